//! # unpyc - batch Python bytecode decompilation front end
//!
//! unpyc fans a set of `.pyc`/`.pyo` files out to a pool of worker threads,
//! each of which hands one file to an external single-file decompiler engine,
//! then aggregates per-worker outcome counters into a single summary line.
//!
//! Before any work is dispatched the input paths are normalized: the longest
//! common directory prefix is stripped and the remainders are re-rooted under
//! the destination directory, so subdirectory structure survives the trip.
//!
//! ## Basic Usage
//!
//! ```bash
//! # Decompile to stdout
//! unpyc foo.pyc bar.pyc
//!
//! # Decompile a whole tree into /tmp with four workers
//! unpyc -r -p 4 -o /tmp /usr/lib/python3.11
//! ```
//!
//! The engine itself is an opaque collaborator behind the [`engine::Transform`]
//! trait; this crate only owns dispatch, path remapping, and aggregation.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod paths;
