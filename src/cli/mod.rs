//! Command-line interface for unpyc.
//!
//! Argument definitions live in [`args`]; this module wires a parsed
//! command line into the path reducer, the engine, and the dispatcher.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::Options;
use crate::dispatch::{CancelToken, Dispatcher};
use crate::engine::{self, BatchContext, ExternalEngine};
use crate::paths::{self, Destination};

pub mod args;

use args::Cli;

const TIMESTAMP_FMT: &str = "# %Y.%m.%d %H:%M:%S %Z";

impl Cli {
    /// Run one batch: normalize paths, resolve the engine, dispatch, print
    /// the summary.
    pub fn run(self, cancel: CancelToken) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        let options = Options::from_cli(&self);

        let mut files = self.files.clone();
        for source in &self.compile {
            let compiled = engine::compile_source(&self.python, source)?;
            info!(source = %source.display(), compiled = %compiled.display(), "byte-compiled");
            files.push(compiled.to_string_lossy().into_owned());
        }
        let files = paths::expand_inputs(&files, self.recurse);

        let (prefix, relatives) = paths::reduce(&files)?;
        debug!(%prefix, inputs = relatives.len(), "reduced input paths");

        let dest = Destination::resolve(self.output.as_deref(), relatives.len());
        let engine = ExternalEngine::resolve(&self.engine)?;

        let ctx = Arc::new(BatchContext {
            src_base: prefix,
            dest,
            options,
        });

        if self.timestamp {
            println!("{}", chrono::Local::now().format(TIMESTAMP_FMT));
        }

        let multiple = relatives.len() > 1;
        let workers = effective_workers(self.processes);
        let dispatcher = Dispatcher::new(workers);
        let totals = dispatcher.run(ctx, relatives, Arc::new(engine), cancel)?;

        // One combined line for a parallel run; serial mode only reports
        // when there was more than one file to talk about.
        if workers > 1 || multiple {
            println!("# {totals}");
        }

        if self.timestamp {
            println!("{}", chrono::Local::now().format(TIMESTAMP_FMT));
        }
        Ok(())
    }
}

/// Cap the requested worker count at twice the core count; the engine is
/// CPU-bound, so anything past that only adds contention.
fn effective_workers(requested: usize) -> usize {
    if requested <= 1 {
        return requested;
    }
    let cap = num_cpus::get().max(1) * 2;
    if requested > cap {
        debug!(requested, cap, "capping worker count");
    }
    requested.min(cap)
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // Decompiled source goes to stdout; keep diagnostics off it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
