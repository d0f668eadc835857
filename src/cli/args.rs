//! Argument definitions for the `unpyc` binary.

use std::path::PathBuf;

use clap::Parser;

/// Which side of the tree transformation to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TreeStage {
    Before,
    After,
}

/// Batch Python bytecode decompilation front end
#[derive(Debug, Parser)]
#[command(
    name = "unpyc",
    version,
    about = "Batch Python bytecode decompilation front end",
    long_about = "Batch Python bytecode decompilation front end.\n\n\
                  Decompiles .pyc/.pyo files through an external single-file decompiler \
                  engine, fanning the inputs out to parallel workers and summing the \
                  per-file outcomes into one summary line. When writing into a directory \
                  the common prefix of the inputs is stripped and their subdirectory \
                  structure is preserved beneath the output base."
)]
pub struct Cli {
    /// Bytecode files or directories to decompile
    #[arg(value_name = "FILE|DIR")]
    pub files: Vec<String>,

    /// Output destination: a directory, a single file, or `-` for stdout
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<String>,

    /// Number of worker processes
    #[arg(short = 'p', long = "processes", value_name = "N", default_value_t = 0)]
    pub processes: usize,

    /// Recurse directories looking for .pyc and .pyo files
    #[arg(short = 'r', long = "recurse")]
    pub recurse: bool,

    /// Byte-compile a Python source first, then decompile the result (repeatable)
    #[arg(short = 'c', long = "compile", value_name = "PY-FILE")]
    pub compile: Vec<PathBuf>,

    /// Print a timestamp banner before and after the run
    #[arg(short = 'd', long = "timestamp")]
    pub timestamp: bool,

    /// Include byte-code disassembly; given twice, before and after as well
    /// (disables verification)
    #[arg(short = 'a', long = "asm", action = clap::ArgAction::Count)]
    pub asm: u8,

    /// Show matching grammar rules
    #[arg(short = 'g', long = "grammar")]
    pub grammar: bool,

    /// Show the syntax tree before or after transformation, e.g.
    /// `--tree=after`; bare `-t` means before (disables verification)
    #[arg(
        short = 't',
        long = "tree",
        value_enum,
        value_name = "STAGE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "before"
    )]
    pub tree: Vec<TreeStage>,

    /// Show the syntax tree both before and after transformation
    #[arg(short = 'T', long = "tree-plus")]
    pub tree_plus: bool,

    /// Compare generated source against the input byte-code
    #[arg(long = "verify")]
    pub verify: bool,

    /// Only compile-check the generated source
    #[arg(long = "syntax-verify")]
    pub syntax_verify: bool,

    /// Compile the generated source, run it and check its exit code
    #[arg(long = "verify-run")]
    pub verify_run: bool,

    /// Emit line-number correspondences between byte-code and source
    #[arg(long = "linemaps")]
    pub linemaps: bool,

    /// Use the fragments deparser
    #[arg(long = "fragments")]
    pub fragments: bool,

    /// Source encoding for generated files (PEP 263)
    #[arg(long = "encoding", value_name = "ENCODING")]
    pub encoding: Option<String>,

    /// Only decompile instructions at or after this byte offset
    #[arg(long = "start-offset", value_name = "OFFSET")]
    pub start_offset: Option<u64>,

    /// Stop decompiling at this byte offset
    #[arg(long = "stop-offset", value_name = "OFFSET")]
    pub stop_offset: Option<u64>,

    /// Decompiler engine program invoked once per file
    #[arg(
        long = "engine",
        value_name = "PROG",
        env = "UNPYC_ENGINE",
        default_value = "uncompyle6"
    )]
    pub engine: String,

    /// Python interpreter used by --compile
    #[arg(
        long = "python",
        value_name = "PROG",
        env = "UNPYC_PYTHON",
        default_value = "python3"
    )]
    pub python: String,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
