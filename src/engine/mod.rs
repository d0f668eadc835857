//! The external transformation boundary.
//!
//! Decompilation itself happens in an external single-file engine program.
//! This module owns the seam: the [`Transform`] trait a dispatcher worker
//! calls once per file, the [`Counters`] it gets back, and the
//! [`ExternalEngine`] implementation that shells out to the real decompiler.
//!
//! Engine contract: the decompiled source arrives on the engine's stdout,
//! diagnostics on its stderr; exit 0 is success, exit 2 means the requested
//! verification failed, any other nonzero exit is a per-file failure.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::Write;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AsmDisplay, Options, TreeDisplay, VerifyMode};
use crate::error::BatchError;
use crate::paths::Destination;

/// Outcome counters for a batch. Created at zero, bumped once per file,
/// summed across workers, printed once as the summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total: u64,
    pub okay: u64,
    pub failed: u64,
    pub verify_failed: u64,
}

impl Counters {
    pub fn one_okay() -> Self {
        Counters {
            total: 1,
            okay: 1,
            ..Default::default()
        }
    }

    pub fn one_failed() -> Self {
        Counters {
            total: 1,
            failed: 1,
            ..Default::default()
        }
    }

    pub fn one_verify_failed() -> Self {
        Counters {
            total: 1,
            verify_failed: 1,
            ..Default::default()
        }
    }
}

impl AddAssign for Counters {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.okay += rhs.okay;
        self.failed += rhs.failed;
        self.verify_failed += rhs.verify_failed;
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decompiled {} files: {} okay, {} failed, {} verify failed",
            self.total, self.okay, self.failed, self.verify_failed
        )
    }
}

/// Shared immutable context for one batch run. Built once by the CLI layer
/// and read concurrently by every worker.
#[derive(Debug)]
pub struct BatchContext {
    /// Common prefix stripped from the inputs; empty or ends with the path
    /// separator, so `src_base + relative` is the original input path.
    pub src_base: String,
    pub dest: Destination,
    pub options: Options,
}

impl BatchContext {
    pub fn input_path(&self, relative: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.src_base, relative))
    }
}

/// Per-file failures the dispatcher can recognize.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Decompilation succeeded structurally but the generated source did
    /// not verify against the input byte-code.
    #[error("verification failed for {path}")]
    VerifyMismatch { path: String },

    /// Everything else. Serial mode aborts on these; parallel mode records
    /// a failure and moves on.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

/// The per-file transformation seam.
///
/// Implementations must be callable from several workers at once. Distinct
/// work items never target the same output path, so no locking is needed
/// around output writes.
pub trait Transform: Send + Sync {
    fn invoke(&self, ctx: &BatchContext, relative: &str) -> Result<Counters, TransformError>;
}

/// Shells out to a single-file decompiler program per work item and maps
/// its outcome onto [`Counters`] and the output-file naming conventions:
/// `_dis` for verified successes, `_dis_unverified` when verification
/// failed, `_dis_failed` holding the engine's stderr on failure.
#[derive(Debug)]
pub struct ExternalEngine {
    program: PathBuf,
}

impl ExternalEngine {
    pub const VERIFY_MISMATCH_EXIT: i32 = 2;

    /// Resolve the engine program on PATH once, up front. A missing engine
    /// is a setup failure, not a per-file one.
    pub fn resolve(program: &str) -> Result<Self, BatchError> {
        let resolved = which::which(program).map_err(|err| BatchError::Setup {
            program: program.to_string(),
            reason: err.to_string(),
        })?;
        debug!(engine = %resolved.display(), "resolved decompiler engine");
        Ok(Self { program: resolved })
    }

    /// Bypass PATH resolution; the caller vouches for the program.
    pub fn from_path(program: PathBuf) -> Self {
        Self { program }
    }

    fn engine_args(options: &Options) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match options.asm {
            AsmDisplay::Off => {}
            AsmDisplay::After => args.push("-a".into()),
            AsmDisplay::Both => {
                args.push("-a".into());
                args.push("-a".into());
            }
        }
        if options.grammar {
            args.push("--grammar".into());
        }
        match options.tree {
            TreeDisplay::None => {}
            TreeDisplay::Before => args.push("--tree=before".into()),
            TreeDisplay::After => args.push("--tree=after".into()),
            TreeDisplay::Both => {
                args.push("--tree=before".into());
                args.push("--tree=after".into());
            }
        }
        match options.verify {
            VerifyMode::None => {}
            VerifyMode::Weak => args.push("--syntax-verify".into()),
            VerifyMode::Strong => args.push("--verify".into()),
            VerifyMode::Run => args.push("--verify-run".into()),
        }
        if options.linemaps {
            args.push("--linemaps".into());
        }
        if options.fragments {
            args.push("--fragments".into());
        }
        if let Some(encoding) = &options.source_encoding {
            args.push(format!("--encoding={encoding}").into());
        }
        if let Some(offset) = options.start_offset {
            args.push(format!("--start-offset={offset}").into());
        }
        if let Some(offset) = options.stop_offset {
            args.push(format!("--stop-offset={offset}").into());
        }
        args
    }

    /// Write one product either to its mapped file (creating intermediate
    /// directories) or to the shared stdout stream.
    fn write_product(
        ctx: &BatchContext,
        relative: &str,
        suffix: &str,
        bytes: &[u8],
    ) -> anyhow::Result<()> {
        match &ctx.dest {
            Destination::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(bytes)
                    .context("writing decompiled source to stdout")?;
            }
            // An explicit single-file target is used literally, no suffix.
            Destination::File(path) => {
                fs::write(path, bytes)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            Destination::Dir(base) => {
                let mapped = base.join(relative);
                let target = with_suffix(&mapped, suffix);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                fs::write(&target, bytes)
                    .with_context(|| format!("writing {}", target.display()))?;
            }
        }
        Ok(())
    }
}

impl Transform for ExternalEngine {
    fn invoke(&self, ctx: &BatchContext, relative: &str) -> Result<Counters, TransformError> {
        let input = ctx.input_path(relative);
        let output = Command::new(&self.program)
            .args(Self::engine_args(&ctx.options))
            .arg(&input)
            .output()
            .with_context(|| format!("spawning {}", self.program.display()))?;

        match output.status.code() {
            Some(0) => {
                Self::write_product(ctx, relative, "_dis", &output.stdout)?;
                Ok(Counters::one_okay())
            }
            Some(Self::VERIFY_MISMATCH_EXIT) => {
                // The decompiled source is still worth keeping; it just
                // carries the unverified marker.
                Self::write_product(ctx, relative, "_dis_unverified", &output.stdout)?;
                Err(TransformError::VerifyMismatch {
                    path: input.display().to_string(),
                })
            }
            _ => {
                warn!(input = %input.display(), status = ?output.status, "decompilation failed");
                if matches!(ctx.dest, Destination::Dir(_)) {
                    Self::write_product(ctx, relative, "_dis_failed", &output.stderr)?;
                }
                Ok(Counters::one_failed())
            }
        }
    }
}

/// Append a suffix to the file name: `pkg/mod.pyc` + `_dis` ->
/// `pkg/mod.pyc_dis`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Byte-compile a Python source so it can be fed back through the engine,
/// mirroring the front end's `--compile` round trip.
pub fn compile_source(python: &str, source: &Path) -> anyhow::Result<PathBuf> {
    let target = source.with_extension("pyc");
    let status = Command::new(python)
        .arg("-c")
        .arg("import py_compile, sys; py_compile.compile(sys.argv[1], sys.argv[2], doraise=True)")
        .arg(source)
        .arg(&target)
        .status()
        .with_context(|| format!("running {python}"))?;
    anyhow::ensure!(
        status.success(),
        "byte-compiling {} failed",
        source.display()
    );
    Ok(target)
}
