//! Immutable run options.
//!
//! The legacy front end accumulated these in a process-wide mutable dict as
//! flags were parsed. Here the flags are folded into one `Options` value up
//! front; nothing mutates it afterwards, so every worker sees the same
//! snapshot and nothing can leak between invocations.

use crate::cli::args::{Cli, TreeStage};

/// Disassembly display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsmDisplay {
    #[default]
    Off,
    After,
    Both,
}

/// Syntax-tree display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeDisplay {
    #[default]
    None,
    Before,
    After,
    Both,
}

/// How (whether) generated source is verified against the input byte-code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    #[default]
    None,
    /// Compile-check only.
    Weak,
    /// Compare generated source against the byte-code.
    Strong,
    /// Compile, run, and check the exit code.
    Run,
}

/// One immutable snapshot of every per-run option the engine cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub asm: AsmDisplay,
    pub grammar: bool,
    pub tree: TreeDisplay,
    pub verify: VerifyMode,
    pub linemaps: bool,
    pub fragments: bool,
    pub source_encoding: Option<String>,
    pub start_offset: Option<u64>,
    pub stop_offset: Option<u64>,
}

impl Options {
    /// Fold CLI flags into an `Options` snapshot.
    ///
    /// Debug displays dump intermediate state into the generated source,
    /// which makes verification meaningless, so `-a`/`-t`/`-T` switch it
    /// off, matching the legacy flag interactions.
    pub fn from_cli(cli: &Cli) -> Self {
        let asm = match cli.asm {
            0 => AsmDisplay::Off,
            1 => AsmDisplay::After,
            _ => AsmDisplay::Both,
        };

        let before = cli.tree.contains(&TreeStage::Before);
        let after = cli.tree.contains(&TreeStage::After);
        let tree = match (cli.tree_plus, before, after) {
            (true, _, _) | (_, true, true) => TreeDisplay::Both,
            (_, true, false) => TreeDisplay::Before,
            (_, false, true) => TreeDisplay::After,
            (_, false, false) => TreeDisplay::None,
        };

        let mut verify = if cli.verify_run {
            VerifyMode::Run
        } else if cli.verify {
            VerifyMode::Strong
        } else if cli.syntax_verify {
            VerifyMode::Weak
        } else {
            VerifyMode::None
        };
        if asm != AsmDisplay::Off || tree != TreeDisplay::None {
            verify = VerifyMode::None;
        }

        Options {
            asm,
            grammar: cli.grammar,
            tree,
            verify,
            linemaps: cli.linemaps,
            fragments: cli.fragments,
            source_encoding: cli.encoding.clone(),
            start_offset: cli.start_offset,
            stop_offset: cli.stop_offset,
        }
    }
}
