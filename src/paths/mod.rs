//! Input path reduction and destination mapping.
//!
//! `reduce` strips the longest common directory prefix from the inputs so
//! that [`Destination::map`] can rebuild the same subdirectory structure
//! under the output base:
//!
//! ```text
//! unpyc -o /tmp bla/fasel.pyc bla/foo.pyc  ->  /tmp/fasel.pyc_dis, /tmp/foo.pyc_dis
//! unpyc -o /tmp bla/fasel.pyc bar/foo.pyc  ->  /tmp/bla/fasel.pyc_dis, /tmp/bar/foo.pyc_dis
//! ```

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::BatchError;

/// Longest common leading substring across all paths. Character-wise on
/// purpose: the directory-boundary fixup happens in [`reduce`].
fn common_prefix(paths: &[String]) -> String {
    let mut prefix = paths[0].as_str();
    for path in &paths[1..] {
        let shared = prefix
            .char_indices()
            .zip(path.chars())
            .take_while(|((_, a), b)| a == b)
            .count();
        prefix = &prefix[..byte_len(prefix, shared)];
    }
    prefix.to_string()
}

fn byte_len(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

/// Compute the common prefix of `paths` and strip it from each of them.
///
/// The raw character-level prefix can end inside a filename (`some/classes`
/// and `some/cmds` share `some/c`), so it is truncated back to the last
/// directory boundary before stripping. The returned prefix is either empty
/// or ends with the path separator, and `prefix + relative` reproduces every
/// input exactly, in order.
///
/// A single input reduces to its parent directory plus its basename. An
/// empty input set is a usage error, never silently tolerated.
pub fn reduce(paths: &[String]) -> Result<(String, Vec<String>), BatchError> {
    if paths.is_empty() {
        return Err(BatchError::Usage("No files given".into()));
    }
    let mut prefix = common_prefix(paths);
    if !prefix.ends_with(MAIN_SEPARATOR) {
        prefix = match prefix.rfind(MAIN_SEPARATOR) {
            Some(idx) => prefix[..=idx].to_string(),
            None => String::new(),
        };
    }
    let relatives = paths
        .iter()
        .map(|p| p[prefix.len()..].to_string())
        .collect();
    Ok((prefix, relatives))
}

fn is_bytecode(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("pyc") | Some("pyo")
    )
}

/// Expand directory arguments into the bytecode files beneath them.
///
/// Without `recurse` the inputs pass through untouched. With it, each
/// directory is walked for `.pyc`/`.pyo` files; plain file arguments are
/// kept as given. Walk order is sorted for a stable dispatch order.
pub fn expand_inputs(paths: &[String], recurse: bool) -> Vec<String> {
    if !recurse {
        return paths.to_vec();
    }
    let mut expanded = Vec::new();
    for path in paths {
        if Path::new(path).is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
                if entry.file_type().is_file() && is_bytecode(entry.path()) {
                    expanded.push(entry.path().to_string_lossy().into_owned());
                }
            }
        } else {
            expanded.push(path.clone());
        }
    }
    expanded.sort();
    expanded
}

/// Where decompiled output lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The shared standard output stream. Workers do not serialize their
    /// writes, so interleaving across workers is undefined; callers wanting
    /// ordered output use serial mode.
    Stdout,
    /// One literal output file; only chosen for a single input.
    File(PathBuf),
    /// Directory base; each relative path is re-rooted beneath it.
    Dir(PathBuf),
}

impl Destination {
    /// Resolve the `-o` argument against the number of inputs: `-` or no
    /// argument means stdout, an existing directory (or any path with more
    /// than one input) becomes the multi-file base, otherwise the argument
    /// names the single output file literally.
    pub fn resolve(outfile: Option<&str>, inputs: usize) -> Self {
        match outfile {
            None | Some("-") => Destination::Stdout,
            Some(path) if Path::new(path).is_dir() => Destination::Dir(PathBuf::from(path)),
            Some(path) if inputs > 1 => Destination::Dir(PathBuf::from(path)),
            Some(path) => Destination::File(PathBuf::from(path)),
        }
    }

    /// Map one relative input onto its output location. `None` is the shared
    /// stdout stream. Pure; intermediate directories are created by the
    /// writer, not here.
    pub fn map(&self, relative: &str) -> Option<PathBuf> {
        match self {
            Destination::Stdout => None,
            Destination::File(path) => Some(path.clone()),
            Destination::Dir(base) => Some(base.join(relative)),
        }
    }
}
