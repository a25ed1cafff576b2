//! Command handlers -- one module per subcommand

pub mod config;
pub mod list;
pub mod run;

use std::path::{Path, PathBuf};

/// Resolves a relative suite root against the config file's directory.
pub(crate) fn resolve_root(config_path: &Path, root: &str) -> PathBuf {
    let root = Path::new(root);
    if root.is_absolute() {
        return root.to_path_buf();
    }
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(root),
        _ => root.to_path_buf(),
    }
}
