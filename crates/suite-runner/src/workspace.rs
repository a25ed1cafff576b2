//! Per-case scoped working directories.
//!
//! With isolation enabled each case runs inside a private copy held by a
//! [`tempfile::TempDir`]. When the case directory sits under the suite root,
//! the whole root is copied so relative module sources (`source = "../../"`)
//! still resolve; otherwise only the case directory is copied. The copy is
//! removed when the workspace is closed or dropped, on every exit path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::RunnerError;

/// Directory names never copied into a workspace.
const SKIPPED_DIRS: &[&str] = &[".git", ".terraform", "target"];

/// Working directory for a single case.
#[derive(Debug)]
pub struct CaseWorkspace {
    dir: PathBuf,
    temp: Option<TempDir>,
}

impl CaseWorkspace {
    /// Prepares the working directory for `case_dir`.
    ///
    /// Copying runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// `RunnerError::Workspace` when `case_dir` is not a directory or the copy
    /// fails.
    pub async fn prepare(root: &Path, case_dir: &Path, isolate: bool) -> Result<Self, RunnerError> {
        let root = root.to_path_buf();
        let case_dir = case_dir.to_path_buf();
        let display = case_dir.display().to_string();

        tokio::task::spawn_blocking(move || Self::prepare_blocking(&root, &case_dir, isolate))
            .await
            .map_err(|e| RunnerError::Workspace {
                path: display,
                source: io::Error::other(e.to_string()),
            })?
    }

    fn prepare_blocking(root: &Path, case_dir: &Path, isolate: bool) -> Result<Self, RunnerError> {
        let workspace_err = |source: io::Error| RunnerError::Workspace {
            path: case_dir.display().to_string(),
            source,
        };

        let meta = fs::metadata(case_dir).map_err(workspace_err)?;
        if !meta.is_dir() {
            return Err(workspace_err(io::Error::new(
                io::ErrorKind::NotADirectory,
                "not a directory",
            )));
        }

        if !isolate {
            return Ok(Self {
                dir: case_dir.to_path_buf(),
                temp: None,
            });
        }

        let temp = tempfile::Builder::new()
            .prefix("plancheck-")
            .tempdir()
            .map_err(workspace_err)?;

        // never walk into the copy itself, e.g. when the root contains the temp dir
        let exclude = temp.path().canonicalize().map_err(workspace_err)?;
        let case_abs = case_dir.canonicalize().map_err(workspace_err)?;
        let root_abs = root.canonicalize().ok();

        let dir = match root_abs
            .as_deref()
            .and_then(|r| case_abs.strip_prefix(r).ok().map(|rel| (r, rel)))
        {
            Some((root_abs, rel)) => {
                copy_tree(root_abs, temp.path(), &exclude).map_err(workspace_err)?;
                temp.path().join(rel)
            }
            None => {
                let name = case_abs.file_name().unwrap_or(case_abs.as_os_str());
                let target = temp.path().join(name);
                copy_tree(&case_abs, &target, &exclude).map_err(workspace_err)?;
                target
            }
        };

        debug!(case_dir = %case_dir.display(), workspace = %dir.display(), "workspace prepared");
        Ok(Self {
            dir,
            temp: Some(temp),
        })
    }

    /// Directory the engine runs in.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Whether this workspace is a private copy.
    pub fn is_isolated(&self) -> bool {
        self.temp.is_some()
    }

    /// Root of the private copy, if any.
    pub fn temp_root(&self) -> Option<&Path> {
        self.temp.as_ref().map(TempDir::path)
    }

    /// Removes the private copy, reporting removal errors.
    ///
    /// Dropping the workspace also removes it, silently.
    pub fn close(self) -> Result<(), RunnerError> {
        match self.temp {
            Some(temp) => {
                let path = temp.path().display().to_string();
                temp.close()
                    .map_err(|source| RunnerError::Workspace { path, source })
            }
            None => Ok(()),
        }
    }
}

/// Recursively copies `src` into `dst`, skipping [`SKIPPED_DIRS`] and the
/// `exclude` directory.
///
/// Symlinks to files are copied as files; symlinks to directories are
/// skipped to avoid cycles.
fn copy_tree(src: &Path, dst: &Path, exclude: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let from = entry.path();
        let to = dst.join(&name);
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if SKIPPED_DIRS.iter().any(|s| name == *s) || from == exclude {
                continue;
            }
            copy_tree(&from, &to, exclude)?;
        } else if file_type.is_symlink() {
            if fs::metadata(&from).is_ok_and(|m| m.is_file()) {
                fs::copy(&from, &to)?;
            }
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}
