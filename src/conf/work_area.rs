use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under the user's home that collects working areas when no
/// explicit base directory is configured.
const DEFAULT_BASE_DIR: &str = ".catalina-runner";

/// The per-launch directory tree the server runs out of.
///
/// Every launch owns exactly one working area, derived from its context
/// file name, so concurrent launches of different contexts never share
/// mutable state. [`WorkingArea::prepare`] wipes and recreates the `conf`
/// subtree from the installation template on every launch; nothing from a
/// previous run survives into the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingArea {
    root: PathBuf,
    conf: PathBuf,
    temp: PathBuf,
    logs: PathBuf,
}

impl WorkingArea {
    /// Derives the working area paths for a context without touching the
    /// filesystem.
    ///
    /// # Arguments
    ///
    /// * `context_name` - The context file name, used as the directory name
    /// * `base_override` - Optional base directory replacing the default
    ///   `~/.catalina-runner`
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkArea` if no base override is given and the home
    /// directory cannot be determined.
    pub fn for_context(context_name: &str, base_override: Option<&Path>) -> Result<Self> {
        let base = match base_override {
            Some(dir) => dir.to_path_buf(),
            None => dirs::home_dir()
                .ok_or_else(|| {
                    Error::WorkArea("Could not determine the home directory".to_string())
                })?
                .join(DEFAULT_BASE_DIR),
        };
        let root = base.join(context_name);
        Ok(Self {
            conf: root.join("conf"),
            temp: root.join("temp"),
            logs: root.join("logs"),
            root,
        })
    }

    /// Root of the working area; the server's base directory and the
    /// process working directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The writable `conf` tree, recreated from the template on `prepare`.
    pub fn conf(&self) -> &Path {
        &self.conf
    }

    /// Scratch directory handed to the server as its temp dir.
    pub fn temp(&self) -> &Path {
        &self.temp
    }

    /// Directory for the server's own log files.
    pub fn logs(&self) -> &Path {
        &self.logs
    }

    /// Wipes any previous `conf` tree, copies the installation template in,
    /// and makes sure the temp and logs directories exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkArea` when a directory cannot be removed,
    /// created, or copied.
    pub fn prepare(&self, template_conf: &Path) -> Result<()> {
        if self.conf.exists() {
            fs::remove_dir_all(&self.conf).map_err(|e| {
                Error::WorkArea(format!(
                    "Failed to remove stale conf tree {}: {}",
                    self.conf.display(),
                    e
                ))
            })?;
        }
        copy_dir_recursive(template_conf, &self.conf)?;
        for dir in [&self.temp, &self.logs] {
            fs::create_dir_all(dir).map_err(|e| {
                Error::WorkArea(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        tracing::debug!(root = %self.root.display(), "Prepared working area");
        Ok(())
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .map_err(|e| Error::WorkArea(format!("Failed to create {}: {}", dst.display(), e)))?;
    let entries = fs::read_dir(src)
        .map_err(|e| Error::WorkArea(format!("Failed to read {}: {}", src.display(), e)))?;
    for entry in entries {
        let entry = entry
            .map_err(|e| Error::WorkArea(format!("Failed to read {}: {}", src.display(), e)))?;
        let file_type = entry.file_type().map_err(|e| {
            Error::WorkArea(format!("Failed to stat {}: {}", entry.path().display(), e))
        })?;
        let target = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| {
                Error::WorkArea(format!(
                    "Failed to copy {} to {}: {}",
                    entry.path().display(),
                    target.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}
