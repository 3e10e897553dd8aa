//! Classpath resource mapping.
//!
//! Turns the runtime classpath of a deployment into typed resource
//! descriptors: class directories are overlaid onto the application's
//! classes location, jars onto its library location. The collector is a
//! pure function over its input; nothing here touches the filesystem.

use crate::config::ClasspathEntry;
use std::path::PathBuf;

/// Mount point for directory entries inside the web application.
const CLASSES_MOUNT: &str = "/WEB-INF/classes";
/// Mount prefix for jar entries inside the web application.
const LIB_MOUNT: &str = "/WEB-INF/lib";

/// What a classpath entry contributes to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A directory of compiled classes.
    Directory,
    /// A single jar file.
    File,
}

/// One classpath entry resolved to its mount point inside the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMapping {
    /// Filesystem path backing the resource.
    pub base: PathBuf,
    /// Path inside the web application where the resource is mounted.
    pub mount: String,
    /// Directory or single file.
    pub kind: ResourceKind,
}

/// Maps classpath entries to resource mappings, preserving input order.
///
/// Directories mount at the fixed classes path; files mount under the
/// library path keyed by their own file name. An empty input yields an
/// empty output, which is a valid deployment with no mounted resources.
pub fn collect_resources(entries: &[ClasspathEntry]) -> Vec<ResourceMapping> {
    entries
        .iter()
        .map(|entry| {
            if entry.is_directory {
                ResourceMapping {
                    base: entry.path.clone(),
                    mount: CLASSES_MOUNT.to_string(),
                    kind: ResourceKind::Directory,
                }
            } else {
                let file_name = entry
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                ResourceMapping {
                    base: entry.path.clone(),
                    mount: format!("{}/{}", LIB_MOUNT, file_name),
                    kind: ResourceKind::File,
                }
            }
        })
        .collect()
}
