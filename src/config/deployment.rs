use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Context file name used for the root context path.
const ROOT_CONTEXT_NAME: &str = "ROOT";
/// Separator substituted for `/` in context file names.
const CONTEXT_NAME_SEPARATOR: char = '#';

/// One runtime classpath entry supplied by the surrounding build or project
/// model. Directories hold compiled classes, regular files are jars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClasspathEntry {
    /// Filesystem path of the entry.
    pub path: PathBuf,
    /// Whether the entry is a directory of classes rather than a jar.
    pub is_directory: bool,
}

impl ClasspathEntry {
    /// Builds an entry by checking the path on disk.
    ///
    /// A path that does not exist is treated as a jar; the server reports
    /// it in its own way once launched.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_directory = path.is_dir();
        Self { path, is_directory }
    }
}

/// Everything that identifies one deployment of a web application.
///
/// The context path is normalized to begin with `/` when constructed through
/// [`DeploymentDescriptor::new`] or loaded from a configuration file.
///
/// # Examples
///
/// ```
/// use catalina_runner::config::DeploymentDescriptor;
///
/// let descriptor = DeploymentDescriptor::new("app", "/home/dev/webapp/src/main/webapp");
/// assert_eq!(descriptor.context_path, "/app");
/// assert_eq!(descriptor.context_file_name(), "app");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDescriptor {
    /// URL path prefix the application is served under, beginning with `/`.
    pub context_path: String,
    /// Path to the unpacked web application content.
    pub doc_base: PathBuf,
    /// Runtime classpath entries to mount into the application, in order.
    #[serde(default)]
    pub classpath: Vec<ClasspathEntry>,
}

impl DeploymentDescriptor {
    /// Creates a descriptor with a normalized context path and no classpath.
    pub fn new(context_path: impl Into<String>, doc_base: impl Into<PathBuf>) -> Self {
        Self {
            context_path: normalize_context_path(&context_path.into()),
            doc_base: doc_base.into(),
            classpath: Vec::new(),
        }
    }

    /// File name (without extension) of the per-context configuration file.
    ///
    /// Slashes inside the context path become `#`, and the root path maps to
    /// the reserved name `ROOT`, following the server's own convention.
    pub fn context_file_name(&self) -> String {
        let trimmed = self
            .context_path
            .trim_start_matches('/')
            .trim_end_matches('/');
        if trimmed.is_empty() {
            ROOT_CONTEXT_NAME.to_string()
        } else {
            trimmed.replace('/', &CONTEXT_NAME_SEPARATOR.to_string())
        }
    }

    /// Display name for the deployed artifact, used in console output.
    pub fn artifact_name(&self) -> String {
        let trimmed = self.context_path.trim_start_matches('/');
        if trimmed.is_empty() {
            "webapp:war exploded".to_string()
        } else {
            format!("{}:war exploded", trimmed)
        }
    }
}

/// Normalizes a raw context path: always begins with `/`, never ends with
/// one (except the root path itself), surrounding whitespace dropped.
pub(crate) fn normalize_context_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Ports assigned to one launch.
///
/// The value range is enforced by the field type; conflicts between roles are
/// checked by [`crate::config::validator::validate_ports`] before the server
/// configuration is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortAssignment {
    /// Port of the plain HTTP connector.
    pub http: u16,
    /// Loopback port used to signal server shutdown.
    pub shutdown: u16,
    /// Port of the SSL-enabled connector, if the template defines one.
    pub ssl: Option<u16>,
    /// Port of the AJP connector, if the template defines one.
    pub ajp: Option<u16>,
}

impl Default for PortAssignment {
    fn default() -> Self {
        Self {
            http: 8080,
            shutdown: 8005,
            ssl: None,
            ajp: None,
        }
    }
}

/// User-editable launch settings shared by every deployment of a runner.
///
/// All fields are optional in configuration files; missing fields take the
/// defaults below, with the parent environment passed through by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunnerSettings {
    /// Raw VM options string, split on whitespace with double-quote support.
    pub vm_options: String,
    /// Extra classpath entries, joined with the platform path separator.
    pub extra_classpath: String,
    /// Environment variable overrides applied on top of the inherited set.
    pub env: HashMap<String, String>,
    /// Whether the server inherits the parent process environment.
    pub pass_parent_env: bool,
    /// Explicit Java home; falls back to `JAVA_HOME`, then `java` on `PATH`.
    pub java_home: Option<PathBuf>,
    /// Base directory for working areas; defaults to `~/.catalina-runner`.
    pub work_dir: Option<PathBuf>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            vm_options: String::new(),
            extra_classpath: String::new(),
            env: HashMap::new(),
            pass_parent_env: true,
            java_home: None,
            work_dir: None,
        }
    }
}

impl RunnerSettings {
    /// Working-area base directory override, if configured.
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_context_path() {
        assert_eq!(normalize_context_path("app"), "/app");
        assert_eq!(normalize_context_path("/app"), "/app");
        assert_eq!(normalize_context_path("/app/"), "/app");
        assert_eq!(normalize_context_path("  /app "), "/app");
        assert_eq!(normalize_context_path(""), "/");
        assert_eq!(normalize_context_path("/"), "/");
        assert_eq!(normalize_context_path("shop/admin"), "/shop/admin");
    }

    #[test]
    fn test_context_file_name() {
        let root = DeploymentDescriptor::new("/", "/srv/webapp");
        assert_eq!(root.context_file_name(), "ROOT");

        let simple = DeploymentDescriptor::new("/app", "/srv/webapp");
        assert_eq!(simple.context_file_name(), "app");

        let nested = DeploymentDescriptor::new("/shop/admin", "/srv/webapp");
        assert_eq!(nested.context_file_name(), "shop#admin");
    }

    #[test]
    fn test_artifact_name() {
        let root = DeploymentDescriptor::new("/", "/srv/webapp");
        assert_eq!(root.artifact_name(), "webapp:war exploded");

        let simple = DeploymentDescriptor::new("/app", "/srv/webapp");
        assert_eq!(simple.artifact_name(), "app:war exploded");
    }

    #[test]
    fn test_port_defaults() {
        let ports = PortAssignment::default();
        assert_eq!(ports.http, 8080);
        assert_eq!(ports.shutdown, 8005);
        assert!(ports.ssl.is_none());
        assert!(ports.ajp.is_none());
    }

    #[test]
    fn test_settings_default_passes_parent_env() {
        assert!(RunnerSettings::default().pass_parent_env);
    }
}
