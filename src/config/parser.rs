use crate::config::deployment::{
    ClasspathEntry, DeploymentDescriptor, PortAssignment, RunnerSettings, normalize_context_path,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration for a single named deployment.
///
/// This structure defines what to deploy and on which ports. Classpath
/// entries are plain paths here; whether each one is a directory or a jar is
/// decided against the filesystem when the deployment is launched.
///
/// # Examples
///
/// ```
/// use catalina_runner::config::DeploymentConfig;
///
/// let deployment = DeploymentConfig {
///     context_path: "/app".to_string(),
///     doc_base: "/home/dev/webapp/src/main/webapp".into(),
///     classpath: vec!["/home/dev/webapp/target/classes".into()],
///     ports: Default::default(),
/// };
/// assert_eq!(deployment.ports.http, 8080);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    /// URL path prefix the application is served under.
    pub context_path: String,

    /// Path to the unpacked web application content.
    pub doc_base: PathBuf,

    /// Runtime classpath entries (class directories and jars), in order.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,

    /// Ports assigned to this deployment.
    #[serde(default)]
    pub ports: PortAssignment,
}

impl DeploymentConfig {
    /// Resolves the configured paths into a launchable descriptor.
    ///
    /// Classpath entries are classified as directories or jars by checking
    /// the filesystem at this point.
    pub fn to_descriptor(&self) -> DeploymentDescriptor {
        let mut descriptor = DeploymentDescriptor::new(&self.context_path, &self.doc_base);
        descriptor.classpath = self
            .classpath
            .iter()
            .map(|path| ClasspathEntry::from_path(path))
            .collect();
        descriptor
    }
}

/// Main configuration for the runner.
///
/// This structure names the server installation to launch, the launch
/// settings shared by all deployments, and any number of named deployments.
///
/// # JSON Schema
///
/// The configuration follows this JSON schema:
///
/// ```json
/// {
///   "serverHome": "/opt/tomcat",
///   "settings": {
///     "vmOptions": "-Xmx512m",
///     "passParentEnv": true
///   },
///   "deployments": {
///     "webapp": {
///       "contextPath": "/app",
///       "docBase": "/home/dev/webapp/src/main/webapp",
///       "classpath": ["/home/dev/webapp/target/classes"],
///       "ports": { "http": 8080, "shutdown": 8005 }
///     }
///   }
/// }
/// ```
///
/// # Examples
///
/// Loading a configuration from a file:
///
/// ```no_run
/// use catalina_runner::config::Config;
///
/// let config = Config::from_file("runner.json").unwrap();
/// println!("Loaded {} deployments", config.deployments.len());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root directory of the server installation.
    pub server_home: PathBuf,

    /// Launch settings shared by all deployments.
    #[serde(default)]
    pub settings: RunnerSettings,

    /// Map of deployment names to their configurations.
    #[serde(default)]
    pub deployments: HashMap<String, DeploymentConfig>,
}

impl Config {
    /// Loads a configuration from a file path.
    ///
    /// This method reads the file at the specified path and parses its
    /// contents as a JSON configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The file contents are not valid JSON
    /// * The JSON does not conform to the expected schema
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// Context paths of all deployments are normalized to begin with `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The string is not valid JSON
    /// * The JSON does not conform to the expected schema
    pub fn parse_from_str(content: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))?;
        for deployment in config.deployments.values_mut() {
            deployment.context_path = normalize_context_path(&deployment.context_path);
        }
        Ok(config)
    }
}
