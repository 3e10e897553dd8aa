/*!
 # Catalina Runner

 A Rust library for launching Apache Tomcat servers against locally
 developed web applications.

 ## Overview

 Catalina Runner provides functionality to:
 - Validate a server installation and read its version
 - Deploy an exploded webapp directory with compiled classes and jars
   mounted in place, without copying them into the installation
 - Synthesize per-context descriptors and rewrite `server.xml` ports in a
   private working area, leaving the installation untouched
 - Launch and supervise the server process
 - Classify server output into structured deployment events

 ## Basic Usage

 ```no_run
 use catalina_runner::{CatalinaRunner, Result};

 #[tokio::main]
 async fn main() -> Result<()> {
     // Create a runner from a config file
     let mut runner = CatalinaRunner::from_config_file("runner.json")?;

     // Launch a configured deployment
     let id = runner.launch("webapp").await?;

     // Check on it
     let status = runner.status(id)?;
     println!("Status: {:?}", status);

     // Later, stop the server
     runner.stop(id).await?;

     Ok(())
 }
 ```

 ## Features

 - **Installation Resolution**: Validate a server home and read its version
 - **In-Place Deployment**: Mount class directories and jars into the webapp
 - **Configuration Synthesis**: Context descriptors and port rewriting
 - **Process Supervision**: Orderly startup, shutdown, and exit observation
 - **Output Classification**: Structured events from raw server output
 - **Async Support**: Full async/await support

 ## License

 This project is licensed under the terms in the LICENSE file.
*/

pub mod conf;
pub mod config;
pub mod error;
pub mod launch;
pub mod resources;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
pub use server::{LaunchStatus, ServerId, ServerProcess};

use crate::conf::{WorkingArea, synthesize_context, transform_server_xml_file, write_context_file};
use crate::config::{
    DeploymentConfig, DeploymentDescriptor, PortAssignment, RunnerSettings, ServerInstallation,
    validator,
};
use crate::launch::build_launch_spec;
use crate::resources::collect_resources;
use crate::server::{ConsoleSink, EventSink, OutputClassifier};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Configure and launch servers for locally developed web applications
///
/// This struct is the main entry point. It owns the resolved installation,
/// the shared launch settings, and every server process launched through it,
/// and enforces one active launch per context path.
/// All public methods are instrumented with `tracing` spans.
pub struct CatalinaRunner {
    /// Resolved server installation shared by every launch
    installation: ServerInstallation,
    /// Launch settings shared by every deployment
    settings: RunnerSettings,
    /// Deployments by name, from configuration or added programmatically
    deployments: HashMap<String, DeploymentConfig>,
    /// Running server processes
    servers: HashMap<ServerId, ServerProcess>,
    /// Map of context paths to launch IDs
    contexts: HashMap<String, ServerId>,
}

impl CatalinaRunner {
    /// Create a new runner from a configuration file path
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = Config::from_file(path)?;
        Self::from_config(config)
    }

    /// Create a new runner from a configuration string
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config))]
    pub fn from_config_str(config: &str) -> Result<Self> {
        tracing::info!("Loading configuration from string");
        let config = Config::parse_from_str(config)?;
        Self::from_config(config)
    }

    /// Create a new runner from a parsed configuration
    ///
    /// Validates the configuration and resolves the server installation it
    /// names, so every configuration problem surfaces here rather than at
    /// launch time.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config), fields(num_deployments = config.deployments.len()))]
    pub fn from_config(config: Config) -> Result<Self> {
        validator::validate_config(&config)?;
        let installation = ServerInstallation::resolve(&config.server_home)?;
        let mut runner = Self::new(installation, config.settings);
        runner.deployments = config.deployments;
        Ok(runner)
    }

    /// Create a new runner from a resolved installation and settings
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(installation, settings), fields(server = %installation.name()))]
    pub fn new(installation: ServerInstallation, settings: RunnerSettings) -> Self {
        tracing::info!("Creating new CatalinaRunner");
        Self {
            installation,
            settings,
            deployments: HashMap::new(),
            servers: HashMap::new(),
            contexts: HashMap::new(),
        }
    }

    /// The resolved installation this runner launches.
    pub fn installation(&self) -> &ServerInstallation {
        &self.installation
    }

    /// The launch settings shared by every deployment.
    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Registers a named deployment, replacing any existing one of that name.
    pub fn add_deployment(&mut self, name: impl Into<String>, deployment: DeploymentConfig) {
        self.deployments.insert(name.into(), deployment);
    }

    /// Names of the configured deployments, sorted.
    pub fn deployment_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.deployments.keys().cloned().collect();
        names.sort();
        names
    }

    /// Launch a configured deployment with console output
    ///
    /// Events are rendered to the log in the classic deployment-console
    /// format. Use [`CatalinaRunner::launch_with_sink`] to consume events
    /// programmatically instead.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(deployment = %name))]
    pub async fn launch(&mut self, name: &str) -> Result<ServerId> {
        let (descriptor, ports) = self.deployment(name)?;
        let sink = Arc::new(ConsoleSink::new(
            descriptor.artifact_name(),
            ports.http,
            descriptor.context_path.clone(),
        ));
        self.launch_deployment(&descriptor, ports, Some(sink)).await
    }

    /// Launch a configured deployment with a caller-supplied event sink
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, sink), fields(deployment = %name))]
    pub async fn launch_with_sink(
        &mut self,
        name: &str,
        sink: Arc<dyn EventSink>,
    ) -> Result<ServerId> {
        let (descriptor, ports) = self.deployment(name)?;
        self.launch_deployment(&descriptor, ports, Some(sink)).await
    }

    /// Launch a deployment described directly, without a named configuration
    ///
    /// Runs the full pipeline: validation, working-area preparation, context
    /// synthesis, `server.xml` rewriting, launch spec assembly, and process
    /// start. Without a sink the server output is still drained but produces
    /// no events.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, descriptor, sink), fields(context_path = %descriptor.context_path))]
    pub async fn launch_deployment(
        &mut self,
        descriptor: &DeploymentDescriptor,
        ports: PortAssignment,
        sink: Option<Arc<dyn EventSink>>,
    ) -> Result<ServerId> {
        validator::validate_descriptor(descriptor)?;
        validator::validate_ports(&ports)?;
        validator::validate_settings(&self.settings)?;

        if let Some(id) = self.contexts.get(&descriptor.context_path) {
            tracing::warn!(server_id = %id, "Context already has an active launch");
            return Err(Error::AlreadyRunning);
        }

        let tier = self.installation.tier()?;
        let context_name = descriptor.context_file_name();

        tracing::info!("Preparing working area");
        let area = WorkingArea::for_context(&context_name, self.settings.work_dir())?;
        area.prepare(&self.installation.conf_dir())?;

        let mappings = collect_resources(&descriptor.classpath);
        tracing::debug!(num_mappings = mappings.len(), "Collected classpath resources");
        let document = synthesize_context(descriptor, &mappings, tier)?;
        write_context_file(area.conf(), descriptor, &document)?;
        transform_server_xml_file(area.conf(), &ports)?;

        let spec = build_launch_spec(&self.installation, &self.settings, &area)?;
        tracing::debug!(java = %spec.java.display(), "Built launch spec");

        let mut server = ServerProcess::new(context_name, spec);
        if let Some(sink) = sink {
            let classifier = Arc::new(OutputClassifier::new(descriptor.artifact_name()));
            server = server.with_sink(sink, classifier);
        }
        let id = server.id();

        server.start().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to start server process");
            e
        })?;

        self.servers.insert(id, server);
        self.contexts.insert(descriptor.context_path.clone(), id);
        tracing::info!(server_id = %id, "Server launched successfully");
        Ok(id)
    }

    /// Stop a running server
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(server_id = %id))]
    pub async fn stop(&mut self, id: ServerId) -> Result<()> {
        tracing::info!("Attempting to stop server");
        if let Some(mut server) = self.servers.remove(&id) {
            self.contexts.retain(|_, launch| *launch != id);
            server.stop().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to stop server process");
                e
            })?;
            tracing::info!("Server stopped successfully");
            Ok(())
        } else {
            tracing::warn!("Attempted to stop a server that was not found or not running");
            Err(Error::ServerNotFound(id.to_string()))
        }
    }

    /// Stop all running servers
    ///
    /// Stops servers sequentially, collecting failures; a single failure is
    /// returned as-is, multiple failures are aggregated into one error.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn stop_all(&mut self) -> Result<()> {
        tracing::info!("Stopping all running servers");
        let ids: Vec<ServerId> = self.servers.keys().copied().collect();

        let mut errors = Vec::new();
        for id in ids {
            match self.stop(id).await {
                Ok(()) => {}
                Err(e) => {
                    tracing::error!(server_id = %id, error = %e, "Failed to stop server");
                    errors.push((id, e));
                }
            }
        }

        if errors.is_empty() {
            tracing::info!("All servers stopped successfully");
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0).1)
        } else {
            let error_msg = errors
                .iter()
                .map(|(id, e)| format!("{}: {}", id, e))
                .collect::<Vec<_>>()
                .join("; ");
            Err(Error::Other(format!(
                "Multiple servers failed to stop: {}",
                error_msg
            )))
        }
    }

    /// Wait for a running server to exit on its own
    ///
    /// Returns the exit code when the process exited normally; a non-zero
    /// code is not an error. The context path frees up for a new launch.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(server_id = %id))]
    pub async fn wait(&mut self, id: ServerId) -> Result<Option<i32>> {
        let server = self.servers.get_mut(&id).ok_or_else(|| {
            tracing::warn!("Wait requested for unknown server");
            Error::ServerNotFound(id.to_string())
        })?;
        let exit_code = server.wait().await?;
        self.contexts.retain(|_, launch| *launch != id);
        Ok(exit_code)
    }

    /// Get the lifecycle status of a launch
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(server_id = %id))]
    pub fn status(&self, id: ServerId) -> Result<LaunchStatus> {
        self.servers
            .get(&id)
            .map(|server| server.status())
            .ok_or_else(|| {
                tracing::warn!("Status requested for unknown server");
                Error::ServerNotFound(id.to_string())
            })
    }

    /// Status of every known launch, keyed by context file name.
    pub fn statuses(&self) -> HashMap<String, LaunchStatus> {
        self.servers
            .values()
            .map(|server| (server.name().to_string(), server.status()))
            .collect()
    }

    fn deployment(&self, name: &str) -> Result<(DeploymentDescriptor, PortAssignment)> {
        let config = self.deployments.get(name).ok_or_else(|| {
            tracing::error!("Configuration not found for deployment");
            Error::DeploymentNotFound(name.to_string())
        })?;
        Ok((config.to_descriptor(), config.ports))
    }
}
