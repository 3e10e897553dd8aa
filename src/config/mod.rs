//! Configuration module for Catalina Runner.
//!
//! This module handles parsing, validation, and access to configuration
//! for server launches: the resolved server installation, per-deployment
//! descriptors and ports, and the shared runner settings. Configurations
//! can be loaded from JSON files or strings, or built programmatically.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use catalina_runner::config::Config;
//!
//! let config = Config::from_file("runner.json").unwrap();
//! println!("Loaded configuration with {} deployments", config.deployments.len());
//! ```
//!
//! Resolving an installation and describing a deployment programmatically:
//!
//! ```no_run
//! use catalina_runner::config::{DeploymentDescriptor, ServerInstallation};
//!
//! let installation = ServerInstallation::resolve("/opt/tomcat").unwrap();
//! let descriptor = DeploymentDescriptor::new("/app", "/home/dev/webapp/src/main/webapp");
//! println!("{} will serve {}", installation.name(), descriptor.context_path);
//! ```
mod deployment;
mod installation;
mod parser;
pub mod validator;

pub use deployment::{ClasspathEntry, DeploymentDescriptor, PortAssignment, RunnerSettings};
pub use installation::{ServerInstallation, VersionTier};
pub use parser::{Config, DeploymentConfig};
pub use validator::validate_config;
