//! Error handling module for Catalina Runner.
//!
//! This module defines the error types used throughout the library.
//! It provides a comprehensive set of errors that can occur when
//! resolving installations, synthesizing configuration, and supervising
//! server processes, along with helpful context for debugging.
//!
//! # Example
//!
//! ```
//! use catalina_runner::error::{Error, Result};
//!
//! fn handle_error(result: Result<()>) {
//!     match result {
//!         Ok(_) => println!("Launch succeeded"),
//!         Err(Error::InstallationInvalid(msg)) => println!("Bad installation: {}", msg),
//!         Err(Error::UnsupportedVersion(msg)) => println!("Unsupported server: {}", msg),
//!         Err(Error::ConfigTransform(msg)) => println!("Configuration rewrite failed: {}", msg),
//!         Err(e) => println!("Other error: {}", e),
//!     }
//! }
//! ```
use thiserror::Error;

/// Errors that can occur in the catalina-runner library.
///
/// This enum represents all possible error types that can be returned from
/// operations in the library. Each variant includes context information to
/// help diagnose and handle the error appropriately.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse configuration from a file or string.
    ///
    /// This error occurs when:
    /// - The configuration JSON is malformed
    /// - Required fields are missing
    /// - Field types are incorrect
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration is valid JSON but contains invalid values.
    ///
    /// This error occurs when:
    /// - A docBase path is empty or does not exist
    /// - Two roles are assigned the same port number
    /// - A configured Java home has no Java executable
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The server installation directory is not usable.
    ///
    /// This error occurs when:
    /// - The `bin/` or `lib/` subdirectory is missing
    /// - The core library archive cannot be opened
    /// - The version descriptor inside the archive is missing or garbled
    /// - A bootstrap archive expected under `bin/` is absent
    #[error("Invalid server installation: {0}")]
    InstallationInvalid(String),

    /// The server version is below the minimum supported tier.
    ///
    /// This error occurs when:
    /// - The resolved major version is less than 6
    #[error("Unsupported server version: {0}")]
    UnsupportedVersion(String),

    /// A configuration document could not be read, rewritten, or written back.
    ///
    /// This error occurs when:
    /// - `server.xml` or a context template is not well-formed markup
    /// - The root server element or the plain HTTP connector is missing
    /// - The rewritten document cannot be serialized
    #[error("Configuration transform failed: {0}")]
    ConfigTransform(String),

    /// The per-launch working area could not be prepared.
    ///
    /// This error occurs when:
    /// - The home directory cannot be determined
    /// - Copying the template conf tree fails
    /// - A stale working directory cannot be removed
    #[error("Working area error: {0}")]
    WorkArea(String),

    /// The server process could not be created.
    ///
    /// This error occurs when:
    /// - The Java executable does not exist or is not executable
    /// - The operating system refuses to spawn the process
    #[error("Failed to launch server process: {0}")]
    ProcessLaunch(String),

    /// Error while supervising an already-running server process.
    ///
    /// This error occurs when:
    /// - Polling the process status fails
    /// - The process cannot be signalled or reaped
    #[error("Server process error: {0}")]
    Process(String),

    /// Output classification failed for a line.
    ///
    /// This error occurs when:
    /// - Internal classifier state is poisoned
    ///
    /// It is non-fatal: the supervisor reports it as a warning event and
    /// keeps streaming output.
    #[error("Classification error: {0}")]
    Classification(String),

    /// Requested deployment was not found in the configuration.
    ///
    /// This error occurs when:
    /// - A deployment name is passed that doesn't exist in the config
    #[error("Deployment not found: {0}")]
    DeploymentNotFound(String),

    /// Requested server was not found among running servers.
    ///
    /// This error occurs when:
    /// - A server ID is used that doesn't match any launched server
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    /// The server is already running.
    ///
    /// This error occurs when:
    /// - Attempting to launch a context path that already has a live process
    #[error("Already running")]
    AlreadyRunning,

    /// The server is not running.
    ///
    /// This error occurs when:
    /// - Attempting to stop or wait on a server that has no live process
    #[error("Not running")]
    NotRunning,

    /// Any other error not covered by the above categories.
    ///
    /// This is a catch-all error for cases not explicitly handled elsewhere.
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for catalina-runner operations.
///
/// This is a convenience type alias for `std::result::Result` with the `Error` type
/// from this module. Use this throughout the library and in client code to handle
/// errors in a consistent way.
pub type Result<T> = std::result::Result<T, Error>;
