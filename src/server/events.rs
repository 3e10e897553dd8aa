//! Launch events and the sinks that consume them.
//!
//! The supervisor's reader tasks turn server output into [`ProcessEvent`]s
//! and hand them to an [`EventSink`]. Two sinks ship with the crate: a
//! console renderer in the familiar deployment-log format and a channel
//! forwarder for programmatic consumers.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::mpsc;

/// Which pipe of the server process a line of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error, where the server's own logging usually lands.
    Stderr,
}

/// One completed line of raw process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Pipe the line arrived on.
    pub stream: OutputStream,
    /// Line content without the trailing newline.
    pub text: String,
}

/// What a classified line, or the supervisor itself, reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventKind {
    /// The server finished booting.
    StartupComplete {
        /// Boot time as reported by the server.
        duration_ms: u64,
    },
    /// A web application began deploying.
    DeploymentStarted {
        /// Artifact display name.
        artifact: String,
    },
    /// A web application finished deploying.
    DeploymentSucceeded {
        /// Artifact display name.
        artifact: String,
        /// Deploy time as reported by the server.
        duration_ms: u64,
    },
    /// A web application failed to deploy or start.
    DeploymentFailed {
        /// Artifact display name.
        artifact: String,
        /// The server output line that reported the failure.
        detail: String,
    },
    /// The server's JMX agent came up.
    JmxEnabled {
        /// JMX port.
        port: u16,
    },
    /// The server is reloading a context in place.
    HotDeployTriggered,
    /// Periodic heap usage report.
    MemorySample {
        /// Used heap in megabytes.
        used_mb: u64,
    },
    /// A warning-level server line.
    Warning {
        /// The line content.
        message: String,
    },
    /// An error-level server line.
    Error {
        /// The line content.
        message: String,
    },
    /// A line that matched a rule but whose payload could not be parsed.
    Info {
        /// The line content.
        message: String,
    },
    /// The server process exited.
    Terminated {
        /// Exit code, absent when the process died on a signal.
        exit_code: Option<i32>,
    },
}

/// An event together with the time it was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEvent {
    /// What happened.
    pub kind: EventKind,
    /// When the supervisor observed it.
    pub timestamp: SystemTime,
}

impl ProcessEvent {
    /// Wraps an event kind with the current time.
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: SystemTime::now(),
        }
    }
}

/// Consumer of classified launch events.
///
/// Implementations are called from the supervisor's reader tasks and must
/// not block; forward to a channel or log synchronously.
pub trait EventSink: Send + Sync {
    /// Consumes one classified event.
    fn emit(&self, event: &ProcessEvent);

    /// Observes every raw output line before classification.
    fn on_line(&self, _line: &OutputLine) {}
}

/// Renders events in the classic deployment-console format and writes them
/// through `tracing`.
///
/// ```text
/// [10:41:32,115] Artifact app:war exploded: Artifact is being deployed, please wait...
/// [10:41:33,649] Artifact app:war exploded: Artifact is deployed successfully
/// [10:41:34,002] Server startup in 1534 ms
/// Application available at http://localhost:8080/app
/// ```
pub struct ConsoleSink {
    artifact: String,
    http_port: u16,
    context_path: String,
}

impl ConsoleSink {
    /// Creates a console sink for one deployment.
    ///
    /// # Arguments
    ///
    /// * `artifact` - Artifact display name used in deployment lines
    /// * `http_port` - HTTP port used to render the application URL
    /// * `context_path` - Context path appended to the application URL
    pub fn new(artifact: impl Into<String>, http_port: u16, context_path: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            http_port,
            context_path: context_path.into(),
        }
    }

    fn application_url(&self) -> String {
        if self.http_port == 80 {
            format!("http://localhost{}", self.context_path)
        } else {
            format!("http://localhost:{}{}", self.http_port, self.context_path)
        }
    }

    fn render(&self, event: &ProcessEvent) -> String {
        let ts = timestamp(event.timestamp);
        match &event.kind {
            EventKind::StartupComplete { duration_ms } => format!(
                "[{}] Server startup in {} ms\nApplication available at {}",
                ts,
                duration_ms,
                self.application_url()
            ),
            EventKind::DeploymentStarted { artifact } => format!(
                "[{}] Artifact {}: Artifact is being deployed, please wait...",
                ts, artifact
            ),
            EventKind::DeploymentSucceeded { artifact, .. } => format!(
                "[{}] Artifact {}: Artifact is deployed successfully",
                ts, artifact
            ),
            EventKind::DeploymentFailed { artifact, .. } => format!(
                "[{}] Artifact {}: Error during artifact deployment. See server log for details.",
                ts, artifact
            ),
            EventKind::JmxEnabled { port } => {
                format!("[{}] INFO: JMX agent enabled on port {}", ts, port)
            }
            EventKind::HotDeployTriggered => format!("[{}] INFO: Reloading context", ts),
            EventKind::MemorySample { used_mb } => {
                format!("[{}] INFO: Heap usage {}M", ts, used_mb)
            }
            EventKind::Warning { message } => format!("[{}] WARN: {}", ts, message),
            EventKind::Error { message } => format!("[{}] ERROR: {}", ts, message),
            EventKind::Info { message } => format!("[{}] INFO: {}", ts, message),
            EventKind::Terminated { exit_code } => match exit_code {
                Some(code) => format!("[{}] Process finished with exit code {}", ts, code),
                None => format!("[{}] Process finished", ts),
            },
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: &ProcessEvent) {
        let rendered = self.render(event);
        match &event.kind {
            EventKind::Error { .. } => {
                tracing::error!(artifact = %self.artifact, "{}", rendered);
            }
            EventKind::DeploymentFailed { detail, .. } => {
                tracing::error!(artifact = %self.artifact, detail = %detail, "{}", rendered);
            }
            EventKind::Warning { .. } => {
                tracing::warn!(artifact = %self.artifact, "{}", rendered);
            }
            _ => {
                tracing::info!(artifact = %self.artifact, "{}", rendered);
            }
        }
    }
}

/// Forwards events into an unbounded channel, preserving emission order.
///
/// The receiving half is returned by [`ChannelSink::channel`]; dropping it
/// silently discards further events.
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ProcessEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver it forwards to.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProcessEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &ProcessEvent) {
        // A closed receiver means the consumer lost interest.
        let _ = self.sender.send(event.clone());
    }
}

fn timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%H:%M:%S,%3f")
        .to_string()
}
