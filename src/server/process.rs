use crate::error::{Error, Result};
use crate::launch::LaunchSpec;
use crate::server::classifier::OutputClassifier;
use crate::server::events::{EventKind, EventSink, OutputLine, OutputStream, ProcessEvent};
use async_process::{Child, Command, Stdio};
use futures_lite::io::AsyncReadExt;
use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a launched server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerId(Uuid);

impl ServerId {
    // Private constructor, only usable within our crate
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a launched server process.
///
/// The state only moves forward: `NotStarted → Running → Terminated`.
/// `Terminated` is entered when the supervisor observes the exit through
/// [`ServerProcess::wait`] or [`ServerProcess::stop`]; a crashed child is
/// still `Running` until one of those is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStatus {
    /// The process has not been spawned yet.
    NotStarted,
    /// The process was spawned successfully.
    Running,
    /// The process exited, or was stopped, and the exit was observed.
    Terminated,
}

/// Grace period between the soft stop signal and the hard kill.
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);
/// Poll interval while waiting for a signaled process to exit.
#[cfg(unix)]
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A supervised server process.
///
/// Owns the child process handle and the reader tasks draining its output.
/// Output is always drained, even without a sink, so the child never blocks
/// on a full pipe.
pub struct ServerProcess {
    /// Deployment name, for logging
    name: String,
    /// Launch ID
    id: ServerId,
    /// Resolved launch specification
    spec: LaunchSpec,
    /// Child process handle while running
    child: Option<Child>,
    /// Observed lifecycle state
    status: LaunchStatus,
    /// Event consumer shared with the reader tasks
    sink: Option<Arc<dyn EventSink>>,
    /// Line classifier shared by both reader tasks
    classifier: Option<Arc<OutputClassifier>>,
}

impl ServerProcess {
    /// Creates a supervisor for a launch spec without starting anything.
    pub fn new(name: String, spec: LaunchSpec) -> Self {
        Self {
            name,
            id: ServerId::new(),
            spec,
            child: None,
            status: LaunchStatus::NotStarted,
            sink: None,
            classifier: None,
        }
    }

    /// Attaches an event sink and the classifier feeding it.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>, classifier: Arc<OutputClassifier>) -> Self {
        self.sink = Some(sink);
        self.classifier = Some(classifier);
        self
    }

    /// Get the launch ID
    pub fn id(&self) -> ServerId {
        self.id
    }

    /// Get the deployment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the observed lifecycle state
    pub fn status(&self) -> LaunchStatus {
        self.status
    }

    /// The launch specification this supervisor runs.
    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Spawns the process and the output reader tasks.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyRunning` if the process was already started and
    /// `Error::ProcessLaunch` if the OS refuses to spawn it.
    pub async fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let spec = &self.spec;
        let mut command = Command::new(&spec.java);
        command.current_dir(&spec.working_dir);
        if !spec.classpath.is_empty() {
            command.arg("-cp").arg(spec.classpath_string());
        }
        command.args(&spec.vm_options);
        if !spec.main_class.is_empty() {
            command.arg(&spec.main_class);
        }
        command.args(&spec.program_args);

        if !spec.pass_parent_env {
            command.env_clear();
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        // The server takes no console input.
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            Error::ProcessLaunch(format!("Failed to start {}: {}", spec.java.display(), e))
        })?;

        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(
                stdout,
                OutputStream::Stdout,
                self.sink.clone(),
                self.classifier.clone(),
            );
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(
                stderr,
                OutputStream::Stderr,
                self.sink.clone(),
                self.classifier.clone(),
            );
        }

        tracing::info!(
            name = %self.name,
            id = %self.id,
            pid = child.id(),
            "Started server process"
        );
        self.child = Some(child);
        self.status = LaunchStatus::Running;
        Ok(())
    }

    /// Stops the process, first with a soft signal, then a hard kill.
    ///
    /// On unix the process receives `SIGTERM` and gets
    /// [`STOP_GRACE_PERIOD`] to shut down in an orderly way before it is
    /// killed. Elsewhere the hard kill is immediate. Returns the exit code
    /// when the process exited normally.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotRunning` if there is no process to stop and
    /// `Error::Process` if the OS fails to signal or reap it.
    pub async fn stop(&mut self) -> Result<Option<i32>> {
        let Some(mut child) = self.child.take() else {
            return Err(Error::NotRunning);
        };
        tracing::info!(name = %self.name, id = %self.id, "Stopping server process");
        let status = terminate_gracefully(&mut child).await?;
        self.status = LaunchStatus::Terminated;
        let exit_code = status.code();
        self.emit(EventKind::Terminated { exit_code });
        Ok(exit_code)
    }

    /// Waits for the process to exit on its own.
    ///
    /// Emits `Terminated` with the observed exit code; a non-zero code is
    /// reported through the event, not as an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotRunning` if there is no process to wait for.
    pub async fn wait(&mut self) -> Result<Option<i32>> {
        let Some(child) = self.child.as_mut() else {
            return Err(Error::NotRunning);
        };
        let status = child
            .status()
            .await
            .map_err(|e| Error::Process(format!("Failed to wait for process exit: {}", e)))?;
        self.child = None;
        self.status = LaunchStatus::Terminated;
        let exit_code = status.code();
        tracing::info!(name = %self.name, id = %self.id, exit_code = ?exit_code, "Server process exited");
        self.emit(EventKind::Terminated { exit_code });
        Ok(exit_code)
    }

    fn emit(&self, kind: EventKind) {
        if let Some(sink) = &self.sink {
            sink.emit(&ProcessEvent::now(kind));
        }
    }
}

#[cfg(unix)]
async fn terminate_gracefully(child: &mut Child) -> Result<ExitStatus> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // The process may already have exited; the poll below sorts that out.
    let _ = kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM);

    let deadline = std::time::Instant::now() + STOP_GRACE_PERIOD;
    while std::time::Instant::now() < deadline {
        match child.try_status() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => tokio::time::sleep(STOP_POLL_INTERVAL).await,
            Err(e) => return Err(Error::Process(format!("Failed to poll process: {}", e))),
        }
    }

    tracing::warn!(pid = child.id(), "Process ignored the stop signal, killing it");
    hard_kill(child).await
}

#[cfg(not(unix))]
async fn terminate_gracefully(child: &mut Child) -> Result<ExitStatus> {
    hard_kill(child).await
}

async fn hard_kill(child: &mut Child) -> Result<ExitStatus> {
    child
        .kill()
        .map_err(|e| Error::Process(format!("Failed to kill process: {}", e)))?;
    child
        .status()
        .await
        .map_err(|e| Error::Process(format!("Failed to reap process: {}", e)))
}

/// Spawns a task that splits one output pipe into lines.
///
/// Lines are split on `\n` with a trailing `\r` dropped; a partial line at
/// EOF is flushed as its own line.
fn spawn_line_reader<R>(
    mut reader: R,
    stream: OutputStream,
    sink: Option<Arc<dyn EventSink>>,
    classifier: Option<Arc<OutputClassifier>>,
) where
    R: futures_lite::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut pending: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break, // EOF
                Ok(n) => {
                    pending.extend_from_slice(&chunk[..n]);
                    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                        let mut line: Vec<u8> = pending.drain(..=pos).collect();
                        line.pop();
                        if line.last() == Some(&b'\r') {
                            line.pop();
                        }
                        dispatch_line(&line, stream, sink.as_deref(), classifier.as_deref());
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Output pipe closed with error");
                    break;
                }
            }
        }
        if !pending.is_empty() {
            dispatch_line(&pending, stream, sink.as_deref(), classifier.as_deref());
        }
    });
}

fn dispatch_line(
    bytes: &[u8],
    stream: OutputStream,
    sink: Option<&dyn EventSink>,
    classifier: Option<&OutputClassifier>,
) {
    let line = OutputLine {
        stream,
        text: String::from_utf8_lossy(bytes).into_owned(),
    };
    if let Some(sink) = sink {
        sink.on_line(&line);
    }
    let Some(classifier) = classifier else {
        return;
    };
    match classifier.classify(&line.text) {
        Ok(Some(event)) => {
            if let Some(sink) = sink {
                sink.emit(&event);
            }
        }
        Ok(None) => {}
        Err(e) => {
            // Classification failures must never abort the stream.
            tracing::warn!(error = %e, "Output classification failed");
            if let Some(sink) = sink {
                sink.emit(&ProcessEvent::now(EventKind::Warning {
                    message: format!("Output classification failed: {}", e),
                }));
            }
        }
    }
}
