//! Launch supervision for server processes.
//!
//! This module owns the process side of a launch: spawning the Java process
//! described by a [`crate::launch::LaunchSpec`], draining its output into
//! classified events, and shutting it down in an orderly way.
//!
//! # Components
//!
//! * `classifier` - Ordered regex rules that turn output lines into events
//! * `events` - Event types and the sink implementations consuming them
//! * `process` - The supervised process and its lifecycle state machine
//!
//! # Examples
//!
//! Receiving events through a channel:
//!
//! ```no_run
//! use catalina_runner::server::{ChannelSink, OutputClassifier, ServerProcess};
//! use std::sync::Arc;
//! # use catalina_runner::launch::LaunchSpec;
//! # async fn example(spec: LaunchSpec) -> catalina_runner::error::Result<()> {
//! let (sink, mut events) = ChannelSink::channel();
//! let classifier = Arc::new(OutputClassifier::new("app:war exploded"));
//! let mut server = ServerProcess::new("app".to_string(), spec)
//!     .with_sink(Arc::new(sink), classifier);
//! server.start().await?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event.kind);
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod events;
mod process;

pub use classifier::{MEMORY_SAMPLE_INTERVAL, OutputClassifier};
pub use events::{
    ChannelSink, ConsoleSink, EventKind, EventSink, OutputLine, OutputStream, ProcessEvent,
};
pub use process::{LaunchStatus, STOP_GRACE_PERIOD, ServerId, ServerProcess};
