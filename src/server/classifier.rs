//! Classification of server output lines into launch events.
//!
//! The server reports lifecycle milestones as free-form log lines. The
//! classifier matches each line against an ordered rule table, most specific
//! rule first, and produces at most one event per line.

use crate::error::{Error, Result};
use crate::server::events::{EventKind, ProcessEvent};
use regex::Regex;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Minimum spacing between two consecutive `MemorySample` events.
pub const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
enum RuleKind {
    StartupComplete,
    DeploymentSucceeded,
    DeploymentFailed,
    DeploymentStarted,
    JmxEnabled,
    HotDeploy,
    MemorySample,
    GenericError,
    GenericWarning,
}

struct Rule {
    pattern: Regex,
    kind: RuleKind,
}

/// Ordered first-match-wins line classifier.
///
/// Stateless across lines except for the memory-sample rate limiter, so one
/// classifier can be shared by the stdout and stderr reader tasks.
pub struct OutputClassifier {
    artifact: String,
    rules: Vec<Rule>,
    last_memory_sample: Mutex<Option<Instant>>,
    memory_interval: Duration,
}

impl OutputClassifier {
    /// Creates a classifier with the default memory sampling interval.
    ///
    /// # Arguments
    ///
    /// * `artifact` - Artifact display name carried in deployment events
    pub fn new(artifact: impl Into<String>) -> Self {
        Self::with_memory_interval(artifact, MEMORY_SAMPLE_INTERVAL)
    }

    /// Creates a classifier with a custom memory sampling interval.
    pub fn with_memory_interval(artifact: impl Into<String>, interval: Duration) -> Self {
        Self {
            artifact: artifact.into(),
            rules: build_rules(),
            last_memory_sample: Mutex::new(None),
            memory_interval: interval,
        }
    }

    /// Classifies one line of server output.
    ///
    /// Returns `Ok(None)` for lines no rule matches and for memory samples
    /// suppressed by the rate limiter. A matched line whose numeric payload
    /// fails to parse degrades to an `Info` event rather than being lost.
    ///
    /// # Errors
    ///
    /// Returns `Error::Classification` when the rate limiter state is
    /// unusable. Callers treat this as non-fatal.
    pub fn classify(&self, line: &str) -> Result<Option<ProcessEvent>> {
        for rule in &self.rules {
            if let Some(captures) = rule.pattern.captures(line) {
                return self.build_event(rule.kind, &captures, line);
            }
        }
        Ok(None)
    }

    fn build_event(
        &self,
        kind: RuleKind,
        captures: &regex::Captures<'_>,
        line: &str,
    ) -> Result<Option<ProcessEvent>> {
        let kind = match kind {
            RuleKind::StartupComplete => match parse_number(captures.get(1)) {
                Some(duration_ms) => EventKind::StartupComplete { duration_ms },
                None => info(line),
            },
            RuleKind::DeploymentSucceeded => match parse_number(captures.get(1)) {
                Some(duration_ms) => EventKind::DeploymentSucceeded {
                    artifact: self.artifact.clone(),
                    duration_ms,
                },
                None => info(line),
            },
            RuleKind::DeploymentFailed => EventKind::DeploymentFailed {
                artifact: self.artifact.clone(),
                detail: line.to_string(),
            },
            RuleKind::DeploymentStarted => EventKind::DeploymentStarted {
                artifact: self.artifact.clone(),
            },
            RuleKind::JmxEnabled => {
                match parse_number(captures.get(1)).and_then(|n| u16::try_from(n).ok()) {
                    Some(port) => EventKind::JmxEnabled { port },
                    None => info(line),
                }
            }
            RuleKind::HotDeploy => EventKind::HotDeployTriggered,
            RuleKind::MemorySample => {
                if !self.memory_sample_due()? {
                    return Ok(None);
                }
                match parse_number(captures.get(1)) {
                    Some(used_mb) => EventKind::MemorySample { used_mb },
                    None => info(line),
                }
            }
            RuleKind::GenericError => EventKind::Error {
                message: line.to_string(),
            },
            RuleKind::GenericWarning => EventKind::Warning {
                message: line.to_string(),
            },
        };
        Ok(Some(ProcessEvent::now(kind)))
    }

    fn memory_sample_due(&self) -> Result<bool> {
        let mut last = self
            .last_memory_sample
            .lock()
            .map_err(|_| Error::Classification("Memory sample state lock poisoned".to_string()))?;
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < self.memory_interval => Ok(false),
            _ => {
                *last = Some(now);
                Ok(true)
            }
        }
    }
}

fn info(line: &str) -> EventKind {
    EventKind::Info {
        message: line.to_string(),
    }
}

/// Parses a captured digit group, tolerating thousands separators.
fn parse_number(capture: Option<regex::Match<'_>>) -> Option<u64> {
    let digits = capture?.as_str().replace(',', "");
    digits.parse().ok()
}

fn build_rules() -> Vec<Rule> {
    // Patterns are literals; compilation cannot fail.
    let rule = |pattern: &str, kind: RuleKind| Rule {
        pattern: Regex::new(pattern).expect("valid regex"),
        kind,
    };
    vec![
        // Boot milestone, duration in group 1. Newer servers bracket the
        // number and may use the long unit name.
        rule(
            r"Server startup in \[?([\d,]+)\]? (?:ms|milliseconds)",
            RuleKind::StartupComplete,
        ),
        // Per-application deploy completion, duration in group 1.
        rule(
            r"Deployment of web application (?:directory|archive) .* has finished in \[?([\d,]+)\]? (?:ms|milliseconds)",
            RuleKind::DeploymentSucceeded,
        ),
        rule(
            r"Error deploying web application (?:directory|archive)|Context \[.*\] startup failed",
            RuleKind::DeploymentFailed,
        ),
        rule(
            r"Deploying web application (?:directory|archive)",
            RuleKind::DeploymentStarted,
        ),
        // JMX agent announcement, port in group 1.
        rule(r"JMX.*enabled.*port[^\d]*(\d+)", RuleKind::JmxEnabled),
        rule(r"Reloading Context with name", RuleKind::HotDeploy),
        // Heap report, megabytes in group 1. Rate-limited downstream.
        rule(r"Memory usage: heap (\d+)M", RuleKind::MemorySample),
        rule(r"ERROR|SEVERE|Exception|Failed", RuleKind::GenericError),
        rule(r"WARN|WARNING", RuleKind::GenericWarning),
    ]
}
