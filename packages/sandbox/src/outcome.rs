// ABOUTME: Value types flowing in and out of a render run
// ABOUTME: Source units, fetched artifacts, and the diagnostics-carrying execution outcome

use crate::provision::ProvisionReport;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code submitted for execution; validity is only discovered by running it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub content: String,
}

impl SourceUnit {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl From<String> for SourceUnit {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

impl From<&str> for SourceUnit {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

/// Binary output fetched back from a session
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the session working directory
    pub path: String,
    pub content: Vec<u8>,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("path", &self.path)
            .field("bytes", &self.content.len())
            .finish()
    }
}

/// Result of one render run.
///
/// `stdout` and `stderr` always hold whatever was captured, on every path.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub artifact: Option<Artifact>,
    pub stdout: String,
    pub stderr: String,
    /// Exit status of the render command, if it ran at all
    pub exit_code: Option<i64>,
    pub provisioning: Option<ProvisionReport>,
    pub session_id: Option<String>,
}

impl ExecutionOutcome {
    /// Outcome for a run cut short by a fault, carrying its description
    pub fn fault(session_id: Option<String>, description: impl Into<String>) -> Self {
        Self {
            stderr: description.into(),
            session_id,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.artifact.is_some()
    }
}
