// ABOUTME: Provider trait and implementations for remote sandbox session backends
// ABOUTME: Defines the five-operation session interface the render pipeline depends on

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod docker;
pub mod e2b;

#[cfg(test)]
pub(crate) mod mock;

pub use docker::{DockerConfig, DockerProvider};
pub use e2b::{E2BConfig, E2BProvider};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("File transfer error: {0}")]
    FileTransfer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Handle to an ephemeral remote execution context.
///
/// The id is assigned by the transport when the session is created and is
/// opaque to everything above the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Outcome of a shell command run inside a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn new(exit_code: i64, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Remote session client used by the render pipeline.
///
/// Every operation may fault; a non-zero exit from `run_command` is a
/// normal result, not a fault.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Create a fresh isolated session
    async fn create_session(&self) -> ProviderResult<Session>;

    /// Run a shell command in the session working directory
    async fn run_command(&self, session: &Session, command: &str) -> ProviderResult<CommandResult>;

    /// Write a file, relative paths resolve against the session working directory
    async fn write_file(&self, session: &Session, path: &str, content: &[u8]) -> ProviderResult<()>;

    /// Read a file back as raw bytes
    async fn read_file(&self, session: &Session, path: &str) -> ProviderResult<Vec<u8>>;

    /// Tear the session down
    async fn destroy_session(&self, session: &Session) -> ProviderResult<()>;
}
