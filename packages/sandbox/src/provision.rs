// ABOUTME: Environment provisioning for a fresh render session
// ABOUTME: Runs the full install and falls back to a library-only install exactly once

use crate::providers::{CommandResult, Provider, Session};
use crate::settings::RenderSettings;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStatus {
    Ready,
    RecoveredByFallback,
    Failed,
}

/// One install command and what came back from it
#[derive(Debug, Clone, Serialize)]
pub struct InstallAttempt {
    pub command: String,
    pub result: Option<CommandResult>,
    /// Transport fault, set when the command never produced a result
    pub fault: Option<String>,
}

impl InstallAttempt {
    pub fn succeeded(&self) -> bool {
        self.result.as_ref().is_some_and(CommandResult::success)
    }

    fn describe(&self) -> String {
        match (&self.result, &self.fault) {
            (_, Some(fault)) => format!("`{}` faulted: {}", self.command, fault),
            (Some(result), None) => format!(
                "`{}` exited with {}: {}",
                self.command,
                result.exit_code,
                result.stderr.trim()
            ),
            (None, None) => format!("`{}` produced no result", self.command),
        }
    }
}

/// Diagnostics for the provisioning step.
///
/// Provisioning never aborts a run; a failed report is carried along so the
/// render attempt can still proceed.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub status: ProvisionStatus,
    pub primary: InstallAttempt,
    pub fallback: Option<InstallAttempt>,
}

impl ProvisionReport {
    pub fn is_ready(&self) -> bool {
        self.status != ProvisionStatus::Failed
    }

    /// Single-line description suitable for logs and error details
    pub fn summary(&self) -> String {
        match self.status {
            ProvisionStatus::Ready => format!("ready via `{}`", self.primary.command),
            ProvisionStatus::RecoveredByFallback => {
                format!("recovered by fallback after {}", self.primary.describe())
            }
            ProvisionStatus::Failed => {
                let fallback = self
                    .fallback
                    .as_ref()
                    .map(InstallAttempt::describe)
                    .unwrap_or_else(|| "no fallback".to_string());
                format!("failed: {}; then {}", self.primary.describe(), fallback)
            }
        }
    }
}

pub struct EnvironmentProvisioner<'a> {
    settings: &'a RenderSettings,
}

impl<'a> EnvironmentProvisioner<'a> {
    pub fn new(settings: &'a RenderSettings) -> Self {
        Self { settings }
    }

    pub async fn provision(&self, provider: &dyn Provider, session: &Session) -> ProvisionReport {
        let primary = Self::attempt(provider, session, &self.settings.primary_install).await;
        if primary.succeeded() {
            info!(session_id = %session.id, "Session provisioned");
            return ProvisionReport {
                status: ProvisionStatus::Ready,
                primary,
                fallback: None,
            };
        }

        warn!(
            session_id = %session.id,
            attempt = %primary.describe(),
            "Primary install failed, trying fallback"
        );

        let fallback = Self::attempt(provider, session, &self.settings.fallback_install).await;
        let status = if fallback.succeeded() {
            info!(session_id = %session.id, "Session provisioned by fallback install");
            ProvisionStatus::RecoveredByFallback
        } else {
            warn!(
                session_id = %session.id,
                attempt = %fallback.describe(),
                "Fallback install failed"
            );
            ProvisionStatus::Failed
        };

        ProvisionReport {
            status,
            primary,
            fallback: Some(fallback),
        }
    }

    async fn attempt(provider: &dyn Provider, session: &Session, command: &str) -> InstallAttempt {
        match provider.run_command(session, command).await {
            Ok(result) => InstallAttempt {
                command: command.to_string(),
                result: Some(result),
                fault: None,
            },
            Err(e) => InstallAttempt {
                command: command.to_string(),
                result: None,
                fault: Some(e.to_string()),
            },
        }
    }
}
