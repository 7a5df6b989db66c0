// ABOUTME: Render orchestrator sequencing session, provisioning, execution, and artifact stages
// ABOUTME: Always returns an outcome with captured diagnostics and always tears the session down

use crate::artifact::{ArtifactFetcher, ArtifactLocator};
use crate::outcome::{ExecutionOutcome, SourceUnit};
use crate::provision::EnvironmentProvisioner;
use crate::providers::Provider;
use crate::runner::ExecutionRunner;
use crate::session::SessionGuard;
use crate::settings::RenderSettings;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct RenderOrchestrator {
    provider: Arc<dyn Provider>,
    settings: RenderSettings,
}

impl RenderOrchestrator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self::with_settings(provider, RenderSettings::default())
    }

    pub fn with_settings(provider: Arc<dyn Provider>, settings: RenderSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render one source unit in a fresh session.
    ///
    /// Never fails: every fault becomes an outcome without an artifact. Exactly
    /// one session is created per call and it is destroyed before returning.
    pub async fn execute(&self, source: &SourceUnit) -> ExecutionOutcome {
        let guard = match SessionGuard::acquire(self.provider.clone()).await {
            Ok(guard) => guard,
            Err(e) => {
                error!(provider = self.provider.name(), error = %e, "Failed to create session");
                return ExecutionOutcome::fault(None, e.to_string());
            }
        };
        let session_id = guard.session().id.clone();

        let outcome = AssertUnwindSafe(self.run_stages(&guard, source))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let description = panic_message(panic.as_ref());
                error!(session_id = %session_id, panic = %description, "Render panicked");
                ExecutionOutcome::fault(
                    Some(session_id.clone()),
                    format!("Render pipeline panicked: {}", description),
                )
            });

        guard.release().await;

        info!(
            session_id = %session_id,
            artifact = outcome
                .artifact
                .as_ref()
                .map(|a| a.path.as_str())
                .unwrap_or("none"),
            "Render finished"
        );
        outcome
    }

    async fn run_stages(&self, guard: &SessionGuard, source: &SourceUnit) -> ExecutionOutcome {
        let provider = guard.provider();
        let session = guard.session();
        let mut outcome = ExecutionOutcome {
            session_id: Some(session.id.clone()),
            ..Default::default()
        };

        let report = EnvironmentProvisioner::new(&self.settings)
            .provision(provider, session)
            .await;
        if !report.is_ready() {
            warn!(
                session_id = %session.id,
                provisioning = %report.summary(),
                "Provisioning failed, rendering anyway"
            );
        }
        outcome.provisioning = Some(report);

        let result = match ExecutionRunner::new(&self.settings)
            .run(provider, session, source)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Render stage faulted");
                outcome.stderr = e.to_string();
                return outcome;
            }
        };
        outcome.exit_code = Some(result.exit_code);
        outcome.stdout = result.stdout;
        outcome.stderr = result.stderr;

        let path = match ArtifactLocator::new(&self.settings)
            .locate(provider, session)
            .await
        {
            Ok(Some(path)) => path,
            Ok(None) => return outcome,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Artifact search faulted");
                if outcome.stderr.is_empty() {
                    outcome.stderr = e.to_string();
                }
                return outcome;
            }
        };

        outcome.artifact = ArtifactFetcher::fetch(provider, session, &path).await;
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
