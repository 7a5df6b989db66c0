// ABOUTME: Scoped ownership of a remote session with guaranteed teardown
// ABOUTME: Destroys the session exactly once, on explicit release or when the guard is dropped

use crate::providers::{Provider, ProviderResult, Session};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Owns one live session.
///
/// Call [`SessionGuard::release`] on every normal path. If the guard is
/// dropped without it (a panic or a cancelled future) teardown is spawned on
/// the current runtime instead. Teardown faults are logged, never returned.
pub struct SessionGuard {
    provider: Arc<dyn Provider>,
    session: Session,
    released: bool,
}

impl SessionGuard {
    /// Create a session and take ownership of it
    pub async fn acquire(provider: Arc<dyn Provider>) -> ProviderResult<Self> {
        let session = provider.create_session().await?;
        info!(
            provider = provider.name(),
            session_id = %session.id,
            "Acquired session"
        );
        Ok(Self {
            provider,
            session,
            released: false,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Destroy the session and consume the guard.
    ///
    /// Teardown runs on its own task, so dropping this future part way through
    /// does not abandon it.
    pub async fn release(mut self) {
        let teardown = tokio::spawn(Self::destroy(self.provider.clone(), self.session.clone()));
        self.released = true;
        let session_id = self.session.id.clone();
        drop(self);

        if let Err(e) = teardown.await {
            error!(session_id = %session_id, error = %e, "Session teardown task failed");
        }
    }

    async fn destroy(provider: Arc<dyn Provider>, session: Session) {
        match provider.destroy_session(&session).await {
            Ok(()) => debug!(session_id = %session.id, "Destroyed session"),
            Err(e) => error!(session_id = %session.id, error = %e, "Failed to destroy session"),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        warn!(
            session_id = %self.session.id,
            "Session dropped without release, destroying in background"
        );
        let provider = self.provider.clone();
        let session = self.session.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(Self::destroy(provider, session));
            }
            Err(_) => error!(
                session_id = %session.id,
                "No async runtime available, session was not destroyed"
            ),
        }
    }
}
