// ABOUTME: Artifact discovery and retrieval for finished render sessions
// ABOUTME: Locates output files by extension and reads their bytes back, degrading faults to absence

use crate::outcome::Artifact;
use crate::providers::{Provider, ProviderResult, Session};
use crate::settings::RenderSettings;
use tracing::{debug, warn};

/// Pick the artifact from `find` output.
///
/// Paths are compared lexicographically so the same filesystem state always
/// yields the same choice, whatever order the search tool walked it in.
pub fn select_artifact(listing: &str) -> Option<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .min()
        .map(str::to_string)
}

pub struct ArtifactLocator<'a> {
    settings: &'a RenderSettings,
}

impl<'a> ArtifactLocator<'a> {
    pub fn new(settings: &'a RenderSettings) -> Self {
        Self { settings }
    }

    /// Search the media directory. `Ok(None)` means the run produced nothing.
    pub async fn locate(
        &self,
        provider: &dyn Provider,
        session: &Session,
    ) -> ProviderResult<Option<String>> {
        let result = provider
            .run_command(session, &self.settings.locate_command())
            .await?;

        // find exits non-zero when the media directory was never created
        if !result.success() {
            debug!(
                session_id = %session.id,
                exit_code = result.exit_code,
                stderr = result.stderr.trim(),
                "Artifact search exited non-zero"
            );
        }

        let selected = select_artifact(&result.stdout);
        match &selected {
            Some(path) => debug!(session_id = %session.id, path = %path, "Selected artifact"),
            None => debug!(
                session_id = %session.id,
                extension = %self.settings.artifact_extension,
                "No artifact found"
            ),
        }
        Ok(selected)
    }
}

pub struct ArtifactFetcher;

impl ArtifactFetcher {
    /// Read an artifact back. Faults and empty files both come back as `None`.
    pub async fn fetch(provider: &dyn Provider, session: &Session, path: &str) -> Option<Artifact> {
        match provider.read_file(session, path).await {
            Ok(content) if content.is_empty() => {
                warn!(session_id = %session.id, path = %path, "Artifact is empty");
                None
            }
            Ok(content) => {
                debug!(
                    session_id = %session.id,
                    path = %path,
                    bytes = content.len(),
                    "Fetched artifact"
                );
                Some(Artifact {
                    path: path.to_string(),
                    content,
                })
            }
            Err(e) => {
                warn!(
                    session_id = %session.id,
                    path = %path,
                    error = %e,
                    "Failed to fetch artifact"
                );
                None
            }
        }
    }
}
