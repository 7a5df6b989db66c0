// ABOUTME: Execution runner that places the scene source in a session and renders it
// ABOUTME: A non-zero exit is returned as a normal result; only transport faults are errors

use crate::outcome::SourceUnit;
use crate::providers::{CommandResult, Provider, ProviderResult, Session};
use crate::settings::RenderSettings;
use tracing::{debug, info};

pub struct ExecutionRunner<'a> {
    settings: &'a RenderSettings,
}

impl<'a> ExecutionRunner<'a> {
    pub fn new(settings: &'a RenderSettings) -> Self {
        Self { settings }
    }

    pub async fn run(
        &self,
        provider: &dyn Provider,
        session: &Session,
        source: &SourceUnit,
    ) -> ProviderResult<CommandResult> {
        provider
            .write_file(session, &self.settings.scene_file, source.content.as_bytes())
            .await?;
        debug!(
            session_id = %session.id,
            path = %self.settings.scene_file,
            bytes = source.content.len(),
            "Wrote scene file"
        );

        let command = self.settings.render_command();
        info!(session_id = %session.id, command = %command, "Rendering");
        let result = provider.run_command(session, &command).await?;

        if result.success() {
            info!(session_id = %session.id, "Render command succeeded");
        } else {
            info!(
                session_id = %session.id,
                exit_code = result.exit_code,
                "Render command exited non-zero"
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockRemote;
    use crate::providers::ProviderError;
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_run_writes_scene_then_renders() {
        let settings = RenderSettings::default();
        let mut provider = MockRemote::new();
        provider
            .expect_write_file()
            .withf(|_, path, content| path == "scene.py" && content == b"from manim import *")
            .times(1)
            .returning(|_, _, _| Ok(()));
        provider
            .expect_run_command()
            .with(always(), eq("manim -ql scene.py --media_dir media"))
            .times(1)
            .returning(|_, _| Ok(CommandResult::new(0, "File ready", "")));

        let result = ExecutionRunner::new(&settings)
            .run(
                &provider,
                &Session::new("sbx"),
                &SourceUnit::new("from manim import *"),
            )
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.stdout, "File ready");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_a_result() {
        let settings = RenderSettings::default();
        let mut provider = MockRemote::new();
        provider.expect_write_file().returning(|_, _, _| Ok(()));
        provider
            .expect_run_command()
            .returning(|_, _| Ok(CommandResult::new(1, "", "SyntaxError: invalid syntax")));

        let result = ExecutionRunner::new(&settings)
            .run(&provider, &Session::new("sbx"), &SourceUnit::new("def ("))
            .await
            .unwrap();

        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("SyntaxError"));
    }

    #[tokio::test]
    async fn test_write_fault_skips_render() {
        let settings = RenderSettings::default();
        let mut provider = MockRemote::new();
        provider
            .expect_write_file()
            .returning(|_, _, _| Err(ProviderError::FileTransfer("disk full".to_string())));
        provider.expect_run_command().times(0);

        let err = ExecutionRunner::new(&settings)
            .run(&provider, &Session::new("sbx"), &SourceUnit::new("x"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::FileTransfer(_)));
    }
}
