mod api_tests;

use animbox_sandbox::{CommandResult, Provider, ProviderResult, RenderSettings, Session};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) const VIDEO_BYTES: &[u8] = b"\0\0\0\x18ftypisom\0\0\0\0";

/// In-memory provider whose render succeeds only for scenes that declare `(Scene)`
#[derive(Default)]
pub(crate) struct FakeProvider {
    pub sessions: AtomicUsize,
    pub destroyed: AtomicUsize,
    scene: std::sync::Mutex<String>,
}

impl FakeProvider {
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn renders(&self) -> bool {
        self.scene.lock().unwrap().contains("(Scene)")
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn create_session(&self) -> ProviderResult<Session> {
        let n = self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Session::new(format!("fake-{}", n)))
    }

    async fn run_command(
        &self,
        _session: &Session,
        command: &str,
    ) -> ProviderResult<CommandResult> {
        let settings = RenderSettings::default();
        if command == settings.render_command() {
            return Ok(if self.renders() {
                CommandResult::new(0, "File ready", "")
            } else {
                CommandResult::new(1, "", "NameError: name 'Circl' is not defined")
            });
        }
        if command == settings.locate_command() {
            return Ok(if self.renders() {
                CommandResult::new(0, "media/videos/scene/480p15/Demo.mp4\n", "")
            } else {
                CommandResult::new(1, "", "find: 'media': No such file or directory")
            });
        }
        Ok(CommandResult::new(0, "", ""))
    }

    async fn write_file(
        &self,
        _session: &Session,
        _path: &str,
        content: &[u8],
    ) -> ProviderResult<()> {
        *self.scene.lock().unwrap() = String::from_utf8_lossy(content).to_string();
        Ok(())
    }

    async fn read_file(&self, _session: &Session, _path: &str) -> ProviderResult<Vec<u8>> {
        Ok(VIDEO_BYTES.to_vec())
    }

    async fn destroy_session(&self, _session: &Session) -> ProviderResult<()> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
