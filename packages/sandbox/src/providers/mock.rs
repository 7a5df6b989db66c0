// ABOUTME: mockall double for the Provider trait used by unit tests
// ABOUTME: Lets stage tests script every remote call and count session teardown

use super::{CommandResult, Provider, ProviderResult, Session};
use async_trait::async_trait;
use mockall::mock;

mock! {
    pub Remote {}

    #[async_trait]
    impl Provider for Remote {
        fn name(&self) -> &'static str;
        async fn create_session(&self) -> ProviderResult<Session>;
        async fn run_command(
            &self,
            session: &Session,
            command: &str,
        ) -> ProviderResult<CommandResult>;
        async fn write_file(
            &self,
            session: &Session,
            path: &str,
            content: &[u8],
        ) -> ProviderResult<()>;
        async fn read_file(&self, session: &Session, path: &str) -> ProviderResult<Vec<u8>>;
        async fn destroy_session(&self, session: &Session) -> ProviderResult<()>;
    }
}
