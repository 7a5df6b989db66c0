// ABOUTME: Sandboxed render execution for Animbox
// ABOUTME: Session providers plus the provision, run, locate, fetch, and teardown pipeline

pub mod artifact;
pub mod orchestrator;
pub mod outcome;
pub mod providers;
pub mod provision;
pub mod runner;
pub mod session;
pub mod settings;

pub use artifact::{select_artifact, ArtifactFetcher, ArtifactLocator};
pub use orchestrator::RenderOrchestrator;
pub use outcome::{Artifact, ExecutionOutcome, SourceUnit};
pub use providers::{
    CommandResult, DockerConfig, DockerProvider, E2BConfig, E2BProvider, Provider, ProviderError,
    ProviderResult, Session,
};
pub use provision::{EnvironmentProvisioner, InstallAttempt, ProvisionReport, ProvisionStatus};
pub use runner::ExecutionRunner;
pub use session::SessionGuard;
pub use settings::RenderSettings;
