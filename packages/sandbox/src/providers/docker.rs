// ABOUTME: Docker provider implementation for local container-backed render sessions
// ABOUTME: Uses bollard to run one long-lived container per session and exec commands in it

use super::{CommandResult, Provider, ProviderError, ProviderResult, Session};
use animbox_config::defaults;
use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, DownloadFromContainerOptions, LogOutput,
        RemoveContainerOptions, StartContainerOptions, UploadToContainerOptions,
    },
    exec::{CreateExecOptions, StartExecResults},
    image::CreateImageOptions,
    Docker,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

const LABEL_PREFIX: &str = "animbox.sandbox";

/// Settings for Docker-backed sessions
#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub image: String,
    pub working_dir: String,
    pub memory_mb: Option<u64>,
    /// Timeout for image pull operations
    pub pull_timeout: Duration,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            image: defaults::DOCKER_IMAGE.to_string(),
            working_dir: "/manim".to_string(),
            memory_mb: None,
            pull_timeout: Duration::from_secs(600),
        }
    }
}

pub struct DockerProvider {
    client: Docker,
    config: DockerConfig,
    /// Images already pulled by this provider, keyed by name
    image_cache: Arc<RwLock<HashMap<String, chrono::DateTime<chrono::Utc>>>>,
}

impl DockerProvider {
    /// Connect to the local Docker daemon
    pub fn new(config: DockerConfig) -> ProviderResult<Self> {
        let client = Docker::connect_with_defaults()
            .map_err(|e| ProviderError::Connection(format!("Docker: {}", e)))?;

        Ok(Self::with_client(client, config))
    }

    /// Create with a specific Docker connection
    pub fn with_client(client: Docker, config: DockerConfig) -> Self {
        Self {
            client,
            config,
            image_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check whether the daemon answers a ping
    pub async fn is_available(&self) -> bool {
        match self.client.ping().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Docker not available: {}", e);
                false
            }
        }
    }

    fn to_bollard_config(&self, name: &str) -> Config<String> {
        let labels = HashMap::from([
            (format!("{}.managed", LABEL_PREFIX), "true".to_string()),
            (format!("{}.name", LABEL_PREFIX), name.to_string()),
        ]);

        let host_config = bollard::models::HostConfig {
            memory: self.config.memory_mb.map(|mb| (mb * 1024 * 1024) as i64),
            ..Default::default()
        };

        Config {
            image: Some(self.config.image.clone()),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            working_dir: Some(self.config.working_dir.clone()),
            labels: Some(labels),
            host_config: Some(host_config),
            ..Default::default()
        }
    }

    /// Resolve a session path against the container working directory
    fn resolve_path(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", self.config.working_dir.trim_end_matches('/'), path)
        }
    }

    async fn image_exists(&self, image: &str) -> ProviderResult<bool> {
        match self.client.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(ProviderError::Session(e.to_string())),
        }
    }

    async fn ensure_image(&self) -> ProviderResult<()> {
        let image = self.config.image.as_str();

        if self.image_cache.read().await.contains_key(image) && self.image_exists(image).await? {
            debug!("Image {} found in cache, skipping pull", image);
            return Ok(());
        }

        if self.image_exists(image).await? {
            self.image_cache
                .write()
                .await
                .insert(image.to_string(), chrono::Utc::now());
            return Ok(());
        }

        info!(
            "Pulling image: {} (timeout: {:?})",
            image, self.config.pull_timeout
        );

        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };
        let stream = self.client.create_image(Some(options), None, None);

        let result = tokio::time::timeout(self.config.pull_timeout, async {
            let mut stream = stream;
            while let Some(result) = stream.next().await {
                let info = result.map_err(|e| {
                    ProviderError::Session(format!("Failed to pull image {}: {}", image, e))
                })?;
                if let Some(error) = info.error {
                    return Err(ProviderError::Session(format!(
                        "Failed to pull image {}: {}",
                        image, error
                    )));
                }
                if let Some(status) = info.status {
                    debug!("Pull status: {}", status);
                }
            }
            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => {
                info!("Successfully pulled image: {}", image);
                self.image_cache
                    .write()
                    .await
                    .insert(image.to_string(), chrono::Utc::now());
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProviderError::Session(format!(
                "Timeout pulling image {} after {:?}",
                image, self.config.pull_timeout
            ))),
        }
    }

    async fn exec(
        &self,
        container_id: &str,
        command: Vec<String>,
    ) -> ProviderResult<CommandResult> {
        let exec_config = CreateExecOptions {
            cmd: Some(command),
            working_dir: Some(self.config.working_dir.clone()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .client
            .create_exec(container_id, exec_config)
            .await
            .map_err(|e| ProviderError::Command(e.to_string()))?;

        let start_result = self
            .client
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| ProviderError::Command(e.to_string()))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        match start_result {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(msg) = output.next().await {
                    match msg {
                        Ok(LogOutput::StdOut { message }) => stdout.extend_from_slice(&message),
                        Ok(LogOutput::StdErr { message }) => stderr.extend_from_slice(&message),
                        Ok(LogOutput::Console { message }) => stdout.extend_from_slice(&message),
                        Ok(_) => {}
                        Err(e) => return Err(ProviderError::Command(e.to_string())),
                    }
                }
            }
            StartExecResults::Detached => {
                return Err(ProviderError::Command(
                    "Exec was detached unexpectedly".to_string(),
                ))
            }
        }

        let exec_inspect = self
            .client
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| ProviderError::Command(e.to_string()))?;

        Ok(CommandResult {
            exit_code: exec_inspect.exit_code.unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }
}

#[async_trait]
impl Provider for DockerProvider {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn create_session(&self) -> ProviderResult<Session> {
        self.ensure_image().await?;

        let name = format!("animbox-{}", Uuid::new_v4());
        info!("Creating container: {}", name);

        let options = CreateContainerOptions {
            name: name.clone(),
            platform: None,
        };

        let container = self
            .client
            .create_container(Some(options), self.to_bollard_config(&name))
            .await
            .map_err(|e| ProviderError::Session(e.to_string()))?;

        if let Err(e) = self
            .client
            .start_container(&container.id, None::<StartContainerOptions<String>>)
            .await
        {
            // The container exists but never became a session; don't leak it
            let _ = self
                .client
                .remove_container(
                    &container.id,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await;
            return Err(ProviderError::Session(e.to_string()));
        }

        debug!("Started container: {}", container.id);
        Ok(Session::new(container.id))
    }

    async fn run_command(&self, session: &Session, command: &str) -> ProviderResult<CommandResult> {
        debug!("Executing command in container {}: {}", session.id, command);
        self.exec(
            &session.id,
            vec!["sh".to_string(), "-c".to_string(), command.to_string()],
        )
        .await
    }

    async fn write_file(
        &self,
        session: &Session,
        path: &str,
        content: &[u8],
    ) -> ProviderResult<()> {
        let full_path = self.resolve_path(path);
        let (parent, file_name) = match full_path.rsplit_once('/') {
            Some(("", name)) => ("/".to_string(), name.to_string()),
            Some((dir, name)) => (dir.to_string(), name.to_string()),
            None => (self.config.working_dir.clone(), full_path.clone()),
        };

        if parent != self.config.working_dir {
            let mkdir = self
                .exec(&session.id, vec!["mkdir".into(), "-p".into(), parent.clone()])
                .await?;
            if !mkdir.success() {
                return Err(ProviderError::FileTransfer(format!(
                    "Could not create {}: {}",
                    parent, mkdir.stderr
                )));
            }
        }

        let tar_data = create_tar_archive(&file_name, content)
            .map_err(|e| ProviderError::FileTransfer(e.to_string()))?;

        let options = UploadToContainerOptions {
            path: parent,
            ..Default::default()
        };

        self.client
            .upload_to_container(&session.id, Some(options), tar_data.into())
            .await
            .map_err(|e| ProviderError::FileTransfer(e.to_string()))
    }

    async fn read_file(&self, session: &Session, path: &str) -> ProviderResult<Vec<u8>> {
        let options = DownloadFromContainerOptions {
            path: self.resolve_path(path),
        };

        let mut stream = self.client.download_from_container(&session.id, Some(options));

        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| ProviderError::FileTransfer(e.to_string()))?;
            data.extend_from_slice(&bytes);
        }

        extract_single_file(&data).map_err(|e| ProviderError::FileTransfer(e.to_string()))
    }

    async fn destroy_session(&self, session: &Session) -> ProviderResult<()> {
        info!("Removing container: {}", session.id);

        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        self.client
            .remove_container(&session.id, Some(options))
            .await
            .map_err(|e| ProviderError::Session(e.to_string()))
    }
}

// Helper functions for tar operations
fn create_tar_archive(file_name: &str, content: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut archive = tar::Builder::new(Vec::new());

    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);
    archive.append_data(&mut header, file_name, content)?;

    archive.into_inner()
}

fn extract_single_file(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut archive = tar::Archive::new(data);

    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type().is_file() {
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            return Ok(content);
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "Archive contains no regular file",
    ))
}
