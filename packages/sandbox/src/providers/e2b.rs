// ABOUTME: E2B provider for cloud micro-VM render sessions
// ABOUTME: Talks to the E2B control plane over REST and to the in-sandbox envd daemon for commands and files

use super::{CommandResult, Provider, ProviderError, ProviderResult, Session};
use animbox_config::defaults;
use async_trait::async_trait;
use base64::Engine;
use reqwest::{multipart, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Port the envd daemon listens on inside every sandbox
const ENVD_PORT: u16 = 49983;

const CONNECT_CONTENT_TYPE: &str = "application/connect+json";
const CONNECT_END_STREAM_FLAG: u8 = 0b0000_0010;

/// Settings for E2B-backed sessions
#[derive(Debug, Clone)]
pub struct E2BConfig {
    pub api_key: String,
    pub api_url: String,
    pub domain: String,
    pub template: String,
    /// Lifetime the control plane enforces if a session is never killed
    pub sandbox_timeout_secs: u64,
    pub username: String,
    pub working_dir: String,
    /// Fixed envd base URL, bypassing the per-sandbox host name
    pub envd_url: Option<String>,
    pub request_timeout: Duration,
}

impl E2BConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: defaults::E2B_API_URL.to_string(),
            domain: defaults::E2B_DOMAIN.to_string(),
            template: defaults::E2B_TEMPLATE.to_string(),
            sandbox_timeout_secs: defaults::E2B_SANDBOX_TIMEOUT_SECS,
            username: "user".to_string(),
            working_dir: "/home/user".to_string(),
            envd_url: None,
            request_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Serialize)]
struct NewSandboxRequest<'a> {
    #[serde(rename = "templateID")]
    template_id: &'a str,
    timeout: u64,
}

#[derive(Debug, Deserialize)]
struct SandboxResponse {
    #[serde(rename = "sandboxID")]
    sandbox_id: String,
    #[serde(rename = "envdAccessToken", default)]
    envd_access_token: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProcessStreamMessage {
    #[serde(default)]
    event: Option<ProcessEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct ProcessEvent {
    #[serde(default)]
    data: Option<DataEvent>,
    #[serde(default)]
    end: Option<EndEvent>,
}

#[derive(Debug, Deserialize)]
struct DataEvent {
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndEvent {
    // proto3 JSON omits zero values, so a clean exit arrives without the field
    #[serde(default)]
    exit_code: i64,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EndStreamMessage {
    #[serde(default)]
    error: Option<ConnectError>,
}

#[derive(Debug, Deserialize)]
struct ConnectError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Data plane address of one live sandbox
#[derive(Debug, Clone)]
struct EnvdEndpoint {
    base_url: String,
    access_token: Option<String>,
}

pub struct E2BProvider {
    client: Client,
    config: E2BConfig,
    endpoints: Arc<RwLock<HashMap<String, EnvdEndpoint>>>,
}

impl E2BProvider {
    pub fn new(config: E2BConfig) -> ProviderResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::Config("E2B API key is required".to_string()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;

        Ok(Self {
            client,
            config,
            endpoints: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn envd_base_url(&self, sandbox_id: &str, domain: Option<&str>) -> String {
        match &self.config.envd_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}-{}.{}",
                ENVD_PORT,
                sandbox_id,
                domain.unwrap_or(&self.config.domain)
            ),
        }
    }

    async fn endpoint(&self, session: &Session) -> ProviderResult<EnvdEndpoint> {
        self.endpoints
            .read()
            .await
            .get(&session.id)
            .cloned()
            .ok_or_else(|| ProviderError::Session(format!("Unknown session: {}", session.id)))
    }

    fn basic_auth(&self) -> String {
        let credentials = format!("{}:", self.config.username);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }

    fn with_access_token(
        request: reqwest::RequestBuilder,
        endpoint: &EnvdEndpoint,
    ) -> reqwest::RequestBuilder {
        match &endpoint.access_token {
            Some(token) => request.header("X-Access-Token", token),
            None => request,
        }
    }

    async fn api_error(response: Response) -> ProviderError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        ProviderError::Api { status, message }
    }
}

#[async_trait]
impl Provider for E2BProvider {
    fn name(&self) -> &'static str {
        "e2b"
    }

    async fn create_session(&self) -> ProviderResult<Session> {
        let request = NewSandboxRequest {
            template_id: &self.config.template,
            timeout: self.config.sandbox_timeout_secs,
        };

        let response = self
            .client
            .post(self.api_url("/sandboxes"))
            .header("X-API-Key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let sandbox: SandboxResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Session(format!("Invalid sandbox response: {}", e)))?;

        let endpoint = EnvdEndpoint {
            base_url: self.envd_base_url(&sandbox.sandbox_id, sandbox.domain.as_deref()),
            access_token: sandbox.envd_access_token,
        };
        debug!("Sandbox {} envd at {}", sandbox.sandbox_id, endpoint.base_url);

        self.endpoints
            .write()
            .await
            .insert(sandbox.sandbox_id.clone(), endpoint);

        info!(
            "Created E2B sandbox {} from template {}",
            sandbox.sandbox_id, self.config.template
        );
        Ok(Session::new(sandbox.sandbox_id))
    }

    async fn run_command(&self, session: &Session, command: &str) -> ProviderResult<CommandResult> {
        let endpoint = self.endpoint(session).await?;

        let body = json!({
            "process": {
                "cmd": "/bin/bash",
                "args": ["-l", "-c", command],
                "envs": {},
                "cwd": self.config.working_dir,
            }
        });
        let payload =
            serde_json::to_vec(&body).map_err(|e| ProviderError::Command(e.to_string()))?;

        let request = self
            .client
            .post(format!("{}/process.Process/Start", endpoint.base_url))
            .header("Content-Type", CONNECT_CONTENT_TYPE)
            .header("Connect-Protocol-Version", "1")
            .header("Authorization", self.basic_auth())
            .body(encode_envelope(0, &payload));

        let response = Self::with_access_token(request, &endpoint)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let stream = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Command(e.to_string()))?;

        parse_process_stream(&stream)
    }

    async fn write_file(
        &self,
        session: &Session,
        path: &str,
        content: &[u8],
    ) -> ProviderResult<()> {
        let endpoint = self.endpoint(session).await?;

        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(content.to_vec()).file_name(file_name),
        );

        let request = self
            .client
            .post(format!("{}/files", endpoint.base_url))
            .query(&[("path", path), ("username", self.config.username.as_str())])
            .multipart(form);

        let response = Self::with_access_token(request, &endpoint)
            .send()
            .await
            .map_err(|e| ProviderError::FileTransfer(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        debug!("Wrote {} bytes to {}:{}", content.len(), session.id, path);
        Ok(())
    }

    async fn read_file(&self, session: &Session, path: &str) -> ProviderResult<Vec<u8>> {
        let endpoint = self.endpoint(session).await?;

        let request = self
            .client
            .get(format!("{}/files", endpoint.base_url))
            .query(&[("path", path), ("username", self.config.username.as_str())]);

        let response = Self::with_access_token(request, &endpoint)
            .send()
            .await
            .map_err(|e| ProviderError::FileTransfer(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::FileTransfer(format!(
                "File not found: {}",
                path
            )));
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::FileTransfer(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn destroy_session(&self, session: &Session) -> ProviderResult<()> {
        self.endpoints.write().await.remove(&session.id);

        let response = self
            .client
            .delete(self.api_url(&format!("/sandboxes/{}", session.id)))
            .header("X-API-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                info!("Killed E2B sandbox {}", session.id);
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                warn!("E2B sandbox {} was already gone", session.id);
                Ok(())
            }
            _ => Err(Self::api_error(response).await),
        }
    }
}

/// Frame one Connect streaming message: flags byte, big-endian length, payload
fn encode_envelope(flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 5);
    frame.push(flags);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

fn decode_envelopes(mut data: &[u8]) -> ProviderResult<Vec<(u8, &[u8])>> {
    let mut frames = Vec::new();

    while !data.is_empty() {
        if data.len() < 5 {
            return Err(ProviderError::Command(
                "Truncated envelope header in process stream".to_string(),
            ));
        }
        let flags = data[0];
        let len = u32::from_be_bytes([data[1], data[2], data[3], data[4]]) as usize;
        let rest = &data[5..];
        if rest.len() < len {
            return Err(ProviderError::Command(
                "Truncated envelope payload in process stream".to_string(),
            ));
        }
        frames.push((flags, &rest[..len]));
        data = &rest[len..];
    }

    Ok(frames)
}

fn decode_output(encoded: &str) -> ProviderResult<String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| ProviderError::Command(format!("Invalid output chunk: {}", e)))?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// Fold a complete process event stream into a command result
fn parse_process_stream(data: &[u8]) -> ProviderResult<CommandResult> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = None;

    for (flags, payload) in decode_envelopes(data)? {
        if flags & CONNECT_END_STREAM_FLAG != 0 {
            let end: EndStreamMessage = serde_json::from_slice(payload)
                .map_err(|e| ProviderError::Command(format!("Invalid end of stream: {}", e)))?;
            if let Some(error) = end.error {
                return Err(ProviderError::Command(format!(
                    "{}: {}",
                    error.code, error.message
                )));
            }
            continue;
        }

        let message: ProcessStreamMessage = serde_json::from_slice(payload)
            .map_err(|e| ProviderError::Command(format!("Invalid process event: {}", e)))?;
        let event = message.event.unwrap_or_default();

        if let Some(data) = event.data {
            if let Some(chunk) = data.stdout {
                stdout.push_str(&decode_output(&chunk)?);
            }
            if let Some(chunk) = data.stderr {
                stderr.push_str(&decode_output(&chunk)?);
            }
        }

        if let Some(end) = event.end {
            if let Some(error) = end.error.filter(|e| !e.is_empty()) {
                stderr.push_str(&error);
            }
            exit_code = Some(end.exit_code);
        }
    }

    let exit_code = exit_code.ok_or_else(|| {
        ProviderError::Command("Process stream ended without an exit status".to_string())
    })?;

    Ok(CommandResult {
        exit_code,
        stdout,
        stderr,
    })
}
