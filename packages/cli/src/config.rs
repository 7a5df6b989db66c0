use animbox_config::{constants, defaults};
use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid sandbox provider: {0} (expected e2b or docker)")]
    InvalidProvider(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Which backend hosts render sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    E2B,
    Docker,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "e2b" => Ok(ProviderKind::E2B),
            "docker" | "local" => Ok(ProviderKind::Docker),
            _ => Err(ConfigError::InvalidProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    /// Single allowed origin; any origin when unset
    pub cors_origin: Option<String>,
    pub dataset_path: PathBuf,
    pub provider: ProviderKind,
    pub e2b_api_key: Option<String>,
    pub e2b_api_url: String,
    pub e2b_domain: String,
    pub e2b_template: String,
    pub e2b_sandbox_timeout_secs: u64,
    pub docker_image: String,
    /// Include provisioning diagnostics in render failure responses
    pub surface_provisioning_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: defaults::PORT,
            host: defaults::HOST.to_string(),
            cors_origin: None,
            dataset_path: PathBuf::from(defaults::DATASET_PATH),
            provider: ProviderKind::E2B,
            e2b_api_key: None,
            e2b_api_url: defaults::E2B_API_URL.to_string(),
            e2b_domain: defaults::E2B_DOMAIN.to_string(),
            e2b_template: defaults::E2B_TEMPLATE.to_string(),
            e2b_sandbox_timeout_secs: defaults::E2B_SANDBOX_TIMEOUT_SECS,
            docker_image: defaults::DOCKER_IMAGE.to_string(),
            surface_provisioning_logs: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var(constants::PORT) {
            Some(port_str) => port_str.trim().parse::<u16>()?,
            None => defaults::PORT,
        };

        // Validate port is in valid range
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let provider = var(constants::SANDBOX_PROVIDER)
            .unwrap_or_else(|| defaults::SANDBOX_PROVIDER.to_string())
            .parse::<ProviderKind>()?;

        let e2b_sandbox_timeout_secs = match var(constants::E2B_SANDBOX_TIMEOUT_SECS) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: constants::E2B_SANDBOX_TIMEOUT_SECS,
                    value,
                })?,
            None => defaults::E2B_SANDBOX_TIMEOUT_SECS,
        };

        let surface_provisioning_logs = match var(constants::SURFACE_PROVISIONING_LOGS) {
            Some(value) => parse_flag(constants::SURFACE_PROVISIONING_LOGS, value)?,
            None => false,
        };

        Ok(Config {
            port,
            host: var(constants::HOST).unwrap_or_else(|| defaults::HOST.to_string()),
            cors_origin: var(constants::CORS_ORIGIN),
            dataset_path: var(constants::DATASET_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(defaults::DATASET_PATH)),
            provider,
            e2b_api_key: var(constants::E2B_API_KEY),
            e2b_api_url: var(constants::E2B_API_URL)
                .unwrap_or_else(|| defaults::E2B_API_URL.to_string()),
            e2b_domain: var(constants::E2B_DOMAIN)
                .unwrap_or_else(|| defaults::E2B_DOMAIN.to_string()),
            e2b_template: var(constants::E2B_TEMPLATE)
                .unwrap_or_else(|| defaults::E2B_TEMPLATE.to_string()),
            e2b_sandbox_timeout_secs,
            docker_image: var(constants::DOCKER_IMAGE)
                .unwrap_or_else(|| defaults::DOCKER_IMAGE.to_string()),
            surface_provisioning_logs,
        })
    }
}

fn parse_flag(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}
