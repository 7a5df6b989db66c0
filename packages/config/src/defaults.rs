// ABOUTME: Default values for settings that fall back when the environment is silent
// ABOUTME: Shared by the server config loader and the sandbox provider constructors

pub const PORT: u16 = 5001;
pub const HOST: &str = "0.0.0.0";
pub const DATASET_PATH: &str = "3blue1brown-manim-prompts.csv";
pub const SANDBOX_PROVIDER: &str = "e2b";

pub const E2B_API_URL: &str = "https://api.e2b.dev";
pub const E2B_DOMAIN: &str = "e2b.app";
pub const E2B_TEMPLATE: &str = "base";
pub const E2B_SANDBOX_TIMEOUT_SECS: u64 = 600;

pub const DOCKER_IMAGE: &str = "manimcommunity/manim:stable";

pub const LOG_FILTER: &str = "info";
