// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Animbox

// Server Configuration
pub const PORT: &str = "PORT";
pub const HOST: &str = "HOST";
pub const CORS_ORIGIN: &str = "CORS_ORIGIN";

// Dataset Configuration
pub const DATASET_PATH: &str = "DATASET_PATH";

// Sandbox Provider Selection
pub const SANDBOX_PROVIDER: &str = "SANDBOX_PROVIDER";

// E2B Configuration
pub const E2B_API_KEY: &str = "E2B_API_KEY";
pub const E2B_API_URL: &str = "E2B_API_URL";
pub const E2B_DOMAIN: &str = "E2B_DOMAIN";
pub const E2B_TEMPLATE: &str = "E2B_TEMPLATE";
pub const E2B_SANDBOX_TIMEOUT_SECS: &str = "E2B_SANDBOX_TIMEOUT_SECS";

// Docker Configuration
pub const DOCKER_IMAGE: &str = "DOCKER_IMAGE";

// Diagnostics
pub const SURFACE_PROVISIONING_LOGS: &str = "SURFACE_PROVISIONING_LOGS";

// Logging
pub const RUST_LOG: &str = "RUST_LOG";
