//! # System Constants
//!
//! Notification topics, environment variable names and defaults shared across
//! the Flowstate core.

/// Topics the executor publishes step lifecycle notifications on
pub mod topics {
    pub const STEP_STARTED: &str = "step.started";
    pub const STEP_SUSPENDED: &str = "step.suspended";
    pub const STEP_RESUMED: &str = "step.resumed";
    pub const STEP_COMPLETED: &str = "step.completed";
    pub const STEP_FAILED: &str = "step.failed";
}

/// Environment variables consulted for environment and config discovery
pub mod env {
    pub const FLOWSTATE_ENV: &str = "FLOWSTATE_ENV";
    pub const APP_ENV: &str = "APP_ENV";
    pub const FLOWSTATE_CONFIG_DIR: &str = "FLOWSTATE_CONFIG_DIR";
}

pub mod system {
    pub const DEFAULT_ENVIRONMENT: &str = "development";
    pub const KNOWN_ENVIRONMENTS: [&str; 3] = ["development", "test", "production"];
    pub const CONFIG_FILE_NAMES: [&str; 2] = ["flowstate-config.yaml", "flowstate-config.yml"];
    pub const DEFAULT_CONFIG_DIRECTORY: &str = "config";
    pub const DEFAULT_MAX_CONCURRENT_STEPS: usize = 64;
}

/// Parameter names understood by the built-in prefix processor
pub mod processor_params {
    pub const PREFIX: &str = "pfx";
    pub const RAISE_ERROR: &str = "raise_error";
    pub const DEFAULT_RECORD: &str = "default_record";
    pub const CONSTANT_RECORD: &str = "crec";
    pub const SUPPORTS_BULK: &str = "supports_bulk";
}
