//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and files
//! for debugging concurrent step execution and async completions.

use crate::constants::{env as env_vars, system};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call repeatedly; only the first call installs a subscriber. When a
/// global subscriber is already present (e.g. set by an embedding host) the
/// existing one is kept.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level))
        };

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(filter());

        let log_dir = PathBuf::from("log");
        if let Err(e) = fs::create_dir_all(&log_dir) {
            // No writable log directory: console output only
            if tracing_subscriber::registry()
                .with(console_layer)
                .try_init()
                .is_ok()
            {
                tracing::warn!(
                    error = %e,
                    log_dir = %log_dir.display(),
                    "Could not create log directory, logging to console only"
                );
            }
            return;
        }

        // Log file name carries environment, PID and start timestamp
        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");
        let log_path = log_dir.join(&log_filename);

        let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = tracing_subscriber::registry().with(console_layer).with(
            fmt::layer()
                .with_writer(file_writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter()),
        );

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
            return;
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_path.display(),
            "Structured logging initialized with file output"
        );

        // The writer flushes on drop; it must live as long as the process
        std::mem::forget(guard);
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var(env_vars::FLOWSTATE_ENV)
        .or_else(|_| std::env::var(env_vars::APP_ENV))
        .unwrap_or_else(|_| system::DEFAULT_ENVIRONMENT.to_string())
        .to_lowercase()
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" | "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for step lifecycle operations
pub fn log_step_operation(
    operation: &str,
    step: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        step = %step,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "STEP_OPERATION"
    );
}

/// Log structured data for async key operations
pub fn log_async_key_operation(
    operation: &str,
    async_key: &str,
    step: Option<&str>,
    status: &str,
) {
    tracing::info!(
        operation = %operation,
        async_key = %async_key,
        step = step,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "ASYNC_KEY_OPERATION"
    );
}

/// Log structured data for processor stage operations
pub fn log_processor_operation(
    operation: &str,
    stage: &str,
    records: usize,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        stage = %stage,
        records = records,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "PROCESSOR_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
