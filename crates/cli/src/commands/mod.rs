pub mod config;
pub mod digest;
pub mod doctor;
pub mod migrate;
pub mod seed;

use std::future::Future;

use fleetpulse_core::config::{AppConfig, LoadOptions};
use fleetpulse_db::{connect_from_config, migrations, DbPool};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

/// `(error_class, message, exit_code)` raised inside a database-backed command.
pub type StepFailure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Loads config, connects, applies pending migrations, then runs `step`.
///
/// Exit codes: 2 config, 3 runtime, 4 connectivity, 5 migration; `step`
/// picks its own.
pub fn with_database<T, F, Fut>(command: &str, step: F) -> Result<T, CommandResult>
where
    F: FnOnce(DbPool, AppConfig) -> Fut,
    Fut: Future<Output = Result<T, StepFailure>>,
{
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    let result: Result<T, StepFailure> = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let outcome = step(pool.clone(), config.clone()).await;
        pool.close().await;
        outcome
    });

    result.map_err(|(error_class, message, exit_code)| {
        CommandResult::failure(command, error_class, message, exit_code)
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
