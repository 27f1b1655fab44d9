pub mod config;
pub mod doctor;
pub mod due;
pub mod migrate;
pub mod sweep;

use std::sync::Arc;

use serde::Serialize;
use teetime_core::chrono::{DateTime, Utc};
use teetime_core::config::AppConfig;
use teetime_core::BookingEngine;
use teetime_db::{connect_with_settings, migrations, DbPool, SqlBookingStore};

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

#[derive(Debug, Serialize)]
struct CommandReport<'a, T: Serialize> {
    command: &'a str,
    status: &'a str,
    report: &'a T,
}

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

    /// A structured result whose body is `report` rather than a message.
    pub fn report<T: Serialize>(command: &str, status: &str, report: &T, exit_code: u8) -> Self {
        match serde_json::to_string(&CommandReport { command, status, report }) {
            Ok(output) => Self { exit_code, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// `(error_class, message, exit_code)` carried out of a command's async block.
pub(crate) type CommandFailure = (&'static str, String, u8);

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(teetime_core::config::LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    })
}

pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, CommandFailure> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

/// An engine over the durable store with the configured backend. The CLI
/// never sends notifications anywhere but the log.
pub(crate) fn engine(config: &AppConfig, pool: &DbPool) -> Result<BookingEngine, CommandFailure> {
    let policy = config
        .scheduling
        .policy()
        .map_err(|error| ("config_validation", error.to_string(), 2u8))?;
    let mut engine = BookingEngine::new(Arc::new(SqlBookingStore::new(pool.clone())), policy)
        .with_per_item_timeout(config.execution.per_item_timeout());
    if let Some(backend) = config.execution.reservation_backend() {
        engine = engine.with_backend(backend);
    }
    Ok(engine)
}

pub(crate) fn parse_instant(command: &str, raw: Option<&str>) -> Result<DateTime<Utc>, CommandResult> {
    match raw {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|instant| instant.with_timezone(&Utc))
            .map_err(|error| {
                CommandResult::failure(
                    command,
                    "invalid_argument",
                    format!("`--at` must be an RFC 3339 timestamp: {error}"),
                    2,
                )
            }),
    }
}
