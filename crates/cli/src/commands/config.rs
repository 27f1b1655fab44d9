use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use teetime_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries: Vec<(&str, String, &str)> = vec![
        ("database.url", config.database.url.clone(), "TEETIME_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "TEETIME_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "TEETIME_DATABASE_TIMEOUT_SECS",
        ),
        ("server.bind_address", config.server.bind_address.clone(), "TEETIME_SERVER_BIND_ADDRESS"),
        ("server.port", config.server.port.to_string(), "TEETIME_SERVER_PORT"),
        (
            "scheduling.club_name",
            config.scheduling.club_name.clone(),
            "TEETIME_SCHEDULING_CLUB_NAME",
        ),
        ("scheduling.timezone", config.scheduling.timezone.clone(), "TEETIME_SCHEDULING_TIMEZONE"),
        (
            "scheduling.days_in_advance",
            config.scheduling.days_in_advance.to_string(),
            "TEETIME_SCHEDULING_DAYS_IN_ADVANCE",
        ),
        (
            "scheduling.open_hour",
            config.scheduling.open_hour.to_string(),
            "TEETIME_SCHEDULING_OPEN_HOUR",
        ),
        (
            "scheduling.open_minute",
            config.scheduling.open_minute.to_string(),
            "TEETIME_SCHEDULING_OPEN_MINUTE",
        ),
        (
            "scheduling.guest_lead_hours",
            config.scheduling.guest_lead_hours.to_string(),
            "TEETIME_SCHEDULING_GUEST_LEAD_HOURS",
        ),
        (
            "scheduling.execute_when_window_open",
            config.scheduling.execute_when_window_open.to_string(),
            "TEETIME_SCHEDULING_EXECUTE_WHEN_WINDOW_OPEN",
        ),
        (
            "scheduling.default_fallback_window_minutes",
            config.scheduling.default_fallback_window_minutes.to_string(),
            "TEETIME_SCHEDULING_DEFAULT_FALLBACK_WINDOW_MINUTES",
        ),
        (
            "execution.backend",
            config.execution.backend.as_str().to_string(),
            "TEETIME_EXECUTION_BACKEND",
        ),
        (
            "execution.per_item_timeout_secs",
            config.execution.per_item_timeout_secs.to_string(),
            "TEETIME_EXECUTION_PER_ITEM_TIMEOUT_SECS",
        ),
        (
            "execution.retry_max_attempts",
            config.execution.retry_max_attempts.to_string(),
            "TEETIME_EXECUTION_RETRY_MAX_ATTEMPTS",
        ),
        (
            "execution.retry_base_delay_ms",
            config.execution.retry_base_delay_ms.to_string(),
            "TEETIME_EXECUTION_RETRY_BASE_DELAY_MS",
        ),
        (
            "jobs.scheduler_api_key",
            redact_secret(config.jobs.scheduler_api_key.as_ref()).to_string(),
            "TEETIME_JOBS_SCHEDULER_API_KEY",
        ),
        (
            "notifications.webhook_url",
            config.notifications.webhook_url.as_deref().unwrap_or("<unset>").to_string(),
            "TEETIME_NOTIFICATIONS_WEBHOOK_URL",
        ),
        (
            "notifications.webhook_token",
            redact_secret(config.notifications.webhook_token.as_ref()).to_string(),
            "TEETIME_NOTIFICATIONS_WEBHOOK_TOKEN",
        ),
        (
            "notifications.timeout_secs",
            config.notifications.timeout_secs.to_string(),
            "TEETIME_NOTIFICATIONS_TIMEOUT_SECS",
        ),
        ("logging.level", config.logging.level.clone(), "TEETIME_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "TEETIME_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_key) in entries {
        lines.push(render_line(key_path, &value, source(key_path, env_key)));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("teetime.toml"), PathBuf::from("config/teetime.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> &'static str {
    match secret {
        Some(value) if value.expose_secret().trim().is_empty() => "<empty>",
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}
