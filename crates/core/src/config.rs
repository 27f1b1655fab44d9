use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{MockBackend, ReservationBackend, RetryPolicy, RetryingBackend};
use crate::domain::request::DEFAULT_FALLBACK_WINDOW_MINUTES;
use crate::scheduler::{BookingWindowPolicy, SchedulingPolicy};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub scheduling: SchedulingConfig,
    pub execution: ExecutionConfig,
    pub jobs: JobsConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SchedulingConfig {
    pub club_name: String,
    /// IANA zone name the club's booking window is defined in.
    pub timezone: String,
    pub days_in_advance: u32,
    pub open_hour: u32,
    pub open_minute: u32,
    /// Zero disables the multi-player lead-time rule.
    pub guest_lead_hours: u32,
    pub execute_when_window_open: bool,
    pub default_fallback_window_minutes: u32,
}

#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    pub backend: BackendKind,
    pub per_item_timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

#[derive(Clone, Debug, Default)]
pub struct JobsConfig {
    pub scheduler_api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
    pub webhook_token: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Mock,
    Disabled,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Disabled => "disabled",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub backend: Option<BackendKind>,
    pub timezone: Option<String>,
    pub per_item_timeout_secs: Option<u64>,
    pub scheduler_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://teetime.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            scheduling: SchedulingConfig {
                club_name: "Northgate Country Club".to_string(),
                timezone: "America/Chicago".to_string(),
                days_in_advance: 7,
                open_hour: 6,
                open_minute: 30,
                guest_lead_hours: 48,
                execute_when_window_open: true,
                default_fallback_window_minutes: DEFAULT_FALLBACK_WINDOW_MINUTES,
            },
            execution: ExecutionConfig {
                backend: BackendKind::Mock,
                per_item_timeout_secs: 300,
                retry_max_attempts: 2,
                retry_base_delay_ms: 500,
            },
            jobs: JobsConfig::default(),
            notifications: NotificationConfig {
                webhook_url: None,
                webhook_token: None,
                timeout_secs: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(ConfigError::Validation(format!(
                "unsupported reservation backend `{other}` (expected mock|disabled)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SchedulingConfig {
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone.trim().parse::<Tz>().map_err(|_| {
            ConfigError::Validation(format!(
                "scheduling.timezone `{}` is not an IANA timezone name",
                self.timezone
            ))
        })
    }

    pub fn policy(&self) -> Result<SchedulingPolicy, ConfigError> {
        Ok(SchedulingPolicy {
            window: BookingWindowPolicy {
                days_in_advance: self.days_in_advance,
                open_hour: self.open_hour,
                open_minute: self.open_minute,
                timezone: self.timezone()?,
            },
            guest_lead_hours: (self.guest_lead_hours > 0).then_some(self.guest_lead_hours),
            execute_when_window_open: self.execute_when_window_open,
        })
    }
}

impl ExecutionConfig {
    pub fn per_item_timeout(&self) -> Duration {
        Duration::from_secs(self.per_item_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            ..RetryPolicy::default()
        }
    }

    /// The configured backend, wrapped in the retry policy. `None` when
    /// execution is disabled.
    pub fn reservation_backend(&self) -> Option<Arc<dyn ReservationBackend>> {
        match self.backend {
            BackendKind::Mock => {
                Some(Arc::new(RetryingBackend::new(MockBackend::new(), self.retry_policy())))
            }
            BackendKind::Disabled => None,
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("teetime.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(scheduling) = patch.scheduling {
            if let Some(club_name) = scheduling.club_name {
                self.scheduling.club_name = club_name;
            }
            if let Some(timezone) = scheduling.timezone {
                self.scheduling.timezone = timezone;
            }
            if let Some(days_in_advance) = scheduling.days_in_advance {
                self.scheduling.days_in_advance = days_in_advance;
            }
            if let Some(open_hour) = scheduling.open_hour {
                self.scheduling.open_hour = open_hour;
            }
            if let Some(open_minute) = scheduling.open_minute {
                self.scheduling.open_minute = open_minute;
            }
            if let Some(guest_lead_hours) = scheduling.guest_lead_hours {
                self.scheduling.guest_lead_hours = guest_lead_hours;
            }
            if let Some(execute_when_window_open) = scheduling.execute_when_window_open {
                self.scheduling.execute_when_window_open = execute_when_window_open;
            }
            if let Some(window) = scheduling.default_fallback_window_minutes {
                self.scheduling.default_fallback_window_minutes = window;
            }
        }

        if let Some(execution) = patch.execution {
            if let Some(backend) = execution.backend {
                self.execution.backend = backend;
            }
            if let Some(per_item_timeout_secs) = execution.per_item_timeout_secs {
                self.execution.per_item_timeout_secs = per_item_timeout_secs;
            }
            if let Some(retry_max_attempts) = execution.retry_max_attempts {
                self.execution.retry_max_attempts = retry_max_attempts;
            }
            if let Some(retry_base_delay_ms) = execution.retry_base_delay_ms {
                self.execution.retry_base_delay_ms = retry_base_delay_ms;
            }
        }

        if let Some(jobs) = patch.jobs {
            if let Some(scheduler_api_key_value) = jobs.scheduler_api_key {
                self.jobs.scheduler_api_key = Some(secret_value(scheduler_api_key_value));
            }
        }

        if let Some(notifications) = patch.notifications {
            if let Some(webhook_url) = notifications.webhook_url {
                self.notifications.webhook_url = Some(webhook_url);
            }
            if let Some(webhook_token_value) = notifications.webhook_token {
                self.notifications.webhook_token = Some(secret_value(webhook_token_value));
            }
            if let Some(timeout_secs) = notifications.timeout_secs {
                self.notifications.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TEETIME_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TEETIME_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("TEETIME_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TEETIME_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TEETIME_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TEETIME_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TEETIME_SERVER_PORT") {
            self.server.port = parse_u16("TEETIME_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("TEETIME_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("TEETIME_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("TEETIME_SCHEDULING_CLUB_NAME") {
            self.scheduling.club_name = value;
        }
        if let Some(value) = read_env("TEETIME_SCHEDULING_TIMEZONE") {
            self.scheduling.timezone = value;
        }
        if let Some(value) = read_env("TEETIME_SCHEDULING_DAYS_IN_ADVANCE") {
            self.scheduling.days_in_advance =
                parse_u32("TEETIME_SCHEDULING_DAYS_IN_ADVANCE", &value)?;
        }
        if let Some(value) = read_env("TEETIME_SCHEDULING_OPEN_HOUR") {
            self.scheduling.open_hour = parse_u32("TEETIME_SCHEDULING_OPEN_HOUR", &value)?;
        }
        if let Some(value) = read_env("TEETIME_SCHEDULING_OPEN_MINUTE") {
            self.scheduling.open_minute = parse_u32("TEETIME_SCHEDULING_OPEN_MINUTE", &value)?;
        }
        if let Some(value) = read_env("TEETIME_SCHEDULING_GUEST_LEAD_HOURS") {
            self.scheduling.guest_lead_hours =
                parse_u32("TEETIME_SCHEDULING_GUEST_LEAD_HOURS", &value)?;
        }
        if let Some(value) = read_env("TEETIME_SCHEDULING_EXECUTE_WHEN_WINDOW_OPEN") {
            self.scheduling.execute_when_window_open =
                parse_bool("TEETIME_SCHEDULING_EXECUTE_WHEN_WINDOW_OPEN", &value)?;
        }
        if let Some(value) = read_env("TEETIME_SCHEDULING_DEFAULT_FALLBACK_WINDOW_MINUTES") {
            self.scheduling.default_fallback_window_minutes =
                parse_u32("TEETIME_SCHEDULING_DEFAULT_FALLBACK_WINDOW_MINUTES", &value)?;
        }

        if let Some(value) = read_env("TEETIME_EXECUTION_BACKEND") {
            self.execution.backend = value.parse()?;
        }
        if let Some(value) = read_env("TEETIME_EXECUTION_PER_ITEM_TIMEOUT_SECS") {
            self.execution.per_item_timeout_secs =
                parse_u64("TEETIME_EXECUTION_PER_ITEM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TEETIME_EXECUTION_RETRY_MAX_ATTEMPTS") {
            self.execution.retry_max_attempts =
                parse_u32("TEETIME_EXECUTION_RETRY_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("TEETIME_EXECUTION_RETRY_BASE_DELAY_MS") {
            self.execution.retry_base_delay_ms =
                parse_u64("TEETIME_EXECUTION_RETRY_BASE_DELAY_MS", &value)?;
        }

        if let Some(value) = read_env("TEETIME_JOBS_SCHEDULER_API_KEY") {
            self.jobs.scheduler_api_key = Some(secret_value(value));
        }

        if let Some(value) = read_env("TEETIME_NOTIFICATIONS_WEBHOOK_URL") {
            self.notifications.webhook_url = Some(value);
        }
        if let Some(value) = read_env("TEETIME_NOTIFICATIONS_WEBHOOK_TOKEN") {
            self.notifications.webhook_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("TEETIME_NOTIFICATIONS_TIMEOUT_SECS") {
            self.notifications.timeout_secs =
                parse_u64("TEETIME_NOTIFICATIONS_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("TEETIME_LOGGING_LEVEL").or_else(|| read_env("TEETIME_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TEETIME_LOGGING_FORMAT").or_else(|| read_env("TEETIME_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(backend) = overrides.backend {
            self.execution.backend = backend;
        }
        if let Some(timezone) = overrides.timezone {
            self.scheduling.timezone = timezone;
        }
        if let Some(per_item_timeout_secs) = overrides.per_item_timeout_secs {
            self.execution.per_item_timeout_secs = per_item_timeout_secs;
        }
        if let Some(scheduler_api_key) = overrides.scheduler_api_key {
            self.jobs.scheduler_api_key = Some(secret_value(scheduler_api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_scheduling(&self.scheduling)?;
        validate_execution(&self.execution)?;
        validate_jobs(&self.jobs)?;
        validate_notifications(&self.notifications)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("teetime.toml"), PathBuf::from("config/teetime.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_scheduling(scheduling: &SchedulingConfig) -> Result<(), ConfigError> {
    scheduling.timezone()?;

    if scheduling.open_hour > 23 || scheduling.open_minute > 59 {
        return Err(ConfigError::Validation(format!(
            "scheduling open time {}:{} is not a valid time of day",
            scheduling.open_hour, scheduling.open_minute
        )));
    }

    if scheduling.days_in_advance > 365 {
        return Err(ConfigError::Validation(
            "scheduling.days_in_advance must be in range 0..=365".to_string(),
        ));
    }

    Ok(())
}

fn validate_execution(execution: &ExecutionConfig) -> Result<(), ConfigError> {
    if execution.per_item_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "execution.per_item_timeout_secs must be greater than zero".to_string(),
        ));
    }

    if execution.retry_max_attempts == 0 || execution.retry_max_attempts > 10 {
        return Err(ConfigError::Validation(
            "execution.retry_max_attempts must be in range 1..=10".to_string(),
        ));
    }

    Ok(())
}

fn validate_jobs(jobs: &JobsConfig) -> Result<(), ConfigError> {
    let blank =
        jobs.scheduler_api_key.as_ref().is_some_and(|key| key.expose_secret().trim().is_empty());
    if blank {
        return Err(ConfigError::Validation(
            "jobs.scheduler_api_key must not be blank when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_notifications(notifications: &NotificationConfig) -> Result<(), ConfigError> {
    if let Some(url) = &notifications.webhook_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "notifications.webhook_url must start with http:// or https://".to_string(),
            ));
        }
    }

    if notifications.timeout_secs == 0 || notifications.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "notifications.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    scheduling: Option<SchedulingPatch>,
    execution: Option<ExecutionPatch>,
    jobs: Option<JobsPatch>,
    notifications: Option<NotificationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulingPatch {
    club_name: Option<String>,
    timezone: Option<String>,
    days_in_advance: Option<u32>,
    open_hour: Option<u32>,
    open_minute: Option<u32>,
    guest_lead_hours: Option<u32>,
    execute_when_window_open: Option<bool>,
    default_fallback_window_minutes: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ExecutionPatch {
    backend: Option<BackendKind>,
    per_item_timeout_secs: Option<u64>,
    retry_max_attempts: Option<u32>,
    retry_base_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct JobsPatch {
    scheduler_api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationPatch {
    webhook_url: Option<String>,
    webhook_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
