use std::sync::Arc;
use std::time::Duration;

use teetime_agent::ConversationTracker;
use teetime_core::config::{AppConfig, ConfigError, LoadOptions};
use teetime_core::{BookingEngine, Notifier, TracingNotifier};
use teetime_db::{connect_with_settings, migrations, DbPool, SqlBookingStore, SqlSessionStore};
use thiserror::Error;
use tracing::{info, warn};

use crate::notify::WebhookNotifier;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: BookingEngine,
    pub tracker: Arc<ConversationTracker>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("notification client could not be built: {0}")]
    Notifier(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let mut engine = BookingEngine::new(
        Arc::new(SqlBookingStore::new(db_pool.clone())),
        config.scheduling.policy()?,
    )
    .with_notifier(build_notifier(&config)?)
    .with_per_item_timeout(config.execution.per_item_timeout());
    match config.execution.reservation_backend() {
        Some(backend) => engine = engine.with_backend(backend),
        None => warn!(
            event_name = "system.bootstrap.backend_disabled",
            correlation_id = "bootstrap",
            "no reservation backend configured; executions will fail"
        ),
    }

    let tracker = Arc::new(ConversationTracker::new(
        engine.clone(),
        Arc::new(SqlSessionStore::new(db_pool.clone())),
        config.scheduling.club_name.clone(),
        config.scheduling.default_fallback_window_minutes,
    ));

    Ok(Application { config, db_pool, engine, tracker })
}

fn build_notifier(config: &AppConfig) -> Result<Arc<dyn Notifier>, BootstrapError> {
    let notifications = &config.notifications;
    match &notifications.webhook_url {
        Some(url) => {
            let notifier = WebhookNotifier::new(
                url.clone(),
                notifications.webhook_token.clone(),
                Duration::from_secs(notifications.timeout_secs),
            )
            .map_err(BootstrapError::Notifier)?;
            Ok(Arc::new(notifier))
        }
        None => Ok(Arc::new(TracingNotifier)),
    }
}

#[cfg(test)]
mod tests {
    use teetime_core::config::{BackendKind, ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn options(backend: BackendKind) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                backend: Some(backend),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_the_engine() {
        let app = bootstrap(options(BackendKind::Mock)).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('booking', 'conversation_session')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("count tables");
        assert_eq!(table_count, 2);
        assert!(app.engine.has_backend());
        assert_eq!(app.engine.timezone(), teetime_core::chrono_tz::America::Chicago);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn disabled_backend_leaves_engine_without_backend() {
        let app = bootstrap(options(BackendKind::Disabled)).await.expect("bootstrap");
        assert!(!app.engine.has_backend());
        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_unknown_timezone() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                timezone: Some("Mars/Olympus".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("scheduling.timezone"), "{message}");
    }
}
