use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

use callplan_core::config::{AppConfig, ConfigError, LoadOptions};
use callplan_db::{connect_with_config, migrations, DbPool};
use callplan_workflow::{WorkflowContext, WorkflowServices};

use crate::audit::TracingAuditSink;
use crate::health;
use crate::notifier::{self, NotificationDispatcher, NotifierError};
use crate::routes;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub services: WorkflowServices,
    notifier: Option<NotificationDispatcher>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Notifier(#[from] NotifierError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connects, migrates, and wires the workflow services for an already loaded config.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        max_connections = config.database.max_connections,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let (notifications, notifier) = notifier::start(&config.notifications)?;
    let context = WorkflowContext::sql(
        db_pool.clone(),
        Arc::new(TracingAuditSink),
        notifications,
        config.workflow,
    );
    info!(
        event_name = "system.bootstrap.workflow_ready",
        correlation_id = "bootstrap",
        require_approved_plan_for_check_in = config.workflow.require_approved_plan_for_check_in,
        require_rejection_reason = config.workflow.require_rejection_reason,
        "workflow services wired"
    );

    Ok(Application { services: WorkflowServices::new(context), config, db_pool, notifier })
}

impl Application {
    pub fn router(&self) -> Router {
        routes::router(self.services.clone())
            .merge(health::router(self.db_pool.clone()))
            .layer(TraceLayer::new_for_http())
    }

    /// Drains queued notifications within the configured grace period, then closes the pool.
    pub async fn shutdown(self) {
        let Self { config, db_pool, services, notifier } = self;
        // The queue closes once the last sink handle is gone.
        drop(services);
        if let Some(notifier) = notifier {
            notifier.drain(Duration::from_secs(config.server.graceful_shutdown_secs)).await;
        }
        db_pool.close().await;
        info!(event_name = "system.shutdown.complete", correlation_id = "shutdown", "shutdown complete");
    }
}
