use std::sync::Arc;

use axum::Router;
use fleetpulse_core::config::{AppConfig, ConfigError, LoadOptions};
use fleetpulse_core::errors::ApplicationError;
use fleetpulse_core::notifications::{DigestEngine, DigestRenderer};
use fleetpulse_db::{
    connect_from_config, migrations, DbPool, SqlAccountRepository, SqlFleetRepository,
    SqlNotificationLedgerRepository,
};
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

use crate::{digest, health, mailer};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<DigestEngine>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("digest templates failed to load: {0}")]
    Templates(#[source] ApplicationError),
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

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
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

    let renderer =
        DigestRenderer::new(config.digest.app_base_url.clone()).map_err(BootstrapError::Templates)?;
    let engine = DigestEngine::new(
        Arc::new(SqlAccountRepository::new(db_pool.clone())),
        Arc::new(SqlFleetRepository::new(db_pool.clone())),
        Arc::new(SqlNotificationLedgerRepository::new(db_pool.clone())),
        renderer,
    );

    if config.digest.cron_secret().is_none() {
        warn!(
            event_name = "system.bootstrap.cron_secret_missing",
            correlation_id = "bootstrap",
            "digest.cron_secret is not set; digest endpoints will reject every request"
        );
    }

    Ok(Application { config, db_pool, engine: Arc::new(engine) })
}

impl Application {
    /// Health and digest routes on one router.
    pub fn router(&self) -> Router {
        let mailer = mailer::from_config(&self.config.mail, Client::new());
        match &mailer {
            Ok(_) => info!(
                event_name = "system.bootstrap.mail_transport",
                correlation_id = "bootstrap",
                transport = self.config.mail.transport.as_str(),
                "mail transport initialized"
            ),
            Err(error) => warn!(
                event_name = "system.bootstrap.mail_transport",
                correlation_id = "bootstrap",
                transport = self.config.mail.transport.as_str(),
                error = %error,
                "mail transport unavailable; digest execute requests will fail"
            ),
        }

        let digest_state =
            digest::DigestState::new(self.engine.clone(), self.config.digest.clone(), mailer);
        health::router(self.db_pool.clone()).merge(digest::router(digest_state))
    }
}
