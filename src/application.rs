use std::sync::Arc;

use anyhow::Context;
use database::pg_store::PgStore;
use database::store::NotificationStore;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::biz::notification::webhook::NotificationWebhookRelay;
use crate::config::config::{Config, DatabaseSetting};
use crate::state::AppState;

pub struct Application {
  state: AppState,
  relay: NotificationWebhookRelay,
}

impl Application {
  pub async fn build(config: Config, state: AppState) -> Result<Self, anyhow::Error> {
    let relay =
      NotificationWebhookRelay::new(state.store.clone(), config.notification.webhook_timeout)?;
    Ok(Self { state, relay })
  }

  /// Relays notifications to workflow webhooks until the process receives ctrl-c.
  pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
    let rx = self.state.store.subscribe_notifications();
    tokio::select! {
      _ = self.relay.run(rx) => {},
      result = tokio::signal::ctrl_c() => {
        result.context("fail to listen for shutdown signal")?;
        info!("shutting down");
      },
    }
    Ok(())
  }
}

pub async fn init_state(config: &Config) -> Result<AppState, anyhow::Error> {
  info!("Preparing to run database migrations...");
  let pg_pool = get_connection_pool(&config.db_settings).await?;
  migrate(&pg_pool).await?;

  info!(
    "Listening for notifications on channel {}",
    config.notification.channel
  );
  let store = PgStore::new(pg_pool.clone(), &config.notification.channel).await?;
  Ok(AppState {
    pg_pool,
    config: Arc::new(config.clone()),
    store: Arc::new(store),
  })
}

async fn get_connection_pool(setting: &DatabaseSetting) -> Result<PgPool, anyhow::Error> {
  info!("Connecting to postgres database with setting: {}", setting);
  PgPoolOptions::new()
    .max_connections(setting.max_connections)
    .acquire_timeout(std::time::Duration::from_secs(10))
    .idle_timeout(std::time::Duration::from_secs(60))
    .connect_with(setting.pg_connect_options())
    .await
    .map_err(|e| anyhow::anyhow!("Failed to connect to postgres database: {}", e))
}

async fn migrate(pool: &PgPool) -> Result<(), anyhow::Error> {
  sqlx::migrate!("./migrations")
    .run(pool)
    .await
    .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))
}
