use anyhow::Error;
use database_entity::dto::Notification;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, trace, warn};

/// Default channel the notifications insert trigger publishes on.
pub const NOTIFICATION_CHANNEL: &str = "crm_notification_channel";

/// Relays Postgres `NOTIFY` payloads on `channel` to every subscriber, decoded as `T`.
pub struct PostgresDBListener<T: Clone> {
  notify: broadcast::Sender<T>,
  handle: JoinHandle<()>,
}

impl<T> PostgresDBListener<T>
where
  T: Clone + DeserializeOwned + Send + 'static,
{
  pub async fn new(pg_pool: &PgPool, channel: &str) -> Result<Self, Error> {
    let mut listener = PgListener::connect_with(pg_pool).await?;
    listener.listen(channel).await?;

    let (tx, _) = broadcast::channel(1000);
    let notify = tx.clone();
    let channel = channel.to_string();
    let handle = tokio::spawn(async move {
      loop {
        match listener.recv().await {
          Ok(notification) => {
            trace!("Received notification: {}", notification.payload());
            match serde_json::from_str::<T>(notification.payload()) {
              Ok(change) => {
                let _ = tx.send(change);
              },
              Err(err) => {
                error!(
                  "Failed to deserialize change: {:?}, payload: {}",
                  err,
                  notification.payload()
                );
              },
            }
          },
          Err(err) => {
            warn!("listener on {} stopped: {}", channel, err);
            break;
          },
        }
      }
    });
    Ok(Self { notify, handle })
  }

  pub fn subscribe(&self) -> broadcast::Receiver<T> {
    self.notify.subscribe()
  }
}

impl<T: Clone> Drop for PostgresDBListener<T> {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

pub type NotificationListener = PostgresDBListener<Notification>;
