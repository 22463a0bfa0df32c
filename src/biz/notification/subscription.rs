use database_entity::dto::Notification;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use uuid::Uuid;

/// Live feed of inserted notifications, narrowed to one recipient.
pub struct NotificationSubscription {
  rx: broadcast::Receiver<Notification>,
  user_id: Uuid,
}

impl NotificationSubscription {
  pub fn new(rx: broadcast::Receiver<Notification>, user_id: Uuid) -> Self {
    Self { rx, user_id }
  }

  pub fn user_id(&self) -> &Uuid {
    &self.user_id
  }

  /// Waits for the next notification addressed to the subscribed user. Returns `None` once
  /// the underlying channel is closed.
  pub async fn recv(&mut self) -> Option<Notification> {
    loop {
      match self.rx.recv().await {
        Ok(notification) if notification.user_id == self.user_id => return Some(notification),
        Ok(_) => continue,
        Err(RecvError::Lagged(skipped)) => {
          warn!(
            "notification subscription of {} lagged, {} pushes dropped",
            self.user_id, skipped
          );
        },
        Err(RecvError::Closed) => return None,
      }
    }
  }
}
