use std::sync::Arc;
use std::time::Duration;

use app_error::AppError;
use database::store::WorkflowStore;
use database_entity::dto::Notification;
use reqwest::Url;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, instrument, trace, warn};

/// Forwards inserted notifications to the external endpoint configured on the workflow the
/// notification refers to. Delivery is best effort: one attempt, failures are logged.
pub struct NotificationWebhookRelay {
  workflows: Arc<dyn WorkflowStore>,
  client: reqwest::Client,
}

impl NotificationWebhookRelay {
  pub fn new(workflows: Arc<dyn WorkflowStore>, timeout: Duration) -> Result<Self, AppError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { workflows, client })
  }

  /// The endpoint of the workflow named in the notification payload, if it has one.
  pub async fn endpoint_for(&self, notification: &Notification) -> Result<Option<Url>, AppError> {
    let workflow_id = match notification.payload()?.workflow_id {
      None => return Ok(None),
      Some(workflow_id) => workflow_id,
    };
    let endpoint = self
      .workflows
      .select_workflow(&workflow_id)
      .await?
      .and_then(|workflow| workflow.notification_url);
    match endpoint {
      None => Ok(None),
      Some(endpoint) => Ok(Some(Url::parse(&endpoint)?)),
    }
  }

  /// Posts the notification as JSON. Returns whether a request was sent.
  #[instrument(level = "debug", skip_all, fields(notification_id = %notification.id), err)]
  pub async fn deliver(&self, notification: &Notification) -> Result<bool, AppError> {
    let endpoint = match self.endpoint_for(notification).await? {
      None => {
        trace!("no endpoint for notification {}", notification.id);
        return Ok(false);
      },
      Some(endpoint) => endpoint,
    };
    let resp = self
      .client
      .post(endpoint.clone())
      .json(notification)
      .send()
      .await?;
    if !resp.status().is_success() {
      return Err(AppError::Unhandled(format!(
        "webhook {} answered {}",
        endpoint,
        resp.status()
      )));
    }
    Ok(true)
  }

  /// Relays until the channel closes.
  pub async fn run(self, mut rx: broadcast::Receiver<Notification>) {
    info!("notification webhook relay started");
    loop {
      match rx.recv().await {
        Ok(notification) => {
          if let Err(err) = self.deliver(&notification).await {
            error!(
              "fail to deliver notification {} to webhook: {}",
              notification.id, err
            );
          }
        },
        Err(RecvError::Lagged(skipped)) => {
          warn!("webhook relay lagged, {} notifications skipped", skipped);
        },
        Err(RecvError::Closed) => break,
      }
    }
    info!("notification webhook relay stopped");
  }
}
