use std::sync::Arc;

use app_error::AppError;
use database_entity::dto::{
  CreateWorkflowParams, Notification, ResourceTag, Workflow, WorkflowChangeset, WorkflowMember,
  WorkflowMembership,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{instrument, trace, warn};
use uuid::Uuid;
use validator::Validate;

use crate::biz::notification::subscription::NotificationSubscription;
use crate::biz::workflow::ops::WorkflowService;
use crate::biz::workflow::visibility::is_visible;

#[derive(Debug, Default)]
struct SessionState {
  user_id: Option<Uuid>,
  workflows: Vec<Workflow>,
  /// `None` is the personal scope.
  active: Option<Workflow>,
  notifications: Vec<Notification>,
}

/// Session-scoped owner of the workflow list, the active workflow and the notification
/// list. State only changes through the operations below; each one delegates to the
/// [WorkflowService] and patches memory after the store call succeeds, so a failed call
/// leaves the previous state untouched.
pub struct WorkflowSession {
  service: WorkflowService,
  state: Arc<RwLock<SessionState>>,
  scope_tx: Arc<watch::Sender<Option<Uuid>>>,
  subscription: Mutex<Option<JoinHandle<()>>>,
}

impl WorkflowSession {
  pub fn new(service: WorkflowService) -> Self {
    let (scope_tx, _) = watch::channel(None);
    Self {
      service,
      state: Arc::new(RwLock::new(SessionState::default())),
      scope_tx: Arc::new(scope_tx),
      subscription: Mutex::new(None),
    }
  }

  pub fn service(&self) -> &WorkflowService {
    &self.service
  }

  /// Opens the notification subscription for the signed-in user, then loads the workflow
  /// and notification lists. Starting again replaces the previous subscription. The session
  /// ends by itself once the user signs out.
  #[instrument(level = "debug", skip(self), err)]
  pub async fn start(&self) -> Result<(), AppError> {
    let user = self.service.auth().require_user()?;
    self.release_subscription();
    {
      let mut state = self.state.write();
      if state.user_id != Some(user.id) {
        *state = SessionState {
          user_id: Some(user.id),
          ..Default::default()
        };
        publish_scope(&self.scope_tx, None);
      }
    }

    let handle = tokio::spawn(follow_notifications(
      self.service.subscribe_notifications(user.id),
      self.service.auth().subscribe(),
      self.state.clone(),
      self.scope_tx.clone(),
    ));
    *self.subscription.lock() = Some(handle);

    let (workflows, loaded) = tokio::try_join!(
      self.service.list_workflows(),
      self.service.list_notifications()
    )?;
    let mut state = self.state.write();
    if state.user_id != Some(user.id) {
      return Err(AppError::AuthenticationRequired(
        "signed out while the session was loading".to_string(),
      ));
    }
    state.workflows = workflows;
    // rows pushed while the lists were loading are kept unless the load already has them
    let mut notifications = std::mem::take(&mut state.notifications)
      .into_iter()
      .filter(|pushed| !loaded.iter().any(|row| row.id == pushed.id))
      .collect::<Vec<_>>();
    notifications.extend(loaded);
    state.notifications = notifications;
    Ok(())
  }

  /// Releases the subscription and forgets everything loaded for the user.
  pub fn end(&self) {
    self.release_subscription();
    *self.state.write() = SessionState::default();
    publish_scope(&self.scope_tx, None);
  }

  pub fn is_subscribed(&self) -> bool {
    self
      .subscription
      .lock()
      .as_ref()
      .map(|handle| !handle.is_finished())
      .unwrap_or(false)
  }

  fn release_subscription(&self) {
    if let Some(handle) = self.subscription.lock().take() {
      handle.abort();
    }
  }

  /// Follows the active workflow id; `None` is the personal scope.
  pub fn subscribe_scope(&self) -> watch::Receiver<Option<Uuid>> {
    self.scope_tx.subscribe()
  }

  pub fn workflows(&self) -> Vec<Workflow> {
    self.state.read().workflows.clone()
  }

  pub fn active_workflow(&self) -> Option<Workflow> {
    self.state.read().active.clone()
  }

  pub fn active_workflow_id(&self) -> Option<Uuid> {
    self.state.read().active.as_ref().map(|workflow| workflow.id)
  }

  pub fn notifications(&self) -> Vec<Notification> {
    self.state.read().notifications.clone()
  }

  pub fn unread_count(&self) -> usize {
    self
      .state
      .read()
      .notifications
      .iter()
      .filter(|notification| !notification.read)
      .count()
  }

  /// Whether widgets for `tag` are shown under the active workflow.
  pub fn is_visible(&self, tag: ResourceTag) -> bool {
    is_visible(tag, self.state.read().active.as_ref())
  }

  /// Stores the active workflow, `None` being the personal scope. No store call is made.
  pub fn switch_workflow(&self, workflow: Option<Workflow>) {
    let workflow_id = workflow.as_ref().map(|workflow| workflow.id);
    self.state.write().active = workflow;
    publish_scope(&self.scope_tx, workflow_id);
  }

  /// Re-reads the workflow list. On failure the previous list is kept.
  pub async fn reload_workflows(&self) -> Result<(), AppError> {
    let workflows = self.service.list_workflows().await?;
    self.state.write().workflows = workflows;
    Ok(())
  }

  /// Re-reads the notification list. On failure the previous list is kept.
  pub async fn reload_notifications(&self) -> Result<(), AppError> {
    let notifications = self.service.list_notifications().await?;
    self.state.write().notifications = notifications;
    Ok(())
  }

  /// Creates the workflow and makes it the active one.
  pub async fn create_workflow(&self, params: CreateWorkflowParams) -> Result<Workflow, AppError> {
    params
      .validate()
      .map_err(|err| AppError::InvalidRequest(err.to_string()))?;
    let workflow = self.service.create_workflow(params).await?;
    self.state.write().workflows.push(workflow.clone());
    self.switch_workflow(Some(workflow.clone()));
    Ok(workflow)
  }

  /// Sends a join request. The workflow only shows up once the creator accepts it and the
  /// list is reloaded.
  pub async fn join_workflow(&self, share_code: &str) -> Result<WorkflowMembership, AppError> {
    self.service.join_workflow(share_code).await
  }

  pub async fn accept_join_request(
    &self,
    notification: &Notification,
  ) -> Result<WorkflowMembership, AppError> {
    let membership = self.service.accept_join_request(notification).await?;
    self.mark_read_locally(&notification.id);
    if let Err(err) = self.reload_notifications().await {
      warn!("fail to reload notifications after accepting a join request: {}", err);
    }
    Ok(membership)
  }

  pub async fn decline_join_request(
    &self,
    notification: &Notification,
  ) -> Result<WorkflowMembership, AppError> {
    let membership = self.service.decline_join_request(notification).await?;
    self.mark_read_locally(&notification.id);
    Ok(membership)
  }

  pub async fn delete_workflow(&self, workflow_id: &Uuid) -> Result<(), AppError> {
    self.service.delete_workflow(workflow_id).await?;
    let reset_scope = {
      let mut state = self.state.write();
      state.workflows.retain(|workflow| &workflow.id != workflow_id);
      let is_active = state
        .active
        .as_ref()
        .map(|workflow| &workflow.id == workflow_id)
        .unwrap_or(false);
      if is_active {
        state.active = None;
      }
      is_active
    };
    if reset_scope {
      publish_scope(&self.scope_tx, None);
    }
    Ok(())
  }

  pub async fn update_workflow(
    &self,
    workflow_id: &Uuid,
    changeset: WorkflowChangeset,
  ) -> Result<Workflow, AppError> {
    changeset
      .validate()
      .map_err(|err| AppError::InvalidRequest(err.to_string()))?;
    let updated = self.service.update_workflow(workflow_id, changeset).await?;
    let mut state = self.state.write();
    for workflow in state.workflows.iter_mut() {
      if workflow.id == updated.id {
        *workflow = updated.clone();
      }
    }
    if let Some(active) = state.active.as_mut() {
      if active.id == updated.id {
        *active = updated.clone();
      }
    }
    Ok(updated)
  }

  pub async fn list_members(&self, workflow_id: &Uuid) -> Result<Vec<WorkflowMember>, AppError> {
    self.service.list_members(workflow_id).await
  }

  /// Removes a member from a workflow the signed-in user created. The creator's own
  /// membership cannot be removed.
  pub async fn remove_member(
    &self,
    workflow: &Workflow,
    member: &WorkflowMembership,
  ) -> Result<(), AppError> {
    let user = self.service.auth().require_user()?;
    if !workflow.is_creator(&user.id) {
      return Err(AppError::NotEnoughPermissions {
        user: user.id.to_string(),
        action: format!("remove members of workflow {}", workflow.id),
      });
    }
    if member.workflow_id != workflow.id {
      return Err(AppError::InvalidRequest(format!(
        "membership {} does not belong to workflow {}",
        member.id, workflow.id
      )));
    }
    if workflow.is_creator(&member.user_id) {
      return Err(AppError::InvalidRequest(
        "the workflow creator cannot be removed".to_string(),
      ));
    }
    self.service.remove_member(&member.id).await
  }

  pub async fn mark_notification_read(&self, notification_id: &Uuid) -> Result<(), AppError> {
    self.service.mark_notification_read(notification_id).await?;
    self.mark_read_locally(notification_id);
    Ok(())
  }

  pub async fn mark_all_notifications_read(&self) -> Result<u64, AppError> {
    let updated = self.service.mark_all_notifications_read().await?;
    for notification in self.state.write().notifications.iter_mut() {
      notification.read = true;
    }
    Ok(updated)
  }

  fn mark_read_locally(&self, notification_id: &Uuid) {
    if let Some(notification) = self
      .state
      .write()
      .notifications
      .iter_mut()
      .find(|notification| &notification.id == notification_id)
    {
      notification.read = true;
    }
  }
}

fn publish_scope(scope_tx: &watch::Sender<Option<Uuid>>, workflow_id: Option<Uuid>) {
  scope_tx.send_if_modified(|current| {
    if *current == workflow_id {
      false
    } else {
      *current = workflow_id;
      true
    }
  });
}

/// Prepends pushed notifications until the subscription closes or `user_rx` stops naming
/// the subscribed user. In the latter case the session state is reset.
async fn follow_notifications(
  mut subscription: NotificationSubscription,
  mut user_rx: watch::Receiver<Option<Uuid>>,
  state: Arc<RwLock<SessionState>>,
  scope_tx: Arc<watch::Sender<Option<Uuid>>>,
) {
  let user_id = *subscription.user_id();
  let mut signed_in = *user_rx.borrow_and_update() == Some(user_id);
  while signed_in {
    tokio::select! {
      notification = subscription.recv() => match notification {
        Some(notification) => {
          trace!("push notification {} for {}", notification.id, notification.user_id);
          state.write().notifications.insert(0, notification);
        },
        None => return,
      },
      changed = user_rx.changed() => {
        signed_in = changed.is_ok() && *user_rx.borrow_and_update() == Some(user_id);
      },
    }
  }

  trace!("user {} signed out, ending workflow session", user_id);
  *state.write() = SessionState::default();
  publish_scope(&scope_tx, None);
}

impl Drop for WorkflowSession {
  fn drop(&mut self) {
    self.release_subscription();
  }
}
