use std::sync::Arc;

use app_error::AppError;
use database::store::{NotificationStore, WorkflowStore};
use database_entity::dto::{
  CreateWorkflowParams, MembershipStatus, NewMembership, NewNotification, NewWorkflow,
  Notification, NotificationType, Workflow, WorkflowChangeset, WorkflowMember,
  WorkflowMembership,
};
use tracing::{instrument, trace, warn};
use uuid::Uuid;

use crate::biz::authentication::{AuthState, SessionUser};
use crate::biz::notification::subscription::NotificationSubscription;
use crate::biz::workflow::share_code::{generate_share_code, normalize_share_code};
use crate::biz::workflow::steps::{
  WriteSteps, INSERT_CREATOR_MEMBERSHIP, INSERT_JOIN_MEMBERSHIP, INSERT_WORKFLOW,
  MARK_REQUEST_READ, NOTIFY_CREATOR, NOTIFY_REQUESTER, UPDATE_MEMBERSHIP_STATUS,
};

/// Stateless façade over the workflow and notification relations. It is the only
/// component that writes workflows, memberships and notifications.
#[derive(Clone)]
pub struct WorkflowService {
  workflows: Arc<dyn WorkflowStore>,
  notifications: Arc<dyn NotificationStore>,
  auth: AuthState,
}

impl WorkflowService {
  pub fn new<S>(store: Arc<S>, auth: AuthState) -> Self
  where
    S: WorkflowStore + NotificationStore,
  {
    Self {
      workflows: store.clone(),
      notifications: store,
      auth,
    }
  }

  pub fn with_stores(
    workflows: Arc<dyn WorkflowStore>,
    notifications: Arc<dyn NotificationStore>,
    auth: AuthState,
  ) -> Self {
    Self {
      workflows,
      notifications,
      auth,
    }
  }

  pub fn auth(&self) -> &AuthState {
    &self.auth
  }

  fn require_user(&self) -> Result<SessionUser, AppError> {
    self.auth.require_user()
  }

  /// Workflows where the current user holds a pending or accepted membership.
  #[instrument(level = "debug", skip(self), err)]
  pub async fn list_workflows(&self) -> Result<Vec<Workflow>, AppError> {
    let user = self.require_user()?;
    self.workflows.select_workflows_for_user(&user.id).await
  }

  pub async fn get_workflow(&self, workflow_id: &Uuid) -> Result<Workflow, AppError> {
    self
      .workflows
      .select_workflow(workflow_id)
      .await?
      .ok_or_else(|| AppError::RecordNotFound(format!("workflow {} not found", workflow_id)))
  }

  /// Inserts the workflow, then the creator's accepted admin membership. `params` is
  /// expected to be validated by the caller.
  #[instrument(level = "debug", skip(self), err)]
  pub async fn create_workflow(&self, params: CreateWorkflowParams) -> Result<Workflow, AppError> {
    let user = self.require_user()?;
    let new_workflow = NewWorkflow {
      name: params.name,
      creator_id: user.id,
      share_code: generate_share_code(),
      shared_resources: params.shared_resources,
    };

    let mut steps = WriteSteps::new("create workflow");
    let workflow = match steps
      .run(INSERT_WORKFLOW, self.workflows.insert_workflow(&new_workflow))
      .await
    {
      Ok(workflow) => workflow,
      Err(err) => {
        self.log_share_code_collision(&new_workflow.share_code).await;
        return Err(err);
      },
    };

    steps
      .run(
        INSERT_CREATOR_MEMBERSHIP,
        self
          .workflows
          .insert_membership(&NewMembership::creator(&workflow)),
      )
      .await?;
    trace!(
      "workflow {} created with share code {}",
      workflow.id,
      workflow.share_code
    );
    Ok(workflow)
  }

  async fn log_share_code_collision(&self, share_code: &str) {
    if let Ok(Some(_)) = self.workflows.find_workflow_by_share_code(share_code).await {
      warn!("share code {} is already taken, the insert is not retried", share_code);
    }
  }

  /// Requests membership in the workflow owning `share_code`. The membership stays pending
  /// until the creator accepts it.
  #[instrument(level = "debug", skip(self), err)]
  pub async fn join_workflow(&self, share_code: &str) -> Result<WorkflowMembership, AppError> {
    let user = self.require_user()?;
    let share_code = normalize_share_code(share_code);
    let workflow = self
      .workflows
      .find_workflow_by_share_code(&share_code)
      .await?
      .ok_or(AppError::InvalidShareCode)?;

    if self
      .workflows
      .select_membership(&workflow.id, &user.id)
      .await?
      .is_some()
    {
      return Err(AppError::AlreadyMember);
    }

    let mut steps = WriteSteps::new("join workflow");
    let membership = steps
      .run(
        INSERT_JOIN_MEMBERSHIP,
        self
          .workflows
          .insert_membership(&NewMembership::join_request(workflow.id, user.id)),
      )
      .await?;

    let request = NewNotification::join_request(&workflow, user.id, &user.email, membership.id);
    steps
      .run(NOTIFY_CREATOR, self.notifications.insert_notification(&request))
      .await?;
    Ok(membership)
  }

  /// Accepts the membership a `join_request` notification refers to, notifies the requester
  /// and marks the request read, in that order. A request is answered once: the membership
  /// must still be pending.
  #[instrument(level = "debug", skip_all, fields(notification_id = %notification.id), err)]
  pub async fn accept_join_request(
    &self,
    notification: &Notification,
  ) -> Result<WorkflowMembership, AppError> {
    let pending = self.pending_join_request(notification).await?;
    let mut steps = WriteSteps::new("accept join request");
    let membership = steps
      .run(
        UPDATE_MEMBERSHIP_STATUS,
        self
          .workflows
          .update_membership_status(&pending.id, MembershipStatus::Accepted),
      )
      .await?;
    steps
      .run(
        NOTIFY_REQUESTER,
        self
          .notifications
          .insert_notification(&NewNotification::join_accepted(&membership)),
      )
      .await?;
    steps
      .run(
        MARK_REQUEST_READ,
        self.notifications.mark_notification_read(&notification.id),
      )
      .await?;
    Ok(membership)
  }

  /// Marks the referenced membership declined and the request read. The requester is not
  /// notified.
  #[instrument(level = "debug", skip_all, fields(notification_id = %notification.id), err)]
  pub async fn decline_join_request(
    &self,
    notification: &Notification,
  ) -> Result<WorkflowMembership, AppError> {
    let pending = self.pending_join_request(notification).await?;
    let mut steps = WriteSteps::new("decline join request");
    let membership = steps
      .run(
        UPDATE_MEMBERSHIP_STATUS,
        self
          .workflows
          .update_membership_status(&pending.id, MembershipStatus::Declined),
      )
      .await?;
    steps
      .run(
        MARK_REQUEST_READ,
        self.notifications.mark_notification_read(&notification.id),
      )
      .await?;
    Ok(membership)
  }

  async fn pending_join_request(
    &self,
    notification: &Notification,
  ) -> Result<WorkflowMembership, AppError> {
    let user = self.require_user()?;
    if notification.kind != NotificationType::JoinRequest {
      return Err(AppError::InvalidRequest(format!(
        "notification {} is a {} notification, not a join request",
        notification.id,
        notification.kind.as_str()
      )));
    }
    if notification.user_id != user.id {
      return Err(AppError::NotEnoughPermissions {
        user: user.id.to_string(),
        action: format!("answer join request {}", notification.id),
      });
    }
    if notification.read {
      return Err(AppError::InvalidRequest(format!(
        "join request {} was already answered",
        notification.id
      )));
    }

    let membership_id = notification.membership_id()?;
    let membership = self
      .workflows
      .select_membership_by_id(&membership_id)
      .await?
      .ok_or_else(|| {
        AppError::RecordNotFound(format!("membership {} not found", membership_id))
      })?;
    if membership.status != MembershipStatus::Pending {
      return Err(AppError::InvalidRequest(format!(
        "membership {} is already {}",
        membership.id,
        membership.status.as_str()
      )));
    }
    Ok(membership)
  }

  /// Every membership of the workflow with the member's display identity. Access is
  /// enforced by the store's row-level policies.
  pub async fn list_members(&self, workflow_id: &Uuid) -> Result<Vec<WorkflowMember>, AppError> {
    self.workflows.select_members(workflow_id).await
  }

  /// Hard-deletes a membership. Callers only offer this to the workflow creator and never
  /// against the creator's own membership.
  #[instrument(level = "debug", skip(self), err)]
  pub async fn remove_member(&self, membership_id: &Uuid) -> Result<(), AppError> {
    self.require_user()?;
    self.workflows.delete_membership(membership_id).await
  }

  /// Deletes the workflow. Memberships are removed with it and scoped resources fall back
  /// to their owner's personal space.
  #[instrument(level = "debug", skip(self), err)]
  pub async fn delete_workflow(&self, workflow_id: &Uuid) -> Result<(), AppError> {
    self.require_user()?;
    self.workflows.delete_workflow(workflow_id).await
  }

  #[instrument(level = "debug", skip(self), err)]
  pub async fn update_workflow(
    &self,
    workflow_id: &Uuid,
    changeset: WorkflowChangeset,
  ) -> Result<Workflow, AppError> {
    self.require_user()?;
    if changeset.is_empty() {
      return self.get_workflow(workflow_id).await;
    }
    self.workflows.update_workflow(workflow_id, &changeset).await
  }

  /// Notifications for the current user, newest first.
  #[instrument(level = "debug", skip(self), err)]
  pub async fn list_notifications(&self) -> Result<Vec<Notification>, AppError> {
    let user = self.require_user()?;
    self.notifications.select_notifications(&user.id).await
  }

  pub async fn mark_notification_read(&self, notification_id: &Uuid) -> Result<(), AppError> {
    self.require_user()?;
    self
      .notifications
      .mark_notification_read(notification_id)
      .await
  }

  /// Returns how many notifications were unread. Calling it again returns zero.
  #[instrument(level = "debug", skip(self), err)]
  pub async fn mark_all_notifications_read(&self) -> Result<u64, AppError> {
    let user = self.require_user()?;
    self
      .notifications
      .mark_all_notifications_read(&user.id)
      .await
  }

  /// Inserts a notification for any recipient, e.g. a task or debt reminder.
  #[instrument(level = "debug", skip(self), err)]
  pub async fn create_notification(
    &self,
    notification: NewNotification,
  ) -> Result<Notification, AppError> {
    self.require_user()?;
    self.notifications.insert_notification(&notification).await
  }

  /// Live notifications addressed to `user_id`.
  pub fn subscribe_notifications(&self, user_id: Uuid) -> NotificationSubscription {
    NotificationSubscription::new(self.notifications.subscribe_notifications(), user_id)
  }
}
