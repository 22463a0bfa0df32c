use app_error::AppError;
use async_trait::async_trait;
use database_entity::dto::{
  MembershipStatus, NewMembership, NewNotification, NewWorkflow, Notification, Workflow,
  WorkflowChangeset, WorkflowMember, WorkflowMembership,
};
use database_entity::resource::{CalendarEvent, Contact, Deal, Debt, Task, WorkflowScope};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Workflows and memberships. Implementations must keep share codes unique and allow at
/// most one membership per (workflow, user) pair.
#[async_trait]
pub trait WorkflowStore: Send + Sync + 'static {
  async fn insert_workflow(&self, params: &NewWorkflow) -> Result<Workflow, AppError>;

  /// Workflows where the user holds a pending or accepted membership.
  async fn select_workflows_for_user(&self, user_id: &Uuid) -> Result<Vec<Workflow>, AppError>;

  /// Privileged lookup that ignores per-row access control.
  async fn find_workflow_by_share_code(
    &self,
    share_code: &str,
  ) -> Result<Option<Workflow>, AppError>;

  async fn select_workflow(&self, workflow_id: &Uuid) -> Result<Option<Workflow>, AppError>;

  async fn update_workflow(
    &self,
    workflow_id: &Uuid,
    changeset: &WorkflowChangeset,
  ) -> Result<Workflow, AppError>;

  /// Deletes the workflow together with its memberships. Resources scoped to it lose
  /// their workflow reference.
  async fn delete_workflow(&self, workflow_id: &Uuid) -> Result<(), AppError>;

  async fn insert_membership(&self, params: &NewMembership)
    -> Result<WorkflowMembership, AppError>;

  async fn select_membership(
    &self,
    workflow_id: &Uuid,
    user_id: &Uuid,
  ) -> Result<Option<WorkflowMembership>, AppError>;

  async fn select_membership_by_id(
    &self,
    membership_id: &Uuid,
  ) -> Result<Option<WorkflowMembership>, AppError>;

  async fn update_membership_status(
    &self,
    membership_id: &Uuid,
    status: MembershipStatus,
  ) -> Result<WorkflowMembership, AppError>;

  async fn delete_membership(&self, membership_id: &Uuid) -> Result<(), AppError>;

  async fn select_members(&self, workflow_id: &Uuid) -> Result<Vec<WorkflowMember>, AppError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
  async fn insert_notification(&self, params: &NewNotification)
    -> Result<Notification, AppError>;

  /// Notifications addressed to the user, newest first.
  async fn select_notifications(&self, user_id: &Uuid) -> Result<Vec<Notification>, AppError>;

  async fn mark_notification_read(&self, notification_id: &Uuid) -> Result<(), AppError>;

  /// Returns how many notifications flipped from unread to read.
  async fn mark_all_notifications_read(&self, user_id: &Uuid) -> Result<u64, AppError>;

  /// Every row inserted into the notifications relation, regardless of recipient.
  fn subscribe_notifications(&self) -> broadcast::Receiver<Notification>;
}

/// Domain resources, read through the (user, workflow scope) pair.
#[async_trait]
pub trait ResourceStore: Send + Sync + 'static {
  async fn select_contacts(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<Contact>, AppError>;

  async fn select_deals(&self, user_id: &Uuid, scope: WorkflowScope) -> Result<Vec<Deal>, AppError>;

  async fn select_tasks(&self, user_id: &Uuid, scope: WorkflowScope) -> Result<Vec<Task>, AppError>;

  async fn select_events(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<CalendarEvent>, AppError>;

  async fn select_debts(&self, user_id: &Uuid, scope: WorkflowScope) -> Result<Vec<Debt>, AppError>;
}
