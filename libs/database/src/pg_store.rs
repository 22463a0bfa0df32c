use std::sync::Arc;

use app_error::AppError;
use async_trait::async_trait;
use database_entity::dto::{
  MembershipStatus, NewMembership, NewNotification, NewWorkflow, Notification, Workflow,
  WorkflowChangeset, WorkflowMember, WorkflowMembership,
};
use database_entity::resource::{CalendarEvent, Contact, Deal, Debt, Task, WorkflowScope};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::instrument;
use uuid::Uuid;

use crate::listener::NotificationListener;
use crate::store::{NotificationStore, ResourceStore, WorkflowStore};
use crate::{notification, resource, workflow};

/// Postgres-backed store. Inserted notifications reach subscribers through the table's
/// insert trigger and a `LISTEN` on the configured channel.
#[derive(Clone)]
pub struct PgStore {
  pg_pool: PgPool,
  listener: Arc<NotificationListener>,
}

impl PgStore {
  pub async fn new(pg_pool: PgPool, notification_channel: &str) -> Result<Self, AppError> {
    let listener = NotificationListener::new(&pg_pool, notification_channel).await?;
    Ok(Self {
      pg_pool,
      listener: Arc::new(listener),
    })
  }

  pub fn pg_pool(&self) -> &PgPool {
    &self.pg_pool
  }
}

#[async_trait]
impl WorkflowStore for PgStore {
  #[instrument(level = "debug", skip_all, err)]
  async fn insert_workflow(&self, params: &NewWorkflow) -> Result<Workflow, AppError> {
    workflow::insert_workflow(&self.pg_pool, params).await
  }

  async fn select_workflows_for_user(&self, user_id: &Uuid) -> Result<Vec<Workflow>, AppError> {
    workflow::select_workflows_for_user(&self.pg_pool, user_id).await
  }

  async fn find_workflow_by_share_code(
    &self,
    share_code: &str,
  ) -> Result<Option<Workflow>, AppError> {
    workflow::select_workflow_by_share_code(&self.pg_pool, share_code).await
  }

  async fn select_workflow(&self, workflow_id: &Uuid) -> Result<Option<Workflow>, AppError> {
    workflow::select_workflow_by_id(&self.pg_pool, workflow_id).await
  }

  #[instrument(level = "debug", skip(self, changeset), err)]
  async fn update_workflow(
    &self,
    workflow_id: &Uuid,
    changeset: &WorkflowChangeset,
  ) -> Result<Workflow, AppError> {
    workflow::update_workflow(&self.pg_pool, workflow_id, changeset).await
  }

  #[instrument(level = "debug", skip(self), err)]
  async fn delete_workflow(&self, workflow_id: &Uuid) -> Result<(), AppError> {
    workflow::delete_workflow(&self.pg_pool, workflow_id).await
  }

  #[instrument(level = "debug", skip_all, err)]
  async fn insert_membership(
    &self,
    params: &NewMembership,
  ) -> Result<WorkflowMembership, AppError> {
    workflow::insert_workflow_member(&self.pg_pool, params).await
  }

  async fn select_membership(
    &self,
    workflow_id: &Uuid,
    user_id: &Uuid,
  ) -> Result<Option<WorkflowMembership>, AppError> {
    workflow::select_workflow_membership(&self.pg_pool, workflow_id, user_id).await
  }

  async fn select_membership_by_id(
    &self,
    membership_id: &Uuid,
  ) -> Result<Option<WorkflowMembership>, AppError> {
    workflow::select_workflow_membership_by_id(&self.pg_pool, membership_id).await
  }

  #[instrument(level = "debug", skip(self), err)]
  async fn update_membership_status(
    &self,
    membership_id: &Uuid,
    status: MembershipStatus,
  ) -> Result<WorkflowMembership, AppError> {
    workflow::update_workflow_member_status(&self.pg_pool, membership_id, status).await
  }

  #[instrument(level = "debug", skip(self), err)]
  async fn delete_membership(&self, membership_id: &Uuid) -> Result<(), AppError> {
    workflow::delete_workflow_member(&self.pg_pool, membership_id).await
  }

  async fn select_members(&self, workflow_id: &Uuid) -> Result<Vec<WorkflowMember>, AppError> {
    workflow::select_workflow_members(&self.pg_pool, workflow_id).await
  }
}

#[async_trait]
impl NotificationStore for PgStore {
  #[instrument(level = "debug", skip_all, err)]
  async fn insert_notification(
    &self,
    params: &NewNotification,
  ) -> Result<Notification, AppError> {
    notification::insert_notification(&self.pg_pool, params).await
  }

  async fn select_notifications(&self, user_id: &Uuid) -> Result<Vec<Notification>, AppError> {
    notification::select_notifications_for_user(&self.pg_pool, user_id).await
  }

  async fn mark_notification_read(&self, notification_id: &Uuid) -> Result<(), AppError> {
    notification::update_notification_read(&self.pg_pool, notification_id).await
  }

  async fn mark_all_notifications_read(&self, user_id: &Uuid) -> Result<u64, AppError> {
    notification::update_all_notifications_read(&self.pg_pool, user_id).await
  }

  fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
    self.listener.subscribe()
  }
}

#[async_trait]
impl ResourceStore for PgStore {
  async fn select_contacts(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<Contact>, AppError> {
    resource::select_contacts(&self.pg_pool, user_id, scope).await
  }

  async fn select_deals(&self, user_id: &Uuid, scope: WorkflowScope) -> Result<Vec<Deal>, AppError> {
    resource::select_deals(&self.pg_pool, user_id, scope).await
  }

  async fn select_tasks(&self, user_id: &Uuid, scope: WorkflowScope) -> Result<Vec<Task>, AppError> {
    resource::select_tasks(&self.pg_pool, user_id, scope).await
  }

  async fn select_events(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<CalendarEvent>, AppError> {
    resource::select_events(&self.pg_pool, user_id, scope).await
  }

  async fn select_debts(&self, user_id: &Uuid, scope: WorkflowScope) -> Result<Vec<Debt>, AppError> {
    resource::select_debts(&self.pg_pool, user_id, scope).await
  }
}
