use std::collections::{HashMap, HashSet};

use app_error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use database_entity::dto::{
  MembershipStatus, NewMembership, NewNotification, NewWorkflow, Notification, UserProfile,
  Workflow, WorkflowChangeset, WorkflowMember, WorkflowMembership,
};
use database_entity::resource::{CalendarEvent, Contact, Deal, Debt, Task, WorkflowScope};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::store::{NotificationStore, ResourceStore, WorkflowStore};

/// Store operations that can be made to fail once with [MemStore::fail_next].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
  InsertWorkflow,
  SelectWorkflows,
  UpdateWorkflow,
  DeleteWorkflow,
  InsertMembership,
  UpdateMembershipStatus,
  DeleteMembership,
  InsertNotification,
  SelectNotifications,
  MarkNotificationRead,
  SelectResources,
}

/// Which resource collection was read, and for which scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceQuery {
  Contacts(WorkflowScope),
  Deals(WorkflowScope),
  Tasks(WorkflowScope),
  Events(WorkflowScope),
  Debts(WorkflowScope),
}

#[derive(Default)]
struct Tables {
  users: HashMap<Uuid, UserProfile>,
  workflows: Vec<Workflow>,
  memberships: Vec<WorkflowMembership>,
  notifications: Vec<Notification>,
  contacts: Vec<Contact>,
  deals: Vec<Deal>,
  tasks: Vec<Task>,
  events: Vec<CalendarEvent>,
  debts: Vec<Debt>,
  failures: HashSet<StoreOp>,
  resource_queries: Vec<ResourceQuery>,
}

impl Tables {
  fn check(&mut self, op: StoreOp) -> Result<(), AppError> {
    if self.failures.remove(&op) {
      return Err(AppError::StoreFailure(format!("injected failure: {:?}", op)));
    }
    Ok(())
  }

  fn is_accepted_member(&self, workflow_id: &Uuid, user_id: &Uuid) -> bool {
    self.memberships.iter().any(|m| {
      &m.workflow_id == workflow_id
        && &m.user_id == user_id
        && m.status == MembershipStatus::Accepted
    })
  }

  fn in_scope(
    &self,
    owner: &Uuid,
    workflow_id: Option<Uuid>,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> bool {
    match scope {
      None => workflow_id.is_none() && owner == user_id,
      Some(scope) => workflow_id == Some(scope) && self.is_accepted_member(&scope, user_id),
    }
  }
}

/// In-memory implementation of the store contract, enforcing the same uniqueness and
/// cascade rules as the Postgres schema.
pub struct MemStore {
  tables: Mutex<Tables>,
  notify: broadcast::Sender<Notification>,
}

impl Default for MemStore {
  fn default() -> Self {
    Self::new()
  }
}

impl MemStore {
  pub fn new() -> Self {
    let (notify, _) = broadcast::channel(1000);
    Self {
      tables: Mutex::new(Tables::default()),
      notify,
    }
  }

  /// The next call of `op` fails with a store failure.
  pub fn fail_next(&self, op: StoreOp) {
    self.tables.lock().failures.insert(op);
  }

  pub fn insert_user(&self, profile: UserProfile) {
    self.tables.lock().users.insert(profile.id, profile);
  }

  pub fn insert_contact(&self, contact: Contact) {
    self.tables.lock().contacts.push(contact);
  }

  pub fn insert_deal(&self, deal: Deal) {
    self.tables.lock().deals.push(deal);
  }

  pub fn insert_task(&self, task: Task) {
    self.tables.lock().tasks.push(task);
  }

  pub fn insert_event(&self, event: CalendarEvent) {
    self.tables.lock().events.push(event);
  }

  pub fn insert_debt(&self, debt: Debt) {
    self.tables.lock().debts.push(debt);
  }

  pub fn workflows(&self) -> Vec<Workflow> {
    self.tables.lock().workflows.clone()
  }

  pub fn memberships(&self) -> Vec<WorkflowMembership> {
    self.tables.lock().memberships.clone()
  }

  pub fn notifications(&self) -> Vec<Notification> {
    self.tables.lock().notifications.clone()
  }

  pub fn contacts(&self) -> Vec<Contact> {
    self.tables.lock().contacts.clone()
  }

  /// Resource reads in the order they happened.
  pub fn resource_queries(&self) -> Vec<ResourceQuery> {
    self.tables.lock().resource_queries.clone()
  }

  pub fn clear_resource_queries(&self) {
    self.tables.lock().resource_queries.clear();
  }

  /// Pushes a notification to subscribers without storing it, as a realtime channel that
  /// replays a row would.
  pub fn publish(&self, notification: Notification) {
    let _ = self.notify.send(notification);
  }
}

#[async_trait]
impl WorkflowStore for MemStore {
  async fn insert_workflow(&self, params: &NewWorkflow) -> Result<Workflow, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::InsertWorkflow)?;
    if tables
      .workflows
      .iter()
      .any(|w| w.share_code == params.share_code)
    {
      return Err(AppError::StoreFailure(format!(
        "duplicate key value violates unique constraint \"workflows_share_code_key\": {}",
        params.share_code
      )));
    }
    let workflow = Workflow {
      id: Uuid::new_v4(),
      name: params.name.clone(),
      creator_id: params.creator_id,
      share_code: params.share_code.clone(),
      shared_resources: params.shared_resources.clone(),
      notification_url: None,
      created_at: Utc::now(),
    };
    tables.workflows.push(workflow.clone());
    Ok(workflow)
  }

  async fn select_workflows_for_user(&self, user_id: &Uuid) -> Result<Vec<Workflow>, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::SelectWorkflows)?;
    let workflow_ids = tables
      .memberships
      .iter()
      .filter(|m| &m.user_id == user_id && m.status != MembershipStatus::Declined)
      .map(|m| m.workflow_id)
      .collect::<HashSet<_>>();
    Ok(
      tables
        .workflows
        .iter()
        .filter(|w| workflow_ids.contains(&w.id))
        .cloned()
        .collect(),
    )
  }

  async fn find_workflow_by_share_code(
    &self,
    share_code: &str,
  ) -> Result<Option<Workflow>, AppError> {
    let tables = self.tables.lock();
    Ok(
      tables
        .workflows
        .iter()
        .find(|w| w.share_code == share_code)
        .cloned(),
    )
  }

  async fn select_workflow(&self, workflow_id: &Uuid) -> Result<Option<Workflow>, AppError> {
    let tables = self.tables.lock();
    Ok(tables.workflows.iter().find(|w| &w.id == workflow_id).cloned())
  }

  async fn update_workflow(
    &self,
    workflow_id: &Uuid,
    changeset: &WorkflowChangeset,
  ) -> Result<Workflow, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::UpdateWorkflow)?;
    let workflow = tables
      .workflows
      .iter_mut()
      .find(|w| &w.id == workflow_id)
      .ok_or_else(|| AppError::RecordNotFound(format!("workflow {}", workflow_id)))?;
    if let Some(name) = &changeset.name {
      workflow.name = name.clone();
    }
    if let Some(tags) = &changeset.shared_resources {
      workflow.shared_resources = tags.clone();
    }
    if let Some(url) = &changeset.notification_url {
      workflow.notification_url = if url.is_empty() {
        None
      } else {
        Some(url.clone())
      };
    }
    Ok(workflow.clone())
  }

  async fn delete_workflow(&self, workflow_id: &Uuid) -> Result<(), AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::DeleteWorkflow)?;
    tables.workflows.retain(|w| &w.id != workflow_id);
    tables.memberships.retain(|m| &m.workflow_id != workflow_id);

    let detached = Some(*workflow_id);
    for contact in tables.contacts.iter_mut().filter(|r| r.workflow_id == detached) {
      contact.workflow_id = None;
    }
    for deal in tables.deals.iter_mut().filter(|r| r.workflow_id == detached) {
      deal.workflow_id = None;
    }
    for task in tables.tasks.iter_mut().filter(|r| r.workflow_id == detached) {
      task.workflow_id = None;
    }
    for event in tables.events.iter_mut().filter(|r| r.workflow_id == detached) {
      event.workflow_id = None;
    }
    for debt in tables.debts.iter_mut().filter(|r| r.workflow_id == detached) {
      debt.workflow_id = None;
    }
    Ok(())
  }

  async fn insert_membership(
    &self,
    params: &NewMembership,
  ) -> Result<WorkflowMembership, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::InsertMembership)?;
    if tables
      .memberships
      .iter()
      .any(|m| m.workflow_id == params.workflow_id && m.user_id == params.user_id)
    {
      return Err(AppError::StoreFailure(
        "duplicate key value violates unique constraint \"workflow_members_workflow_id_user_id_key\""
          .to_string(),
      ));
    }
    if !tables.workflows.iter().any(|w| w.id == params.workflow_id) {
      return Err(AppError::StoreFailure(format!(
        "insert violates foreign key constraint: workflow {} does not exist",
        params.workflow_id
      )));
    }
    let membership = WorkflowMembership {
      id: Uuid::new_v4(),
      workflow_id: params.workflow_id,
      user_id: params.user_id,
      role: params.role,
      status: params.status,
      created_at: Utc::now(),
    };
    tables.memberships.push(membership.clone());
    Ok(membership)
  }

  async fn select_membership(
    &self,
    workflow_id: &Uuid,
    user_id: &Uuid,
  ) -> Result<Option<WorkflowMembership>, AppError> {
    let tables = self.tables.lock();
    Ok(
      tables
        .memberships
        .iter()
        .find(|m| &m.workflow_id == workflow_id && &m.user_id == user_id)
        .cloned(),
    )
  }

  async fn select_membership_by_id(
    &self,
    membership_id: &Uuid,
  ) -> Result<Option<WorkflowMembership>, AppError> {
    let tables = self.tables.lock();
    Ok(
      tables
        .memberships
        .iter()
        .find(|m| &m.id == membership_id)
        .cloned(),
    )
  }

  async fn update_membership_status(
    &self,
    membership_id: &Uuid,
    status: MembershipStatus,
  ) -> Result<WorkflowMembership, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::UpdateMembershipStatus)?;
    let membership = tables
      .memberships
      .iter_mut()
      .find(|m| &m.id == membership_id)
      .ok_or_else(|| AppError::RecordNotFound(format!("membership {}", membership_id)))?;
    membership.status = status;
    Ok(membership.clone())
  }

  async fn delete_membership(&self, membership_id: &Uuid) -> Result<(), AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::DeleteMembership)?;
    tables.memberships.retain(|m| &m.id != membership_id);
    Ok(())
  }

  async fn select_members(&self, workflow_id: &Uuid) -> Result<Vec<WorkflowMember>, AppError> {
    let tables = self.tables.lock();
    Ok(
      tables
        .memberships
        .iter()
        .filter(|m| &m.workflow_id == workflow_id)
        .map(|m| WorkflowMember {
          membership: m.clone(),
          user: tables.users.get(&m.user_id).cloned(),
        })
        .collect(),
    )
  }
}

#[async_trait]
impl NotificationStore for MemStore {
  async fn insert_notification(
    &self,
    params: &NewNotification,
  ) -> Result<Notification, AppError> {
    let notification = {
      let mut tables = self.tables.lock();
      tables.check(StoreOp::InsertNotification)?;
      let notification = Notification {
        id: Uuid::new_v4(),
        user_id: params.user_id,
        kind: params.kind.clone(),
        content: params.content.clone(),
        data: serde_json::to_value(&params.data)?,
        read: false,
        created_at: Utc::now(),
      };
      tables.notifications.push(notification.clone());
      notification
    };
    let _ = self.notify.send(notification.clone());
    Ok(notification)
  }

  async fn select_notifications(&self, user_id: &Uuid) -> Result<Vec<Notification>, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::SelectNotifications)?;
    let mut notifications = tables
      .notifications
      .iter()
      .filter(|n| &n.user_id == user_id)
      .cloned()
      .collect::<Vec<_>>();
    // Stable sort keeps insertion order for equal timestamps, reversed for newest first.
    notifications.reverse();
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(notifications)
  }

  async fn mark_notification_read(&self, notification_id: &Uuid) -> Result<(), AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::MarkNotificationRead)?;
    if let Some(notification) = tables
      .notifications
      .iter_mut()
      .find(|n| &n.id == notification_id)
    {
      notification.read = true;
    }
    Ok(())
  }

  async fn mark_all_notifications_read(&self, user_id: &Uuid) -> Result<u64, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::MarkNotificationRead)?;
    let mut updated = 0;
    for notification in tables
      .notifications
      .iter_mut()
      .filter(|n| &n.user_id == user_id && !n.read)
    {
      notification.read = true;
      updated += 1;
    }
    Ok(updated)
  }

  fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
    self.notify.subscribe()
  }
}

#[async_trait]
impl ResourceStore for MemStore {
  async fn select_contacts(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<Contact>, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::SelectResources)?;
    tables.resource_queries.push(ResourceQuery::Contacts(scope));
    Ok(
      tables
        .contacts
        .iter()
        .filter(|r| tables.in_scope(&r.user_id, r.workflow_id, user_id, scope))
        .cloned()
        .collect(),
    )
  }

  async fn select_deals(&self, user_id: &Uuid, scope: WorkflowScope) -> Result<Vec<Deal>, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::SelectResources)?;
    tables.resource_queries.push(ResourceQuery::Deals(scope));
    Ok(
      tables
        .deals
        .iter()
        .filter(|r| tables.in_scope(&r.user_id, r.workflow_id, user_id, scope))
        .cloned()
        .collect(),
    )
  }

  async fn select_tasks(&self, user_id: &Uuid, scope: WorkflowScope) -> Result<Vec<Task>, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::SelectResources)?;
    tables.resource_queries.push(ResourceQuery::Tasks(scope));
    Ok(
      tables
        .tasks
        .iter()
        .filter(|r| tables.in_scope(&r.user_id, r.workflow_id, user_id, scope))
        .cloned()
        .collect(),
    )
  }

  async fn select_events(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<CalendarEvent>, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::SelectResources)?;
    tables.resource_queries.push(ResourceQuery::Events(scope));
    Ok(
      tables
        .events
        .iter()
        .filter(|r| tables.in_scope(&r.user_id, r.workflow_id, user_id, scope))
        .cloned()
        .collect(),
    )
  }

  async fn select_debts(&self, user_id: &Uuid, scope: WorkflowScope) -> Result<Vec<Debt>, AppError> {
    let mut tables = self.tables.lock();
    tables.check(StoreOp::SelectResources)?;
    tables.resource_queries.push(ResourceQuery::Debts(scope));
    Ok(
      tables
        .debts
        .iter()
        .filter(|r| tables.in_scope(&r.user_id, r.workflow_id, user_id, scope))
        .cloned()
        .collect(),
    )
  }
}
