use std::str::FromStr;

use app_error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use database_entity::dto::{
  parse_resource_tags, MembershipStatus, Notification, NotificationType, UserProfile, Workflow,
  WorkflowMember, WorkflowMembership, WorkflowRole,
};
use database_entity::resource::{CalendarEvent, Contact, Deal, DealStage, Debt, DebtStatus, Task};
use sqlx::FromRow;
use uuid::Uuid;

/// Represent the row of the workflows table
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowRow {
  pub id: Uuid,
  pub name: String,
  pub creator_id: Uuid,
  pub share_code: String,
  pub shared_resources: Vec<String>,
  pub notification_url: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl From<WorkflowRow> for Workflow {
  fn from(value: WorkflowRow) -> Self {
    Self {
      id: value.id,
      name: value.name,
      creator_id: value.creator_id,
      share_code: value.share_code,
      shared_resources: parse_resource_tags(&value.shared_resources),
      notification_url: value.notification_url,
      created_at: value.created_at,
    }
  }
}

/// Represent the row of the workflow_members table
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowMembershipRow {
  pub id: Uuid,
  pub workflow_id: Uuid,
  pub user_id: Uuid,
  pub role: String,
  pub status: String,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<WorkflowMembershipRow> for WorkflowMembership {
  type Error = AppError;

  fn try_from(value: WorkflowMembershipRow) -> Result<Self, Self::Error> {
    Ok(Self {
      id: value.id,
      workflow_id: value.workflow_id,
      user_id: value.user_id,
      role: WorkflowRole::from_str(&value.role)?,
      status: MembershipStatus::from_str(&value.status)?,
      created_at: value.created_at,
    })
  }
}

/// A membership joined with the member's profile. The profile columns are null when the
/// user row is missing.
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowMemberRow {
  pub id: Uuid,
  pub workflow_id: Uuid,
  pub user_id: Uuid,
  pub role: String,
  pub status: String,
  pub created_at: DateTime<Utc>,
  pub profile_id: Option<Uuid>,
  pub email: Option<String>,
  pub full_name: Option<String>,
  pub avatar_url: Option<String>,
}

impl TryFrom<WorkflowMemberRow> for WorkflowMember {
  type Error = AppError;

  fn try_from(value: WorkflowMemberRow) -> Result<Self, Self::Error> {
    let user = value.profile_id.map(|id| UserProfile {
      id,
      email: value.email,
      full_name: value.full_name,
      avatar_url: value.avatar_url,
    });
    let membership = WorkflowMembershipRow {
      id: value.id,
      workflow_id: value.workflow_id,
      user_id: value.user_id,
      role: value.role,
      status: value.status,
      created_at: value.created_at,
    }
    .try_into()?;
    Ok(Self { membership, user })
  }
}

/// Represent the row of the notifications table
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
  pub id: Uuid,
  pub user_id: Uuid,
  #[sqlx(rename = "type")]
  pub kind: String,
  pub content: String,
  pub data: Option<serde_json::Value>,
  pub read: bool,
  pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
  fn from(value: NotificationRow) -> Self {
    Self {
      id: value.id,
      user_id: value.user_id,
      kind: NotificationType::from(value.kind.as_str()),
      content: value.content,
      data: value.data.unwrap_or(serde_json::Value::Null),
      read: value.read,
      created_at: value.created_at,
    }
  }
}

fn profile(
  id: Option<Uuid>,
  email: Option<String>,
  full_name: Option<String>,
  avatar_url: Option<String>,
) -> Option<UserProfile> {
  id.map(|id| UserProfile {
    id,
    email,
    full_name,
    avatar_url,
  })
}

#[derive(Debug, Clone, FromRow)]
pub struct ContactRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub workflow_id: Option<Uuid>,
  pub name: String,
  pub role: Option<String>,
  pub company: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub status: Option<String>,
  pub last_contact: Option<NaiveDate>,
  pub avatar: Option<String>,
  pub tags: Option<Vec<String>>,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub creator_id: Option<Uuid>,
  pub creator_email: Option<String>,
  pub creator_name: Option<String>,
  pub creator_avatar: Option<String>,
}

impl From<ContactRow> for Contact {
  fn from(value: ContactRow) -> Self {
    Self {
      id: value.id,
      user_id: value.user_id,
      workflow_id: value.workflow_id,
      name: value.name,
      role: value.role.unwrap_or_default(),
      company: value.company.unwrap_or_default(),
      email: value.email.unwrap_or_default(),
      phone: value.phone.unwrap_or_default(),
      status: value.status.unwrap_or_else(|| "New".to_string()),
      last_contact: value.last_contact,
      avatar: value.avatar,
      tags: value.tags.unwrap_or_default(),
      notes: value.notes,
      creator: profile(
        value.creator_id,
        value.creator_email,
        value.creator_name,
        value.creator_avatar,
      ),
      tasks: vec![],
      deals: vec![],
      created_at: value.created_at,
    }
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct DealRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub workflow_id: Option<Uuid>,
  pub title: String,
  pub client_name: Option<String>,
  pub amount: Option<String>,
  pub probability: Option<i32>,
  pub status: String,
  pub contact_id: Option<Uuid>,
  pub related_task_id: Option<Uuid>,
  pub reminder_date: Option<NaiveDate>,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub creator_id: Option<Uuid>,
  pub creator_email: Option<String>,
  pub creator_name: Option<String>,
  pub creator_avatar: Option<String>,
}

impl TryFrom<DealRow> for Deal {
  type Error = AppError;

  fn try_from(value: DealRow) -> Result<Self, Self::Error> {
    Ok(Self {
      id: value.id,
      user_id: value.user_id,
      workflow_id: value.workflow_id,
      title: value.title,
      client_name: value.client_name.unwrap_or_default(),
      amount: value.amount.unwrap_or_else(|| "$0".to_string()),
      probability: value.probability.unwrap_or(10),
      stage: DealStage::from_str(&value.status)?,
      contact_id: value.contact_id,
      related_task_id: value.related_task_id,
      reminder_date: value.reminder_date,
      notes: value.notes,
      owner: profile(
        value.creator_id,
        value.creator_email,
        value.creator_name,
        value.creator_avatar,
      ),
      created_at: value.created_at,
    })
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub workflow_id: Option<Uuid>,
  pub title: String,
  pub description: Option<String>,
  pub due_date: Option<NaiveDate>,
  pub reminder_time: Option<String>,
  pub priority: Option<String>,
  pub project: Option<String>,
  pub completed: bool,
  pub contact_id: Option<Uuid>,
  pub deal_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub creator_id: Option<Uuid>,
  pub creator_email: Option<String>,
  pub creator_name: Option<String>,
  pub creator_avatar: Option<String>,
}

impl From<TaskRow> for Task {
  fn from(value: TaskRow) -> Self {
    Self {
      id: value.id,
      user_id: value.user_id,
      workflow_id: value.workflow_id,
      title: value.title,
      description: value.description,
      due_date: value.due_date,
      reminder_time: value.reminder_time,
      priority: value.priority.unwrap_or_else(|| "medium".to_string()),
      project: value.project,
      completed: value.completed,
      contact_id: value.contact_id,
      deal_id: value.deal_id,
      assignee: profile(
        value.creator_id,
        value.creator_email,
        value.creator_name,
        value.creator_avatar,
      ),
      created_at: value.created_at,
    }
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub workflow_id: Option<Uuid>,
  pub title: String,
  pub description: Option<String>,
  pub date: DateTime<Utc>,
  pub time: Option<String>,
  #[sqlx(rename = "type")]
  pub kind: Option<String>,
  pub contact_id: Option<Uuid>,
  pub deal_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub creator_id: Option<Uuid>,
  pub creator_email: Option<String>,
  pub creator_name: Option<String>,
  pub creator_avatar: Option<String>,
}

impl From<EventRow> for CalendarEvent {
  fn from(value: EventRow) -> Self {
    Self {
      id: value.id,
      user_id: value.user_id,
      workflow_id: value.workflow_id,
      title: value.title,
      description: value.description,
      date: value.date,
      time: value.time,
      kind: value.kind.unwrap_or_else(|| "meeting".to_string()),
      contact_id: value.contact_id,
      deal_id: value.deal_id,
      creator: profile(
        value.creator_id,
        value.creator_email,
        value.creator_name,
        value.creator_avatar,
      ),
      created_at: value.created_at,
    }
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct DebtRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub workflow_id: Option<Uuid>,
  pub borrower_name: String,
  pub amount_lent: Option<String>,
  pub amount_repaid: Option<String>,
  pub date_lent: DateTime<Utc>,
  pub reminder_date: Option<NaiveDate>,
  pub description: Option<String>,
  pub status: String,
  pub related_task_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<DebtRow> for Debt {
  type Error = AppError;

  fn try_from(value: DebtRow) -> Result<Self, Self::Error> {
    Ok(Self {
      id: value.id,
      user_id: value.user_id,
      workflow_id: value.workflow_id,
      borrower_name: value.borrower_name,
      amount_lent: value.amount_lent.unwrap_or_else(|| "$0".to_string()),
      amount_repaid: value.amount_repaid.unwrap_or_else(|| "$0".to_string()),
      date_lent: value.date_lent,
      reminder_date: value.reminder_date,
      description: value.description,
      status: DebtStatus::from_str(&value.status)?,
      related_task_id: value.related_task_id,
      created_at: value.created_at,
    })
  }
}
