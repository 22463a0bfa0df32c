use std::str::FromStr;

use app_error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::UserProfile;

/// Read scope of every domain resource query. `None` is the user's personal space.
pub type WorkflowScope = Option<Uuid>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
  pub id: Uuid,
  pub title: String,
  pub completed: bool,
  pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealSummary {
  pub id: Uuid,
  pub title: String,
  pub amount: String,
  pub stage: DealStage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
  pub id: Uuid,
  pub user_id: Uuid,
  pub workflow_id: Option<Uuid>,
  pub name: String,
  pub role: String,
  pub company: String,
  pub email: String,
  pub phone: String,
  pub status: String,
  pub last_contact: Option<NaiveDate>,
  pub avatar: Option<String>,
  pub tags: Vec<String>,
  pub notes: Option<String>,
  pub creator: Option<UserProfile>,
  /// Tasks linked to this contact, filled in once tasks are loaded for the same scope.
  #[serde(default)]
  pub tasks: Vec<TaskSummary>,
  #[serde(default)]
  pub deals: Vec<DealSummary>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
  Lead,
  Qualified,
  Proposal,
  Negotiation,
  Won,
}

impl DealStage {
  pub const ALL: [DealStage; 5] = [
    DealStage::Lead,
    DealStage::Qualified,
    DealStage::Proposal,
    DealStage::Negotiation,
    DealStage::Won,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      DealStage::Lead => "lead",
      DealStage::Qualified => "qualified",
      DealStage::Proposal => "proposal",
      DealStage::Negotiation => "negotiation",
      DealStage::Won => "won",
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      DealStage::Lead => "Lead",
      DealStage::Qualified => "Qualified",
      DealStage::Proposal => "Proposal",
      DealStage::Negotiation => "Negotiation",
      DealStage::Won => "Won",
    }
  }
}

impl FromStr for DealStage {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    DealStage::ALL
      .into_iter()
      .find(|stage| stage.as_str() == s)
      .ok_or_else(|| AppError::InvalidRequest(format!("unknown deal stage: {}", s)))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
  pub id: Uuid,
  pub user_id: Uuid,
  pub workflow_id: Option<Uuid>,
  pub title: String,
  pub client_name: String,
  pub amount: String,
  pub probability: i32,
  pub stage: DealStage,
  pub contact_id: Option<Uuid>,
  pub related_task_id: Option<Uuid>,
  pub reminder_date: Option<NaiveDate>,
  pub notes: Option<String>,
  pub owner: Option<UserProfile>,
  pub created_at: DateTime<Utc>,
}

impl Deal {
  pub fn summary(&self) -> DealSummary {
    DealSummary {
      id: self.id,
      title: self.title.clone(),
      amount: self.amount.clone(),
      stage: self.stage,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  pub id: Uuid,
  pub user_id: Uuid,
  pub workflow_id: Option<Uuid>,
  pub title: String,
  pub description: Option<String>,
  pub due_date: Option<NaiveDate>,
  pub reminder_time: Option<String>,
  pub priority: String,
  pub project: Option<String>,
  pub completed: bool,
  pub contact_id: Option<Uuid>,
  pub deal_id: Option<Uuid>,
  pub assignee: Option<UserProfile>,
  pub created_at: DateTime<Utc>,
}

impl Task {
  pub fn summary(&self) -> TaskSummary {
    TaskSummary {
      id: self.id,
      title: self.title.clone(),
      completed: self.completed,
      due_date: self.due_date,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
  pub id: Uuid,
  pub user_id: Uuid,
  pub workflow_id: Option<Uuid>,
  pub title: String,
  pub description: Option<String>,
  pub date: DateTime<Utc>,
  pub time: Option<String>,
  #[serde(rename = "type")]
  pub kind: String,
  pub contact_id: Option<Uuid>,
  pub deal_id: Option<Uuid>,
  pub creator: Option<UserProfile>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
  Lent,
  Partial,
  Repaid,
}

impl DebtStatus {
  pub const ALL: [DebtStatus; 3] = [DebtStatus::Lent, DebtStatus::Partial, DebtStatus::Repaid];

  pub fn as_str(&self) -> &'static str {
    match self {
      DebtStatus::Lent => "lent",
      DebtStatus::Partial => "partial",
      DebtStatus::Repaid => "repaid",
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      DebtStatus::Lent => "MONEY LENT",
      DebtStatus::Partial => "PARTIALLY REPAID",
      DebtStatus::Repaid => "FULLY REPAID",
    }
  }
}

impl FromStr for DebtStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    DebtStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| AppError::InvalidRequest(format!("unknown debt status: {}", s)))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
  pub id: Uuid,
  pub user_id: Uuid,
  pub workflow_id: Option<Uuid>,
  pub borrower_name: String,
  pub amount_lent: String,
  pub amount_repaid: String,
  pub date_lent: DateTime<Utc>,
  pub reminder_date: Option<NaiveDate>,
  pub description: Option<String>,
  pub status: DebtStatus,
  pub related_task_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
}
