use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use app_error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::util::{validate_endpoint, validate_not_empty_str, validate_not_empty_tags};

/// Length of the human-typeable code used to join a workflow.
pub const SHARE_CODE_LENGTH: usize = 6;

/// The resource types a workflow can share with its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTag {
  Contacts,
  Deals,
  Tasks,
  Calendar,
  Debts,
}

impl ResourceTag {
  pub const ALL: [ResourceTag; 5] = [
    ResourceTag::Contacts,
    ResourceTag::Deals,
    ResourceTag::Tasks,
    ResourceTag::Calendar,
    ResourceTag::Debts,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ResourceTag::Contacts => "contacts",
      ResourceTag::Deals => "deals",
      ResourceTag::Tasks => "tasks",
      ResourceTag::Calendar => "calendar",
      ResourceTag::Debts => "debts",
    }
  }
}

impl Display for ResourceTag {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ResourceTag {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "contacts" => Ok(ResourceTag::Contacts),
      "deals" => Ok(ResourceTag::Deals),
      "tasks" => Ok(ResourceTag::Tasks),
      "calendar" => Ok(ResourceTag::Calendar),
      "debts" => Ok(ResourceTag::Debts),
      _ => Err(AppError::InvalidRequest(format!(
        "unknown resource tag: {}",
        s
      ))),
    }
  }
}

/// Parses stored tags, dropping anything outside the recognized set.
pub fn parse_resource_tags<I, S>(values: I) -> BTreeSet<ResourceTag>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  values
    .into_iter()
    .filter_map(|value| match ResourceTag::from_str(value.as_ref()) {
      Ok(tag) => Some(tag),
      Err(err) => {
        warn!("skip stored resource tag: {}", err);
        None
      },
    })
    .collect()
}

/// A named, shared workspace. The creator is always an accepted admin member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub id: Uuid,
  pub name: String,
  pub creator_id: Uuid,
  pub share_code: String,
  pub shared_resources: BTreeSet<ResourceTag>,
  pub notification_url: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Workflow {
  pub fn shares(&self, tag: ResourceTag) -> bool {
    self.shared_resources.contains(&tag)
  }

  pub fn is_creator(&self, user_id: &Uuid) -> bool {
    &self.creator_id == user_id
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRole {
  Admin,
  Member,
}

impl WorkflowRole {
  pub fn as_str(&self) -> &'static str {
    match self {
      WorkflowRole::Admin => "admin",
      WorkflowRole::Member => "member",
    }
  }
}

impl FromStr for WorkflowRole {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "admin" => Ok(WorkflowRole::Admin),
      "member" => Ok(WorkflowRole::Member),
      _ => Err(AppError::InvalidRequest(format!("unknown role: {}", s))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
  Pending,
  Accepted,
  Declined,
}

impl MembershipStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      MembershipStatus::Pending => "pending",
      MembershipStatus::Accepted => "accepted",
      MembershipStatus::Declined => "declined",
    }
  }
}

impl FromStr for MembershipStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(MembershipStatus::Pending),
      "accepted" => Ok(MembershipStatus::Accepted),
      "declined" => Ok(MembershipStatus::Declined),
      _ => Err(AppError::InvalidRequest(format!(
        "unknown membership status: {}",
        s
      ))),
    }
  }
}

/// At most one membership exists per (workflow, user) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMembership {
  pub id: Uuid,
  pub workflow_id: Uuid,
  pub user_id: Uuid,
  pub role: WorkflowRole,
  pub status: MembershipStatus,
  pub created_at: DateTime<Utc>,
}

/// Display identity of a user, as shown next to memberships and resources.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
  pub id: Uuid,
  pub email: Option<String>,
  pub full_name: Option<String>,
  pub avatar_url: Option<String>,
}

impl UserProfile {
  pub fn display_name(&self) -> &str {
    self
      .full_name
      .as_deref()
      .or(self.email.as_deref())
      .unwrap_or_default()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMember {
  #[serde(flatten)]
  pub membership: WorkflowMembership,
  pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct CreateWorkflowParams {
  #[validate(custom = "validate_not_empty_str")]
  pub name: String,

  #[validate(custom = "validate_not_empty_tags")]
  pub shared_resources: BTreeSet<ResourceTag>,
}

/// Partial update of a workflow. `None` leaves a field untouched; an empty
/// `notification_url` clears the endpoint.
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
pub struct WorkflowChangeset {
  #[validate(custom = "validate_not_empty_str")]
  pub name: Option<String>,

  #[validate(custom = "validate_not_empty_tags")]
  pub shared_resources: Option<BTreeSet<ResourceTag>>,

  #[validate(custom = "validate_endpoint")]
  pub notification_url: Option<String>,
}

impl WorkflowChangeset {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.shared_resources.is_none() && self.notification_url.is_none()
  }
}

/// Insert parameters for the workflows relation.
#[derive(Debug, Clone)]
pub struct NewWorkflow {
  pub name: String,
  pub creator_id: Uuid,
  pub share_code: String,
  pub shared_resources: BTreeSet<ResourceTag>,
}

/// Insert parameters for the workflow-memberships relation.
#[derive(Debug, Clone)]
pub struct NewMembership {
  pub workflow_id: Uuid,
  pub user_id: Uuid,
  pub role: WorkflowRole,
  pub status: MembershipStatus,
}

impl NewMembership {
  pub fn creator(workflow: &Workflow) -> Self {
    Self {
      workflow_id: workflow.id,
      user_id: workflow.creator_id,
      role: WorkflowRole::Admin,
      status: MembershipStatus::Accepted,
    }
  }

  pub fn join_request(workflow_id: Uuid, user_id: Uuid) -> Self {
    Self {
      workflow_id,
      user_id,
      role: WorkflowRole::Member,
      status: MembershipStatus::Pending,
    }
  }
}

/// Kind of a notification. Types this crate does not act on are kept verbatim in
/// [NotificationType::Other] so they survive a round trip through the relay.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationType {
  JoinRequest,
  JoinAccepted,
  Reminder,
  Other(String),
}

impl NotificationType {
  pub fn as_str(&self) -> &str {
    match self {
      NotificationType::JoinRequest => "join_request",
      NotificationType::JoinAccepted => "join_accepted",
      NotificationType::Reminder => "reminder",
      NotificationType::Other(value) => value,
    }
  }
}

impl From<&str> for NotificationType {
  fn from(value: &str) -> Self {
    match value {
      "join_request" => NotificationType::JoinRequest,
      "join_accepted" => NotificationType::JoinAccepted,
      "reminder" => NotificationType::Reminder,
      other => NotificationType::Other(other.to_string()),
    }
  }
}

impl Serialize for NotificationType {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for NotificationType {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = String::deserialize(deserializer)?;
    Ok(NotificationType::from(value.as_str()))
  }
}

/// Structured payload carried by a notification. Every field is optional since the
/// payload is opaque to the store; unknown keys are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NotificationPayload {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub workflow_id: Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub requester_id: Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub membership_id: Option<Uuid>,
  /// Kind of the linked resource for deep links, e.g. `task` or `deal`.
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub resource_type: Option<String>,
  #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
  pub resource_id: Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An event directed at one user. Only `read` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub id: Uuid,
  pub user_id: Uuid,
  #[serde(rename = "type")]
  pub kind: NotificationType,
  pub content: String,
  #[serde(default)]
  pub data: serde_json::Value,
  #[serde(default)]
  pub read: bool,
  pub created_at: DateTime<Utc>,
}

impl Notification {
  pub fn payload(&self) -> Result<NotificationPayload, AppError> {
    if self.data.is_null() {
      return Ok(NotificationPayload::default());
    }
    Ok(serde_json::from_value(self.data.clone())?)
  }

  /// The membership a `join_request` refers to.
  pub fn membership_id(&self) -> Result<Uuid, AppError> {
    self.payload()?.membership_id.ok_or_else(|| {
      AppError::InvalidRequest(format!(
        "notification {} does not reference a membership",
        self.id
      ))
    })
  }

  pub fn is_unread_join_request(&self) -> bool {
    self.kind == NotificationType::JoinRequest && !self.read
  }
}

/// Insert parameters for the notifications relation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
  pub user_id: Uuid,
  pub kind: NotificationType,
  pub content: String,
  pub data: NotificationPayload,
}

impl NewNotification {
  pub fn join_request(
    workflow: &Workflow,
    requester_id: Uuid,
    requester_email: &str,
    membership_id: Uuid,
  ) -> Self {
    Self {
      user_id: workflow.creator_id,
      kind: NotificationType::JoinRequest,
      content: format!("User {} wants to join your workflow.", requester_email),
      data: NotificationPayload {
        workflow_id: Some(workflow.id),
        requester_id: Some(requester_id),
        membership_id: Some(membership_id),
        ..Default::default()
      },
    }
  }

  pub fn join_accepted(membership: &WorkflowMembership) -> Self {
    Self {
      user_id: membership.user_id,
      kind: NotificationType::JoinAccepted,
      content: "Your request to join workflow has been accepted.".to_string(),
      data: NotificationPayload {
        workflow_id: Some(membership.workflow_id),
        membership_id: Some(membership.id),
        ..Default::default()
      },
    }
  }

  pub fn reminder(
    user_id: Uuid,
    content: impl Into<String>,
    resource_type: &str,
    resource_id: Uuid,
    path: &str,
  ) -> Self {
    Self {
      user_id,
      kind: NotificationType::Reminder,
      content: content.into(),
      data: NotificationPayload {
        resource_type: Some(resource_type.to_string()),
        resource_id: Some(resource_id),
        path: Some(path.to_string()),
        ..Default::default()
      },
    }
  }
}
