use app_error::AppError;
use database_entity::resource::{CalendarEvent, Contact, Deal, Debt, Task, WorkflowScope};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::pg_row::{ContactRow, DealRow, DebtRow, EventRow, TaskRow};

// $1 is the reading user, $2 the workflow scope. A null scope reads the user's personal
// rows; a workflow scope requires an accepted membership.
const SCOPE_FILTER: &str = r#"
  ($2::UUID IS NULL AND r.workflow_id IS NULL AND r.user_id = $1)
  OR (
    $2::UUID IS NOT NULL
    AND r.workflow_id = $2
    AND EXISTS (
      SELECT 1 FROM workflow_members m
      WHERE m.workflow_id = $2 AND m.user_id = $1 AND m.status = 'accepted'
    )
  )
"#;

const CREATOR_COLUMNS: &str = r#"
  u.id AS creator_id, u.email AS creator_email, u.full_name AS creator_name,
  u.avatar_url AS creator_avatar
"#;

pub async fn select_contacts<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  user_id: &Uuid,
  scope: WorkflowScope,
) -> Result<Vec<Contact>, AppError> {
  let rows = sqlx::query_as::<_, ContactRow>(&format!(
    r#"
      SELECT r.id, r.user_id, r.workflow_id, r.name, r.role, r.company, r.email, r.phone,
             r.status, r.last_contact, r.avatar, r.tags, r.notes, r.created_at,
             {CREATOR_COLUMNS}
      FROM contacts r
      LEFT JOIN users u ON u.id = r.user_id
      WHERE {SCOPE_FILTER}
      ORDER BY r.created_at DESC
    "#
  ))
  .bind(user_id)
  .bind(scope)
  .fetch_all(executor)
  .await?;
  Ok(rows.into_iter().map(Contact::from).collect())
}

pub async fn select_deals<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  user_id: &Uuid,
  scope: WorkflowScope,
) -> Result<Vec<Deal>, AppError> {
  let rows = sqlx::query_as::<_, DealRow>(&format!(
    r#"
      SELECT r.id, r.user_id, r.workflow_id, r.title, r.client_name, r.amount,
             r.probability, r.status, r.contact_id, r.related_task_id, r.reminder_date,
             r.notes, r.created_at,
             {CREATOR_COLUMNS}
      FROM deals r
      LEFT JOIN users u ON u.id = r.user_id
      WHERE {SCOPE_FILTER}
      ORDER BY r.created_at DESC
    "#
  ))
  .bind(user_id)
  .bind(scope)
  .fetch_all(executor)
  .await?;
  rows.into_iter().map(Deal::try_from).collect()
}

pub async fn select_tasks<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  user_id: &Uuid,
  scope: WorkflowScope,
) -> Result<Vec<Task>, AppError> {
  let rows = sqlx::query_as::<_, TaskRow>(&format!(
    r#"
      SELECT r.id, r.user_id, r.workflow_id, r.title, r.description, r.due_date,
             r.reminder_time, r.priority, r.project, r.completed, r.contact_id, r.deal_id,
             r.created_at,
             {CREATOR_COLUMNS}
      FROM tasks r
      LEFT JOIN users u ON u.id = r.user_id
      WHERE {SCOPE_FILTER}
      ORDER BY r.created_at DESC
    "#
  ))
  .bind(user_id)
  .bind(scope)
  .fetch_all(executor)
  .await?;
  Ok(rows.into_iter().map(Task::from).collect())
}

pub async fn select_events<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  user_id: &Uuid,
  scope: WorkflowScope,
) -> Result<Vec<CalendarEvent>, AppError> {
  let rows = sqlx::query_as::<_, EventRow>(&format!(
    r#"
      SELECT r.id, r.user_id, r.workflow_id, r.title, r.description, r.date, r.time,
             r.type, r.contact_id, r.deal_id, r.created_at,
             {CREATOR_COLUMNS}
      FROM events r
      LEFT JOIN users u ON u.id = r.user_id
      WHERE {SCOPE_FILTER}
      ORDER BY r.date ASC
    "#
  ))
  .bind(user_id)
  .bind(scope)
  .fetch_all(executor)
  .await?;
  Ok(rows.into_iter().map(CalendarEvent::from).collect())
}

pub async fn select_debts<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  user_id: &Uuid,
  scope: WorkflowScope,
) -> Result<Vec<Debt>, AppError> {
  let rows = sqlx::query_as::<_, DebtRow>(&format!(
    r#"
      SELECT r.id, r.user_id, r.workflow_id, r.borrower_name, r.amount_lent,
             r.amount_repaid, r.date_lent, r.reminder_date, r.description, r.status,
             r.related_task_id, r.created_at
      FROM debts r
      WHERE {SCOPE_FILTER}
      ORDER BY r.created_at DESC
    "#
  ))
  .bind(user_id)
  .bind(scope)
  .fetch_all(executor)
  .await?;
  rows.into_iter().map(Debt::try_from).collect()
}
