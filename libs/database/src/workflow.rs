use app_error::AppError;
use database_entity::dto::{
  MembershipStatus, NewMembership, NewWorkflow, Workflow, WorkflowChangeset, WorkflowMember,
  WorkflowMembership,
};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::pg_row::{WorkflowMemberRow, WorkflowMembershipRow, WorkflowRow};

const WORKFLOW_COLUMNS: &str =
  "id, name, creator_id, share_code, shared_resources, notification_url, created_at";

pub async fn insert_workflow<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  params: &NewWorkflow,
) -> Result<Workflow, AppError> {
  let tags = params
    .shared_resources
    .iter()
    .map(|tag| tag.as_str().to_string())
    .collect::<Vec<_>>();
  let row = sqlx::query_as::<_, WorkflowRow>(&format!(
    r#"
      INSERT INTO workflows (name, creator_id, share_code, shared_resources)
      VALUES ($1, $2, $3, $4)
      RETURNING {WORKFLOW_COLUMNS}
    "#
  ))
  .bind(&params.name)
  .bind(params.creator_id)
  .bind(&params.share_code)
  .bind(&tags)
  .fetch_one(executor)
  .await?;
  Ok(row.into())
}

/// Workflows the user holds a pending or accepted membership in, oldest first.
pub async fn select_workflows_for_user<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  user_id: &Uuid,
) -> Result<Vec<Workflow>, AppError> {
  let rows = sqlx::query_as::<_, WorkflowRow>(
    r#"
      SELECT w.id, w.name, w.creator_id, w.share_code, w.shared_resources,
             w.notification_url, w.created_at
      FROM workflows w
      JOIN workflow_members m ON m.workflow_id = w.id
      WHERE m.user_id = $1
        AND m.status IN ('pending', 'accepted')
      ORDER BY w.created_at ASC
    "#,
  )
  .bind(user_id)
  .fetch_all(executor)
  .await?;
  Ok(rows.into_iter().map(Workflow::from).collect())
}

pub async fn select_workflow_by_id<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  workflow_id: &Uuid,
) -> Result<Option<Workflow>, AppError> {
  let row = sqlx::query_as::<_, WorkflowRow>(&format!(
    "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = $1"
  ))
  .bind(workflow_id)
  .fetch_optional(executor)
  .await?;
  Ok(row.map(Workflow::from))
}

/// Resolves a share code through the `find_workflow_by_code` function. The function runs
/// with definer rights so a non-member can discover the workflow it is asking to join.
pub async fn select_workflow_by_share_code<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  share_code: &str,
) -> Result<Option<Workflow>, AppError> {
  let row = sqlx::query_as::<_, WorkflowRow>(&format!(
    "SELECT {WORKFLOW_COLUMNS} FROM find_workflow_by_code($1)"
  ))
  .bind(share_code)
  .fetch_optional(executor)
  .await?;
  Ok(row.map(Workflow::from))
}

pub async fn update_workflow<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  workflow_id: &Uuid,
  changeset: &WorkflowChangeset,
) -> Result<Workflow, AppError> {
  let tags = changeset.shared_resources.as_ref().map(|tags| {
    tags
      .iter()
      .map(|tag| tag.as_str().to_string())
      .collect::<Vec<_>>()
  });
  let row = sqlx::query_as::<_, WorkflowRow>(&format!(
    r#"
      UPDATE workflows
      SET
        name = COALESCE($2, name),
        shared_resources = COALESCE($3, shared_resources),
        notification_url = CASE WHEN $4::TEXT IS NULL THEN notification_url
                                ELSE NULLIF($4, '') END
      WHERE id = $1
      RETURNING {WORKFLOW_COLUMNS}
    "#
  ))
  .bind(workflow_id)
  .bind(changeset.name.as_deref())
  .bind(tags)
  .bind(changeset.notification_url.as_deref())
  .fetch_one(executor)
  .await?;
  Ok(row.into())
}

/// Memberships cascade with the workflow; scoped resources have their workflow reference
/// set to null by the foreign key.
pub async fn delete_workflow<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  workflow_id: &Uuid,
) -> Result<(), AppError> {
  sqlx::query("DELETE FROM workflows WHERE id = $1")
    .bind(workflow_id)
    .execute(executor)
    .await?;
  Ok(())
}

pub async fn insert_workflow_member<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  params: &NewMembership,
) -> Result<WorkflowMembership, AppError> {
  let row = sqlx::query_as::<_, WorkflowMembershipRow>(
    r#"
      INSERT INTO workflow_members (workflow_id, user_id, role, status)
      VALUES ($1, $2, $3, $4)
      RETURNING id, workflow_id, user_id, role, status, created_at
    "#,
  )
  .bind(params.workflow_id)
  .bind(params.user_id)
  .bind(params.role.as_str())
  .bind(params.status.as_str())
  .fetch_one(executor)
  .await?;
  row.try_into()
}

pub async fn select_workflow_membership<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  workflow_id: &Uuid,
  user_id: &Uuid,
) -> Result<Option<WorkflowMembership>, AppError> {
  let row = sqlx::query_as::<_, WorkflowMembershipRow>(
    r#"
      SELECT id, workflow_id, user_id, role, status, created_at
      FROM workflow_members
      WHERE workflow_id = $1 AND user_id = $2
    "#,
  )
  .bind(workflow_id)
  .bind(user_id)
  .fetch_optional(executor)
  .await?;
  row.map(WorkflowMembership::try_from).transpose()
}

pub async fn select_workflow_membership_by_id<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  membership_id: &Uuid,
) -> Result<Option<WorkflowMembership>, AppError> {
  let row = sqlx::query_as::<_, WorkflowMembershipRow>(
    r#"
      SELECT id, workflow_id, user_id, role, status, created_at
      FROM workflow_members
      WHERE id = $1
    "#,
  )
  .bind(membership_id)
  .fetch_optional(executor)
  .await?;
  row.map(WorkflowMembership::try_from).transpose()
}

pub async fn update_workflow_member_status<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  membership_id: &Uuid,
  status: MembershipStatus,
) -> Result<WorkflowMembership, AppError> {
  let row = sqlx::query_as::<_, WorkflowMembershipRow>(
    r#"
      UPDATE workflow_members
      SET status = $2
      WHERE id = $1
      RETURNING id, workflow_id, user_id, role, status, created_at
    "#,
  )
  .bind(membership_id)
  .bind(status.as_str())
  .fetch_one(executor)
  .await?;
  row.try_into()
}

pub async fn delete_workflow_member<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  membership_id: &Uuid,
) -> Result<(), AppError> {
  sqlx::query("DELETE FROM workflow_members WHERE id = $1")
    .bind(membership_id)
    .execute(executor)
    .await?;
  Ok(())
}

pub async fn select_workflow_members<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  workflow_id: &Uuid,
) -> Result<Vec<WorkflowMember>, AppError> {
  let rows = sqlx::query_as::<_, WorkflowMemberRow>(
    r#"
      SELECT m.id, m.workflow_id, m.user_id, m.role, m.status, m.created_at,
             u.id AS profile_id, u.email, u.full_name, u.avatar_url
      FROM workflow_members m
      LEFT JOIN users u ON u.id = m.user_id
      WHERE m.workflow_id = $1
      ORDER BY m.created_at ASC
    "#,
  )
  .bind(workflow_id)
  .fetch_all(executor)
  .await?;
  rows.into_iter().map(WorkflowMember::try_from).collect()
}
