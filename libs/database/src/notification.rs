use app_error::AppError;
use database_entity::dto::{NewNotification, Notification};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::pg_row::NotificationRow;

pub async fn insert_notification<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  params: &NewNotification,
) -> Result<Notification, AppError> {
  let data = serde_json::to_value(&params.data)?;
  let row = sqlx::query_as::<_, NotificationRow>(
    r#"
      INSERT INTO notifications (user_id, type, content, data)
      VALUES ($1, $2, $3, $4)
      RETURNING id, user_id, type, content, data, read, created_at
    "#,
  )
  .bind(params.user_id)
  .bind(params.kind.as_str())
  .bind(&params.content)
  .bind(data)
  .fetch_one(executor)
  .await?;
  Ok(row.into())
}

/// All notifications addressed to the user, newest first.
pub async fn select_notifications_for_user<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  user_id: &Uuid,
) -> Result<Vec<Notification>, AppError> {
  let rows = sqlx::query_as::<_, NotificationRow>(
    r#"
      SELECT id, user_id, type, content, data, read, created_at
      FROM notifications
      WHERE user_id = $1
      ORDER BY created_at DESC
    "#,
  )
  .bind(user_id)
  .fetch_all(executor)
  .await?;
  Ok(rows.into_iter().map(Notification::from).collect())
}

pub async fn update_notification_read<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  notification_id: &Uuid,
) -> Result<(), AppError> {
  sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
    .bind(notification_id)
    .execute(executor)
    .await?;
  Ok(())
}

pub async fn update_all_notifications_read<'a, E: Executor<'a, Database = Postgres>>(
  executor: E,
  user_id: &Uuid,
) -> Result<u64, AppError> {
  let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read")
    .bind(user_id)
    .execute(executor)
    .await?;
  Ok(result.rows_affected())
}
