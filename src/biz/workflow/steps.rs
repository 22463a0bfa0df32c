use std::future::Future;

use app_error::AppError;
use tracing::warn;

pub const INSERT_WORKFLOW: &str = "insert workflow";
pub const INSERT_CREATOR_MEMBERSHIP: &str = "insert creator membership";
pub const INSERT_JOIN_MEMBERSHIP: &str = "insert pending membership";
pub const NOTIFY_CREATOR: &str = "notify workflow creator";
pub const UPDATE_MEMBERSHIP_STATUS: &str = "update membership status";
pub const NOTIFY_REQUESTER: &str = "notify requester";
pub const MARK_REQUEST_READ: &str = "mark join request read";

/// An ordered sequence of independent store writes with no rollback.
///
/// A failure of the first step is returned as is since nothing was applied. A failure of a
/// later step is reported as [AppError::PartialWrite], naming the step and how many steps
/// were applied before it.
pub struct WriteSteps {
  operation: &'static str,
  completed: usize,
}

impl WriteSteps {
  pub fn new(operation: &'static str) -> Self {
    Self {
      operation,
      completed: 0,
    }
  }

  pub async fn run<T, F>(&mut self, step: &'static str, write: F) -> Result<T, AppError>
  where
    F: Future<Output = Result<T, AppError>>,
  {
    match write.await {
      Ok(value) => {
        self.completed += 1;
        Ok(value)
      },
      Err(err) if self.completed == 0 => Err(err),
      Err(err) => {
        warn!(
          "{}: step '{}' failed after {} applied step(s), earlier steps are kept: {}",
          self.operation, step, self.completed, err
        );
        Err(AppError::PartialWrite {
          step: step.to_string(),
          completed: self.completed,
          source: Box::new(err),
        })
      },
    }
  }

  pub fn completed(&self) -> usize {
    self.completed
  }
}
