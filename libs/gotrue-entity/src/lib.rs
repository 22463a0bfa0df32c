use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub mod gotrue_jwt;

/// Events emitted by the auth service when the signed-in session changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
  InitialSession,
  SignedIn,
  SignedOut,
  TokenRefreshed,
  UserUpdated,
}

impl AuthChangeEvent {
  pub fn is_signed_out(&self) -> bool {
    matches!(self, AuthChangeEvent::SignedOut)
  }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GoTrueError {
  pub code: i64,
  pub msg: String,
  pub error_id: Option<String>,
}

impl Display for GoTrueError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!(
      "gotrue error: {} code: {}, error_id: {:?}",
      self.msg, self.code, self.error_id
    ))
  }
}

impl From<jsonwebtoken::errors::Error> for GoTrueError {
  fn from(value: jsonwebtoken::errors::Error) -> Self {
    GoTrueError {
      code: 401,
      msg: format!("invalid access token: {}", value),
      error_id: None,
    }
  }
}
