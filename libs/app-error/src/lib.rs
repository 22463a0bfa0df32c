use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Internal(#[from] anyhow::Error),

  #[error("An unhandled error occurred:{0}")]
  Unhandled(String),

  #[error("Record not found:{0}")]
  RecordNotFound(String),

  #[error("Invalid share code")]
  InvalidShareCode,

  #[error("Already a member of this workflow")]
  AlreadyMember,

  #[error("Authentication required:{0}")]
  AuthenticationRequired(String),

  #[error("Invalid request:{0}")]
  InvalidRequest(String),

  #[error("{user}: do not have permissions to {action}")]
  NotEnoughPermissions { user: String, action: String },

  /// Opaque failure reported by the persistence layer. The message is passed through as is.
  #[error("{0}")]
  StoreFailure(String),

  /// A multi-step write stopped at `step` after `completed` earlier steps were applied.
  /// The earlier steps are not rolled back.
  #[error("{step} failed after {completed} completed step(s): {source}")]
  PartialWrite {
    step: String,
    completed: usize,
    #[source]
    source: Box<AppError>,
  },

  #[error(transparent)]
  UuidError(#[from] uuid::Error),

  #[error(transparent)]
  UrlError(#[from] url::ParseError),

  #[error(transparent)]
  SerdeError(#[from] serde_json::Error),

  #[error("{0}")]
  Connect(String),

  #[error("{0}")]
  RequestTimeout(String),
}

impl AppError {
  pub fn is_record_not_found(&self) -> bool {
    matches!(self, AppError::RecordNotFound(_))
  }

  pub fn is_network_error(&self) -> bool {
    matches!(self, AppError::Connect(_) | AppError::RequestTimeout(_))
  }

  pub fn is_already_member(&self) -> bool {
    matches!(self, AppError::AlreadyMember)
  }

  pub fn is_invalid_share_code(&self) -> bool {
    matches!(self, AppError::InvalidShareCode)
  }

  pub fn is_authentication_required(&self) -> bool {
    matches!(self, AppError::AuthenticationRequired(_))
  }

  /// Returns the name of the failing step when the error comes from a partially applied
  /// multi-step write.
  pub fn failed_step(&self) -> Option<&str> {
    match self {
      AppError::PartialWrite { step, .. } => Some(step.as_str()),
      _ => None,
    }
  }

  pub fn code(&self) -> ErrorCode {
    match self {
      AppError::Unhandled(_) => ErrorCode::Unhandled,
      AppError::RecordNotFound(_) => ErrorCode::RecordNotFound,
      AppError::InvalidShareCode => ErrorCode::InvalidShareCode,
      AppError::AlreadyMember => ErrorCode::AlreadyMember,
      AppError::AuthenticationRequired(_) => ErrorCode::AuthenticationRequired,
      AppError::InvalidRequest(_) => ErrorCode::InvalidRequest,
      AppError::NotEnoughPermissions { .. } => ErrorCode::NotEnoughPermissions,
      AppError::StoreFailure(_) => ErrorCode::StoreFailure,
      AppError::PartialWrite { .. } => ErrorCode::PartialWrite,
      AppError::Internal(_) => ErrorCode::Internal,
      AppError::UuidError(_) => ErrorCode::UuidError,
      AppError::UrlError(_) => ErrorCode::InvalidUrl,
      AppError::SerdeError(_) => ErrorCode::SerdeError,
      AppError::Connect(_) => ErrorCode::NetworkError,
      AppError::RequestTimeout(_) => ErrorCode::NetworkError,
    }
  }
}

impl From<reqwest::Error> for AppError {
  fn from(error: reqwest::Error) -> Self {
    if error.is_connect() {
      return AppError::Connect(error.to_string());
    }

    if error.is_timeout() {
      return AppError::RequestTimeout(error.to_string());
    }

    if error.is_request() {
      return if error.status() == Some(StatusCode::PAYLOAD_TOO_LARGE) {
        AppError::InvalidRequest(format!("payload too large: {}", error))
      } else {
        AppError::InvalidRequest(error.to_string())
      };
    }
    AppError::Unhandled(error.to_string())
  }
}

#[cfg(feature = "sqlx_error")]
impl From<sqlx::Error> for AppError {
  fn from(value: sqlx::Error) -> Self {
    let msg = value.to_string();
    match value {
      sqlx::Error::RowNotFound => {
        AppError::RecordNotFound(format!("Record not exist in db. {})", msg))
      },
      _ => AppError::StoreFailure(msg),
    }
  }
}

#[derive(
  Eq,
  PartialEq,
  Copy,
  Debug,
  Clone,
  serde_repr::Serialize_repr,
  serde_repr::Deserialize_repr,
)]
#[repr(i32)]
pub enum ErrorCode {
  Unhandled = -1,
  RecordNotFound = -2,
  InvalidUrl = 1007,
  InvalidRequest = 1008,
  NotEnoughPermissions = 1012,
  Internal = 1017,
  UuidError = 1018,
  SerdeError = 1022,
  NetworkError = 1023,
  InvalidShareCode = 1030,
  AlreadyMember = 1031,
  AuthenticationRequired = 1032,
  StoreFailure = 1033,
  PartialWrite = 1034,
}

impl ErrorCode {
  pub fn value(&self) -> i32 {
    *self as i32
  }
}

/// The shape an error takes when surfaced next to the control that triggered it.
#[derive(Serialize, Debug)]
pub struct AppErrorSerde {
  pub code: ErrorCode,
  pub message: String,
}

impl From<&AppError> for AppErrorSerde {
  fn from(value: &AppError) -> Self {
    Self {
      code: value.code(),
      message: value.to_string(),
    }
  }
}
