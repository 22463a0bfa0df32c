use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::GoTrueError;

/// Claims of an access token issued by the GoTrue auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoTrueJWTClaims {
  // JWT standard claims
  pub aud: Option<String>,
  pub exp: Option<i64>,
  pub iat: Option<i64>,
  pub iss: Option<String>,
  pub sub: Option<String>,

  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub user_metadata: serde_json::Value,
  #[serde(default)]
  pub role: Option<String>,
  pub session_id: Option<String>,
}

lazy_static::lazy_static! {
  pub static ref VALIDATION: Validation = Validation::new(Algorithm::HS256);
}

impl GoTrueJWTClaims {
  pub fn verify(token: &str, secret: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
    let claims = decode::<Self>(token, &DecodingKey::from_secret(secret), &VALIDATION)?.claims;

    let ts_expiry = claims.exp.ok_or_else(|| {
      jsonwebtoken::errors::ErrorKind::MissingRequiredClaim("expect exp but not found".to_owned())
    })?;

    let ts_now = chrono::Utc::now().timestamp();
    match ts_now > ts_expiry {
      true => Err(jsonwebtoken::errors::ErrorKind::ExpiredSignature.into()),
      false => Ok(claims),
    }
  }

  /// The user the token was issued to.
  pub fn user_id(&self) -> Result<Uuid, GoTrueError> {
    let sub = self.sub.as_deref().ok_or_else(|| GoTrueError {
      code: 401,
      msg: "token has no subject".to_string(),
      error_id: None,
    })?;
    Uuid::parse_str(sub).map_err(|err| GoTrueError {
      code: 401,
      msg: format!("token subject is not a user id: {}", err),
      error_id: None,
    })
  }

  /// Display name stored by the sign-up form, if any.
  pub fn full_name(&self) -> Option<String> {
    self
      .user_metadata
      .get("full_name")
      .and_then(|value| value.as_str())
      .map(|value| value.to_string())
  }

  pub fn is_authenticated(&self) -> bool {
    self.role.as_deref() == Some("authenticated")
  }
}
