use std::sync::Arc;

use app_error::AppError;
use gotrue_entity::gotrue_jwt::GoTrueJWTClaims;
use gotrue_entity::AuthChangeEvent;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{instrument, trace};
use uuid::Uuid;

/// The user a session acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
  pub id: Uuid,
  pub email: String,
  pub full_name: Option<String>,
}

impl SessionUser {
  pub fn new(id: Uuid, email: impl Into<String>) -> Self {
    Self {
      id,
      email: email.into(),
      full_name: None,
    }
  }
}

impl TryFrom<GoTrueJWTClaims> for SessionUser {
  type Error = AppError;

  fn try_from(claims: GoTrueJWTClaims) -> Result<Self, Self::Error> {
    let id = claims
      .user_id()
      .map_err(|err| AppError::AuthenticationRequired(err.msg))?;
    Ok(Self {
      id,
      full_name: claims.full_name(),
      email: claims.email.unwrap_or_default(),
    })
  }
}

#[instrument(level = "trace", skip_all, err)]
pub fn session_user_from_token(
  token: &str,
  jwt_secret: &Secret<String>,
) -> Result<SessionUser, AppError> {
  let claims = GoTrueJWTClaims::verify(token, jwt_secret.expose_secret().as_bytes())
    .map_err(|err| AppError::AuthenticationRequired(format!("fail to decode token: {}", err)))?;
  SessionUser::try_from(claims)
}

/// Holds the signed-in user, if any. Clones share the same state.
///
/// Every change is published on a watch channel so that scoped consumers (the domain data
/// context) can react to sign-in and sign-out.
#[derive(Clone)]
pub struct AuthState {
  user: Arc<RwLock<Option<SessionUser>>>,
  notify: Arc<watch::Sender<Option<Uuid>>>,
}

impl Default for AuthState {
  fn default() -> Self {
    Self::new()
  }
}

impl AuthState {
  pub fn new() -> Self {
    let (notify, _) = watch::channel(None);
    Self {
      user: Arc::new(RwLock::new(None)),
      notify: Arc::new(notify),
    }
  }

  pub fn sign_in(&self, user: SessionUser) {
    trace!("sign in: {}", user.id);
    let user_id = user.id;
    *self.user.write() = Some(user);
    self.notify.send_replace(Some(user_id));
  }

  pub fn sign_in_with_token(
    &self,
    token: &str,
    jwt_secret: &Secret<String>,
  ) -> Result<SessionUser, AppError> {
    let user = session_user_from_token(token, jwt_secret)?;
    self.sign_in(user.clone());
    Ok(user)
  }

  pub fn sign_out(&self) {
    trace!("sign out");
    *self.user.write() = None;
    self.notify.send_replace(None);
  }

  /// Applies an auth event from the hosted auth service. Only sign-out changes state here;
  /// sign-in carries a token and goes through [AuthState::sign_in_with_token].
  pub fn on_auth_event(&self, event: AuthChangeEvent) {
    if event.is_signed_out() {
      self.sign_out();
    }
  }

  pub fn current_user(&self) -> Option<SessionUser> {
    self.user.read().clone()
  }

  pub fn user_id(&self) -> Option<Uuid> {
    self.user.read().as_ref().map(|user| user.id)
  }

  /// The signed-in user, or `AuthenticationRequired` when nobody is signed in.
  pub fn require_user(&self) -> Result<SessionUser, AppError> {
    self
      .current_user()
      .ok_or_else(|| AppError::AuthenticationRequired("no signed-in user".to_string()))
  }

  pub fn subscribe(&self) -> watch::Receiver<Option<Uuid>> {
    self.notify.subscribe()
  }
}
