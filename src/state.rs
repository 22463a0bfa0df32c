use std::sync::Arc;

use database::pg_store::PgStore;
use database::store::{NotificationStore, ResourceStore, WorkflowStore};
use sqlx::PgPool;

use crate::biz::authentication::AuthState;
use crate::biz::crm::data_context::CrmDataContext;
use crate::biz::session::WorkflowSession;
use crate::biz::workflow::ops::WorkflowService;
use crate::config::config::Config;

#[derive(Clone)]
pub struct AppState {
  pub pg_pool: PgPool,
  pub config: Arc<Config>,
  pub store: Arc<PgStore>,
}

impl AppState {
  pub fn open_session(&self, auth: AuthState) -> ClientSession {
    ClientSession::open(self.store.clone(), auth)
  }
}

pub struct ClientSession {
  pub auth: AuthState,
  pub session: WorkflowSession,
  pub data: Arc<CrmDataContext>,
  watcher: tokio::task::JoinHandle<()>,
}

impl ClientSession {
  /// Wires a workflow session and a domain data context for one signed-in client. The data
  /// context follows both the auth state and the session's active workflow.
  pub fn open<S>(store: Arc<S>, auth: AuthState) -> Self
  where
    S: WorkflowStore + NotificationStore + ResourceStore,
  {
    let service = WorkflowService::new(store.clone(), auth.clone());
    let session = WorkflowSession::new(service);
    let data = Arc::new(CrmDataContext::new(store));
    let watcher = data
      .clone()
      .watch(auth.subscribe(), session.subscribe_scope());
    Self {
      auth,
      session,
      data,
      watcher,
    }
  }

  /// Signs out, releases the notification subscription and drops the loaded resources.
  pub fn close(&self) {
    self.session.end();
    self.data.clear();
    self.auth.sign_out();
  }
}

impl Drop for ClientSession {
  fn drop(&mut self) {
    self.watcher.abort();
  }
}
