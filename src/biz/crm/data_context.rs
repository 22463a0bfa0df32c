use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use app_error::AppError;
use database::store::ResourceStore;
use database_entity::resource::{CalendarEvent, Contact, Deal, Debt, Task, WorkflowScope};
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, instrument, trace};
use uuid::Uuid;

use crate::biz::crm::board::{deal_board, debt_board, DealBoard, DebtBoard};

/// The pair every resource read is scoped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeKey {
  pub user_id: Uuid,
  pub workflow_id: WorkflowScope,
}

/// Resources loaded for one [ScopeKey].
#[derive(Debug, Clone, Default)]
pub struct CrmData {
  pub contacts: Vec<Contact>,
  pub deals: Vec<Deal>,
  pub tasks: Vec<Task>,
  pub events: Vec<CalendarEvent>,
  pub debts: Vec<Debt>,
}

impl CrmData {
  pub fn deal_board(&self) -> DealBoard {
    deal_board(&self.deals)
  }

  pub fn debt_board(&self) -> DebtBoard {
    debt_board(&self.debts)
  }
}

#[derive(Default)]
struct Loaded {
  key: Option<ScopeKey>,
  data: CrmData,
}

/// In-memory copies of the domain resources for the signed-in user and the active
/// workflow. Any change of either value triggers one full parallel reload; sign-out clears
/// everything at once.
pub struct CrmDataContext {
  store: Arc<dyn ResourceStore>,
  loaded: RwLock<Loaded>,
  reloads: AtomicUsize,
  /// Bumped by every [CrmDataContext::clear]; a reload started before a clear is dropped.
  clears: AtomicUsize,
}

impl CrmDataContext {
  pub fn new(store: Arc<dyn ResourceStore>) -> Self {
    Self {
      store,
      loaded: RwLock::new(Loaded::default()),
      reloads: AtomicUsize::new(0),
      clears: AtomicUsize::new(0),
    }
  }

  pub fn data(&self) -> CrmData {
    self.loaded.read().data.clone()
  }

  pub fn loaded_key(&self) -> Option<ScopeKey> {
    self.loaded.read().key
  }

  /// How many reload cycles completed so far.
  pub fn reload_count(&self) -> usize {
    self.reloads.load(Ordering::SeqCst)
  }

  /// Reacts to a new (user, workflow) pair. Returns whether a reload ran. When the reload
  /// fails the previously loaded data is kept.
  pub async fn on_scope_change(
    &self,
    user_id: Option<Uuid>,
    workflow_id: WorkflowScope,
  ) -> Result<bool, AppError> {
    let user_id = match user_id {
      None => {
        self.clear();
        return Ok(false);
      },
      Some(user_id) => user_id,
    };
    let key = ScopeKey {
      user_id,
      workflow_id,
    };
    if self.loaded_key() == Some(key) {
      return Ok(false);
    }
    self.reload(key).await?;
    Ok(true)
  }

  /// Loads every collection for `key` in parallel and replaces the in-memory copies.
  #[instrument(level = "debug", skip(self), err)]
  pub async fn reload(&self, key: ScopeKey) -> Result<(), AppError> {
    let clears = self.clears.load(Ordering::SeqCst);
    let (contacts, deals, tasks, events, debts) = tokio::try_join!(
      self.store.select_contacts(&key.user_id, key.workflow_id),
      self.store.select_deals(&key.user_id, key.workflow_id),
      self.store.select_tasks(&key.user_id, key.workflow_id),
      self.store.select_events(&key.user_id, key.workflow_id),
      self.store.select_debts(&key.user_id, key.workflow_id),
    )?;
    let contacts = attach_associations(contacts, &tasks, &deals);
    let mut loaded = self.loaded.write();
    if self.clears.load(Ordering::SeqCst) != clears {
      trace!("drop resources loaded for {:?}, cleared meanwhile", key);
      return Ok(());
    }
    *loaded = Loaded {
      key: Some(key),
      data: CrmData {
        contacts,
        deals,
        tasks,
        events,
        debts,
      },
    };
    self.reloads.fetch_add(1, Ordering::SeqCst);
    trace!("reloaded resources for {:?}", key);
    Ok(())
  }

  pub fn clear(&self) {
    let mut loaded = self.loaded.write();
    self.clears.fetch_add(1, Ordering::SeqCst);
    *loaded = Loaded::default();
  }

  /// Follows both the signed-in user and the active workflow until either channel closes.
  pub fn watch(
    self: Arc<Self>,
    mut user_rx: watch::Receiver<Option<Uuid>>,
    mut scope_rx: watch::Receiver<WorkflowScope>,
  ) -> JoinHandle<()> {
    tokio::spawn(async move {
      loop {
        let user_id = *user_rx.borrow_and_update();
        let workflow_id = *scope_rx.borrow_and_update();
        if let Err(err) = self.on_scope_change(user_id, workflow_id).await {
          error!("fail to reload resources: {}", err);
        }
        let closed = tokio::select! {
          changed = user_rx.changed() => changed.is_err(),
          changed = scope_rx.changed() => changed.is_err(),
        };
        if closed {
          break;
        }
      }
    })
  }
}

/// Fills each contact's task and deal summaries from the collections loaded with it.
fn attach_associations(mut contacts: Vec<Contact>, tasks: &[Task], deals: &[Deal]) -> Vec<Contact> {
  for contact in contacts.iter_mut() {
    contact.tasks = tasks
      .iter()
      .filter(|task| task.contact_id == Some(contact.id))
      .map(Task::summary)
      .collect();
    contact.deals = deals
      .iter()
      .filter(|deal| deal.contact_id == Some(contact.id))
      .map(Deal::summary)
      .collect();
  }
  contacts
}
