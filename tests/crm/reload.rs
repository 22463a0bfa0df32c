use std::sync::Arc;
use std::time::Duration;

use app_error::AppError;
use async_trait::async_trait;
use database::mem_store::{MemStore, ResourceQuery};
use database::store::ResourceStore;
use database_entity::dto::ResourceTag;
use database_entity::resource::{CalendarEvent, Contact, Deal, Debt, Task, WorkflowScope};
use turf_crm::biz::crm::data_context::{CrmDataContext, ScopeKey};
use turf_crm::state::ClientSession;
use uuid::Uuid;

use crate::util::{contact, create_workflow, mem_store, register_user, wait_until};

/// Answers contact reads only after a delay.
struct SlowContacts(Arc<MemStore>);

#[async_trait]
impl ResourceStore for SlowContacts {
  async fn select_contacts(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<Contact>, AppError> {
    tokio::time::sleep(Duration::from_millis(100)).await;
    self.0.select_contacts(user_id, scope).await
  }

  async fn select_deals(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<Deal>, AppError> {
    self.0.select_deals(user_id, scope).await
  }

  async fn select_tasks(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<Task>, AppError> {
    self.0.select_tasks(user_id, scope).await
  }

  async fn select_events(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<CalendarEvent>, AppError> {
    self.0.select_events(user_id, scope).await
  }

  async fn select_debts(
    &self,
    user_id: &Uuid,
    scope: WorkflowScope,
  ) -> Result<Vec<Debt>, AppError> {
    self.0.select_debts(user_id, scope).await
  }
}

fn scopes_of(queries: &[ResourceQuery]) -> Vec<Option<Uuid>> {
  queries
    .iter()
    .map(|query| match query {
      ResourceQuery::Contacts(scope)
      | ResourceQuery::Deals(scope)
      | ResourceQuery::Tasks(scope)
      | ResourceQuery::Events(scope)
      | ResourceQuery::Debts(scope) => *scope,
    })
    .collect()
}

#[tokio::test]
async fn switching_workflow_reloads_everything_once() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let a = create_workflow(&owner, "A", &[ResourceTag::Contacts]).await;
  let b = create_workflow(&owner, "B", &[ResourceTag::Deals]).await;
  let session = owner.session();
  session.start().await.unwrap();

  let data = Arc::new(CrmDataContext::new(store.clone()));
  let watcher = data
    .clone()
    .watch(owner.auth.subscribe(), session.subscribe_scope());
  wait_until(|| data.reload_count() == 1).await;

  session.switch_workflow(Some(a.clone()));
  wait_until(|| data.reload_count() == 2).await;

  store.clear_resource_queries();
  session.switch_workflow(Some(b.clone()));
  wait_until(|| data.reload_count() == 3).await;
  tokio::time::sleep(std::time::Duration::from_millis(50)).await;
  assert_eq!(data.reload_count(), 3);

  let queries = store.resource_queries();
  assert_eq!(queries.len(), 5);
  assert!(queries.contains(&ResourceQuery::Contacts(Some(b.id))));
  assert!(queries.contains(&ResourceQuery::Deals(Some(b.id))));
  assert!(queries.contains(&ResourceQuery::Tasks(Some(b.id))));
  assert!(queries.contains(&ResourceQuery::Events(Some(b.id))));
  assert!(queries.contains(&ResourceQuery::Debts(Some(b.id))));
  assert_eq!(
    data.loaded_key(),
    Some(ScopeKey {
      user_id: owner.id(),
      workflow_id: Some(b.id),
    })
  );

  store.clear_resource_queries();
  session.switch_workflow(None);
  wait_until(|| data.reload_count() == 4).await;
  assert_eq!(scopes_of(&store.resource_queries()), vec![None; 5]);
  watcher.abort();
}

#[tokio::test]
async fn same_scope_does_not_reload() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let data = CrmDataContext::new(store.clone());

  assert!(data.on_scope_change(Some(owner.id()), None).await.unwrap());
  assert!(!data.on_scope_change(Some(owner.id()), None).await.unwrap());
  assert_eq!(data.reload_count(), 1);
  assert_eq!(store.resource_queries().len(), 5);
}

#[tokio::test]
async fn sign_out_clears_loaded_resources() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  store.insert_contact(contact(owner.id(), None, "Sweet"));
  let session = owner.session();
  let data = Arc::new(CrmDataContext::new(store.clone()));
  let watcher = data
    .clone()
    .watch(owner.auth.subscribe(), session.subscribe_scope());
  wait_until(|| data.data().contacts.len() == 1).await;

  owner.auth.sign_out();
  wait_until(|| data.data().contacts.is_empty()).await;
  assert_eq!(data.loaded_key(), None);
  assert_eq!(data.reload_count(), 1);
  watcher.abort();
}

#[tokio::test]
async fn failed_reload_keeps_previous_data() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let workflow = create_workflow(&owner, "A", &[ResourceTag::Contacts]).await;
  store.insert_contact(contact(owner.id(), None, "Sweet"));
  let data = CrmDataContext::new(store.clone());
  data.on_scope_change(Some(owner.id()), None).await.unwrap();

  store.fail_next(database::mem_store::StoreOp::SelectResources);
  assert!(data
    .on_scope_change(Some(owner.id()), Some(workflow.id))
    .await
    .is_err());
  assert_eq!(data.data().contacts.len(), 1);
  assert_eq!(data.loaded_key().unwrap().workflow_id, None);

  // a later attempt for the same scope reloads again
  assert!(data
    .on_scope_change(Some(owner.id()), Some(workflow.id))
    .await
    .unwrap());
  assert!(data.data().contacts.is_empty());
}

#[tokio::test]
async fn close_clears_loaded_resources_at_once() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  store.insert_contact(contact(owner.id(), None, "Sweet"));
  let client = ClientSession::open(store.clone(), owner.auth.clone());
  wait_until(|| client.data.data().contacts.len() == 1).await;

  client.close();
  assert_eq!(client.data.loaded_key(), None);
  assert!(client.data.data().contacts.is_empty());
  assert!(!client.session.is_subscribed());
  assert!(owner.auth.current_user().is_none());
}

#[tokio::test]
async fn reload_finishing_after_clear_is_dropped() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  store.insert_contact(contact(owner.id(), None, "Sweet"));
  let data = Arc::new(CrmDataContext::new(Arc::new(SlowContacts(store.clone()))));
  let key = ScopeKey {
    user_id: owner.id(),
    workflow_id: None,
  };

  let in_flight = tokio::spawn({
    let data = data.clone();
    async move { data.reload(key).await }
  });
  tokio::time::sleep(Duration::from_millis(20)).await;
  data.clear();
  in_flight.await.unwrap().unwrap();

  assert_eq!(data.loaded_key(), None);
  assert!(data.data().contacts.is_empty());
  assert_eq!(data.reload_count(), 0);
}
