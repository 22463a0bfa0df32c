use database_entity::dto::ResourceTag;
use turf_crm::biz::crm::data_context::CrmDataContext;

use crate::util::{contact, create_workflow, deal, mem_store, register_user, task};

#[tokio::test]
async fn contacts_carry_task_and_deal_summaries() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let sweet = contact(owner.id(), None, "Sweet");
  let ryder = contact(owner.id(), None, "Ryder");
  let mission = task(owner.id(), None, "Meet at Grove Street", Some(sweet.id));
  let heist = deal(owner.id(), None, "Rooftop deal", Some(sweet.id));
  store.insert_contact(sweet.clone());
  store.insert_contact(ryder.clone());
  store.insert_task(mission.clone());
  store.insert_task(task(owner.id(), None, "Unlinked", None));
  store.insert_deal(heist.clone());

  let data = CrmDataContext::new(store.clone());
  data.on_scope_change(Some(owner.id()), None).await.unwrap();
  let loaded = data.data();

  let sweet = loaded.contacts.iter().find(|c| c.id == sweet.id).unwrap();
  assert_eq!(sweet.tasks, vec![mission.summary()]);
  assert_eq!(sweet.deals, vec![heist.summary()]);
  let ryder = loaded.contacts.iter().find(|c| c.id == ryder.id).unwrap();
  assert!(ryder.tasks.is_empty());
  assert!(ryder.deals.is_empty());

  let board = loaded.deal_board();
  assert_eq!(board.iter().map(|c| c.items.len()).sum::<usize>(), 1);
}

#[tokio::test]
async fn personal_and_workflow_scopes_do_not_mix() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;
  store.insert_contact(contact(owner.id(), None, "Personal"));
  store.insert_contact(contact(owner.id(), Some(workflow.id), "Shared"));

  let data = CrmDataContext::new(store.clone());
  data.on_scope_change(Some(owner.id()), None).await.unwrap();
  let names = data
    .data()
    .contacts
    .into_iter()
    .map(|c| c.name)
    .collect::<Vec<_>>();
  assert_eq!(names, vec!["Personal"]);

  data
    .on_scope_change(Some(owner.id()), Some(workflow.id))
    .await
    .unwrap();
  let names = data
    .data()
    .contacts
    .into_iter()
    .map(|c| c.name)
    .collect::<Vec<_>>();
  assert_eq!(names, vec!["Shared"]);
}

#[tokio::test]
async fn workflow_resources_need_an_accepted_membership() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;
  store.insert_contact(contact(owner.id(), Some(workflow.id), "Shared"));
  requester
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap();

  let data = CrmDataContext::new(store.clone());
  data
    .on_scope_change(Some(requester.id()), Some(workflow.id))
    .await
    .unwrap();
  assert!(data.data().contacts.is_empty());

  let request = owner.service.list_notifications().await.unwrap().remove(0);
  owner.service.accept_join_request(&request).await.unwrap();
  data.clear();
  data
    .on_scope_change(Some(requester.id()), Some(workflow.id))
    .await
    .unwrap();
  assert_eq!(data.data().contacts.len(), 1);
}

#[tokio::test]
async fn deleting_workflow_detaches_its_resources() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;
  store.insert_contact(contact(owner.id(), Some(workflow.id), "Shared"));

  owner.service.delete_workflow(&workflow.id).await.unwrap();
  assert!(store.workflows().is_empty());
  assert!(store.memberships().is_empty());
  assert!(store.contacts().iter().all(|c| c.workflow_id.is_none()));

  let data = CrmDataContext::new(store.clone());
  data.on_scope_change(Some(owner.id()), None).await.unwrap();
  assert_eq!(data.data().contacts.len(), 1);
}
