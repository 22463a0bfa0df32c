use database::mem_store::StoreOp;
use database_entity::dto::ResourceTag;

use crate::util::{create_workflow, mem_store, register_user};

#[tokio::test]
async fn notifications_are_listed_newest_first() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;
  for name in ["Ryder", "Sweet", "Kendl"] {
    let requester = register_user(&store, name);
    requester
      .service
      .join_workflow(&workflow.share_code)
      .await
      .unwrap();
  }

  let contents = owner
    .service
    .list_notifications()
    .await
    .unwrap()
    .into_iter()
    .map(|n| n.content)
    .collect::<Vec<_>>();
  assert_eq!(
    contents,
    vec![
      "User kendl@grove.street wants to join your workflow.",
      "User sweet@grove.street wants to join your workflow.",
      "User ryder@grove.street wants to join your workflow.",
    ]
  );
}

#[tokio::test]
async fn mark_all_read_is_idempotent() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;
  for name in ["Ryder", "Sweet"] {
    let requester = register_user(&store, name);
    requester
      .service
      .join_workflow(&workflow.share_code)
      .await
      .unwrap();
  }

  assert_eq!(owner.service.mark_all_notifications_read().await.unwrap(), 2);
  let first = owner.service.list_notifications().await.unwrap();
  assert!(first.iter().all(|n| n.read));

  assert_eq!(owner.service.mark_all_notifications_read().await.unwrap(), 0);
  let second = owner.service.list_notifications().await.unwrap();
  assert_eq!(first, second);
}

#[tokio::test]
async fn mark_all_read_leaves_other_recipients_alone() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;
  requester
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap();

  assert_eq!(
    requester.service.mark_all_notifications_read().await.unwrap(),
    0
  );
  assert!(!owner.service.list_notifications().await.unwrap()[0].read);
}

#[tokio::test]
async fn failed_list_is_reported() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  store.fail_next(StoreOp::SelectNotifications);
  assert!(owner.service.list_notifications().await.is_err());
  assert!(owner.service.list_notifications().await.unwrap().is_empty());
}
