use assert_json_diff::assert_json_eq;
use database::mem_store::StoreOp;
use database_entity::dto::{MembershipStatus, NotificationType, ResourceTag, WorkflowRole};
use serde_json::json;
use turf_crm::biz::workflow::steps::NOTIFY_CREATOR;

use crate::util::{create_workflow, mem_store, register_user};

#[tokio::test]
async fn unknown_share_code_is_rejected_without_membership() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;

  let err = requester.service.join_workflow("ZZZZZZ").await.unwrap_err();
  assert!(err.is_invalid_share_code());
  assert_eq!(store.memberships().len(), 1);
  assert!(store.notifications().is_empty());
}

#[tokio::test]
async fn join_creates_pending_membership_and_notifies_creator() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;

  let membership = requester
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap();
  assert_eq!(membership.workflow_id, workflow.id);
  assert_eq!(membership.user_id, requester.id());
  assert_eq!(membership.role, WorkflowRole::Member);
  assert_eq!(membership.status, MembershipStatus::Pending);

  let notifications = owner.service.list_notifications().await.unwrap();
  assert_eq!(notifications.len(), 1);
  let request = &notifications[0];
  assert_eq!(request.kind, NotificationType::JoinRequest);
  assert!(!request.read);
  assert_eq!(
    request.content,
    "User ryder@grove.street wants to join your workflow."
  );
  assert_json_eq!(
    request.data,
    json!({
      "workflow_id": workflow.id,
      "requester_id": requester.id(),
      "membership_id": membership.id,
    })
  );
  assert!(requester
    .service
    .list_notifications()
    .await
    .unwrap()
    .is_empty());
}

#[tokio::test]
async fn typed_share_code_is_case_insensitive() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;

  let typed = format!(" {} ", workflow.share_code.to_lowercase());
  let membership = requester.service.join_workflow(&typed).await.unwrap();
  assert_eq!(membership.workflow_id, workflow.id);
}

#[tokio::test]
async fn joining_twice_is_rejected() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;

  requester
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap();
  let err = requester
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap_err();
  assert!(err.is_already_member());

  let requester_rows = store
    .memberships()
    .into_iter()
    .filter(|m| m.user_id == requester.id())
    .count();
  assert_eq!(requester_rows, 1);
  assert_eq!(store.notifications().len(), 1);
}

#[tokio::test]
async fn creator_cannot_join_own_workflow() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;

  let err = owner
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap_err();
  assert!(err.is_already_member());
}

#[tokio::test]
async fn pending_workflow_is_listed_for_requester() {
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
    requester.service.list_workflows().await.unwrap(),
    vec![workflow]
  );
}

#[tokio::test]
async fn failed_creator_notification_keeps_pending_membership() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Contacts]).await;
  store.fail_next(StoreOp::InsertNotification);

  let err = requester
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap_err();
  assert_eq!(err.failed_step(), Some(NOTIFY_CREATOR));
  assert!(store
    .memberships()
    .iter()
    .any(|m| m.user_id == requester.id() && m.status == MembershipStatus::Pending));
  assert!(store.notifications().is_empty());
}
