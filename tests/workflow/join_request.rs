use app_error::AppError;
use database::mem_store::StoreOp;
use database_entity::dto::{
  MembershipStatus, NewNotification, Notification, NotificationType, ResourceTag,
};
use turf_crm::biz::workflow::steps::NOTIFY_REQUESTER;

use crate::util::{create_workflow, mem_store, register_user, TestUser};

async fn pending_request(owner: &TestUser, requester: &TestUser) -> Notification {
  let workflow = create_workflow(owner, "Grove", &[ResourceTag::Contacts]).await;
  requester
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap();
  owner
    .service
    .list_notifications()
    .await
    .unwrap()
    .into_iter()
    .find(|n| n.kind == NotificationType::JoinRequest)
    .unwrap()
}

#[tokio::test]
async fn accept_join_request_flow() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let request = pending_request(&owner, &requester).await;

  let membership = owner.service.accept_join_request(&request).await.unwrap();
  assert_eq!(membership.id, request.membership_id().unwrap());
  assert_eq!(membership.status, MembershipStatus::Accepted);

  let accepted = requester.service.list_notifications().await.unwrap();
  assert_eq!(accepted.len(), 1);
  assert_eq!(accepted[0].kind, NotificationType::JoinAccepted);
  assert_eq!(accepted[0].user_id, requester.id());
  assert_eq!(
    accepted[0].content,
    "Your request to join workflow has been accepted."
  );
  assert_eq!(
    accepted[0].payload().unwrap().workflow_id,
    Some(membership.workflow_id)
  );

  let owner_notifications = owner.service.list_notifications().await.unwrap();
  assert_eq!(owner_notifications.len(), 1);
  assert!(owner_notifications[0].read);
}

#[tokio::test]
async fn only_the_recipient_can_answer_a_join_request() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let request = pending_request(&owner, &requester).await;

  let err = requester
    .service
    .accept_join_request(&request)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::NotEnoughPermissions { .. }));
  assert!(store
    .memberships()
    .iter()
    .any(|m| m.user_id == requester.id() && m.status == MembershipStatus::Pending));
}

#[tokio::test]
async fn accepting_a_reminder_is_rejected() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let reminder = owner
    .service
    .create_notification(NewNotification::reminder(
      owner.id(),
      "Mission Reminder: meet Sweet",
      "task",
      uuid::Uuid::new_v4(),
      "/tasks",
    ))
    .await
    .unwrap();

  let err = owner
    .service
    .accept_join_request(&reminder)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::InvalidRequest(_)));
}

#[tokio::test]
async fn failed_requester_notification_reports_step_and_keeps_acceptance() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let request = pending_request(&owner, &requester).await;
  store.fail_next(StoreOp::InsertNotification);

  let err = owner
    .service
    .accept_join_request(&request)
    .await
    .unwrap_err();
  assert_eq!(err.failed_step(), Some(NOTIFY_REQUESTER));
  match err {
    AppError::PartialWrite { completed, .. } => assert_eq!(completed, 1),
    other => panic!("unexpected error: {:?}", other),
  }

  assert!(store
    .memberships()
    .iter()
    .any(|m| m.user_id == requester.id() && m.status == MembershipStatus::Accepted));
  assert!(requester
    .service
    .list_notifications()
    .await
    .unwrap()
    .is_empty());
  assert!(!owner.service.list_notifications().await.unwrap()[0].read);
}

#[tokio::test]
async fn decline_marks_membership_declined_and_request_read() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let request = pending_request(&owner, &requester).await;

  let membership = owner.service.decline_join_request(&request).await.unwrap();
  assert_eq!(membership.status, MembershipStatus::Declined);
  assert!(owner.service.list_notifications().await.unwrap()[0].read);
  assert!(requester
    .service
    .list_notifications()
    .await
    .unwrap()
    .is_empty());

  // declined workflows are no longer listed, and the row still blocks another request
  assert!(requester.service.list_workflows().await.unwrap().is_empty());
  let workflow = store.workflows().remove(0);
  let err = requester
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap_err();
  assert!(err.is_already_member());
}

#[tokio::test]
async fn accepting_the_same_request_twice_is_rejected() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let request = pending_request(&owner, &requester).await;

  owner.service.accept_join_request(&request).await.unwrap();
  let err = owner
    .service
    .accept_join_request(&request)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::InvalidRequest(_)));

  let accepted = requester.service.list_notifications().await.unwrap();
  assert_eq!(accepted.len(), 1);
  assert_eq!(accepted[0].kind, NotificationType::JoinAccepted);
}

#[tokio::test]
async fn a_declined_request_cannot_be_accepted_later() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let request = pending_request(&owner, &requester).await;

  owner.service.decline_join_request(&request).await.unwrap();
  // the stale copy still says unread, the stored membership decides
  let err = owner
    .service
    .accept_join_request(&request)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::InvalidRequest(_)));

  let reread = owner.service.list_notifications().await.unwrap().remove(0);
  assert!(reread.read);
  let err = owner
    .service
    .accept_join_request(&reread)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::InvalidRequest(_)));

  assert!(store
    .memberships()
    .iter()
    .any(|m| m.user_id == requester.id() && m.status == MembershipStatus::Declined));
  assert!(requester
    .service
    .list_notifications()
    .await
    .unwrap()
    .is_empty());
}
