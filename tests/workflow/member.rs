use app_error::AppError;
use database_entity::dto::{MembershipStatus, ResourceTag};

use crate::util::{create_workflow, mem_store, register_user};

#[tokio::test]
async fn members_carry_display_identity() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Deals]).await;
  requester
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap();

  let members = owner.service.list_members(&workflow.id).await.unwrap();
  assert_eq!(members.len(), 2);
  let pending = members
    .iter()
    .find(|m| m.membership.status == MembershipStatus::Pending)
    .unwrap();
  let profile = pending.user.as_ref().unwrap();
  assert_eq!(profile.id, requester.id());
  assert_eq!(profile.display_name(), "Ryder");
}

#[tokio::test]
async fn creator_removes_member_but_not_self() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let requester = register_user(&store, "Ryder");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Deals]).await;
  let membership = requester
    .service
    .join_workflow(&workflow.share_code)
    .await
    .unwrap();
  let owner_membership = store
    .memberships()
    .into_iter()
    .find(|m| m.user_id == owner.id())
    .unwrap();

  let owner_session = owner.session();
  let err = owner_session
    .remove_member(&workflow, &owner_membership)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::InvalidRequest(_)));

  let requester_session = requester.session();
  let err = requester_session
    .remove_member(&workflow, &owner_membership)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::NotEnoughPermissions { .. }));

  owner_session
    .remove_member(&workflow, &membership)
    .await
    .unwrap();
  assert_eq!(store.memberships(), vec![owner_membership]);
}
