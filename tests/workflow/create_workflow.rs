use app_error::AppError;
use database::mem_store::StoreOp;
use database_entity::dto::{MembershipStatus, ResourceTag, WorkflowChangeset, WorkflowRole};
use turf_crm::biz::workflow::share_code::is_well_formed;
use turf_crm::biz::workflow::steps::INSERT_CREATOR_MEMBERSHIP;
use turf_crm::biz::workflow::visibility::is_visible;

use crate::util::{create_params, create_workflow, mem_store, register_user};

#[tokio::test]
async fn create_workflow_inserts_workflow_and_admin_membership() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let workflow = create_workflow(
    &owner,
    "Sales Team A",
    &[ResourceTag::Contacts, ResourceTag::Deals],
  )
  .await;

  assert_eq!(store.workflows(), vec![workflow.clone()]);
  assert_eq!(workflow.name, "Sales Team A");
  assert_eq!(workflow.creator_id, owner.id());
  assert!(is_well_formed(&workflow.share_code));

  let memberships = store.memberships();
  assert_eq!(memberships.len(), 1);
  assert_eq!(memberships[0].workflow_id, workflow.id);
  assert_eq!(memberships[0].user_id, owner.id());
  assert_eq!(memberships[0].role, WorkflowRole::Admin);
  assert_eq!(memberships[0].status, MembershipStatus::Accepted);

  assert!(!is_visible(ResourceTag::Tasks, Some(&workflow)));
  assert!(is_visible(ResourceTag::Contacts, Some(&workflow)));
  assert!(is_visible(ResourceTag::Deals, Some(&workflow)));
}

#[tokio::test]
async fn create_workflow_requires_sign_in() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  owner.auth.sign_out();

  let err = owner
    .service
    .create_workflow(create_params("Sales Team A", &[ResourceTag::Contacts]))
    .await
    .unwrap_err();
  assert!(err.is_authentication_required());
  assert!(store.workflows().is_empty());
}

#[tokio::test]
async fn failed_workflow_insert_is_a_plain_store_failure() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  store.fail_next(StoreOp::InsertWorkflow);

  let err = owner
    .service
    .create_workflow(create_params("Sales Team A", &[ResourceTag::Contacts]))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::StoreFailure(_)));
  assert!(store.workflows().is_empty());
  assert!(store.memberships().is_empty());
}

#[tokio::test]
async fn failed_creator_membership_leaves_orphan_workflow() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  store.fail_next(StoreOp::InsertMembership);

  let err = owner
    .service
    .create_workflow(create_params("Sales Team A", &[ResourceTag::Contacts]))
    .await
    .unwrap_err();
  assert_eq!(err.failed_step(), Some(INSERT_CREATOR_MEMBERSHIP));
  assert_eq!(store.workflows().len(), 1);
  assert!(store.memberships().is_empty());
}

#[tokio::test]
async fn workflows_are_listed_only_for_members() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let stranger = register_user(&store, "Tenpenny");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Tasks]).await;

  assert_eq!(owner.service.list_workflows().await.unwrap(), vec![workflow]);
  assert!(stranger.service.list_workflows().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_workflow_changes_only_given_fields() {
  let store = mem_store();
  let owner = register_user(&store, "Carl");
  let workflow = create_workflow(&owner, "Grove", &[ResourceTag::Tasks]).await;

  let updated = owner
    .service
    .update_workflow(
      &workflow.id,
      WorkflowChangeset {
        notification_url: Some("https://hooks.grove.street/crm".to_string()),
        ..Default::default()
      },
    )
    .await
    .unwrap();
  assert_eq!(updated.name, "Grove");
  assert_eq!(updated.shared_resources, workflow.shared_resources);
  assert_eq!(
    updated.notification_url.as_deref(),
    Some("https://hooks.grove.street/crm")
  );

  let cleared = owner
    .service
    .update_workflow(
      &workflow.id,
      WorkflowChangeset {
        notification_url: Some(String::new()),
        ..Default::default()
      },
    )
    .await
    .unwrap();
  assert_eq!(cleared.notification_url, None);

  let unchanged = owner
    .service
    .update_workflow(&workflow.id, WorkflowChangeset::default())
    .await
    .unwrap();
  assert_eq!(unchanged, cleared);
}
