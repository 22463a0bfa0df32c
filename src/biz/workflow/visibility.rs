use database_entity::dto::{ResourceTag, Workflow};

/// Whether widgets for `tag` are shown under the active workflow. The personal scope sees
/// every resource type.
pub fn is_visible(tag: ResourceTag, active_workflow: Option<&Workflow>) -> bool {
  match active_workflow {
    None => true,
    Some(workflow) => workflow.shares(tag),
  }
}

/// The resource types visible under the active workflow, in display order.
pub fn visible_resources(active_workflow: Option<&Workflow>) -> Vec<ResourceTag> {
  ResourceTag::ALL
    .into_iter()
    .filter(|tag| is_visible(*tag, active_workflow))
    .collect()
}
