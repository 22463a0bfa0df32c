use std::collections::BTreeSet;

use validator::ValidationError;

use crate::dto::ResourceTag;

pub(crate) fn validate_not_empty_str(s: &str) -> Result<(), ValidationError> {
  if s.trim().is_empty() {
    return Err(ValidationError::new("should not be empty string"));
  }
  Ok(())
}

pub(crate) fn validate_not_empty_tags(tags: &BTreeSet<ResourceTag>) -> Result<(), ValidationError> {
  if tags.is_empty() {
    return Err(ValidationError::new("should share at least one resource"));
  }
  Ok(())
}

/// An empty endpoint clears the current one, anything else must parse as an http(s) url.
pub(crate) fn validate_endpoint(endpoint: &str) -> Result<(), ValidationError> {
  if endpoint.is_empty() {
    return Ok(());
  }
  match url::Url::parse(endpoint) {
    Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
    _ => Err(ValidationError::new("should be an http(s) url")),
  }
}
