use std::fmt::Display;
use std::str::FromStr;

pub fn get_env_var(key: &str, default: &str) -> String {
  std::env::var(key).unwrap_or_else(|e| {
    tracing::debug!(
      "failed to read environment variable:{}:{}, using default value: {}",
      e,
      key,
      default
    );
    default.to_owned()
  })
}

/// Optionally get an environment variable.
/// if value is empty, return None.
pub fn get_env_var_opt(key: &str) -> Option<String> {
  match std::env::var(key) {
    Ok(val) if val.is_empty() => None,
    Ok(val) => Some(val),
    Err(e) => {
      tracing::debug!("failed to read environment variable {}: {}, None set", key, e);
      None
    },
  }
}

/// Reads and parses `key`, falling back to `default` when the variable is unset or does not
/// parse as `T`.
pub fn get_env_var_parsed<T>(key: &str, default: T) -> T
where
  T: FromStr + Display,
  T::Err: Display,
{
  match get_env_var_opt(key) {
    None => default,
    Some(raw) => raw.parse::<T>().unwrap_or_else(|err| {
      tracing::warn!(
        "environment variable {}={} is invalid: {}, using default value: {}",
        key,
        raw,
        err,
        default
      );
      default
    }),
  }
}
