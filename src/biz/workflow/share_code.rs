use database_entity::dto::SHARE_CODE_LENGTH;
use rand::Rng;

const SHARE_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random uppercase base-36 code. Uniqueness is left to the store's unique constraint.
pub fn generate_share_code() -> String {
  let mut rng = rand::thread_rng();
  (0..SHARE_CODE_LENGTH)
    .map(|_| {
      let idx = rng.gen_range(0..SHARE_CODE_CHARSET.len());
      SHARE_CODE_CHARSET[idx] as char
    })
    .collect()
}

/// Codes are typed by hand, so surrounding whitespace and case are ignored.
pub fn normalize_share_code(code: &str) -> String {
  code.trim().to_ascii_uppercase()
}

pub fn is_well_formed(code: &str) -> bool {
  code.len() == SHARE_CODE_LENGTH
    && code
      .bytes()
      .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
