pub mod token;

use regex::Regex;
use std::sync::OnceLock;

/// 1 to 16 characters of letters, digits, `_` or `-`.
pub fn valid_username(name: &str) -> bool {
  static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
  NAME_REGEX
    .get_or_init(|| Regex::new(r"^[0-9A-Za-z_\-]{1,16}$").expect("static regex"))
    .is_match(name)
}
