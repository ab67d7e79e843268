//! Username validation module
//!
//! Usernames are the primary lookup key for the whole protocol, so they are
//! normalized and validated before any storage access. A name that fails
//! here never reaches the store or the challenge ledger.

use crate::error::{AppError, AppResult};

/// Maximum accepted username length after normalization
pub const MAX_USERNAME_LEN: usize = 64;

/// Characters allowed in a username besides ASCII alphanumerics
const EXTRA_CHARS: &[char] = &['.', '_', '-'];

/// Normalize and validate a username
///
/// Normalization: surrounding whitespace is trimmed and the name is
/// lowercased, so `"Alice"` and `"alice"` address the same account.
///
/// Accepts 1..=64 characters drawn from `[a-z0-9._-]`, starting with an
/// alphanumeric.
pub fn normalize_username(raw: &str) -> AppResult<String> {
    let name = raw.trim().to_lowercase();

    if name.is_empty() {
        return Err(AppError::InvalidUsername(
            "username must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_USERNAME_LEN {
        return Err(AppError::InvalidUsername(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || EXTRA_CHARS.contains(&c))
    {
        return Err(AppError::InvalidUsername(
            "username may only contain a-z, 0-9, '.', '_' and '-'".to_string(),
        ));
    }
    // First character must be alphanumeric so names like "-x" or ".." are out
    if !name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidUsername(
            "username must start with a letter or digit".to_string(),
        ));
    }

    Ok(name)
}

/// Normalize a display name, falling back to the username when absent
///
/// Display names are cosmetic only; they are trimmed and capped, never
/// rejected.
pub fn normalize_display_name(raw: Option<&str>, username: &str) -> String {
    let name = raw.map(str::trim).unwrap_or("");
    if name.is_empty() {
        username.to_string()
    } else {
        name.chars().take(128).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize_username("  Alice ").unwrap(), "alice");
        assert_eq!(normalize_username("BOB.T-1").unwrap(), "bob.t-1");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(normalize_username("").is_err());
        assert!(normalize_username("   ").is_err());
    }

    #[test]
    fn test_rejects_bad_characters() {
        assert!(normalize_username("alice smith").is_err());
        assert!(normalize_username("alice@example").is_err());
        assert!(normalize_username("al/ce").is_err());
    }

    #[test]
    fn test_rejects_bad_first_character() {
        assert!(normalize_username("-alice").is_err());
        assert!(normalize_username(".alice").is_err());
    }

    #[test]
    fn test_rejects_overlong() {
        let long = "a".repeat(MAX_USERNAME_LEN + 1);
        assert!(normalize_username(&long).is_err());
        let max = "a".repeat(MAX_USERNAME_LEN);
        assert!(normalize_username(&max).is_ok());
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(normalize_display_name(None, "alice"), "alice");
        assert_eq!(normalize_display_name(Some("  "), "alice"), "alice");
        assert_eq!(normalize_display_name(Some("Alice S"), "alice"), "Alice S");
    }
}
