//! Screen-level state and handlers.
//!
//! Each view owns its local state (form fields, modal visibility, messages)
//! and talks to the backend only through the accessors in `crate::api`.
//! Handlers return an `Outcome` telling the console whether to stay or
//! navigate; rendering lives in `crate::cli`.

pub mod dashboard;
pub mod login;
pub mod profile;
pub mod register;

use crate::router::Route;
use crate::session::Session;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 8;

pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters.";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Stay,
    Navigate(Route),
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Trimmed value, or `None` for a blank field
pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Tear down the session and return to login
pub fn logout(session: &mut Session) -> Result<Outcome> {
    session.logout()?;
    Ok(Outcome::Navigate(Route::Login))
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email(" ana.souza+x@mail.example.com.br "));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("ana example@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  "), None);
        assert_eq!(non_blank(" Ana "), Some("Ana".to_string()));
    }

    #[test]
    fn test_logout_clears_token() {
        let dir = TempDir::new().unwrap();
        let mut session = testing::session_with_role(&dir, "1", "USER");
        assert_eq!(
            logout(&mut session).unwrap(),
            Outcome::Navigate(Route::Login)
        );
        assert!(session.token().is_none());
    }
}
