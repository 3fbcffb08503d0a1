//! Session-related types.
//!
//! Types stored in the session for authentication state.

use madio_core::{UserId, UserRole};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::backend::User;

/// Session-stored user identity.
///
/// Holds the backend auth token so requests made on the user's behalf are
/// authorized by the backend's collection rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's record ID.
    pub id: UserId,
    /// User's email address.
    pub email: String,
    /// Display name (may be empty).
    pub name: String,
    /// Role at sign-in time.
    pub role: UserRole,
    /// Backend auth token.
    #[serde(with = "token")]
    pub token: SecretString,
}

impl CurrentUser {
    /// Build the session identity from a backend auth response.
    #[must_use]
    pub fn new(user: User, token: String) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            token: SecretString::from(token),
        }
    }

    /// Whether the user may open the admin screens.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Severity of a one-shot notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

impl FlashLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A notice shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the cached cart state of this session.
    pub const CART: &str = "cart";

    /// Key for the anonymous visitor's stored cart.
    pub const GUEST_CART: &str = "madio_cart";

    /// Key for a pending one-shot notice.
    pub const FLASH: &str = "flash";
}

/// Session stores are server-side; the token is kept as a plain string there
/// and wrapped again on load.
mod token {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(token: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(token.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new("u1"),
            email: "sara@example.com".to_string(),
            name: String::new(),
            role: UserRole::User,
            token: SecretString::from("tok-123"),
        }
    }

    #[test]
    fn test_current_user_session_roundtrip() {
        let json = serde_json::to_string(&user()).unwrap();
        let parsed: CurrentUser = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.token.expose_secret(), "tok-123");
        assert_eq!(parsed.id, UserId::new("u1"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug_output = format!("{:?}", user());
        assert!(!debug_output.contains("tok-123"));
    }

    #[test]
    fn test_display_name_and_role() {
        let mut current = user();
        assert_eq!(current.display_name(), "sara@example.com");
        assert!(!current.is_admin());
        current.name = "Sara".to_string();
        current.role = UserRole::Admin;
        assert_eq!(current.display_name(), "Sara");
        assert!(current.is_admin());
    }
}
