//! Authentication service.
//!
//! Passwords are verified by the backend; the storefront keeps the returned
//! auth token in the session and sends it with every request made on the
//! user's behalf.

mod error;

pub use error::AuthError;

use madio_core::{Email, UserRole};
use secrecy::{ExposeSecret, SecretString};
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::backend::{BackendClient, BackendError, FieldError, NewUser};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::cart::CartService;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form input.
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub password_confirm: SecretString,
}

/// Authentication service.
pub struct AuthService<'a> {
    client: &'a BackendClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when the backend answers 400.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<CurrentUser, AuthError> {
        match self.client.authenticate_user(email.trim(), password).await {
            Ok(auth) => Ok(CurrentUser::new(auth.record, auth.token)),
            Err(BackendError::Api { status: 400, .. }) => Err(AuthError::InvalidCredentials),
            Err(e) => Err(e.into()),
        }
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns a validation error before contacting the backend, or
    /// `AuthError::Rejected` with a message mapped from the backend's field
    /// errors.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<CurrentUser, AuthError> {
        validate_passwords(&registration.password, &registration.password_confirm)?;
        let email = Email::parse(&registration.email)?;

        let new_user = NewUser {
            name: registration.name.trim(),
            email: email.as_str(),
            email_visibility: true,
            password: registration.password.expose_secret(),
            password_confirm: registration.password_confirm.expose_secret(),
            role: UserRole::User,
        };

        if let Err(e) = self.client.register_user(&new_user).await {
            return Err(match e.field_errors() {
                Some(fields) => {
                    let (field, message) = registration_message(fields);
                    AuthError::Rejected { field, message }
                }
                None => e.into(),
            });
        }

        info!("Account created");
        self.login(email.as_str(), &registration.password).await
    }
}

/// Check password and confirmation locally.
///
/// # Errors
///
/// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword`.
pub fn validate_passwords(
    password: &SecretString,
    confirmation: &SecretString,
) -> Result<(), AuthError> {
    if password.expose_secret() != confirmation.expose_secret() {
        return Err(AuthError::PasswordMismatch);
    }
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Pick the message for the most relevant rejected field.
fn registration_message(
    fields: &std::collections::BTreeMap<String, FieldError>,
) -> (Option<String>, String) {
    const KNOWN: [(&str, &str); 5] = [
        ("email", "Email is invalid or already registered"),
        ("password", "Password must be at least 8 characters"),
        ("passwordConfirm", "Password and confirmation do not match"),
        ("name", "Name is required"),
        ("role", "Could not assign the account role"),
    ];

    for (field, message) in KNOWN {
        if fields.contains_key(field) {
            return (Some(field.to_string()), message.to_string());
        }
    }

    fields
        .iter()
        .find(|(_, error)| !error.message.is_empty())
        .map_or_else(
            || {
                (
                    None,
                    "Registration failed. Please check your details".to_string(),
                )
            },
            |(field, error)| (Some(field.clone()), error.message.clone()),
        )
}

/// Store the user in the session and start a fresh cart load (which merges
/// any anonymous cart).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in(session: &Session, user: &CurrentUser) -> Result<(), AuthError> {
    session.cycle_id().await?;
    set_current_user(session, user).await?;
    CartService::reset(session).await?;
    set_sentry_user(&user.id, Some(&user.email));
    Ok(())
}

/// Remove the user and cached cart from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_out(session: &Session) -> Result<(), AuthError> {
    clear_current_user(session).await?;
    CartService::reset(session).await?;
    session.cycle_id().await?;
    clear_sentry_user();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn field(message: &str) -> FieldError {
        FieldError {
            code: "validation_invalid".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_validate_passwords() {
        assert!(validate_passwords(&secret("longenough"), &secret("longenough")).is_ok());
        assert!(matches!(
            validate_passwords(&secret("longenough"), &secret("different1")),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            validate_passwords(&secret("short"), &secret("short")),
            Err(AuthError::WeakPassword(8))
        ));
    }

    #[test]
    fn test_registration_message_prefers_email() {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), field("Missing"));
        fields.insert("email".to_string(), field("Value must be unique."));
        let (field, message) = registration_message(&fields);
        assert_eq!(field.as_deref(), Some("email"));
        assert_eq!(message, "Email is invalid or already registered");
    }

    #[test]
    fn test_registration_message_falls_back_to_first_message() {
        let mut fields = BTreeMap::new();
        fields.insert("avatar".to_string(), field("File too large."));
        let (field, message) = registration_message(&fields);
        assert_eq!(field.as_deref(), Some("avatar"));
        assert_eq!(message, "File too large.");

        let mut fields = BTreeMap::new();
        fields.insert("avatar".to_string(), FieldError::default());
        let (_, message) = registration_message(&fields);
        assert_eq!(message, "Registration failed. Please check your details");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AuthError::InvalidCredentials.user_message(),
            "Email or password is incorrect"
        );
        assert_eq!(
            AuthError::WeakPassword(8).user_message(),
            "Password must be at least 8 characters"
        );
    }
}
