//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] madio_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Password too short.
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    /// The backend refused to create the account.
    #[error("registration rejected: {message}")]
    Rejected {
        /// Field the backend complained about, if any.
        field: Option<String>,
        message: String,
    },

    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session could not be updated.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Message to show on the login or registration form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(e) => format!("Email is invalid: {e}"),
            Self::InvalidCredentials => "Email or password is incorrect".to_string(),
            Self::PasswordMismatch => "Password and confirmation do not match".to_string(),
            Self::WeakPassword(min) => format!("Password must be at least {min} characters"),
            Self::Rejected { message, .. } => message.clone(),
            Self::Backend(_) | Self::Session(_) => {
                "Something went wrong. Please try again".to_string()
            }
        }
    }
}
