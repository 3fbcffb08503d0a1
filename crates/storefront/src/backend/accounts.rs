//! User accounts: authentication, registration and role management.

use madio_core::{UserId, UserRole};
use secrecy::SecretString;
use serde::Serialize;
use tracing::instrument;

use super::collections::{SUPERUSERS, USERS};
use super::query::{Filter, ListQuery};
use super::types::{AuthResponse, ListResult, NewUser, User};
use super::{BackendClient, BackendError};

impl BackendClient {
    /// Sign a shop user in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` with status 400 for wrong credentials.
    pub async fn authenticate_user(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthResponse<User>, BackendError> {
        self.auth_with_password(USERS, email, password).await
    }

    /// Sign in as a backend superuser and return the token.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` with status 400 for wrong credentials.
    pub async fn authenticate_superuser(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SecretString, BackendError> {
        let auth: AuthResponse<serde_json::Value> =
            self.auth_with_password(SUPERUSERS, email, password).await?;
        Ok(SecretString::from(auth.token))
    }

    /// Create a shop user account.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` with per-field errors (e.g. email taken).
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub async fn register_user(&self, user: &NewUser<'_>) -> Result<User, BackendError> {
        self.create(USERS, user, None).await
    }

    /// Newest users first.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller may not list users.
    pub async fn list_users(
        &self,
        limit: u32,
        auth: &SecretString,
    ) -> Result<Vec<User>, BackendError> {
        let query = ListQuery::new().per_page(limit).sort("-created");
        let page: ListResult<User> = self.list(USERS, &query, Some(auth)).await?;
        Ok(page.items)
    }

    /// Every user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller may not list users.
    pub async fn all_users(&self, auth: &SecretString) -> Result<Vec<User>, BackendError> {
        self.full_list(USERS, &ListQuery::new().sort("-created"), Some(auth))
            .await
    }

    /// Look a user up by email address.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if no user has that email.
    #[instrument(skip(self, auth))]
    pub async fn find_user_by_email(
        &self,
        email: &str,
        auth: &SecretString,
    ) -> Result<User, BackendError> {
        let query = ListQuery::new().filter(Filter::eq("email", email));
        self.first(USERS, &query, Some(auth)).await
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns an error if the user is missing or the caller may not update it.
    #[instrument(skip(self, auth), fields(user_id = %id, role = %role))]
    pub async fn set_user_role(
        &self,
        id: &UserId,
        role: UserRole,
        auth: &SecretString,
    ) -> Result<User, BackendError> {
        #[derive(Serialize)]
        struct RoleUpdate {
            role: UserRole,
        }

        self.update(USERS, id.as_str(), &RoleUpdate { role }, Some(auth))
            .await
    }
}
