//! Authentication route handlers.
//!
//! Credentials are checked by the backend; on success the user and their
//! backend token are stored in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Chrome, safe_redirect, set_flash};
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Flash;
use crate::services::auth::{self, AuthError, AuthService, MIN_PASSWORD_LENGTH, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Page to return to after signing in.
    #[serde(default)]
    pub redirect: Option<String>,
}

/// `?redirect=` on the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub chrome: Chrome,
    pub email: String,
    pub redirect: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub chrome: Chrome,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
    pub min_password_length: usize,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    chrome: Chrome,
    Query(query): Query<LoginQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginTemplate {
        chrome,
        email: String::new(),
        redirect: query
            .redirect
            .as_deref()
            .map(|target| safe_redirect(Some(target), "/"))
            .unwrap_or_default(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, chrome, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    chrome: Chrome,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let password = SecretString::from(form.password);
    match AuthService::new(state.backend())
        .login(&form.email, &password)
        .await
    {
        Ok(user) => {
            auth::sign_in(&session, &user).await?;
            tracing::info!(user_id = %user.id, "User logged in");
            set_flash(&session, Flash::success(format!("Welcome back, {}", user.display_name()))).await;
            let fallback = if user.is_admin() { "/admin" } else { "/" };
            let target = safe_redirect(form.redirect.as_deref().filter(|r| !r.is_empty()), fallback);
            Ok(Redirect::to(&target).into_response())
        }
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            let error = match e {
                AuthError::InvalidCredentials => e.user_message(),
                _ => "Sign in failed. Please try again".to_string(),
            };
            Ok(LoginTemplate {
                chrome,
                email: form.email,
                redirect: form.redirect.unwrap_or_default(),
                error: Some(error),
            }
            .into_response())
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(OptionalAuth(user): OptionalAuth, chrome: Chrome) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    RegisterTemplate {
        chrome,
        name: String::new(),
        email: String::new(),
        error: None,
        min_password_length: MIN_PASSWORD_LENGTH,
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip(state, session, chrome, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    chrome: Chrome,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let registration = Registration {
        name: form.name.clone(),
        email: form.email.clone(),
        password: SecretString::from(form.password),
        password_confirm: SecretString::from(form.password_confirm),
    };

    match AuthService::new(state.backend())
        .register(&registration)
        .await
    {
        Ok(user) => {
            auth::sign_in(&session, &user).await?;
            tracing::info!(user_id = %user.id, "User registered");
            set_flash(&session, Flash::success("Your account is ready")).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            Ok(RegisterTemplate {
                chrome,
                name: form.name,
                email: form.email,
                error: Some(e.user_message()),
                min_password_length: MIN_PASSWORD_LENGTH,
            }
            .into_response())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out and return to the home page.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    auth::sign_out(&session).await?;
    Ok(Redirect::to("/"))
}
