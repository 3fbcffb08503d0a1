//! Authentication extractors.
//!
//! The signed-in user lives in the session under `current_user`. These
//! extractors only gate navigation; the backend's access rules are what
//! actually protect the data.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// Anonymous visitors are redirected to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in admin.
///
/// Anonymous visitors go to the login page, other users to the home page.
pub struct RequireAdmin(pub CurrentUser);

/// Rejection for the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not signed in.
    RedirectToLogin,
    /// Signed in without the admin role.
    RedirectToHome,
    /// No session layer on the route.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::RedirectToHome => Redirect::to("/").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

async fn session_user(parts: &Parts) -> Result<Option<CurrentUser>, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    Ok(session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten())
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await?
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await?
            .ok_or(AuthRejection::RedirectToLogin)?;
        if !user.is_admin() {
            return Err(AuthRejection::RedirectToHome);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this never rejects the request.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await.ok().flatten()))
    }
}

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the signed-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, http::header, routing::get};
    use madio_core::{UserId, UserRole};
    use secrecy::SecretString;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    fn user(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new("u1"),
            email: "user@example.com".to_string(),
            name: "User".to_string(),
            role,
            token: SecretString::from("token".to_string()),
        }
    }

    async fn sign_in_as(role: Option<UserRole>, session: Session) -> &'static str {
        if let Some(role) = role {
            set_current_user(&session, &user(role)).await.unwrap();
        }
        "signed in"
    }

    async fn admin_page(RequireAdmin(user): RequireAdmin) -> String {
        format!("admin {}", user.id)
    }

    async fn account_page(RequireAuth(user): RequireAuth) -> String {
        format!("account {}", user.id)
    }

    async fn optional_page(OptionalAuth(user): OptionalAuth) -> &'static str {
        if user.is_some() { "known" } else { "guest" }
    }

    fn app(role: Option<UserRole>) -> Router {
        Router::new()
            .route("/signin", get(move |session: Session| sign_in_as(role, session)))
            .route("/admin", get(admin_page))
            .route("/dashboard", get(account_page))
            .route("/optional", get(optional_page))
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
    }

    /// Sign in through the app and return the session cookie.
    async fn cookie(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(Request::get("/signin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    async fn get_with(app: &Router, path: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::get(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_redirected_to_login() {
        let app = app(None);
        for path in ["/admin", "/dashboard"] {
            let response = get_with(&app, path, None).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/login");
        }
        let response = get_with(&app, "/optional", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_admin_redirected_home() {
        let app = app(Some(UserRole::User));
        let cookie = cookie(&app).await;

        let response = get_with(&app, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let response = get_with(&app, "/dashboard", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_allowed() {
        let app = app(Some(UserRole::Admin));
        let cookie = cookie(&app).await;
        let response = get_with(&app, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_session_layer_is_unauthorized() {
        let app = Router::new().route("/dashboard", get(account_page));
        let response = get_with(&app, "/dashboard", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
