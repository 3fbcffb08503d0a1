//! Admin user list.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::ADMIN_LIST_LIMIT;
use crate::backend::User;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::Chrome;
use crate::state::AppState;

/// User row for the admin table.
#[derive(Clone)]
pub struct AdminUserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: &'static str,
    pub is_admin: bool,
    pub created: String,
}

impl From<&User> for AdminUserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str(),
            is_admin: user.role.is_admin(),
            created: user.created.clone(),
        }
    }
}

/// Admin user list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct AdminUsersTemplate {
    pub chrome: Chrome,
    pub users: Vec<AdminUserRow>,
    pub admin_count: usize,
    pub customer_count: usize,
}

/// List the newest users.
#[instrument(skip(state, admin, chrome), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    chrome: Chrome,
) -> Result<impl IntoResponse, AppError> {
    let users = state
        .backend()
        .list_users(ADMIN_LIST_LIMIT, &admin.token)
        .await?;
    let admin_count = users.iter().filter(|u| u.role.is_admin()).count();

    Ok(AdminUsersTemplate {
        chrome,
        admin_count,
        customer_count: users.len() - admin_count,
        users: users.iter().map(AdminUserRow::from).collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::routes::NavUser;

    #[test]
    fn test_users_page_renders_inside_admin_layout() {
        let html = AdminUsersTemplate {
            chrome: Chrome {
                user: Some(NavUser {
                    name: "Admin".to_string(),
                    is_admin: true,
                }),
                ..Chrome::default()
            },
            users: vec![AdminUserRow {
                id: "u1".to_string(),
                name: "Sara Ahmadi".to_string(),
                email: "sara@madio.ir".to_string(),
                role: "user",
                is_admin: false,
                created: "2026-03-01 10:15:00.000Z".to_string(),
            }],
            admin_count: 1,
            customer_count: 1,
        }
        .render()
        .unwrap();

        assert!(html.contains("Back office"));
        assert!(html.contains("sara@madio.ir"));
        assert!(html.contains("2026-03-01"));
        assert!(html.contains("Madio. Prices in Toman."));
    }
}
