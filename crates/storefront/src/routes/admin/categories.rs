//! Admin category management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect},
};
use madio_core::CategoryId;
use tower_sessions::Session;
use tracing::instrument;

use super::products::EditQuery;
use super::{SubmittedForm, failure_message};
use crate::backend::{Category, CategoryInput, collections};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::routes::{Chrome, set_flash};
use crate::state::AppState;

/// Category row for the admin table.
#[derive(Clone)]
pub struct AdminCategoryRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub thumb_url: Option<String>,
}

/// Values of the create/edit form.
#[derive(Clone, Default)]
pub struct CategoryFormView {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub image_url: Option<String>,
}

impl CategoryFormView {
    #[must_use]
    pub fn action(&self) -> String {
        self.id.as_ref().map_or_else(
            || "/admin/categories".to_string(),
            |id| format!("/admin/categories/{id}"),
        )
    }
}

/// Admin category list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/categories.html")]
pub struct AdminCategoriesTemplate {
    pub chrome: Chrome,
    pub categories: Vec<AdminCategoryRow>,
    pub form: CategoryFormView,
}

/// Parse the submitted category form.
///
/// # Errors
///
/// Returns a message naming the first missing field.
pub fn parse_category(form: &mut SubmittedForm) -> Result<CategoryInput, String> {
    let name = form.text("name");
    if name.is_empty() {
        return Err("Category name is required".to_string());
    }
    let icon = form.text("icon");
    if icon.is_empty() {
        return Err("Category icon is required".to_string());
    }
    Ok(CategoryInput {
        name: name.to_string(),
        description: form.text("description").to_string(),
        icon: icon.to_string(),
        image: form.take_image(),
    })
}

fn thumb(state: &AppState, category: &Category) -> Option<String> {
    state.backend().file_url(
        collections::CATEGORIES,
        category.id.as_str(),
        &category.image,
        Some("100x100"),
    )
}

/// List categories, with a create or edit form.
#[instrument(skip(state, _admin, chrome))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    chrome: Chrome,
    Query(query): Query<EditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let categories = state.backend().categories("name").await?;

    let form = query
        .edit
        .as_deref()
        .and_then(|id| categories.iter().find(|c| c.id.as_str() == id))
        .map_or_else(CategoryFormView::default, |category| CategoryFormView {
            id: Some(category.id.to_string()),
            name: category.name.clone(),
            description: category.description.clone(),
            icon: category.icon.clone(),
            image_url: thumb(&state, category),
        });

    Ok(AdminCategoriesTemplate {
        chrome,
        categories: categories
            .iter()
            .map(|category| AdminCategoryRow {
                id: category.id.to_string(),
                name: category.name.clone(),
                description: category.description.clone(),
                icon: category.icon.clone(),
                thumb_url: thumb(&state, category),
            })
            .collect(),
        form,
    })
}

/// Create a category.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut form = SubmittedForm::read(multipart).await?;
    let flash = match parse_category(&mut form) {
        Ok(input) => match state.backend().create_category(input, &admin.token).await {
            Ok(category) => {
                tracing::info!(category_id = %category.id, "Category created");
                Flash::success(format!("{} was created", category.name))
            }
            Err(e) => {
                tracing::warn!("Failed to create category: {e}");
                Flash::error(failure_message("Creating the category", &e))
            }
        },
        Err(message) => Flash::error(message),
    };
    set_flash(&session, flash).await;
    Ok(Redirect::to("/admin/categories"))
}

/// Update a category.
#[instrument(skip(state, session, admin, multipart), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let id = CategoryId::new(id);
    let mut form = SubmittedForm::read(multipart).await?;
    let input = match parse_category(&mut form) {
        Ok(input) => input,
        Err(message) => {
            set_flash(&session, Flash::error(message)).await;
            return Ok(Redirect::to(&format!("/admin/categories?edit={id}")));
        }
    };

    let flash = match state
        .backend()
        .update_category(&id, input, &admin.token)
        .await
    {
        Ok(category) => {
            tracing::info!(category_id = %category.id, "Category updated");
            Flash::success(format!("{} was updated", category.name))
        }
        Err(e) => {
            tracing::warn!("Failed to update category: {e}");
            Flash::error(failure_message("Updating the category", &e))
        }
    };
    set_flash(&session, flash).await;
    Ok(Redirect::to("/admin/categories"))
}

/// Delete a category. The backend refuses while products still use it.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Redirect {
    let id = CategoryId::new(id);
    let flash = match state.backend().delete_category(&id, &admin.token).await {
        Ok(()) => {
            tracing::info!(category_id = %id, "Category deleted");
            Flash::success("Category deleted")
        }
        Err(e) => {
            tracing::warn!("Failed to delete category: {e}");
            Flash::error(failure_message("Deleting the category", &e))
        }
    };
    set_flash(&session, flash).await;
    Redirect::to("/admin/categories")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category_requires_name_and_icon() {
        let mut form = SubmittedForm::from_pairs(&[("name", "Skin Care"), ("icon", "🧴")]);
        let input = parse_category(&mut form).unwrap();
        assert_eq!(input.name, "Skin Care");
        assert_eq!(input.description, "");

        let mut form = SubmittedForm::from_pairs(&[("name", "Skin Care")]);
        assert!(parse_category(&mut form).is_err());
        let mut form = SubmittedForm::from_pairs(&[("icon", "🧴")]);
        assert!(parse_category(&mut form).is_err());
    }
}
