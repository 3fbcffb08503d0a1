//! Admin product management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect},
};
use madio_core::{CategoryId, Price, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{ADMIN_LIST_LIMIT, SubmittedForm, failure_message};
use crate::backend::{Product, ProductInput, collections};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::routes::{Chrome, set_flash};
use crate::state::AppState;

/// Product row for the admin table.
#[derive(Clone)]
pub struct AdminProductRow {
    pub id: String,
    pub name: String,
    pub category_name: String,
    pub price: String,
    pub stock: u32,
    pub featured: bool,
    pub thumb_url: Option<String>,
}

/// Values of the create/edit form.
#[derive(Clone, Default)]
pub struct ProductFormView {
    /// Set when editing an existing product.
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: String,
    pub category: String,
    pub featured: bool,
    pub image_url: Option<String>,
}

impl ProductFormView {
    #[must_use]
    pub fn action(&self) -> String {
        self.id
            .as_ref()
            .map_or_else(|| "/admin/products".to_string(), |id| format!("/admin/products/{id}"))
    }
}

/// Category choice for the form.
#[derive(Clone)]
pub struct CategoryOption {
    pub id: String,
    pub name: String,
}

/// `?edit=<id>` opens the form for an existing product.
#[derive(Debug, Deserialize)]
pub struct EditQuery {
    pub edit: Option<String>,
}

/// Admin product list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub chrome: Chrome,
    pub products: Vec<AdminProductRow>,
    pub categories: Vec<CategoryOption>,
    pub form: ProductFormView,
}

/// Parse the submitted product form.
///
/// # Errors
///
/// Returns a message naming the first invalid field.
pub fn parse_product(form: &mut SubmittedForm) -> Result<ProductInput, String> {
    let name = form.text("name");
    if name.is_empty() {
        return Err("Product name is required".to_string());
    }
    let price = Price::parse(form.text("price"))
        .map_err(|e| format!("Price is invalid: {e}"))?;
    let stock = form
        .text("stock")
        .parse::<u32>()
        .map_err(|_| "Stock must be a whole number".to_string())?;
    let category = form.text("category");
    if category.is_empty() {
        return Err("Choose a category".to_string());
    }

    Ok(ProductInput {
        name: name.to_string(),
        description: form.text("description").to_string(),
        price,
        stock,
        category: CategoryId::new(category),
        featured: form.checked("featured"),
        image: form.take_image(),
    })
}

/// List products, with a create or edit form.
#[instrument(skip(state, admin, chrome), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    chrome: Chrome,
    Query(query): Query<EditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.backend();
    let (products, categories) = tokio::join!(
        client.admin_products(ADMIN_LIST_LIMIT, &admin.token),
        client.categories("name"),
    );
    let products = products?;
    let categories = categories.unwrap_or_else(|e| {
        tracing::warn!("Failed to load categories: {e}");
        Vec::new()
    });

    let editing = query
        .edit
        .as_deref()
        .and_then(|id| products.iter().find(|p| p.id.as_str() == id));
    let form = editing.map_or_else(ProductFormView::default, |product| {
        form_for(&state, product)
    });

    Ok(AdminProductsTemplate {
        chrome,
        products: products
            .iter()
            .map(|product| AdminProductRow {
                id: product.id.to_string(),
                name: product.name.clone(),
                category_name: product.category_name().unwrap_or_default().to_string(),
                price: product.price.display(),
                stock: product.stock,
                featured: product.featured,
                thumb_url: client.file_url(
                    collections::PRODUCTS,
                    product.id.as_str(),
                    &product.image,
                    Some("100x100"),
                ),
            })
            .collect(),
        categories: categories
            .into_iter()
            .map(|c| CategoryOption {
                id: c.id.into_inner(),
                name: c.name,
            })
            .collect(),
        form,
    })
}

fn form_for(state: &AppState, product: &Product) -> ProductFormView {
    ProductFormView {
        id: Some(product.id.to_string()),
        name: product.name.clone(),
        description: product.description.clone(),
        price: product.price.amount().to_string(),
        stock: product.stock.to_string(),
        category: product.category.to_string(),
        featured: product.featured,
        image_url: state.backend().file_url(
            collections::PRODUCTS,
            product.id.as_str(),
            &product.image,
            Some("100x100"),
        ),
    }
}

/// Create a product.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut form = SubmittedForm::read(multipart).await?;
    let flash = match parse_product(&mut form) {
        Ok(input) => match state.backend().create_product(input, &admin.token).await {
            Ok(product) => {
                tracing::info!(product_id = %product.id, "Product created");
                Flash::success(format!("{} was created", product.name))
            }
            Err(e) => {
                tracing::warn!("Failed to create product: {e}");
                Flash::error(failure_message("Creating the product", &e))
            }
        },
        Err(message) => Flash::error(message),
    };
    set_flash(&session, flash).await;
    Ok(Redirect::to("/admin/products"))
}

/// Update a product. Without a new image the stored one is kept.
#[instrument(skip(state, session, admin, multipart), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let id = ProductId::new(id);
    let mut form = SubmittedForm::read(multipart).await?;
    let flash = match parse_product(&mut form) {
        Ok(input) => match state
            .backend()
            .update_product(&id, input, &admin.token)
            .await
        {
            Ok(product) => {
                tracing::info!(product_id = %product.id, "Product updated");
                Flash::success(format!("{} was updated", product.name))
            }
            Err(e) => {
                tracing::warn!("Failed to update product: {e}");
                Flash::error(failure_message("Updating the product", &e))
            }
        },
        Err(message) => {
            set_flash(&session, Flash::error(message)).await;
            return Ok(Redirect::to(&format!("/admin/products?edit={id}")));
        }
    };
    set_flash(&session, flash).await;
    Ok(Redirect::to("/admin/products"))
}

/// Delete a product.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Redirect {
    let id = ProductId::new(id);
    let flash = match state.backend().delete_product(&id, &admin.token).await {
        Ok(()) => {
            tracing::info!(product_id = %id, "Product deleted");
            Flash::success("Product deleted")
        }
        Err(e) => {
            tracing::warn!("Failed to delete product: {e}");
            Flash::error(failure_message("Deleting the product", &e))
        }
    };
    set_flash(&session, flash).await;
    Redirect::to("/admin/products")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product() {
        let mut form = SubmittedForm::from_pairs(&[
            ("name", "Rose face mask"),
            ("description", "Hydrating clay mask"),
            ("price", "1,250,000"),
            ("stock", "3"),
            ("category", "c1"),
            ("featured", "on"),
        ]);
        let input = parse_product(&mut form).unwrap();
        assert_eq!(input.price, Price::from_units(1_250_000));
        assert_eq!(input.stock, 3);
        assert!(input.featured);
        assert!(input.image.is_none());
    }

    #[test]
    fn test_parse_product_rejects_bad_fields() {
        let base = [
            ("name", "Rose face mask"),
            ("price", "100"),
            ("stock", "3"),
            ("category", "c1"),
        ];
        for (field, value) in [("name", ""), ("price", "abc"), ("stock", "-1"), ("category", "")] {
            let pairs: Vec<(&str, &str)> = base
                .iter()
                .map(|&(k, v)| if k == field { (k, value) } else { (k, v) })
                .collect();
            let mut form = SubmittedForm::from_pairs(&pairs);
            assert!(parse_product(&mut form).is_err(), "{field}={value} accepted");
        }
    }

    #[test]
    fn test_form_action() {
        assert_eq!(ProductFormView::default().action(), "/admin/products");
        let form = ProductFormView {
            id: Some("p1".to_string()),
            ..ProductFormView::default()
        };
        assert_eq!(form.action(), "/admin/products/p1");
    }
}
