//! Admin back-office route handlers.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin) and
//! acts with the admin's own backend token, so the backend's collection
//! rules decide what actually succeeds.

pub mod categories;
pub mod orders;
pub mod overview;
pub mod products;
pub mod users;

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::backend::{BackendError, Order, Upload};
use crate::error::AppError;

/// Largest accepted upload (product and category images).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Table rows shown on the admin lists.
pub const ADMIN_LIST_LIMIT: u32 = 100;

/// A decoded `multipart/form-data` submission.
#[derive(Debug, Default)]
pub struct SubmittedForm {
    fields: HashMap<String, String>,
    image: Option<Upload>,
}

impl SubmittedForm {
    /// Read every part; the `image` part becomes the upload when a file was
    /// actually chosen.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is not valid multipart.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let Some(name) = field.name().map(String::from) else {
                continue;
            };

            if name == "image" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    form.image = Some(Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Trimmed text value, empty when missing.
    #[must_use]
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", |v| v.trim())
    }

    /// Whether a checkbox was ticked.
    #[must_use]
    pub fn checked(&self, name: &str) -> bool {
        matches!(self.text(name), "on" | "true" | "1")
    }

    pub const fn take_image(&mut self) -> Option<Upload> {
        self.image.take()
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            image: None,
        }
    }
}

/// Describe a rejected admin write for a flash message.
#[must_use]
pub fn failure_message(action: &str, err: &BackendError) -> String {
    match err.field_errors() {
        Some(fields) => {
            let details: Vec<String> = fields
                .iter()
                .map(|(field, error)| format!("{field}: {}", error.message))
                .collect();
            format!("{action} failed: {}", details.join(", "))
        }
        None => match err {
            BackendError::Api { message, .. } => format!("{action} failed: {message}"),
            BackendError::NotFound(_) => format!("{action} failed: record not found"),
            _ => format!("{action} failed. Please try again"),
        },
    }
}

/// Order row for the admin tables.
#[derive(Clone)]
pub struct AdminOrderRow {
    pub id: String,
    pub created: String,
    pub customer: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub item_count: u32,
    pub total: String,
    pub shipping: String,
    pub payment: &'static str,
}

impl From<&Order> for AdminOrderRow {
    fn from(order: &Order) -> Self {
        let customer = order.expand.user.as_ref().map_or_else(
            || order.user.to_string(),
            |user| format!("{} ({})", user.display_name(), user.email),
        );
        let shipping = order.shipping_info.as_ref().map_or_else(String::new, |info| {
            format!(
                "{}, {}, {} {} ({})",
                info.full_name, info.address, info.city, info.postal_code, info.phone
            )
        });
        Self {
            id: order.id.to_string(),
            created: order.created.clone(),
            customer,
            status: order.status.as_str(),
            status_label: order.status.label(),
            item_count: order.item_count(),
            total: order.total.display(),
            shipping,
            payment: order.payment_method.map_or("", |method| method.label()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::backend::FieldError;

    #[test]
    fn test_submitted_form_accessors() {
        let form = SubmittedForm::from_pairs(&[("name", "  Hand Cream "), ("featured", "on")]);
        assert_eq!(form.text("name"), "Hand Cream");
        assert_eq!(form.text("missing"), "");
        assert!(form.checked("featured"));
        assert!(!form.checked("missing"));
    }

    #[test]
    fn test_failure_message_lists_fields() {
        let mut data = BTreeMap::new();
        data.insert(
            "price".to_string(),
            FieldError {
                code: "validation_min_number".to_string(),
                message: "Must be larger than 0.".to_string(),
            },
        );
        let err = BackendError::Api {
            status: 400,
            message: "Failed to create record.".to_string(),
            data,
        };
        assert_eq!(
            failure_message("Saving the product", &err),
            "Saving the product failed: price: Must be larger than 0."
        );

        let err = BackendError::Api {
            status: 403,
            message: "Only admins can perform this action.".to_string(),
            data: BTreeMap::new(),
        };
        assert_eq!(
            failure_message("Deleting", &err),
            "Deleting failed: Only admins can perform this action."
        );
    }

    #[test]
    fn test_admin_order_row() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "o1",
            "user": "u1",
            "items": [],
            "total": 1500000,
            "status": "processing",
            "shippingInfo": "{\"fullName\":\"Sara\",\"phone\":\"09123456789\",\"address\":\"12 Valiasr\",\"city\":\"Tehran\",\"postalCode\":\"1234567890\"}",
            "paymentMethod": "",
            "expand": {"user": {"id": "u1", "email": "sara@example.com", "name": "Sara"}}
        }))
        .unwrap();
        let row = AdminOrderRow::from(&order);
        assert_eq!(row.customer, "Sara (sara@example.com)");
        assert_eq!(row.shipping, "Sara, 12 Valiasr, Tehran 1234567890 (09123456789)");
        assert_eq!(row.payment, "");
        assert_eq!(row.total, "1,500,000 Toman");
    }
}
