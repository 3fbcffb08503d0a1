//! Record types for the backend collections.
//!
//! Field names follow the collection schemas (`snake_case` columns stay as
//! they are, camelCase columns are renamed). Optional relation and file fields
//! come back as empty strings when unset, so they are kept as plain strings
//! and checked with `is_empty()`.

use std::str::FromStr;

use chrono::NaiveDateTime;
use madio_core::{
    CartItemId, CategoryId, OrderId, OrderStatus, PaymentMethod, Price, ProductId, UserId,
    UserRole,
};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::BackendError;

// =============================================================================
// Envelopes
// =============================================================================

/// One page of a record list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    pub page: u32,
    pub per_page: u32,
    /// -1 when the request skipped the total count.
    pub total_items: i64,
    pub total_pages: i64,
    pub items: Vec<T>,
}

/// Successful password authentication.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse<T> {
    pub token: String,
    pub record: T,
}

// =============================================================================
// Records
// =============================================================================

/// A shop user (auth collection record).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_default")]
    pub role: UserRole,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

impl User {
    /// Name to greet the user with, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// A product category.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    /// Stored file name, empty when no image was uploaded.
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

/// A catalog product.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub category: CategoryId,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default, skip_serializing)]
    pub expand: ProductExpand,
}

/// Expanded relations of a product.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductExpand {
    pub category: Option<Category>,
}

impl Product {
    /// Whether at least one unit can be bought.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Name of the expanded category, if it was requested.
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.expand.category.as_ref().map(|c| c.name.as_str())
    }
}

/// A persisted cart line of a signed-in user.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItemRecord {
    pub id: CartItemId,
    pub user: UserId,
    pub product: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub expand: CartItemExpand,
}

/// Expanded relations of a cart line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartItemExpand {
    pub product: Option<Product>,
}

/// A placed order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user: UserId,
    #[serde(default, deserialize_with = "embedded_json")]
    pub items: Vec<OrderItem>,
    pub total: Price,
    #[serde(default, deserialize_with = "blank_as_default")]
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "embedded_json")]
    pub shipping_info: Option<ShippingInfo>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub expand: OrderExpand,
}

/// Expanded relations of an order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderExpand {
    pub user: Option<User>,
}

impl Order {
    /// Number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// One line of an order, serialized into the order's `items` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Price,
    pub quantity: u32,
    pub total: Price,
}

/// Delivery details, serialized into the order's `shippingInfo` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// =============================================================================
// Write payloads
// =============================================================================

/// Body for creating a shop user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub email_visibility: bool,
    pub password: &'a str,
    pub password_confirm: &'a str,
    pub role: UserRole,
}

/// Body for creating an order. `items` and `shippingInfo` are JSON strings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user: UserId,
    pub items: String,
    pub total: Price,
    pub status: OrderStatus,
    pub shipping_info: String,
    pub payment_method: PaymentMethod,
}

/// An uploaded file to forward to the backend.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    fn into_part(self) -> Result<Part, BackendError> {
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?)
    }
}

/// Product fields submitted from the admin form.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub stock: u32,
    pub category: CategoryId,
    pub featured: bool,
    pub image: Option<Upload>,
}

impl ProductInput {
    /// Build the multipart body. Without a new image the stored one is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the image content type is not a valid MIME type.
    pub fn into_form(self) -> Result<Form, BackendError> {
        let form = Form::new()
            .text("name", self.name)
            .text("description", self.description)
            .text("price", self.price.amount().to_string())
            .text("stock", self.stock.to_string())
            .text("category", self.category.into_inner())
            .text("featured", self.featured.to_string());
        match self.image {
            Some(image) => Ok(form.part("image", image.into_part()?)),
            None => Ok(form),
        }
    }
}

/// Category fields submitted from the admin form.
#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub image: Option<Upload>,
}

impl CategoryInput {
    /// Build the multipart body. Without a new image the stored one is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the image content type is not a valid MIME type.
    pub fn into_form(self) -> Result<Form, BackendError> {
        let form = Form::new()
            .text("name", self.name)
            .text("description", self.description)
            .text("icon", self.icon);
        match self.image {
            Some(image) => Ok(form.part("image", image.into_part()?)),
            None => Ok(form),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Parse a backend timestamp (`2024-05-01 10:20:30.123Z`).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.fZ").ok()
}

/// JSON fields may hold either the structure itself or a string containing it.
fn embedded_json<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(T::default()),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(T::default()),
        serde_json::Value::String(s) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

/// Unset select fields come back as `""`.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn blank_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: std::fmt::Display,
{
    Ok(blank_as_none(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_with_expanded_category() {
        let json = r#"{
            "id": "p1",
            "collectionName": "products",
            "name": "Rose lipstick",
            "description": "Matte finish",
            "price": 350000,
            "stock": 5,
            "featured": true,
            "category": "c1",
            "image": "rose_abc123.jpg",
            "created": "2024-05-01 10:20:30.123Z",
            "updated": "2024-05-01 10:20:30.123Z",
            "expand": {"category": {"id": "c1", "name": "Lips"}}
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Price::from_units(350_000));
        assert_eq!(product.category_name(), Some("Lips"));
        assert!(product.in_stock());
    }

    #[test]
    fn test_product_without_category_or_stock() {
        let json = r#"{"id": "p2", "name": "Travel mirror", "price": 90000}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.category.is_empty());
        assert_eq!(product.category_name(), None);
        assert_eq!(product.stock, 0);
        assert!(!product.in_stock());
    }

    #[test]
    fn test_order_items_stored_as_string() {
        let json = r#"{
            "id": "o1",
            "user": "u1",
            "items": "[{\"productId\":\"p1\",\"productName\":\"Rose\",\"price\":100,\"quantity\":2,\"total\":200}]",
            "total": 200,
            "status": "pending",
            "shippingInfo": "{\"fullName\":\"Sara\",\"phone\":\"09121234567\",\"address\":\"Valiasr 1\",\"city\":\"Tehran\",\"postalCode\":\"1234567890\"}",
            "paymentMethod": "cash"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.shipping_info.unwrap().city, "Tehran");
        assert_eq!(order.payment_method, Some(PaymentMethod::Cash));
    }

    #[test]
    fn test_order_items_stored_as_array_and_blank_selects() {
        let json = r#"{
            "id": "o2",
            "user": "u1",
            "items": [{"productId":"p1","productName":"Rose","price":100,"quantity":1,"total":100}],
            "total": 100,
            "status": "",
            "shippingInfo": null,
            "paymentMethod": ""
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.shipping_info.is_none());
        assert!(order.payment_method.is_none());
    }

    #[test]
    fn test_new_order_wire_names() {
        let order = NewOrder {
            user: UserId::new("u1"),
            items: "[]".to_string(),
            total: Price::from_units(100),
            status: OrderStatus::Pending,
            shipping_info: "{}".to_string(),
            payment_method: PaymentMethod::Online,
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["shippingInfo"], "{}");
        assert_eq!(value["paymentMethod"], "online");
        assert_eq!(value["status"], "pending");
    }

    #[test]
    fn test_shipping_info_omits_empty_notes() {
        let info = ShippingInfo {
            full_name: "Sara".to_string(),
            ..ShippingInfo::default()
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"fullName\":\"Sara\""));
        assert!(!json.contains("notes"));
    }

    #[test]
    fn test_user_display_name_falls_back_to_email() {
        let user: User =
            serde_json::from_str(r#"{"id":"u1","email":"a@b.ir","name":"","role":"admin"}"#)
                .unwrap();
        assert_eq!(user.display_name(), "a@b.ir");
        assert!(user.role.is_admin());
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-05-01 10:20:30.123Z").unwrap();
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2024-05-01");
        assert!(parse_timestamp("yesterday").is_none());
    }
}
