//! `madio setup`: create the shop collections.
//!
//! Collections that already exist are reported and left untouched. The
//! built-in `users` auth collection only gets the `name` and `role` fields
//! added when they are missing.

use madio_core::{OrderStatus, PaymentMethod, UserRole};
use madio_storefront::backend::collections::{CART_ITEMS, CATEGORIES, ORDERS, PRODUCTS, USERS};
use serde_json::{Value, json};
use tracing::info;

use super::{CliError, Superuser};

/// Largest image accepted by the file fields.
const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

const IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

fn image_field() -> Value {
    json!({
        "name": "image",
        "type": "file",
        "maxSelect": 1,
        "maxSize": MAX_IMAGE_BYTES,
        "mimeTypes": IMAGE_TYPES,
        "thumbs": ["100x100", "400x300"],
    })
}

fn relation_field(name: &str, collection_id: &str, cascade_delete: bool) -> Value {
    json!({
        "name": name,
        "type": "relation",
        "required": true,
        "collectionId": collection_id,
        "cascadeDelete": cascade_delete,
        "maxSelect": 1,
    })
}

fn timestamps() -> [Value; 2] {
    [
        json!({"name": "created", "type": "autodate", "onCreate": true, "onUpdate": false}),
        json!({"name": "updated", "type": "autodate", "onCreate": true, "onUpdate": true}),
    ]
}

fn select_field<'a>(name: &str, values: impl IntoIterator<Item = &'a str>, required: bool) -> Value {
    json!({
        "name": name,
        "type": "select",
        "required": required,
        "maxSelect": 1,
        "values": values.into_iter().collect::<Vec<_>>(),
    })
}

fn base_collection(name: &str, mut fields: Vec<Value>) -> Value {
    fields.extend(timestamps());
    json!({ "name": name, "type": "base", "fields": fields })
}

/// Definition of `categories`.
#[must_use]
pub fn categories_collection() -> Value {
    base_collection(
        CATEGORIES,
        vec![
            json!({"name": "name", "type": "text", "required": true}),
            json!({"name": "description", "type": "text"}),
            json!({"name": "icon", "type": "text", "required": true}),
            image_field(),
        ],
    )
}

/// Definition of `products`. Stock is not `required` so that zero is valid.
#[must_use]
pub fn products_collection(categories_id: &str) -> Value {
    base_collection(
        PRODUCTS,
        vec![
            json!({"name": "name", "type": "text", "required": true}),
            json!({"name": "description", "type": "text"}),
            json!({"name": "price", "type": "number", "required": true, "min": 0}),
            json!({"name": "stock", "type": "number", "min": 0, "onlyInt": true}),
            json!({"name": "featured", "type": "bool"}),
            relation_field("category", categories_id, false),
            image_field(),
        ],
    )
}

/// Definition of `cart_items`.
#[must_use]
pub fn cart_items_collection(users_id: &str, products_id: &str) -> Value {
    base_collection(
        CART_ITEMS,
        vec![
            relation_field("user", users_id, true),
            relation_field("product", products_id, true),
            json!({"name": "quantity", "type": "number", "required": true, "min": 1, "onlyInt": true}),
        ],
    )
}

/// Definition of `orders`.
#[must_use]
pub fn orders_collection(users_id: &str) -> Value {
    base_collection(
        ORDERS,
        vec![
            relation_field("user", users_id, false),
            json!({"name": "items", "type": "json", "required": true}),
            json!({"name": "total", "type": "number", "required": true, "min": 0}),
            select_field("status", OrderStatus::ALL.iter().map(OrderStatus::as_str), true),
            json!({"name": "shippingInfo", "type": "json"}),
            select_field(
                "paymentMethod",
                PaymentMethod::ALL.iter().map(PaymentMethod::as_str),
                false,
            ),
        ],
    )
}

/// Fields missing from the `users` collection.
#[must_use]
pub fn missing_user_fields(has_name: bool, has_role: bool) -> Vec<Value> {
    let mut fields = Vec::new();
    if !has_name {
        fields.push(json!({"name": "name", "type": "text"}));
    }
    if !has_role {
        fields.push(select_field(
            "role",
            UserRole::ALL.iter().map(UserRole::as_str),
            false,
        ));
    }
    fields
}

/// Create the collection unless one with that name exists; returns its id.
async fn ensure(superuser: &Superuser, definition: Value) -> Result<String, CliError> {
    let name = definition
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match superuser.client.collection(&name, &superuser.token).await {
        Ok(existing) => {
            info!(collection = %name, "Collection already exists, skipping");
            Ok(existing.id)
        }
        Err(e) if e.is_not_found() => {
            let created = superuser
                .client
                .create_collection(&definition, &superuser.token)
                .await?;
            info!(collection = %name, id = %created.id, "Collection created");
            Ok(created.id)
        }
        Err(e) => Err(e.into()),
    }
}

/// Add `name` and `role` to the users collection when missing.
async fn extend_users(superuser: &Superuser) -> Result<String, CliError> {
    let users = superuser.client.collection(USERS, &superuser.token).await?;
    let missing = missing_user_fields(users.has_field("name"), users.has_field("role"));

    if missing.is_empty() {
        info!("Users collection already configured");
        return Ok(users.id);
    }

    let mut fields = users.fields;
    fields.extend(missing);
    superuser
        .client
        .update_collection(USERS, &json!({ "fields": fields }), &superuser.token)
        .await?;
    info!("Users collection updated");
    Ok(users.id)
}

/// Run the setup.
///
/// # Errors
///
/// Returns an error if any collection cannot be read or created.
pub async fn run(superuser: &Superuser) -> Result<(), CliError> {
    let users_id = extend_users(superuser).await?;
    let categories_id = ensure(superuser, categories_collection()).await?;
    let products_id = ensure(superuser, products_collection(&categories_id)).await?;
    ensure(superuser, cart_items_collection(&users_id, &products_id)).await?;
    ensure(superuser, orders_collection(&users_id)).await?;

    info!("All collections are ready");
    info!("Next: `madio rules` to apply access rules, then `madio seed` for demo data");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn field<'a>(definition: &'a Value, name: &str) -> &'a Value {
        definition["fields"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["name"] == name)
            .unwrap()
    }

    #[test]
    fn test_products_reference_categories() {
        let definition = products_collection("pbc_123");
        assert_eq!(definition["name"], "products");
        assert_eq!(field(&definition, "category")["collectionId"], "pbc_123");
        assert_eq!(field(&definition, "stock")["required"], Value::Null);
        assert_eq!(field(&definition, "created")["type"], "autodate");
    }

    #[test]
    fn test_orders_status_values() {
        let definition = orders_collection("_pb_users_auth_");
        let values = field(&definition, "status")["values"].as_array().unwrap().clone();
        assert_eq!(values.len(), 5);
        assert_eq!(values[0], "pending");
        assert_eq!(field(&definition, "paymentMethod")["values"][2], "online");
    }

    #[test]
    fn test_cart_items_cascade_with_user() {
        let definition = cart_items_collection("u", "p");
        assert_eq!(field(&definition, "user")["cascadeDelete"], true);
        assert_eq!(field(&definition, "quantity")["min"], 1);
    }

    #[test]
    fn test_missing_user_fields() {
        assert!(missing_user_fields(true, true).is_empty());
        let missing = missing_user_fields(false, false);
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[1]["values"], json!(["user", "admin"]));
    }
}
