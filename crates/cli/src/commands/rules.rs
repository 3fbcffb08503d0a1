//! `madio rules`: apply the access rules of every shop collection.
//!
//! The storefront never checks permissions itself beyond hiding the admin
//! screens; these rules are what actually protect the data.

use madio_storefront::backend::admin::AccessRules;
use madio_storefront::backend::collections::{CART_ITEMS, CATEGORIES, ORDERS, PRODUCTS, USERS};
use tracing::{info, warn};

use super::{CliError, Superuser};

/// Matches requests made by a user with the admin role.
pub const ADMIN: &str = r#"@request.auth.role = "admin""#;

/// Matches any signed-in user.
const SIGNED_IN: &str = r#"@request.auth.id != """#;

fn rule(expression: &str) -> Option<String> {
    Some(expression.to_string())
}

fn public() -> Option<String> {
    Some(String::new())
}

/// Publicly readable, admin-only writes.
fn catalog_rules() -> AccessRules {
    AccessRules {
        list_rule: public(),
        view_rule: public(),
        create_rule: rule(ADMIN),
        update_rule: rule(ADMIN),
        delete_rule: rule(ADMIN),
    }
}

/// Rules for every collection, in application order.
#[must_use]
pub fn collection_rules() -> Vec<(&'static str, AccessRules)> {
    let owner = "user = @request.auth.id";
    let owner_or_admin = format!("{owner} || {ADMIN}");
    let self_or_admin = format!("id = @request.auth.id || {ADMIN}");

    vec![
        (CATEGORIES, catalog_rules()),
        (PRODUCTS, catalog_rules()),
        (
            CART_ITEMS,
            AccessRules {
                list_rule: rule(owner),
                view_rule: rule(owner),
                create_rule: rule(&format!("{SIGNED_IN} && @request.body.user = @request.auth.id")),
                update_rule: rule(owner),
                delete_rule: rule(owner),
            },
        ),
        (
            ORDERS,
            AccessRules {
                list_rule: rule(&owner_or_admin),
                view_rule: rule(&owner_or_admin),
                create_rule: rule(SIGNED_IN),
                update_rule: rule(ADMIN),
                delete_rule: None,
            },
        ),
        (
            USERS,
            AccessRules {
                list_rule: rule(&self_or_admin),
                view_rule: rule(&self_or_admin),
                // Sign-up is public but can never grant the admin role.
                create_rule: rule(r#"@request.body.role:isset = false || @request.body.role = "user""#),
                update_rule: rule(&format!(
                    "(id = @request.auth.id && @request.body.role:isset = false) || {ADMIN}"
                )),
                delete_rule: None,
            },
        ),
    ]
}

/// Apply the rules. A missing collection is reported and skipped.
///
/// # Errors
///
/// Returns an error if the backend rejects a rule set.
pub async fn run(superuser: &Superuser) -> Result<(), CliError> {
    for (collection, rules) in collection_rules() {
        match superuser
            .client
            .set_access_rules(collection, &rules, &superuser.token)
            .await
        {
            Ok(_) => info!(collection, "Access rules applied"),
            Err(e) if e.is_not_found() => {
                warn!(collection, "Collection not found, run `madio setup` first");
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!("All access rules applied");
    Ok(())
}
