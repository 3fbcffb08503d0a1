//! Collection management (superuser only).
//!
//! Used by the `madio` CLI to create collections and patch access rules.

use reqwest::Method;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{BackendClient, BackendError};

/// A collection definition as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionModel {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub fields: Vec<serde_json::Value>,
    #[serde(default)]
    pub list_rule: Option<String>,
    #[serde(default)]
    pub view_rule: Option<String>,
    #[serde(default)]
    pub create_rule: Option<String>,
    #[serde(default)]
    pub update_rule: Option<String>,
    #[serde(default)]
    pub delete_rule: Option<String>,
}

impl CollectionModel {
    /// Whether the collection defines a field with this name.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields
            .iter()
            .any(|field| field.get("name").and_then(serde_json::Value::as_str) == Some(name))
    }
}

/// The five access rules of a collection.
///
/// `None` locks the action to superusers, `Some("")` makes it public, any
/// other string is a filter expression evaluated per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRules {
    pub list_rule: Option<String>,
    pub view_rule: Option<String>,
    pub create_rule: Option<String>,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
}

impl BackendClient {
    /// Fetch a collection definition by id or name.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the collection does not exist.
    #[instrument(skip(self, auth))]
    pub async fn collection(
        &self,
        id_or_name: &str,
        auth: &SecretString,
    ) -> Result<CollectionModel, BackendError> {
        let url = self.collections_url(Some(id_or_name))?;
        self.send(self.request(Method::GET, url, Some(auth))).await
    }

    /// Create a collection from a full definition.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` if the definition is invalid or the name is
    /// taken.
    #[instrument(skip(self, definition, auth))]
    pub async fn create_collection(
        &self,
        definition: &serde_json::Value,
        auth: &SecretString,
    ) -> Result<CollectionModel, BackendError> {
        let url = self.collections_url(None)?;
        self.send(self.request(Method::POST, url, Some(auth)).json(definition))
            .await
    }

    /// Patch a collection definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is missing or the patch is invalid.
    #[instrument(skip(self, patch, auth))]
    pub async fn update_collection<B: Serialize + Sync>(
        &self,
        id_or_name: &str,
        patch: &B,
        auth: &SecretString,
    ) -> Result<CollectionModel, BackendError> {
        let url = self.collections_url(Some(id_or_name))?;
        self.send(self.request(Method::PATCH, url, Some(auth)).json(patch))
            .await
    }

    /// Replace the access rules of a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is missing or a rule does not parse.
    pub async fn set_access_rules(
        &self,
        id_or_name: &str,
        rules: &AccessRules,
        auth: &SecretString,
    ) -> Result<CollectionModel, BackendError> {
        self.update_collection(id_or_name, rules, auth).await
    }

    fn collections_url(&self, id_or_name: Option<&str>) -> Result<url::Url, BackendError> {
        let mut url = self.base_url().clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| BackendError::InvalidUrl(self.base_url().to_string()))?;
            segments.pop_if_empty().extend(["api", "collections"]);
            if let Some(id_or_name) = id_or_name {
                segments.push(id_or_name);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_has_field() {
        let model: CollectionModel = serde_json::from_value(serde_json::json!({
            "id": "_pb_users_auth_",
            "name": "users",
            "type": "auth",
            "fields": [{"name": "email", "type": "email"}, {"name": "name", "type": "text"}],
            "listRule": null
        }))
        .unwrap();
        assert!(model.has_field("name"));
        assert!(!model.has_field("role"));
        assert!(model.list_rule.is_none());
    }

    #[test]
    fn test_access_rules_serialize_locked_as_null() {
        let rules = AccessRules {
            list_rule: Some(String::new()),
            ..AccessRules::default()
        };
        let value = serde_json::to_value(&rules).unwrap();
        assert_eq!(value["listRule"], "");
        assert!(value["deleteRule"].is_null());
    }
}
