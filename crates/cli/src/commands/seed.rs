//! `madio seed`: create categories and products from a YAML file.
//!
//! Categories that already exist (same name) are reused. A product that
//! fails to save is reported and skipped; the summary at the end lists the
//! counts.

use std::path::Path;

use madio_core::{CategoryId, Price};
use madio_storefront::backend::{Category, CategoryInput, ProductInput};
use serde::Deserialize;
use tracing::{error, info};

use super::{CliError, Superuser};

/// Catalog bundled with the CLI, used when no file is given.
const DEMO_CATALOG: &str = include_str!("../../seed/demo.yaml");

/// Top level of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub categories: Vec<SeedCategory>,
}

/// A category with its products.
#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub icon: String,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// A product of a seed category.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub featured: bool,
}

/// Outcome of a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories_created: usize,
    pub categories_reused: usize,
    pub products_created: usize,
    pub products_failed: usize,
    pub featured: usize,
}

/// Parse and check a seed file.
///
/// # Errors
///
/// Returns an error for invalid YAML, blank names or duplicate categories.
pub fn parse(content: &str) -> Result<SeedFile, CliError> {
    let file: SeedFile = serde_yaml::from_str(content)?;

    let mut seen = std::collections::HashSet::new();
    for category in &file.categories {
        if category.name.trim().is_empty() {
            return Err(CliError::InvalidSeed("a category has no name".to_string()));
        }
        if !seen.insert(category.name.as_str()) {
            return Err(CliError::InvalidSeed(format!(
                "category {} is listed twice",
                category.name
            )));
        }
        if let Some(product) = category.products.iter().find(|p| p.name.trim().is_empty()) {
            return Err(CliError::InvalidSeed(format!(
                "a product in {} has no name (price {})",
                category.name, product.price
            )));
        }
    }
    Ok(file)
}

/// Category with this name among the existing ones.
fn existing<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
    categories.iter().find(|c| c.name == name)
}

async fn category_id(
    superuser: &Superuser,
    existing_categories: &[Category],
    seed: &SeedCategory,
    summary: &mut SeedSummary,
) -> Result<CategoryId, CliError> {
    if let Some(category) = existing(existing_categories, &seed.name) {
        info!(category = %seed.name, "Category already exists, reusing");
        summary.categories_reused += 1;
        return Ok(category.id.clone());
    }

    let input = CategoryInput {
        name: seed.name.clone(),
        description: seed.description.clone(),
        icon: seed.icon.clone(),
        image: None,
    };
    let created = superuser
        .client
        .create_category(input, &superuser.token)
        .await?;
    info!(category = %seed.name, "Created category");
    summary.categories_created += 1;
    Ok(created.id)
}

/// Run the seeding.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or a category
/// cannot be created.
pub async fn run(superuser: &Superuser, file: Option<&Path>) -> Result<(), CliError> {
    let content = match file {
        Some(path) => {
            info!(path = %path.display(), "Loading seed file");
            tokio::fs::read_to_string(path).await?
        }
        None => {
            info!("Loading bundled demo catalog");
            DEMO_CATALOG.to_string()
        }
    };
    let seed = parse(&content)?;
    info!(categories = seed.categories.len(), "Parsed seed file");

    let existing_categories = superuser.client.categories("name").await?;
    let mut summary = SeedSummary::default();

    for category in &seed.categories {
        let category_id = category_id(superuser, &existing_categories, category, &mut summary).await?;

        for product in &category.products {
            let input = ProductInput {
                name: product.name.clone(),
                description: product.description.clone(),
                price: Price::from_units(product.price),
                stock: product.stock,
                category: category_id.clone(),
                featured: product.featured,
                image: None,
            };
            match superuser
                .client
                .create_product(input, &superuser.token)
                .await
            {
                Ok(_) => {
                    info!(product = %product.name, "Created product");
                    summary.products_created += 1;
                    if product.featured {
                        summary.featured += 1;
                    }
                }
                Err(e) => {
                    error!(product = %product.name, "Failed to create product: {e}");
                    summary.products_failed += 1;
                }
            }
        }
    }

    info!("Seeding complete!");
    info!("  Categories created: {}", summary.categories_created);
    info!("  Categories reused: {}", summary.categories_reused);
    info!("  Products created: {}", summary.products_created);
    info!("  Featured products: {}", summary.featured);
    if summary.products_failed > 0 {
        error!("  Products failed: {}", summary.products_failed);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog_parses() {
        let seed = parse(DEMO_CATALOG).unwrap();
        assert_eq!(seed.categories.len(), 5);
        let products: usize = seed.categories.iter().map(|c| c.products.len()).sum();
        assert_eq!(products, 21);
        assert!(
            seed.categories
                .iter()
                .flat_map(|c| &c.products)
                .all(|p| p.price > 0)
        );
    }

    #[test]
    fn test_defaults() {
        let seed = parse(
            "categories:\n  - name: Tools\n    icon: x\n    products:\n      - name: Hammer\n        price: 10\n",
        )
        .unwrap();
        let product = seed.categories.first().unwrap().products.first().unwrap();
        assert_eq!(product.stock, 0);
        assert!(!product.featured);
        assert_eq!(product.description, "");
    }

    #[test]
    fn test_rejects_duplicate_categories() {
        let err = parse("categories:\n  - name: A\n    icon: x\n  - name: A\n    icon: y\n")
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidSeed(_)));
    }

    #[test]
    fn test_rejects_unnamed_product() {
        let err = parse(
            "categories:\n  - name: A\n    icon: x\n    products:\n      - name: ' '\n        price: 1\n",
        )
        .unwrap_err();
        assert!(matches!(err, CliError::InvalidSeed(_)));
    }

    #[test]
    fn test_existing_matches_by_name() {
        let categories: Vec<Category> = serde_json::from_value(serde_json::json!([
            {"id": "c1", "name": "Makeup"},
            {"id": "c2", "name": "Skincare"}
        ]))
        .unwrap();
        assert_eq!(existing(&categories, "Skincare").unwrap().id.as_str(), "c2");
        assert!(existing(&categories, "Fragrance").is_none());
    }
}
