//! Product records and the read-only catalog.
//!
//! The catalog is a fixed, in-memory collection built once (from the backend
//! or from the built-in product list) and queried synchronously by id,
//! category, and search term.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Category name that matches every product.
pub const ALL_CATEGORIES: &str = "All";

/// A product offered in the store.
///
/// Categories form an open set, so they are plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image_url: String,
    pub description: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Product {
    /// A product is listed unless it is explicitly marked inactive.
    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.is_active.unwrap_or(true)
    }

    fn matches_term(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
    }
}

/// Read-only product catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Build a catalog from a product list, preserving order.
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Every product, in catalog order.
    #[must_use]
    pub fn all(&self) -> &[Product] {
        &self.products
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns `true` if the catalog holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Look up a product by id.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id.as_str() == id)
    }

    /// Products in `category`, or every product when `category` is `"All"`.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<&Product> {
        if category == ALL_CATEGORIES {
            return self.products.iter().collect();
        }
        self.products
            .iter()
            .filter(|p| p.category == category)
            .collect()
    }

    /// Case-insensitive substring search over name and description.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&Product> {
        let needle = term.to_lowercase();
        self.products
            .iter()
            .filter(|p| p.matches_term(&needle))
            .collect()
    }

    /// Distinct categories, sorted, with `"All"` first.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self.products.iter().map(|p| p.category.clone()).collect();
        names.sort();
        names.dedup();
        let mut categories = Vec::with_capacity(names.len() + 1);
        categories.push(ALL_CATEGORIES.to_owned());
        categories.extend(names);
        categories
    }

    /// Combined browse filter.
    ///
    /// A blank `term` falls back to [`Catalog::by_category`]; otherwise search
    /// results are narrowed to `category` (unless it is `"All"`).
    #[must_use]
    pub fn filter(&self, category: Option<&str>, term: Option<&str>) -> Vec<&Product> {
        let category = category.unwrap_or(ALL_CATEGORIES);
        match term.map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => self
                .search(term)
                .into_iter()
                .filter(|p| category == ALL_CATEGORIES || p.category == category)
                .collect(),
            None => self.by_category(category),
        }
    }

    /// Up to `limit` other products from the same category as `id`.
    #[must_use]
    pub fn related(&self, id: &str, limit: usize) -> Vec<&Product> {
        let Some(product) = self.by_id(id) else {
            return Vec::new();
        };
        self.products
            .iter()
            .filter(|p| p.category == product.category && p.id != product.id)
            .take(limit)
            .collect()
    }
}

impl From<Vec<Product>> for Catalog {
    fn from(products: Vec<Product>) -> Self {
        Self::new(products)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str, category: &str, description: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            price: Price::from_cents(2499),
            image_url: format!("/images/products/{id}.jpg"),
            description: description.to_owned(),
            category: category.to_owned(),
            stock_quantity: Some(10),
            is_active: Some(true),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            product("1", "Caramel Coffee", "Flavored", "Sweet caramel notes."),
            product("3", "Dark Roast", "Dark Roast", "Bold and smoky."),
            product("5", "Hazelnut Coffee", "Flavored", "Nutty and aromatic."),
            product("8", "Vanilla Coffee", "Flavored", "Smooth and creamy."),
            product("4", "Espresso Blend", "Espresso", "Rich crema, hint of VANILLA bean."),
        ])
    }

    #[test]
    fn test_search_matches_name_case_insensitively() {
        let catalog = catalog();
        let hits = catalog.search("vanilla");
        let ids: Vec<&str> = hits.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["8", "4"]);
    }

    #[test]
    fn test_search_without_match_is_empty() {
        assert!(catalog().search("zzz").is_empty());
    }

    #[test]
    fn test_by_category_all_returns_everything() {
        let catalog = catalog();
        assert_eq!(catalog.by_category("All").len(), catalog.len());
        assert_eq!(catalog.by_category("Flavored").len(), 3);
        assert!(catalog.by_category("Decaf").is_empty());
    }

    #[test]
    fn test_categories_sorted_and_prefixed() {
        assert_eq!(
            catalog().categories(),
            vec!["All", "Dark Roast", "Espresso", "Flavored"]
        );
    }

    #[test]
    fn test_by_id() {
        let catalog = catalog();
        assert_eq!(catalog.by_id("3").unwrap().name, "Dark Roast");
        assert!(catalog.by_id("99").is_none());
    }

    #[test]
    fn test_filter_combines_search_and_category() {
        let catalog = catalog();
        let hits = catalog.filter(Some("Flavored"), Some(" coffee "));
        assert_eq!(hits.len(), 3);
        let hits = catalog.filter(Some("Espresso"), Some("vanilla"));
        assert_eq!(hits.len(), 1);
        let hits = catalog.filter(Some("Dark Roast"), Some("   "));
        assert_eq!(hits.len(), 1);
        assert_eq!(catalog.filter(None, None).len(), catalog.len());
    }

    #[test]
    fn test_related_excludes_self() {
        let catalog = catalog();
        let related = catalog.related("1", 4);
        assert_eq!(related.len(), 2);
        assert!(related.iter().all(|p| p.id.as_str() != "1"));
        assert!(catalog.related("missing", 4).is_empty());
    }

    #[test]
    fn test_listed_defaults_to_true() {
        let mut p = product("x", "X", "Y", "Z");
        p.is_active = None;
        assert!(p.is_listed());
        p.is_active = Some(false);
        assert!(!p.is_listed());
    }
}
