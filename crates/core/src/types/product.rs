//! Catalog value objects.
//!
//! A [`Product`] received from the catalog is a snapshot: components that
//! hold on to one (cart lines, the favorites set) keep the copy they were
//! given at the moment of action. Later catalog changes do not retroactively
//! alter a held snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    /// URL-safe identifier used in catalog paths.
    pub slug: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A product snapshot as served by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub title: String,
    /// URL-safe identifier used in catalog paths.
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    /// Units available; cart quantities are clamped to this.
    pub stock: u32,
    pub is_active: bool,
    pub image_url: String,
    /// Additional gallery images beyond `image_url`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_hit: bool,
    pub created_at: DateTime<Utc>,
}

/// Catalog listing filter.
///
/// All fields are optional; unset fields are omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Restrict to one category slug.
    pub category: Option<String>,
    /// Free-text search over title/description.
    pub search: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    /// Only products with stock remaining.
    pub in_stock: bool,
    /// Server-side ordering key (e.g. `price`, `-created_at`).
    pub ordering: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
}

impl ProductFilter {
    /// Render the filter as query pairs for the catalog endpoint.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price", max.to_string()));
        }
        if self.in_stock {
            pairs.push(("in_stock", "true".to_string()));
        }
        if let Some(ordering) = &self.ordering {
            pairs.push(("ordering", ordering.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "category_id": 2,
            "title": "Peony bouquet",
            "slug": "peony-bouquet",
            "price": "1500",
            "stock": 5,
            "is_active": true,
            "image_url": "https://cdn.example.com/peony.jpg",
            "created_at": "2025-06-01T10:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_product_optional_fields_default() {
        let product = sample_product();
        assert!(product.description.is_empty());
        assert!(product.images.is_empty());
        assert!(!product.is_new);
        assert!(!product.is_hit);
    }

    #[test]
    fn test_filter_to_query_empty() {
        assert!(ProductFilter::default().to_query().is_empty());
    }

    #[test]
    fn test_filter_to_query_full() {
        let filter = ProductFilter {
            category: Some("roses".into()),
            search: Some("red".into()),
            min_price: Some(100),
            max_price: Some(5000),
            in_stock: true,
            ordering: Some("-created_at".into()),
            page: Some(3),
        };
        let pairs = filter.to_query();
        assert_eq!(pairs.len(), 7);
        assert!(pairs.contains(&("in_stock", "true".to_string())));
        assert!(pairs.contains(&("page", "3".to_string())));
    }
}
