//! Catalog reads.
//!
//! Product-by-slug and the category list are cached in memory for five
//! minutes; filtered listings always hit the network so price/stock edits
//! show up on the next browse.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use blossom_core::{Category, Paginated, Product, ProductFilter};

use crate::error::ApiError;
use crate::gateway::RequestGateway;

/// Cached catalog value.
#[derive(Clone)]
enum CacheValue {
    Product(Arc<Product>),
    Categories(Arc<Vec<Category>>),
}

/// Catalog endpoint group.
#[derive(Clone)]
pub struct ProductsApi {
    gateway: RequestGateway,
    cache: Cache<String, CacheValue>,
}

impl ProductsApi {
    #[must_use]
    pub fn new(gateway: RequestGateway) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { gateway, cache }
    }

    /// List all categories (cached).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let cache_key = "categories".to_string();
        if let Some(CacheValue::Categories(categories)) = self.cache.get(&cache_key).await {
            debug!("cache hit for categories");
            return Ok(categories.as_ref().clone());
        }

        let categories: Vec<Category> = self.gateway.get("/products/categories/").await?;
        self.cache
            .insert(cache_key, CacheValue::Categories(Arc::new(categories.clone())))
            .await;
        Ok(categories)
    }

    /// Get one category by its slug.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the category is not found or the request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn category(&self, slug: &str) -> Result<Category, ApiError> {
        self.gateway
            .get(&format!("/products/categories/{slug}/"))
            .await
    }

    /// List products matching `filter`, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip_all)]
    pub async fn products(&self, filter: &ProductFilter) -> Result<Paginated<Product>, ApiError> {
        self.gateway
            .get_query("/products/", &filter.to_query())
            .await
    }

    /// Get one product by its slug (cached).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the product is not found or the request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn product(&self, slug: &str) -> Result<Product, ApiError> {
        let cache_key = format!("product:{slug}");
        if let Some(CacheValue::Product(product)) = self.cache.get(&cache_key).await {
            debug!("cache hit for product");
            return Ok(product.as_ref().clone());
        }

        let product: Product = self.gateway.get(&format!("/products/{slug}/")).await?;
        self.cache
            .insert(cache_key, CacheValue::Product(Arc::new(product.clone())))
            .await;
        Ok(product)
    }
}
