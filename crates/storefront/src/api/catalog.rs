//! Catalog endpoints: products and suggestions.
//!
//! Reads are cached for 5 minutes; search queries bypass the cache.

use tracing::{debug, instrument};

use allblackery_core::ProductId;

use super::cache::CacheValue;
use super::types::{Product, ProductFilters, ProductPage};
use super::{ApiClient, ApiEnvelope, ApiError};

impl ApiClient {
    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.catalog_cache().get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let envelope: ApiEnvelope<Product> =
            self.get_json(&format!("products/{product_id}")).await?;
        let product = envelope.into_result()?;

        self.catalog_cache()
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a filtered page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, filters))]
    pub async fn get_products(&self, filters: &ProductFilters) -> Result<ProductPage, ApiError> {
        let cache_key = products_cache_key(filters);

        // Check cache (searches are always fresh)
        if !filters.is_search()
            && let Some(CacheValue::Products(page)) = self.catalog_cache().get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let envelope: ApiEnvelope<ProductPage> =
            self.get_json_query("products", filters).await?;
        let page = envelope.into_result()?;

        if !filters.is_search() {
            self.catalog_cache()
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get suggested products for a product detail page.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product_suggestions(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Product>, ApiError> {
        let cache_key = format!("suggestions:{product_id}");

        if let Some(CacheValue::Suggestions(products)) = self.catalog_cache().get(&cache_key).await
        {
            debug!("Cache hit for suggestions");
            return Ok(products);
        }

        let envelope: ApiEnvelope<Vec<Product>> = self
            .get_json(&format!("products/suggestions/{product_id}"))
            .await?;
        let products = envelope.into_result()?;

        self.catalog_cache()
            .insert(cache_key, CacheValue::Suggestions(products.clone()))
            .await;

        Ok(products)
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_catalog_cache(&self) {
        self.catalog_cache().invalidate_all();
        self.catalog_cache().run_pending_tasks().await;
    }
}

/// Cache key for a product listing.
///
/// Every filter dimension the request serializes must appear here; two
/// queries that differ in any filter may not share a cache entry.
fn products_cache_key(filters: &ProductFilters) -> String {
    format!(
        "products:{}:{}:{:?}:{:?}:{:?}:{:?}:{:?}",
        filters.page.unwrap_or(1),
        filters.limit.unwrap_or(20),
        filters.category_id,
        filters.sort_by,
        filters.min_price,
        filters.max_price,
        filters.featured,
    )
}
