//! Catalog reads with read-through caching.
//!
//! The service sits between the storefront and the catalog's system of
//! record. Reads go through [`CacheManager::get_or_set`]; writes to the
//! record are followed by the matching invalidation calls here.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::keys::namespace;
use crate::cache::{CacheKeys, CacheManager, CacheOptions, CacheTags, CacheTtl};
use crate::error::{AppError, AppResult};
use crate::models::{Farm, Product, ProductFilter};

/// System of record for catalog data, usually the database.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn product(&self, id: &str) -> AppResult<Option<Product>>;

    async fn products_by_farm(&self, farm_id: &str) -> AppResult<Vec<Product>>;

    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Vec<Product>>;

    async fn farm(&self, id: &str) -> AppResult<Option<Farm>>;

    async fn search_products(&self, query: &str, filter: &ProductFilter) -> AppResult<Vec<Product>>;
}

/// Catalog service for cached product and farm reads.
///
/// Cloning is cheap: both the cache manager and the source are shared.
#[derive(Clone)]
pub struct CatalogService {
    cache: CacheManager,
    source: Arc<dyn CatalogSource>,
}

impl CatalogService {
    pub fn new(cache: CacheManager, source: Arc<dyn CatalogSource>) -> Self {
        Self { cache, source }
    }

    /// Gets a product by id.
    ///
    /// # Returns
    /// The product if found, or `NotFound` error. Misses are not cached.
    pub async fn product(&self, id: &str) -> AppResult<Product> {
        let options = CacheOptions::new()
            .ttl(CacheTtl::LONG)
            .tag(CacheTags::product(id))
            .tag(CacheTags::catalog());

        self.cache
            .get_or_set(&CacheKeys::product(id), &options, || async {
                self.source
                    .product(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("product", "id", id))
            })
            .await
    }

    /// Lists a farm's products. The TTL follows the season.
    pub async fn products_by_farm(&self, farm_id: &str) -> AppResult<Vec<Product>> {
        let options = CacheOptions::new()
            .seasonal()
            .tag(CacheTags::farm_products(farm_id))
            .tag(CacheTags::catalog());

        self.cache
            .get_or_set(&CacheKeys::products_by_farm(farm_id), &options, || {
                self.source.products_by_farm(farm_id)
            })
            .await
    }

    /// Lists products matching a filter. The TTL follows the season.
    pub async fn list_products(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let mut options = CacheOptions::new().seasonal().tag(CacheTags::catalog());
        if let Some(farm_id) = &filter.farm_id {
            options = options.tag(CacheTags::farm_products(farm_id));
        }

        self.cache
            .get_or_set(
                &CacheKeys::product_list(filter.cache_params()),
                &options,
                || self.source.list_products(filter),
            )
            .await
    }

    /// Gets a farm by id.
    pub async fn farm(&self, id: &str) -> AppResult<Farm> {
        let options = CacheOptions::new()
            .ttl(CacheTtl::LONG)
            .tag(CacheTags::farm(id))
            .tag(CacheTags::catalog());

        self.cache
            .get_or_set(&CacheKeys::farm(id), &options, || async {
                self.source
                    .farm(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("farm", "id", id))
            })
            .await
    }

    /// Gets a farm together with its products, fetching both concurrently.
    pub async fn farm_with_products(&self, id: &str) -> AppResult<(Farm, Vec<Product>)> {
        futures::future::try_join(self.farm(id), self.products_by_farm(id)).await
    }

    /// Searches products. Results are short-lived.
    pub async fn search_products(
        &self,
        query: &str,
        filter: &ProductFilter,
    ) -> AppResult<Vec<Product>> {
        if query.trim().is_empty() {
            return Err(AppError::Validation {
                field: "query".to_string(),
                reason: "search query cannot be empty".to_string(),
            });
        }

        let options = CacheOptions::new()
            .ttl(CacheTtl::SHORT)
            .tag(CacheTags::catalog());

        self.cache
            .get_or_set(
                &CacheKeys::search(query, filter.cache_params()),
                &options,
                || self.source.search_products(query, filter),
            )
            .await
    }

    /// Drop cached data derived from a product after it changed in the source.
    ///
    /// # Returns
    /// Number of listing and search entries removed
    pub async fn product_updated(&self, product: &Product) -> AppResult<usize> {
        self.cache.delete(&CacheKeys::product(&product.id)).await;

        let mut removed = self
            .cache
            .invalidate_tag(&CacheTags::farm_products(&product.farm_id))
            .await;
        removed += self
            .cache
            .invalidate_pattern(&format!("{}:list:*", namespace::PRODUCTS))
            .await?;
        removed += self
            .cache
            .invalidate_pattern(&CacheKeys::namespace_pattern(namespace::SEARCH))
            .await?;

        tracing::info!(
            product_id = %product.id,
            farm_id = %product.farm_id,
            removed,
            "Invalidated product caches"
        );
        Ok(removed)
    }

    /// Drop every cached entry scoped to a farm after it changed in the source.
    pub async fn farm_updated(&self, farm_id: &str) -> AppResult<usize> {
        let mut removed = self.cache.invalidate_tag(&CacheTags::farm(farm_id)).await;
        removed += self
            .cache
            .invalidate_tag(&CacheTags::farm_products(farm_id))
            .await;
        for pattern in CacheKeys::farm_scope_patterns(farm_id) {
            removed += self.cache.invalidate_pattern(&pattern).await?;
        }

        tracing::info!(farm_id, removed, "Invalidated farm caches");
        Ok(removed)
    }

    /// Drop every catalog entry, e.g. after a bulk import.
    pub async fn refresh_catalog(&self) -> usize {
        let removed = self.cache.invalidate_tag(&CacheTags::catalog()).await;
        tracing::info!(removed, "Invalidated catalog caches");
        removed
    }
}
