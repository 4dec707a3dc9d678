use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::cache::Season;

/// Farm listing as served to the storefront
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub location: Option<String>,
    pub featured: bool,
}

/// Product offered by a farm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub farm_id: String,
    pub name: String,
    pub category: String,
    /// Price in the smallest currency unit
    pub price_cents: i64,
    pub unit: String,
    /// Seasons the product is harvested in; empty means year-round
    #[serde(default)]
    pub seasons: Vec<Season>,
    pub available: bool,
    pub updated_at: Timestamp,
}

impl Product {
    pub fn in_season(&self, season: Season) -> bool {
        self.seasons.is_empty() || self.seasons.contains(&season)
    }
}

/// Product listing filter
///
/// Every field takes part in the cache key for listings, so two filters that
/// differ in any field never share a cached page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub farm_id: Option<String>,
    pub category: Option<String>,
    pub season: Option<Season>,
    pub available_only: bool,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            farm_id: None,
            category: None,
            season: None,
            available_only: false,
            page: 1,
            per_page: 20,
        }
    }
}

impl ProductFilter {
    /// Name/value pairs for the listing cache key. Unset options are omitted.
    pub fn cache_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(farm_id) = &self.farm_id {
            params.push(("farm", farm_id.clone()));
        }
        if let Some(category) = &self.category {
            params.push(("category", category.to_lowercase()));
        }
        if let Some(season) = self.season {
            params.push(("season", season.to_string()));
        }
        if self.available_only {
            params.push(("available", "true".to_string()));
        }
        params
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.farm_id.as_ref().is_none_or(|id| *id == product.farm_id)
            && self
                .category
                .as_ref()
                .is_none_or(|c| c.eq_ignore_ascii_case(&product.category))
            && self.season.is_none_or(|s| product.in_season(s))
            && (!self.available_only || product.available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKeys;

    fn tomato() -> Product {
        Product {
            id: "p-1".to_string(),
            farm_id: "f-1".to_string(),
            name: "Heirloom Tomato".to_string(),
            category: "Vegetables".to_string(),
            price_cents: 450,
            unit: "lb".to_string(),
            seasons: vec![Season::Summer],
            available: true,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_filter_matches() {
        let product = tomato();
        assert!(ProductFilter::default().matches(&product));

        let filter = ProductFilter {
            category: Some("vegetables".to_string()),
            season: Some(Season::Summer),
            ..Default::default()
        };
        assert!(filter.matches(&product));

        let filter = ProductFilter {
            season: Some(Season::Winter),
            ..Default::default()
        };
        assert!(!filter.matches(&product));
    }

    #[test]
    fn test_year_round_product_is_always_in_season() {
        let product = Product {
            seasons: vec![],
            ..tomato()
        };
        for season in Season::ALL {
            assert!(product.in_season(season));
        }
    }

    #[test]
    fn test_filters_produce_distinct_listing_keys() {
        let base = ProductFilter::default();
        let by_farm = ProductFilter {
            farm_id: Some("f-1".to_string()),
            ..Default::default()
        };
        let page_two = ProductFilter {
            page: 2,
            ..Default::default()
        };

        let keys = [&base, &by_farm, &page_two].map(|f| CacheKeys::product_list(f.cache_params()));
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[0], keys[2]);
        assert_eq!(keys[0], "products:list:page:1:per_page:20");
    }
}
