//! Cache key registry.
//!
//! Every cached entity gets its key from here so namespaces never collide.
//! Keys look like `namespace[:segment]*[:param:value]*`. Query parameters are
//! sorted by name before they are joined, so two filters built in different
//! orders produce the same key. Reserved characters inside segments are
//! percent-encoded, which keeps `:` usable as the separator and keeps
//! wildcard characters out of invalidation patterns.

use std::collections::BTreeMap;

use crate::cache::seasonal::Season;

/// Namespace prefixes.
pub mod namespace {
    pub const PRODUCT: &str = "product";
    pub const PRODUCTS: &str = "products";
    pub const FARM: &str = "farm";
    pub const FARMS: &str = "farms";
    pub const USER: &str = "user";
    pub const ORDER: &str = "order";
    pub const ORDERS: &str = "orders";
    pub const CART: &str = "cart";
    pub const RECOMMENDATIONS: &str = "recommendations";
    pub const CAMPAIGN: &str = "campaign";
    pub const ANALYTICS: &str = "analytics";
    pub const SEARCH: &str = "search";
}

/// Named TTLs in seconds.
pub struct CacheTtl;

impl CacheTtl {
    pub const SHORT: u64 = 60;
    pub const MEDIUM: u64 = 300;
    pub const LONG: u64 = 3600;
    pub const DAY: u64 = 86_400;
}

/// Builder functions for cache keys.
pub struct CacheKeys;

impl CacheKeys {
    pub fn product(id: &str) -> String {
        KeyBuilder::new(namespace::PRODUCT).segment(id).build()
    }

    pub fn products_by_farm(farm_id: &str) -> String {
        KeyBuilder::new(namespace::PRODUCTS)
            .segment("farm")
            .segment(farm_id)
            .build()
    }

    pub fn product_list<I, K, V>(params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        KeyBuilder::new(namespace::PRODUCTS)
            .segment("list")
            .params(params)
            .build()
    }

    pub fn seasonal_products(season: Season) -> String {
        KeyBuilder::new(namespace::PRODUCTS)
            .segment("season")
            .segment(season.as_str())
            .build()
    }

    pub fn farm(id: &str) -> String {
        KeyBuilder::new(namespace::FARM).segment(id).build()
    }

    pub fn farm_by_slug(slug: &str) -> String {
        KeyBuilder::new(namespace::FARM)
            .segment("slug")
            .segment(slug)
            .build()
    }

    pub fn farm_list<I, K, V>(params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        KeyBuilder::new(namespace::FARMS)
            .segment("list")
            .params(params)
            .build()
    }

    pub fn featured_farms() -> String {
        KeyBuilder::new(namespace::FARMS).segment("featured").build()
    }

    pub fn user(id: &str) -> String {
        KeyBuilder::new(namespace::USER).segment(id).build()
    }

    pub fn user_orders<I, K, V>(user_id: &str, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        KeyBuilder::new(namespace::ORDERS)
            .segment("user")
            .segment(user_id)
            .params(params)
            .build()
    }

    pub fn order(id: &str) -> String {
        KeyBuilder::new(namespace::ORDER).segment(id).build()
    }

    pub fn cart(user_id: &str) -> String {
        KeyBuilder::new(namespace::CART).segment(user_id).build()
    }

    pub fn recommendations(user_id: &str) -> String {
        KeyBuilder::new(namespace::RECOMMENDATIONS)
            .segment(user_id)
            .build()
    }

    pub fn campaign(id: &str) -> String {
        KeyBuilder::new(namespace::CAMPAIGN).segment(id).build()
    }

    pub fn campaign_analytics<I, K, V>(campaign_id: &str, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        KeyBuilder::new(namespace::ANALYTICS)
            .segment("campaign")
            .segment(campaign_id)
            .params(params)
            .build()
    }

    /// Search results key. The query is trimmed and lowercased first.
    pub fn search<I, K, V>(query: &str, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        KeyBuilder::new(namespace::SEARCH)
            .segment(&query.trim().to_lowercase())
            .params(params)
            .build()
    }

    /// Pattern matching every key in a namespace, e.g. `product:*`.
    pub fn namespace_pattern(namespace: &str) -> String {
        format!("{}:*", namespace)
    }

    /// Patterns matching every key scoped to a farm through a `farm`
    /// segment or parameter, such as `products:farm:{id}` or
    /// `products:list:farm:{id}:page:1`. The farm's own entity key is not
    /// included.
    pub fn farm_scope_patterns(farm_id: &str) -> [String; 2] {
        let id = encode_segment(farm_id);
        [format!("*:farm:{}", id), format!("*:farm:{}:*", id)]
    }
}

/// Tag names used for grouped invalidation.
pub struct CacheTags;

impl CacheTags {
    pub fn product(id: &str) -> String {
        format!("product:{}", encode_segment(id))
    }

    pub fn farm(id: &str) -> String {
        format!("farm:{}", encode_segment(id))
    }

    pub fn farm_products(farm_id: &str) -> String {
        format!("farm-products:{}", encode_segment(farm_id))
    }

    pub fn user(id: &str) -> String {
        format!("user:{}", encode_segment(id))
    }

    pub fn catalog() -> String {
        "catalog".to_string()
    }
}

/// Incremental key construction for custom namespaces.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    key: String,
}

impl KeyBuilder {
    pub fn new(namespace: &str) -> Self {
        Self {
            key: encode_segment(namespace),
        }
    }

    pub fn segment(mut self, segment: &str) -> Self {
        self.key.push(':');
        self.key.push_str(&encode_segment(segment));
        self
    }

    /// Append parameters in sorted name order. A repeated name keeps the last
    /// value supplied.
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let sorted: BTreeMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();

        for (name, value) in sorted {
            self.key.push(':');
            self.key.push_str(&encode_segment(&name));
            self.key.push(':');
            self.key.push_str(&encode_segment(&value));
        }
        self
    }

    pub fn build(self) -> String {
        self.key
    }
}

/// Percent-encode the characters that carry meaning in keys and patterns.
fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for ch in segment.chars() {
        match ch {
            '%' => encoded.push_str("%25"),
            ':' => encoded.push_str("%3A"),
            '*' => encoded.push_str("%2A"),
            '?' => encoded.push_str("%3F"),
            '[' => encoded.push_str("%5B"),
            ']' => encoded.push_str("%5D"),
            c => encoded.push(c),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::pattern::KeyPattern;
    use proptest::prelude::*;

    const NO_PARAMS: [(&str, &str); 0] = [];

    #[test]
    fn test_products_by_farm_is_deterministic() {
        assert_eq!(
            CacheKeys::products_by_farm("abc"),
            CacheKeys::products_by_farm("abc")
        );
        assert_eq!(CacheKeys::products_by_farm("abc"), "products:farm:abc");
    }

    #[test]
    fn test_param_order_does_not_matter() {
        let a = CacheKeys::product_list([("a", 1), ("b", 2)]);
        let b = CacheKeys::product_list([("b", 2), ("a", 1)]);
        assert_eq!(a, b);
        assert_eq!(a, "products:list:a:1:b:2");
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let keys = [
            CacheKeys::product("1"),
            CacheKeys::farm("1"),
            CacheKeys::user("1"),
            CacheKeys::order("1"),
            CacheKeys::cart("1"),
            CacheKeys::campaign("1"),
            CacheKeys::recommendations("1"),
            CacheKeys::products_by_farm("1"),
            CacheKeys::farm_by_slug("1"),
            CacheKeys::user_orders("1", NO_PARAMS),
            CacheKeys::campaign_analytics("1", NO_PARAMS),
            CacheKeys::search("1", NO_PARAMS),
        ];
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn test_separator_in_values_is_escaped() {
        let smuggled = CacheKeys::product_list([("a", "1:b:2")]);
        let honest = CacheKeys::product_list([("a", "1"), ("b", "2")]);
        assert_ne!(smuggled, honest);
        assert_eq!(smuggled, "products:list:a:1%3Ab%3A2");
    }

    #[test]
    fn test_wildcards_in_ids_do_not_widen_patterns() {
        let key = CacheKeys::product("*");
        assert_eq!(key, "product:%2A");
        let pattern = KeyPattern::new(&CacheKeys::namespace_pattern(namespace::PRODUCT)).unwrap();
        assert!(pattern.matches(&key));
        assert!(!KeyPattern::new(&key).unwrap().matches("product:1"));
    }

    #[test]
    fn test_search_normalises_query() {
        assert_eq!(
            CacheKeys::search("  Heirloom Tomatoes ", [("page", 1)]),
            CacheKeys::search("heirloom tomatoes", [("page", 1)])
        );
    }

    #[test]
    fn test_seasonal_products_key() {
        assert_eq!(
            CacheKeys::seasonal_products(Season::Summer),
            "products:season:summer"
        );
    }

    #[test]
    fn test_farm_scope_patterns_match_farm_listings() {
        let patterns: Vec<KeyPattern> = CacheKeys::farm_scope_patterns("f-9")
            .iter()
            .map(|p| KeyPattern::new(p).unwrap())
            .collect();
        let scoped = |key: &str| patterns.iter().any(|p| p.matches(key));

        assert!(scoped(&CacheKeys::products_by_farm("f-9")));
        assert!(scoped(&CacheKeys::product_list([("farm", "f-9")])));
        assert!(scoped(&CacheKeys::product_list([
            ("farm", "f-9"),
            ("page", "2"),
            ("category", "fruit"),
        ])));

        assert!(!scoped(&CacheKeys::products_by_farm("f-1")));
        assert!(!scoped(&CacheKeys::products_by_farm("f-90")));
        assert!(!scoped(&CacheKeys::product_list([("farm", "f-90")])));
        assert!(!scoped(&CacheKeys::user("f-9x")));
        assert!(!scoped(&CacheKeys::product("f-90")));
        assert!(!scoped(&CacheKeys::order("f-9")));
    }

    #[test]
    fn test_tags() {
        assert_eq!(CacheTags::product("1"), "product:1");
        assert_eq!(CacheTags::farm_products("a:b"), "farm-products:a%3Ab");
        assert_eq!(CacheTags::catalog(), "catalog");
    }

    fn arb_params() -> impl Strategy<Value = (Vec<(String, String)>, Vec<(String, String)>)> {
        prop::collection::btree_map("[a-z_]{1,8}", "[a-zA-Z0-9:%* -]{0,8}", 0..6).prop_flat_map(
            |params| {
                let ordered: Vec<(String, String)> = params.into_iter().collect();
                (Just(ordered.clone()), Just(ordered).prop_shuffle())
            },
        )
    }

    proptest! {
        #[test]
        fn prop_param_permutations_share_a_key((ordered, shuffled) in arb_params()) {
            prop_assert_eq!(
                CacheKeys::product_list(ordered),
                CacheKeys::product_list(shuffled)
            );
        }

        #[test]
        fn prop_distinct_ids_give_distinct_keys(a in ".{0,12}", b in ".{0,12}") {
            prop_assume!(a != b);
            prop_assert_ne!(CacheKeys::farm(&a), CacheKeys::farm(&b));
        }
    }
}
