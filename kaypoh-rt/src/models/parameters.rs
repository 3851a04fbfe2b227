//! Crawl job input parameters

use serde::{Deserialize, Serialize};

/// Where to search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Restrict to the configured local-scope location
    Local,
    /// Use the configured default location
    #[default]
    Global,
}

/// Input document submitted to the crawl actor
///
/// Field names follow the vendor's input schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlParameters {
    pub search_strings_array: Vec<String>,
    pub location_query: String,
    pub max_crawled_places_per_search: u32,
    pub language: String,
    pub search_matching: String,
    pub max_reviews: u32,
    pub reviews_sort: String,
    pub scrape_reviews_personal_data: bool,
    pub reviews_origin: String,
    pub only_data_from_search_page: bool,
    pub max_crawled_places: u32,
}

impl CrawlParameters {
    /// Parameters for one search query at one location
    pub fn for_query(query: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            search_strings_array: vec![query.into()],
            location_query: location.into(),
            max_crawled_places_per_search: 3,
            language: "en".to_string(),
            search_matching: "all".to_string(),
            max_reviews: 15,
            reviews_sort: "newest".to_string(),
            scrape_reviews_personal_data: true,
            reviews_origin: "all".to_string(),
            only_data_from_search_page: false,
            max_crawled_places: 5,
        }
    }

    /// Apply a search scope: local scope pins both query and location
    pub fn scoped(
        query: &str,
        scope: SearchScope,
        default_location: &str,
        local_location: &str,
    ) -> Self {
        match scope {
            SearchScope::Local => {
                Self::for_query(format!("{} {}", query, local_location), local_location)
            }
            SearchScope::Global => Self::for_query(query, default_location),
        }
    }
}
