//! Search configuration

use crate::error::Result;
use crate::search::query::{AggregationOptions, AggregationTerms};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Default index for courseware content search
pub const DEFAULT_CONTENT_INDEX: &str = "courseware_content";

/// Default index for course discovery search
pub const DEFAULT_COURSE_INFO_INDEX: &str = "course_info";

/// Filter fields offered by course discovery unless overridden
pub const DEFAULT_FILTER_FIELDS: [&str; 3] = ["org", "modes", "language"];

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SearchConfig {
    /// Logical index name for content search
    #[validate(length(min = 1))]
    pub content_index_name: String,

    /// Logical index name for course discovery search
    #[validate(length(min = 1))]
    pub course_info_index_name: String,

    /// Facet fields offered to discovery UIs
    pub discovery_filter_fields: Vec<String>,

    /// Explicit aggregation buckets; derived from the filter fields when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_aggregations: Option<AggregationTerms>,

    /// Provider field defaults carried into discovery queries
    pub discovery_search_fields: Vec<String>,

    /// Do not restrict discovery to courses whose enrollment has opened
    pub skip_enrollment_start_filtering: bool,

    /// Reject status values containing unknown tokens instead of ignoring them
    pub reject_unknown_status: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            content_index_name: DEFAULT_CONTENT_INDEX.to_string(),
            course_info_index_name: DEFAULT_COURSE_INFO_INDEX.to_string(),
            discovery_filter_fields: DEFAULT_FILTER_FIELDS.iter().map(|f| f.to_string()).collect(),
            discovery_aggregations: None,
            discovery_search_fields: vec!["org".to_string()],
            skip_enrollment_start_filtering: false,
            reject_unknown_status: false,
        }
    }
}

impl SearchConfig {
    /// Load configuration from defaults, an optional file and environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::Config::try_from(&SearchConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: SearchConfig = builder
            // Override with environment variables (prefix: COURSE_SEARCH__)
            .add_source(
                config::Environment::with_prefix("COURSE_SEARCH")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("discovery_filter_fields")
                    .with_list_parse_key("discovery_search_fields"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Facet fields offered by course discovery
    pub fn discovery_filter_fields(&self) -> &[String] {
        &self.discovery_filter_fields
    }

    /// Aggregation buckets for course discovery.
    ///
    /// An explicit mapping is returned unchanged; otherwise every filter field
    /// gets one bucket with engine-default options.
    pub fn discovery_aggregations(&self) -> AggregationTerms {
        match &self.discovery_aggregations {
            Some(aggregations) => aggregations.clone(),
            None => self
                .discovery_filter_fields
                .iter()
                .map(|field| (field.clone(), AggregationOptions::default()))
                .collect(),
        }
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn content_index_name(mut self, name: impl Into<String>) -> Self {
        self.config.content_index_name = name.into();
        self
    }

    pub fn course_info_index_name(mut self, name: impl Into<String>) -> Self {
        self.config.course_info_index_name = name.into();
        self
    }

    pub fn discovery_filter_fields(mut self, fields: Vec<impl Into<String>>) -> Self {
        self.config.discovery_filter_fields = fields.into_iter().map(|f| f.into()).collect();
        self
    }

    pub fn discovery_aggregations(mut self, aggregations: AggregationTerms) -> Self {
        self.config.discovery_aggregations = Some(aggregations);
        self
    }

    pub fn discovery_search_fields(mut self, fields: Vec<impl Into<String>>) -> Self {
        self.config.discovery_search_fields = fields.into_iter().map(|f| f.into()).collect();
        self
    }

    pub fn skip_enrollment_start_filtering(mut self, skip: bool) -> Self {
        self.config.skip_enrollment_start_filtering = skip;
        self
    }

    pub fn reject_unknown_status(mut self, reject: bool) -> Self {
        self.config.reject_unknown_status = reject;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
