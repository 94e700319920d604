//! Course search orchestration

use crate::error::{Result, SearchError};
use crate::search::clock::{Clock, SystemClock};
use crate::search::config::SearchConfig;
use crate::search::engine::{EngineResolver, SearchEngine, SearchResponse};
use crate::search::filters::{process_results, FilterGenerator, ResultProcessor};
use crate::search::query::{
    ConstraintMap, Constraints, ContentSearchRequest, DateRange, DiscoveryRequest, EngineQuery,
    FieldValue,
};
use crate::search::status::{StatusFilter, INVITATION_ONLY, STATUS_FIELD};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Builds constraints, runs queries and post-processes content results
pub struct CourseSearchService {
    config: SearchConfig,
    filter_generator: Arc<dyn FilterGenerator>,
    resolver: Arc<dyn EngineResolver>,
    result_processor: Arc<dyn ResultProcessor>,
    clock: Arc<dyn Clock>,
}

impl CourseSearchService {
    pub fn new(
        config: SearchConfig,
        filter_generator: Arc<dyn FilterGenerator>,
        resolver: Arc<dyn EngineResolver>,
        result_processor: Arc<dyn ResultProcessor>,
    ) -> Self {
        Self {
            config,
            filter_generator,
            resolver,
            result_processor,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Search courseware content on behalf of a user.
    ///
    /// Hits the user may not see are removed and counted in
    /// `access_denied_count`.
    pub async fn perform_search(&self, request: &ContentSearchRequest) -> Result<SearchResponse> {
        let constraints = self
            .filter_generator
            .field_filters(request.user.as_ref(), request.course_id.as_deref())
            .await?;

        let engine = self.engine_for(&self.config.content_index_name)?;

        debug!(
            index = %self.config.content_index_name,
            fields = ?constraints.fields,
            filters = ?constraints.filters,
            exclude = ?constraints.exclude,
            "Running content search"
        );

        let raw = engine
            .search_string(&request.term, &constraints, request.page())
            .await?;

        let response = process_results(
            raw,
            &request.term,
            request.user.as_ref(),
            self.result_processor.as_ref(),
        )
        .await?;

        info!(
            index = %self.config.content_index_name,
            hits = response.results.len(),
            access_denied = response.access_denied_count,
            "Content search completed"
        );

        Ok(response)
    }

    /// Public course catalog search with status and enrollment faceting.
    ///
    /// Results are returned exactly as the engine produced them.
    pub async fn course_discovery_search(&self, request: &DiscoveryRequest) -> Result<SearchResponse> {
        let now = self.clock.now();
        let query = self.discovery_query(request, now).await?;

        let engine = self.engine_for(&self.config.course_info_index_name)?;
        let response = engine.search(&query).await?;

        info!(
            index = %self.config.course_info_index_name,
            total = response.total,
            facets = response.facets.len(),
            "Course discovery search completed"
        );

        Ok(response)
    }

    /// Build the engine query for a discovery request at instant `now`
    pub async fn discovery_query(
        &self,
        request: &DiscoveryRequest,
        now: DateTime<Utc>,
    ) -> Result<EngineQuery> {
        let Constraints {
            mut fields,
            mut exclude,
            ..
        } = self.filter_generator.field_filters(None, None).await?;

        fields.retain_keys(&self.config.discovery_search_fields);

        debug!(overrides = ?request.field_overrides, exclude = ?exclude, "Discovery inputs");
        if let Some(overrides) = &request.field_overrides {
            fields.merge_overrides(overrides);
        }

        if let Some(status_value) = fields.take(STATUS_FIELD) {
            self.apply_status(&status_value, &mut fields, &mut exclude, now)?;
        }

        if !self.config.skip_enrollment_start_filtering {
            fields.set("enrollment_start", DateRange::until(now));
        }

        let filters = ConstraintMap::new().with("enrollment_end", DateRange::since(now));

        debug!(fields = ?fields, "Discovery field constraints");

        Ok(EngineQuery {
            query_string: request.term.clone(),
            page: request.page(),
            constraints: Constraints::new(fields, filters, exclude),
            aggregation_terms: self.config.discovery_aggregations(),
        })
    }

    fn apply_status(
        &self,
        status_value: &FieldValue,
        fields: &mut ConstraintMap,
        exclude: &mut ConstraintMap,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let status = match status_value.as_text() {
            Some(raw) => StatusFilter::parse(raw),
            None => StatusFilter {
                unrecognized: vec![serde_json::to_string(status_value)?],
                ..Default::default()
            },
        };

        if status.has_unrecognized() {
            if self.config.reject_unknown_status {
                return Err(SearchError::InvalidStatus(status.unrecognized.join(" ")));
            }
            warn!(unrecognized = ?status.unrecognized, "Ignoring unrecognized course status tokens");
        }

        exclude.set(INVITATION_ONLY, false);
        status.apply(fields, now);
        Ok(())
    }

    fn engine_for(&self, index_name: &str) -> Result<Arc<dyn SearchEngine>> {
        self.resolver.resolve(index_name).ok_or_else(|| {
            error!(index = %index_name, "No search engine configured");
            SearchError::NoSearchEngine(index_name.to_string())
        })
    }
}
