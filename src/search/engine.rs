//! Search engine abstraction and index registry

use crate::error::Result;
use crate::search::query::{Constraints, EngineQuery, Page};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A single search result hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document ID
    pub id: String,

    /// Search score/relevance
    pub score: f32,

    /// Opaque document payload
    pub data: serde_json::Value,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, score: f32, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            score,
            data,
        }
    }
}

/// Term counts for one facet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetResult {
    /// Documents carrying the facet field
    pub total: u64,

    /// Count per distinct term
    pub terms: BTreeMap<String, u64>,

    /// Count of documents in terms that were not listed
    pub other: u64,
}

/// Search response with results and metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Search execution time in milliseconds
    pub took_ms: u64,

    /// Total number of hits (before pagination)
    pub total: u64,

    /// Highest score among the hits
    pub max_score: Option<f32>,

    /// Search results, in engine ranking order
    pub results: Vec<SearchHit>,

    /// Facet counts (if aggregations were requested)
    #[serde(default)]
    pub facets: BTreeMap<String, FacetResult>,

    /// Hits removed because the acting user may not see them
    #[serde(default)]
    pub access_denied_count: usize,

    /// Limit used for pagination
    pub size: usize,

    /// Offset used for pagination
    pub from: usize,
}

/// Full-text search backend bound to one index
#[async_trait]
pub trait SearchEngine: Send + Sync + 'static {
    /// Logical index this engine serves
    fn index_name(&self) -> &str;

    /// Term search constrained by fields, filters and exclusions
    async fn search_string(
        &self,
        term: &str,
        constraints: &Constraints,
        page: Page,
    ) -> Result<SearchResponse>;

    /// Full query with optional term and aggregations
    async fn search(&self, query: &EngineQuery) -> Result<SearchResponse>;
}

/// Looks up an engine by logical index name
pub trait EngineResolver: Send + Sync {
    fn resolve(&self, index_name: &str) -> Option<Arc<dyn SearchEngine>>;
}

/// Concurrent map of index name to engine
pub struct EngineRegistry {
    engines: DashMap<String, Arc<dyn SearchEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            engines: DashMap::new(),
        }
    }

    /// Register an engine under its own index name
    pub fn register(&self, engine: Arc<dyn SearchEngine>) -> Option<Arc<dyn SearchEngine>> {
        let name = engine.index_name().to_string();
        self.register_as(name, engine)
    }

    /// Register an engine under an explicit index name, replacing any previous one
    pub fn register_as(
        &self,
        index_name: impl Into<String>,
        engine: Arc<dyn SearchEngine>,
    ) -> Option<Arc<dyn SearchEngine>> {
        let index_name = index_name.into();
        info!(index = %index_name, "Registered search engine");
        self.engines.insert(index_name, engine)
    }

    pub fn remove(&self, index_name: &str) -> Option<Arc<dyn SearchEngine>> {
        debug!(index = %index_name, "Removing search engine from registry");
        self.engines.remove(index_name).map(|(_, engine)| engine)
    }

    /// Get all registered index names
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.engines.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineResolver for EngineRegistry {
    fn resolve(&self, index_name: &str) -> Option<Arc<dyn SearchEngine>> {
        self.engines.get(index_name).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::memory::InMemoryEngine;

    #[test]
    fn test_register_and_resolve() {
        let registry = EngineRegistry::new();
        assert!(registry.resolve("course_info").is_none());

        registry.register(Arc::new(InMemoryEngine::new("course_info")));
        registry.register_as("alias", Arc::new(InMemoryEngine::new("course_info")));

        assert_eq!(registry.list_names(), vec!["alias", "course_info"]);
        let engine = registry.resolve("course_info").unwrap();
        assert_eq!(engine.index_name(), "course_info");
    }

    #[test]
    fn test_resolved_engine_is_searchable() {
        let registry = EngineRegistry::new();
        let engine = Arc::new(InMemoryEngine::new("courseware_content"));
        engine.index_document("unit-1", serde_json::json!({"title": "Traits"}));
        registry.register(engine);

        let resolved = registry.resolve("courseware_content").unwrap();
        let response = tokio_test::block_on(resolved.search_string(
            "traits",
            &Constraints::default(),
            Page::new(10, 0),
        ))
        .unwrap();
        assert_eq!(response.results[0].id, "unit-1");
    }

    #[test]
    fn test_register_replaces_previous() {
        let registry = EngineRegistry::new();
        assert!(registry.register(Arc::new(InMemoryEngine::new("idx"))).is_none());
        assert!(registry.register(Arc::new(InMemoryEngine::new("idx"))).is_some());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove("idx").is_some());
        assert!(registry.is_empty());
    }
}
