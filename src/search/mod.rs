//! Course catalog search pipeline
//!
//! This module sits between application callers and a full-text search
//! backend:
//!
//! - **Content Search**: term search scoped to a user and course, with
//!   per-result visibility filtering
//! - **Course Discovery**: public catalog search with status, enrollment
//!   window and facet handling
//! - **Pluggable Engines**: backends resolved by logical index name
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           CourseSearchService                    │
//! ├─────────────────────────────────────────────────┤
//! │  - perform_search()  - course_discovery_search() │
//! └─────────────────────────────────────────────────┘
//!          │                   │               │
//!          ▼                   ▼               ▼
//! ┌────────────────┐ ┌──────────────────┐ ┌───────────────┐
//! │ FilterGenerator│ │ EngineResolver   │ │ResultProcessor│
//! │ fields/filters │ │ index -> engine  │ │ visible/None  │
//! │ /exclude       │ │                  │ │               │
//! └────────────────┘ └──────────────────┘ └───────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────┐
//! │           SearchEngine                           │
//! ├─────────────────────────────────────────────────┤
//! │  - search_string()   - search()                  │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use course_search::search::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(EngineRegistry::new());
//!     registry.register(Arc::new(InMemoryEngine::new("course_info")));
//!
//!     let service = CourseSearchService::new(
//!         SearchConfig::default(),
//!         Arc::new(NoopFilterGenerator),
//!         registry,
//!         Arc::new(PassthroughProcessor),
//!     );
//!
//!     let request = DiscoveryRequest::new()
//!         .with_term("rust")
//!         .with_field("estatus", "ongoing");
//!     let results = service.course_discovery_search(&request).await?;
//!     println!("Found {} courses", results.total);
//!
//!     Ok(())
//! }
//! ```

mod clock;
mod config;
mod engine;
mod filters;
mod memory;
mod query;
mod service;
mod status;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    SearchConfig, SearchConfigBuilder, DEFAULT_CONTENT_INDEX, DEFAULT_COURSE_INFO_INDEX,
    DEFAULT_FILTER_FIELDS,
};
pub use engine::{EngineRegistry, EngineResolver, FacetResult, SearchEngine, SearchHit, SearchResponse};
pub use filters::{
    process_results, CourseFilterGenerator, FilterGenerator, NoopFilterGenerator,
    PassthroughProcessor, ResultProcessor,
};
pub use memory::InMemoryEngine;
pub use query::{
    AggregationOptions, AggregationTerms, ConstraintMap, Constraints, ContentSearchRequest,
    DateRange, DiscoveryRequest, EngineQuery, FieldValue, Page, SearchUser,
};
pub use service::CourseSearchService;
pub use status::{CoursePhase, StatusFilter, INVITATION_ONLY, STATUS_FIELD};
