//! Constraint generation and per-result visibility processing

use crate::error::Result;
use crate::search::engine::SearchResponse;
use crate::search::query::{ConstraintMap, Constraints, SearchUser};
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

/// Produces the default constraints for a user and optional course
#[async_trait]
pub trait FilterGenerator: Send + Sync + 'static {
    async fn field_filters(
        &self,
        user: Option<&SearchUser>,
        course_id: Option<&str>,
    ) -> Result<Constraints>;
}

/// Decides whether a result payload is visible to a user.
///
/// `Ok(None)` means "not visible"; `Ok(Some(payload))` keeps the hit with the
/// returned (possibly redacted or enriched) payload.
#[async_trait]
pub trait ResultProcessor: Send + Sync + 'static {
    async fn process_result(
        &self,
        data: serde_json::Value,
        term: &str,
        user: Option<&SearchUser>,
    ) -> Result<Option<serde_json::Value>>;
}

/// Generator that adds no constraints
#[derive(Debug, Clone, Default)]
pub struct NoopFilterGenerator;

#[async_trait]
impl FilterGenerator for NoopFilterGenerator {
    async fn field_filters(
        &self,
        _user: Option<&SearchUser>,
        _course_id: Option<&str>,
    ) -> Result<Constraints> {
        Ok(Constraints::default())
    }
}

/// Generator restricting matches to the requested course
#[derive(Debug, Clone)]
pub struct CourseFilterGenerator {
    course_field: String,
}

impl CourseFilterGenerator {
    pub fn new(course_field: impl Into<String>) -> Self {
        Self {
            course_field: course_field.into(),
        }
    }
}

impl Default for CourseFilterGenerator {
    fn default() -> Self {
        Self::new("course")
    }
}

#[async_trait]
impl FilterGenerator for CourseFilterGenerator {
    async fn field_filters(
        &self,
        _user: Option<&SearchUser>,
        course_id: Option<&str>,
    ) -> Result<Constraints> {
        let mut fields = ConstraintMap::new();
        if let Some(course_id) = course_id {
            fields.set(self.course_field.clone(), course_id);
        }
        Ok(Constraints::new(fields, ConstraintMap::new(), ConstraintMap::new()))
    }
}

/// Processor that shows every payload unchanged
#[derive(Debug, Clone, Default)]
pub struct PassthroughProcessor;

#[async_trait]
impl ResultProcessor for PassthroughProcessor {
    async fn process_result(
        &self,
        data: serde_json::Value,
        _term: &str,
        _user: Option<&SearchUser>,
    ) -> Result<Option<serde_json::Value>> {
        Ok(Some(data))
    }
}

/// Run `processor` over every hit, dropping the invisible ones.
///
/// Surviving hits keep their ranking order and carry the processed payload;
/// `access_denied_count` is the number dropped. The first processor error is
/// returned as-is.
pub async fn process_results(
    mut response: SearchResponse,
    term: &str,
    user: Option<&SearchUser>,
    processor: &dyn ResultProcessor,
) -> Result<SearchResponse> {
    let hits = std::mem::take(&mut response.results);
    let received = hits.len();

    let processed = try_join_all(hits.into_iter().map(|mut hit| async move {
        let data = std::mem::take(&mut hit.data);
        Ok::<_, crate::error::SearchError>(
            processor
                .process_result(data, term, user)
                .await?
                .map(|data| {
                    hit.data = data;
                    hit
                }),
        )
    }))
    .await?;

    response.results = processed.into_iter().flatten().collect();
    response.access_denied_count = received - response.results.len();

    debug!(
        received,
        kept = response.results.len(),
        denied = response.access_denied_count,
        "Post-processed search results"
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::search::engine::SearchHit;
    use serde_json::{json, Value};

    /// Hides hits flagged `hidden` and tags the rest
    struct TaggingProcessor;

    #[async_trait]
    impl ResultProcessor for TaggingProcessor {
        async fn process_result(
            &self,
            mut data: Value,
            term: &str,
            user: Option<&SearchUser>,
        ) -> Result<Option<Value>> {
            if data.get("hidden") == Some(&json!(true)) {
                return Ok(None);
            }
            if data.get("explode").is_some() {
                return Err(SearchError::Processor("boom".to_string()));
            }
            data["matched_term"] = json!(term);
            data["viewer"] = json!(user.map(|u| u.id.clone()));
            Ok(Some(data))
        }
    }

    fn response(payloads: Vec<Value>) -> SearchResponse {
        SearchResponse {
            results: payloads
                .into_iter()
                .enumerate()
                .map(|(i, data)| SearchHit::new(format!("hit-{}", i), 1.0, data))
                .collect(),
            size: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_drops_invisible_and_preserves_order() {
        let raw = response(vec![
            json!({"n": 0}),
            json!({"n": 1, "hidden": true}),
            json!({"n": 2}),
            json!({"n": 3, "hidden": true}),
            json!({"n": 4}),
        ]);
        let user = SearchUser::new("learner");

        let processed = process_results(raw, "rust", Some(&user), &TaggingProcessor)
            .await
            .unwrap();

        let ids: Vec<_> = processed.results.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["hit-0", "hit-2", "hit-4"]);
        assert_eq!(processed.access_denied_count, 2);
        assert_eq!(processed.results[0].data["matched_term"], json!("rust"));
        assert_eq!(processed.results[0].data["viewer"], json!("learner"));
    }

    #[tokio::test]
    async fn test_passthrough_keeps_payload_identical() {
        let raw = response(vec![json!({"content": {"text": "ownership"}})]);
        let expected = raw.results.clone();

        let processed = process_results(raw, "ownership", None, &PassthroughProcessor)
            .await
            .unwrap();

        assert_eq!(processed.results, expected);
        assert_eq!(processed.access_denied_count, 0);
    }

    #[tokio::test]
    async fn test_processor_error_propagates() {
        let raw = response(vec![json!({"n": 0}), json!({"explode": true})]);

        let err = process_results(raw, "x", None, &TaggingProcessor)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Processor(msg) if msg == "boom"));
    }

    #[tokio::test]
    async fn test_course_filter_generator() {
        let generator = CourseFilterGenerator::default();

        let scoped = generator
            .field_filters(None, Some("course-v1:edX+DemoX+Demo"))
            .await
            .unwrap();
        assert_eq!(
            scoped.fields.get("course").and_then(|v| v.as_text()),
            Some("course-v1:edX+DemoX+Demo")
        );

        let unscoped = generator.field_filters(None, None).await.unwrap();
        assert!(unscoped.fields.is_empty());
    }
}
