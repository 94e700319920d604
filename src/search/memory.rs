//! In-memory search engine over JSON documents
//!
//! Intended for tests, local development and the CLI. Matching rules:
//!
//! - the term matches case-insensitively against every string value
//! - field constraints must all match; a document without the field fails
//! - filter constraints must match when the document has the field
//! - exclude constraints drop documents whose field matches
//! - [`DateRange`] values match RFC 3339 timestamps inside the range

use crate::error::{Result, SearchError};
use crate::search::engine::{FacetResult, SearchEngine, SearchHit, SearchResponse};
use crate::search::query::{
    AggregationTerms, ConstraintMap, Constraints, DateRange, EngineQuery, FieldValue, Page,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

/// Stored document
#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    body: Value,
}

/// Search engine holding its documents in insertion order
pub struct InMemoryEngine {
    index_name: String,
    documents: RwLock<Vec<StoredDocument>>,
}

impl InMemoryEngine {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Add or replace a document
    pub fn index_document(&self, id: impl Into<String>, body: Value) {
        let id = id.into();
        let mut documents = self.documents.write();
        match documents.iter_mut().find(|doc| doc.id == id) {
            Some(existing) => existing.body = body,
            None => documents.push(StoredDocument { id, body }),
        }
    }

    /// Index documents that carry their own `id` field
    pub fn index_documents(&self, documents: Vec<Value>) -> Result<usize> {
        let mut count = 0;
        for body in documents {
            let id = match body.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => {
                    return Err(SearchError::Engine(format!(
                        "Document without an id cannot be indexed into '{}'",
                        self.index_name
                    )))
                }
            };
            self.index_document(id, body);
            count += 1;
        }

        debug!(index = %self.index_name, count, "Indexed documents");
        Ok(count)
    }

    pub fn remove_document(&self, id: &str) -> bool {
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|doc| doc.id != id);
        documents.len() != before
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn execute(
        &self,
        term: Option<&str>,
        constraints: &Constraints,
        page: Page,
        aggregation_terms: &AggregationTerms,
    ) -> SearchResponse {
        let start_time = Instant::now();
        let term = term.map(str::trim).filter(|t| !t.is_empty()).map(str::to_lowercase);

        let documents = self.documents.read();
        let matched: Vec<&StoredDocument> = documents
            .iter()
            .filter(|doc| term.as_deref().map_or(true, |t| contains_term(&doc.body, t)))
            .filter(|doc| matches_all(&doc.body, &constraints.fields, false))
            .filter(|doc| matches_all(&doc.body, &constraints.filters, true))
            .filter(|doc| !matches_any(&doc.body, &constraints.exclude))
            .collect();

        let facets = aggregation_terms
            .iter()
            .map(|(field, options)| (field.clone(), count_facet(&matched, field, options.size)))
            .collect();

        let results: Vec<SearchHit> = matched
            .iter()
            .skip(page.from)
            .take(page.size)
            .map(|doc| SearchHit::new(doc.id.clone(), 1.0, doc.body.clone()))
            .collect();

        SearchResponse {
            took_ms: start_time.elapsed().as_millis() as u64,
            total: matched.len() as u64,
            max_score: results.first().map(|hit| hit.score),
            results,
            facets,
            access_denied_count: 0,
            size: page.size,
            from: page.from,
        }
    }
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    fn index_name(&self) -> &str {
        &self.index_name
    }

    async fn search_string(
        &self,
        term: &str,
        constraints: &Constraints,
        page: Page,
    ) -> Result<SearchResponse> {
        Ok(self.execute(Some(term), constraints, page, &AggregationTerms::new()))
    }

    async fn search(&self, query: &EngineQuery) -> Result<SearchResponse> {
        Ok(self.execute(
            query.query_string.as_deref(),
            &query.constraints,
            query.page,
            &query.aggregation_terms,
        ))
    }
}

fn contains_term(value: &Value, term: &str) -> bool {
    match value {
        Value::String(text) => text.to_lowercase().contains(term),
        Value::Array(items) => items.iter().any(|item| contains_term(item, term)),
        Value::Object(map) => map.values().any(|item| contains_term(item, term)),
        _ => false,
    }
}

fn matches_all(body: &Value, constraints: &ConstraintMap, missing_passes: bool) -> bool {
    constraints.iter().all(|(field, expected)| match body.get(field) {
        None | Some(Value::Null) => missing_passes,
        Some(actual) => value_matches(actual, expected),
    })
}

fn matches_any(body: &Value, constraints: &ConstraintMap) -> bool {
    constraints.iter().any(|(field, expected)| {
        body.get(field)
            .map_or(false, |actual| value_matches(actual, expected))
    })
}

fn value_matches(actual: &Value, expected: &FieldValue) -> bool {
    if let Value::Array(items) = actual {
        return items.iter().any(|item| scalar_matches(item, expected));
    }
    scalar_matches(actual, expected)
}

fn scalar_matches(actual: &Value, expected: &FieldValue) -> bool {
    match expected {
        FieldValue::Bool(flag) => actual.as_bool() == Some(*flag),
        FieldValue::Integer(number) => actual.as_i64() == Some(*number),
        FieldValue::Text(text) => actual.as_str() == Some(text.as_str()),
        FieldValue::List(options) => actual
            .as_str()
            .map_or(false, |value| options.iter().any(|option| option == value)),
        FieldValue::Range(range) => range_matches(actual, range),
    }
}

fn range_matches(actual: &Value, range: &DateRange) -> bool {
    actual
        .as_str()
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map_or(false, |instant| range.contains(instant.with_timezone(&Utc)))
}

fn facet_term(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn count_facet(documents: &[&StoredDocument], field: &str, size: Option<usize>) -> FacetResult {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut total = 0;

    for doc in documents {
        let terms: Vec<String> = match doc.body.get(field) {
            Some(Value::Array(items)) => items.iter().filter_map(facet_term).collect(),
            Some(value) => facet_term(value).into_iter().collect(),
            None => Vec::new(),
        };
        if terms.is_empty() {
            continue;
        }
        total += 1;
        for term in terms {
            *counts.entry(term).or_insert(0) += 1;
        }
    }

    let Some(limit) = size else {
        return FacetResult {
            total,
            terms: counts,
            other: 0,
        };
    };

    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let other = ranked.iter().skip(limit).map(|(_, count)| count).sum::<u64>();
    ranked.truncate(limit);

    FacetResult {
        total,
        terms: ranked.into_iter().collect(),
        other,
    }
}
