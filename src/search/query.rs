//! Query constraint types and request structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Half-open or fully-open time interval.
///
/// An absent bound means "unconstrained" on that side. The engine decides how
/// to encode the interval; the pipeline only builds and forwards it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateRange {
    lower: Option<DateTime<Utc>>,
    upper: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Create a range from optional bounds
    pub fn new(lower: Option<DateTime<Utc>>, upper: Option<DateTime<Utc>>) -> Self {
        Self { lower, upper }
    }

    /// Everything at or after `lower`
    pub fn since(lower: DateTime<Utc>) -> Self {
        Self::new(Some(lower), None)
    }

    /// Everything at or before `upper`
    pub fn until(upper: DateTime<Utc>) -> Self {
        Self::new(None, Some(upper))
    }

    /// No bound on either side
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn lower(&self) -> Option<DateTime<Utc>> {
        self.lower
    }

    pub fn upper(&self) -> Option<DateTime<Utc>> {
        self.upper
    }

    /// Inclusive containment check
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.lower.map_or(true, |lower| instant >= lower)
            && self.upper.map_or(true, |upper| instant <= upper)
    }
}

/// Value stored under a constraint key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Text(String),
    List(Vec<String>),
    Range(DateRange),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&DateRange> {
        match self {
            FieldValue::Range(range) => Some(range),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::List(values)
    }
}

impl From<DateRange> for FieldValue {
    fn from(range: DateRange) -> Self {
        FieldValue::Range(range)
    }
}

/// Mapping from field name to required value.
///
/// Writes to an existing key replace the old value; values are never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintMap(BTreeMap<String, FieldValue>);

impl ConstraintMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ConstraintMap::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a key, returning the value it replaced
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Remove a key and return its value
    pub fn take(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key)
    }

    /// Overwrite every key present in `overrides`
    pub fn merge_overrides(&mut self, overrides: &ConstraintMap) {
        for (key, value) in overrides.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Keep only the keys named in `allowed`
    pub fn retain_keys<S: AsRef<str>>(&mut self, allowed: &[S]) {
        self.0
            .retain(|key, _| allowed.iter().any(|name| name.as_ref() == key));
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for ConstraintMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a ConstraintMap {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The three constraint mappings handed to a search engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Positive matches that narrow the candidate set
    #[serde(default)]
    pub fields: ConstraintMap,

    /// Restrictions applied after matching, without scoring
    #[serde(default)]
    pub filters: ConstraintMap,

    /// Values that must not match
    #[serde(default)]
    pub exclude: ConstraintMap,
}

impl Constraints {
    pub fn new(fields: ConstraintMap, filters: ConstraintMap, exclude: ConstraintMap) -> Self {
        Self {
            fields,
            filters,
            exclude,
        }
    }
}

/// Acting user, as far as the pipeline needs to know it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchUser {
    pub id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub is_staff: bool,
}

impl SearchUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            is_staff: false,
        }
    }

    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }
}

/// Pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub size: usize,
    pub from: usize,
}

impl Page {
    pub fn new(size: usize, from: usize) -> Self {
        Self { size, from }
    }
}

/// Options for one aggregation bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationOptions {
    /// Maximum number of terms to report; engine default when absent
    #[serde(default)]
    pub size: Option<usize>,
}

/// Facet field name to aggregation options
pub type AggregationTerms = BTreeMap<String, AggregationOptions>;

/// Full query handed to [`SearchEngine::search`](crate::search::SearchEngine::search)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineQuery {
    pub query_string: Option<String>,
    pub page: Page,
    pub constraints: Constraints,
    pub aggregation_terms: AggregationTerms,
}

/// Content search request scoped to a user and optionally a course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSearchRequest {
    pub term: String,
    pub user: Option<SearchUser>,
    pub course_id: Option<String>,
    pub size: usize,
    pub from: usize,
}

impl ContentSearchRequest {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            user: None,
            course_id: None,
            size: 10,
            from: 0,
        }
    }

    pub fn with_user(mut self, user: SearchUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    pub fn page(&self) -> Page {
        Page::new(self.size, self.from)
    }
}

/// Public, unscoped course catalog query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub term: Option<String>,
    pub size: usize,
    pub from: usize,

    /// Caller-supplied field values; each key replaces the seeded default
    pub field_overrides: Option<ConstraintMap>,
}

impl DiscoveryRequest {
    pub fn new() -> Self {
        Self {
            term: None,
            size: 20,
            from: 0,
            field_overrides: None,
        }
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    pub fn with_field_overrides(mut self, overrides: ConstraintMap) -> Self {
        self.field_overrides = Some(overrides);
        self
    }

    /// Add a single override
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.field_overrides
            .get_or_insert_with(ConstraintMap::new)
            .set(key, value);
        self
    }

    pub fn page(&self) -> Page {
        Page::new(self.size, self.from)
    }
}

impl Default for DiscoveryRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_date_range_bounds() {
        let now = instant();
        let range = DateRange::since(now);
        assert_eq!(range.lower(), Some(now));
        assert_eq!(range.upper(), None);

        assert!(range.contains(now));
        assert!(range.contains(now + Duration::days(1)));
        assert!(!range.contains(now - Duration::seconds(1)));

        assert!(DateRange::until(now).contains(now - Duration::days(400)));
        assert!(DateRange::unbounded().contains(now));
    }

    #[test]
    fn test_constraint_map_overwrites() {
        let mut map = ConstraintMap::new().with("org", "edX");
        let previous = map.set("org", "MITx");

        assert_eq!(previous, Some(FieldValue::from("edX")));
        assert_eq!(map.get("org"), Some(&FieldValue::from("MITx")));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_merge_overrides_replaces_whole_value() {
        let mut map = ConstraintMap::new()
            .with("org", vec!["edX".to_string(), "MITx".to_string()])
            .with("language", "en");
        let overrides = ConstraintMap::new().with("org", vec!["HarvardX".to_string()]);

        map.merge_overrides(&overrides);

        assert_eq!(
            map.get("org"),
            Some(&FieldValue::List(vec!["HarvardX".to_string()]))
        );
        assert_eq!(map.get("language"), Some(&FieldValue::from("en")));
    }

    #[test]
    fn test_retain_keys() {
        let mut map = ConstraintMap::new()
            .with("org", "edX")
            .with("course", "course-v1:edX+DemoX+Demo")
            .with("modes", "audit");
        map.retain_keys(&["org"]);

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["org"]);
    }

    #[test]
    fn test_field_value_serialization() {
        let map = ConstraintMap::new()
            .with("invitation_only", true)
            .with("start", DateRange::until(instant()));
        let json = serde_json::to_value(&map).unwrap();

        assert_eq!(json["invitation_only"], serde_json::json!(true));
        assert_eq!(json["start"]["lower"], serde_json::Value::Null);
        assert_eq!(json["start"]["upper"], serde_json::json!("2024-03-01T12:00:00Z"));

        let back: ConstraintMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_object_override_must_be_a_date_range() {
        let err = serde_json::from_value::<DiscoveryRequest>(serde_json::json!({
            "term": "rust",
            "size": 20,
            "from": 0,
            "field_overrides": {"org": {"name": "edX"}},
        }));
        assert!(err.is_err());

        let request: DiscoveryRequest = serde_json::from_value(serde_json::json!({
            "size": 20,
            "from": 0,
            "field_overrides": {"start": {"lower": "2024-03-01T12:00:00Z"}},
        }))
        .unwrap();
        assert_eq!(
            request.field_overrides.unwrap().get("start"),
            Some(&FieldValue::Range(DateRange::since(instant())))
        );
    }

    #[test]
    fn test_request_defaults() {
        let content = ContentSearchRequest::new("python");
        assert_eq!(content.page(), Page::new(10, 0));

        let discovery = DiscoveryRequest::new().with_field("estatus", "ongoing");
        assert_eq!(discovery.page(), Page::new(20, 0));
        assert!(discovery
            .field_overrides
            .as_ref()
            .unwrap()
            .contains_key("estatus"));
    }
}
