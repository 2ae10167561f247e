use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document identifier as known to the search backend.
pub type DocumentId = String;

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Typed value of a document field, selected by the field's type name when the
/// document is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum FieldValue {
    /// Untyped scalar passed through as received (string, number or bool).
    Plain(serde_json::Value),
    Html(String),
    Atom(String),
    Timestamp(DateTime<Utc>),
    #[serde(rename = "geopoint")]
    GeoPoint(GeoPoint),
}

impl FieldValue {
    /// Lowercased text used by the in-memory backend for term matching.
    pub fn search_text(&self) -> String {
        match self {
            FieldValue::Plain(serde_json::Value::String(s)) => s.to_lowercase(),
            FieldValue::Plain(v) => v.to_string().to_lowercase(),
            FieldValue::Html(s) | FieldValue::Atom(s) => s.to_lowercase(),
            FieldValue::Timestamp(t) => t.to_rfc3339().to_lowercase(),
            FieldValue::GeoPoint(p) => format!("{},{}", p.lat, p.lng),
        }
    }
}

/// A named document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub derived: bool,
}

/// Value of a document facet: either an atomic token or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetValue {
    Number(f64),
    Atom(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocFacet {
    pub name: String,
    pub value: FacetValue,
}

/// A request-scoped document headed for the search backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub facets: Vec<DocFacet>,
}

/// Half-open numeric range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub start: f64,
    pub end: f64,
}

impl Range {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.start && v < self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default)]
    pub facets: Vec<DocFacet>,
}

/// One document in a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DocumentMeta>,
}

/// A facet count in a search response. Range buckets carry `start`/`end`
/// (infinite bounds reported as 0) and a null `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub value: Option<FacetValue>,
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub result: Vec<SearchHit>,
    pub facets: Option<BTreeMap<String, Vec<FacetBucket>>>,
    pub cursor: String,
}

/// What a search returns: a bare ID list for `ids=true` queries, the full
/// response otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchOutcome {
    Ids(Vec<DocumentId>),
    Results(SearchResponse),
}

impl SearchOutcome {
    pub fn ids(&self) -> Vec<DocumentId> {
        match self {
            SearchOutcome::Ids(ids) => ids.clone(),
            SearchOutcome::Results(resp) => resp.result.iter().map(|h| h.id.clone()).collect(),
        }
    }
}
