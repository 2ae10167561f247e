use crate::error::{GatewayError, Result};
use crate::query::facets::{compile_facets, FacetSpec};
use crate::store::SearchOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Multi-valued query parameters as received.
///
/// Keys are kept sorted and values keep their arrival order, so the JSON
/// rendering is canonical: the same parameters always serialize to the same
/// bytes regardless of the order they appeared in the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, Vec<String>>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = QueryParams::new();
        for (k, v) in pairs {
            params.append(k, v);
        }
        params
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn values(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The value of a parameter given exactly once.
    pub fn single(&self, key: &str) -> Option<&str> {
        match self.values(key) {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        !self.values(key).is_empty()
    }

    pub fn canonical_json(&self) -> String {
        // A map of string vectors cannot fail to serialize.
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

/// A search query decoded from [`QueryParams`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub ids_only: bool,
    pub fields: Vec<String>,
    pub with_meta: bool,
    pub cursor: Option<String>,
    pub facets: Vec<FacetSpec>,
}

impl SearchRequest {
    pub fn from_params(params: &QueryParams) -> Result<Self> {
        let query = params
            .values("q")
            .first()
            .cloned()
            .ok_or_else(|| GatewayError::BadRequest("Query string missing".to_string()))?;

        Ok(SearchRequest {
            query,
            limit: params
                .single("limit")
                .map(|l| l.parse().unwrap_or(0))
                .unwrap_or(0),
            ids_only: params.single("ids") == Some("true"),
            fields: params.values("fields").to_vec(),
            with_meta: params.contains("meta"),
            cursor: params.single("cursor").map(str::to_string),
            facets: compile_facets(params.values("facets")),
        })
    }

    pub fn search_options(&self, default_limit: usize) -> SearchOptions {
        SearchOptions {
            limit: if self.limit == 0 {
                default_limit
            } else {
                self.limit
            },
            ids_only: self.ids_only,
            fields: self.fields.clone(),
            cursor: self.cursor.clone(),
            facets: self.facets.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_ignores_key_order() {
        let a = QueryParams::from_pairs([("q", "shoes"), ("limit", "10")]);
        let b = QueryParams::from_pairs([("limit", "10"), ("q", "shoes")]);
        assert_eq!(a.canonical_json(), b.canonical_json());
        assert_eq!(a.canonical_json(), r#"{"limit":["10"],"q":["shoes"]}"#);
    }

    #[test]
    fn canonical_json_keeps_repeated_value_order() {
        let a = QueryParams::from_pairs([("fields", "a"), ("fields", "b")]);
        let b = QueryParams::from_pairs([("fields", "b"), ("fields", "a")]);
        assert_ne!(a.canonical_json(), b.canonical_json());
    }

    #[test]
    fn missing_query_is_bad_request() {
        let params = QueryParams::from_pairs([("limit", "5")]);
        let err = SearchRequest::from_params(&params).unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(ref m) if m == "Query string missing"));
    }

    #[test]
    fn decodes_all_options() {
        let params = QueryParams::from_pairs([
            ("q", "shoes"),
            ("limit", "15"),
            ("ids", "true"),
            ("fields", "title"),
            ("fields", "price"),
            ("meta", "1"),
            ("cursor", "abc"),
            ("facets", "brand|acme"),
        ]);
        let req = SearchRequest::from_params(&params).unwrap();
        assert_eq!(req.query, "shoes");
        assert_eq!(req.limit, 15);
        assert!(req.ids_only);
        assert_eq!(req.fields, vec!["title", "price"]);
        assert!(req.with_meta);
        assert_eq!(req.cursor.as_deref(), Some("abc"));
        assert_eq!(req.facets.len(), 1);
    }

    #[test]
    fn ambiguous_single_valued_params_are_ignored() {
        let params = QueryParams::from_pairs([
            ("q", "shoes"),
            ("limit", "5"),
            ("limit", "9"),
            ("ids", "yes"),
        ]);
        let req = SearchRequest::from_params(&params).unwrap();
        assert_eq!(req.limit, 0);
        assert!(!req.ids_only);
        assert_eq!(req.search_options(20).limit, 20);
    }
}
