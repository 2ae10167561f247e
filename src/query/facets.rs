//! Facet mini-language.
//!
//! Each `facets` query parameter is one token of the form
//! `name|v1,v2,...|minCount`, the last two segments optional. A value
//! containing `---` is a numeric range `start---end`, anything else is an
//! atomic token. The single token `auto` (as the first parameter) asks the
//! backend to discover facets itself and overrides every other token.
//!
//! Malformed numbers never fail the request: an unparsable range bound
//! becomes 0, and an unparsable minimum count is dropped.

use crate::types::Range;

pub const AUTO_FACETS: &str = "auto";
const SEGMENT_DELIMITER: char = '|';
const VALUE_DELIMITER: char = ',';
const RANGE_DELIMITER: &str = "---";

#[derive(Debug, Clone, PartialEq)]
pub enum FacetValueSpec {
    Atom(String),
    Range(Range),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FacetSpec {
    /// Let the backend pick facets.
    Auto,
    Named {
        name: String,
        values: Vec<FacetValueSpec>,
        min_count: Option<i64>,
    },
}

/// Compile raw facet tokens, preserving token order and value order.
pub fn compile_facets<S: AsRef<str>>(tokens: &[S]) -> Vec<FacetSpec> {
    match tokens.first() {
        None => Vec::new(),
        Some(first) if first.as_ref() == AUTO_FACETS => vec![FacetSpec::Auto],
        Some(_) => tokens.iter().map(|t| compile_token(t.as_ref())).collect(),
    }
}

fn compile_token(token: &str) -> FacetSpec {
    let segments: Vec<&str> = token.split(SEGMENT_DELIMITER).collect();
    let name = segments[0].to_string();

    let values = segments
        .get(1)
        .map(|vals| vals.split(VALUE_DELIMITER).map(compile_value).collect())
        .unwrap_or_default();

    let min_count = segments.get(2).and_then(|c| c.parse::<i64>().ok());

    FacetSpec::Named {
        name,
        values,
        min_count,
    }
}

fn compile_value(value: &str) -> FacetValueSpec {
    if value.contains(RANGE_DELIMITER) {
        let mut bounds = value.split(RANGE_DELIMITER);
        let start = parse_bound(bounds.next());
        let end = parse_bound(bounds.next());
        FacetValueSpec::Range(Range { start, end })
    } else {
        FacetValueSpec::Atom(value.to_string())
    }
}

fn parse_bound(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: f64, end: f64) -> FacetValueSpec {
        FacetValueSpec::Range(Range { start, end })
    }

    #[test]
    fn range_atom_and_min_count() {
        let specs = compile_facets(&["price|10---20,premium|2"]);
        assert_eq!(
            specs,
            vec![FacetSpec::Named {
                name: "price".to_string(),
                values: vec![range(10.0, 20.0), FacetValueSpec::Atom("premium".into())],
                min_count: Some(2),
            }]
        );
    }

    #[test]
    fn auto_overrides_everything_else() {
        let specs = compile_facets(&["auto", "brand|acme", "price|1---2"]);
        assert_eq!(specs, vec![FacetSpec::Auto]);
    }

    #[test]
    fn auto_only_counts_as_first_token() {
        let specs = compile_facets(&["brand", "auto"]);
        assert_eq!(specs.len(), 2);
        assert!(matches!(&specs[1], FacetSpec::Named { name, .. } if name == "auto"));
    }

    #[test]
    fn bare_name_has_no_values() {
        let specs = compile_facets(&["brand"]);
        assert_eq!(
            specs,
            vec![FacetSpec::Named {
                name: "brand".into(),
                values: vec![],
                min_count: None,
            }]
        );
    }

    #[test]
    fn malformed_range_degrades_to_zero() {
        let specs = compile_facets(&["price|abc---20,5---xyz,7---"]);
        let FacetSpec::Named { values, .. } = &specs[0] else {
            panic!("expected named facet");
        };
        assert_eq!(
            values,
            &vec![range(0.0, 20.0), range(5.0, 0.0), range(7.0, 0.0)]
        );
    }

    #[test]
    fn unparsable_min_count_is_dropped() {
        let specs = compile_facets(&["brand|acme|lots"]);
        let FacetSpec::Named { min_count, .. } = &specs[0] else {
            panic!("expected named facet");
        };
        assert_eq!(*min_count, None);
    }

    #[test]
    fn token_and_value_order_is_preserved() {
        let specs = compile_facets(&["size|s,m,l", "color|red,blue"]);
        let names: Vec<&str> = specs
            .iter()
            .map(|s| match s {
                FacetSpec::Named { name, .. } => name.as_str(),
                FacetSpec::Auto => "auto",
            })
            .collect();
        assert_eq!(names, vec!["size", "color"]);
        let FacetSpec::Named { values, .. } = &specs[0] else {
            panic!("expected named facet");
        };
        assert_eq!(
            values,
            &vec![
                FacetValueSpec::Atom("s".into()),
                FacetValueSpec::Atom("m".into()),
                FacetValueSpec::Atom("l".into()),
            ]
        );
    }

    #[test]
    fn empty_input_compiles_to_nothing() {
        let none: [&str; 0] = [];
        assert!(compile_facets(&none).is_empty());
    }
}
