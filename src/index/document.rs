use crate::types::{DocFacet, Document, FacetValue, Field, FieldValue, GeoPoint};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A field as submitted by API clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldInput {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
    /// `html`, `atom`, `date`/`datetime`, `geopoint`; anything else is a plain value.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Also record the value as a document facet.
    #[serde(default)]
    pub facet: bool,
    #[serde(default)]
    pub derived: bool,
    #[serde(default)]
    pub language: String,
}

/// A document as submitted by API clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInput {
    /// Empty lets the backend assign an ID.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub fields: Vec<FieldInput>,
}

impl DocumentInput {
    pub fn into_document(self) -> Document {
        let mut facets = Vec::new();
        let mut fields = Vec::with_capacity(self.fields.len());

        for input in self.fields {
            if input.facet {
                facets.push(DocFacet {
                    name: input.name.clone(),
                    value: facet_value(&input.value),
                });
            }
            fields.push(Field {
                value: parse_value(&input.kind, &input.value),
                name: input.name,
                language: input.language,
                derived: input.derived,
            });
        }

        Document {
            id: self.id,
            fields,
            facets,
        }
    }
}

/// Text rendering of a raw JSON value; strings are taken verbatim.
fn string_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn facet_value(value: &serde_json::Value) -> FacetValue {
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(FacetValue::Number)
            .unwrap_or_else(|| FacetValue::Atom(n.to_string())),
        other => FacetValue::Atom(string_value(other)),
    }
}

/// Select the field variant from its type name.
///
/// Dates that cannot be parsed are kept as atoms rather than rejected, since
/// clients routinely send loosely formatted dates.
pub fn parse_value(kind: &str, value: &serde_json::Value) -> FieldValue {
    match kind {
        "html" => FieldValue::Html(string_value(value)),
        "atom" => FieldValue::Atom(string_value(value)),
        "date" | "datetime" => {
            let raw = string_value(value);
            match parse_loose_datetime(&raw) {
                Some(ts) => FieldValue::Timestamp(ts),
                None => FieldValue::Atom(raw),
            }
        }
        "geopoint" => FieldValue::GeoPoint(parse_geopoint(&string_value(value))),
        _ => FieldValue::Plain(value.clone()),
    }
}

/// `"lat,lng"`; missing or malformed parts become 0.
pub fn parse_geopoint(raw: &str) -> GeoPoint {
    let mut parts = raw.split(',');
    let mut coord = || {
        parts
            .next()
            .and_then(|p| p.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let lat = coord();
    let lng = coord();
    GeoPoint { lat, lng }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Best-effort timestamp parsing over the formats clients commonly send:
/// RFC 3339, RFC 2822, common date/time layouts (taken as UTC) and unix
/// timestamps in seconds or milliseconds.
pub fn parse_loose_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        let n: i64 = s.parse().ok()?;
        return match s.len() {
            10 => Utc.timestamp_opt(n, 0).single(),
            13 => Utc.timestamp_millis_opt(n).single(),
            // eight digits are a compact %Y%m%d date
            8 => NaiveDate::parse_from_str(s, "%Y%m%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive)),
            _ => None,
        };
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}
