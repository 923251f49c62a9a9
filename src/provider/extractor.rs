//! Locates the generated image URL in a provider response.
//!
//! Providers wrap their output differently depending on model and API
//! version. Every known wrapper is classified here into a [`ResponseShape`];
//! when a new wrapper shows up, [`OBJECT_PROBES`] is the table to extend.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::app::util::events::{EventSink, PipelineEvent};

use super::errors::{GenerationError, GenerationErrorKind};

pub const FALLBACK_FIELDS: [&str; 4] = ["path", "uri", "href", "link"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// A bare `http(s)://` string.
    UrlString(String),
    /// An object that yields its URL through a nested accessor (`url.href`)
    /// or through its only value.
    UrlAccessorObject { method: &'static str, url: String },
    /// An object carrying the URL in a plain string field.
    PlainUrlField { field: &'static str, url: String },
    /// A list; only the first element is considered.
    Sequence(Box<ResponseShape>),
}

impl ResponseShape {
    pub fn url(&self) -> &str {
        match self {
            Self::UrlString(url) => url,
            Self::UrlAccessorObject { url, .. } => url,
            Self::PlainUrlField { url, .. } => url,
            Self::Sequence(inner) => inner.url(),
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::UrlString(_) => "url_string",
            Self::UrlAccessorObject { method, .. } => method,
            Self::PlainUrlField { field, .. } => field,
            Self::Sequence(inner) => inner.method(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no image url in provider response (type: {observed_type}, fields: [{}])", .fields.join(", "))]
pub struct ExtractionError {
    pub observed_type: String,
    pub fields: Vec<String>,
}

impl From<ExtractionError> for GenerationError {
    fn from(e: ExtractionError) -> Self {
        GenerationError::new(GenerationErrorKind::Unknown, e.to_string())
    }
}

type Probe = fn(&Map<String, Value>) -> Option<ResponseShape>;

/// Object probes in priority order.
pub static OBJECT_PROBES: [Probe; 4] = [
    probe_url_accessor,
    probe_url_property,
    probe_string_conversion,
    probe_fallback_fields,
];

pub fn extract_url(response: &Value, events: &dyn EventSink) -> Result<String, ExtractionError> {
    let shape = classify(response)?;

    events.emit(PipelineEvent::ExtractionMethodChosen {
        method: shape.method(),
    });

    Ok(shape.url().to_string())
}

pub fn classify(response: &Value) -> Result<ResponseShape, ExtractionError> {
    match response {
        Value::Array(items) => match items.first() {
            Some(first) => classify_item(first)
                .map(|shape| ResponseShape::Sequence(Box::new(shape)))
                .map_err(|e| ExtractionError {
                    observed_type: format!("array of {}", e.observed_type),
                    fields: e.fields,
                }),
            None => Err(ExtractionError {
                observed_type: "empty array".to_string(),
                fields: Vec::new(),
            }),
        },
        other => classify_item(other),
    }
}

fn classify_item(value: &Value) -> Result<ResponseShape, ExtractionError> {
    match value {
        Value::String(s) if is_url(s) => Ok(ResponseShape::UrlString(s.to_string())),
        Value::Object(object) => OBJECT_PROBES
            .iter()
            .find_map(|probe| probe(object))
            .ok_or_else(|| ExtractionError {
                observed_type: "object".to_string(),
                fields: object.keys().cloned().collect(),
            }),
        other => Err(ExtractionError {
            observed_type: type_name(other).to_string(),
            fields: Vec::new(),
        }),
    }
}

fn probe_url_accessor(object: &Map<String, Value>) -> Option<ResponseShape> {
    let url = object.get("url")?.as_object()?.get("href")?.as_str()?;

    is_url(url).then(|| ResponseShape::UrlAccessorObject {
        method: "url_accessor",
        url: url.to_string(),
    })
}

fn probe_url_property(object: &Map<String, Value>) -> Option<ResponseShape> {
    let url = object.get("url")?.as_str()?;

    is_url(url).then(|| ResponseShape::PlainUrlField {
        field: "url",
        url: url.to_string(),
    })
}

fn probe_string_conversion(object: &Map<String, Value>) -> Option<ResponseShape> {
    if object.len() != 1 {
        return None;
    }
    let url = object.values().next()?.as_str()?;

    is_url(url).then(|| ResponseShape::UrlAccessorObject {
        method: "string_conversion",
        url: url.to_string(),
    })
}

fn probe_fallback_fields(object: &Map<String, Value>) -> Option<ResponseShape> {
    FALLBACK_FIELDS.iter().copied().find_map(|field| {
        let url = object.get(field)?.as_str()?;
        is_url(url).then(|| ResponseShape::PlainUrlField {
            field,
            url: url.to_string(),
        })
    })
}

fn is_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::app::util::events::MemorySink;

    use super::*;

    const URL: &str = "https://replicate.delivery/xezq/out-0.webp";

    fn extract(response: Value) -> Result<String, ExtractionError> {
        extract_url(&response, &MemorySink::default())
    }

    #[test]
    fn bare_url_string() {
        assert_eq!(extract(json!(URL)).unwrap(), URL);
    }

    #[test]
    fn sequence_of_url_strings_takes_first() {
        let response = json!([URL, "https://replicate.delivery/xezq/out-1.webp"]);

        assert_eq!(extract(response).unwrap(), URL);
    }

    #[test]
    fn sequence_of_accessor_objects() {
        let response = json!([{ "url": { "href": URL } }, { "url": { "href": "https://b" } }]);

        assert_eq!(extract(response).unwrap(), URL);
    }

    #[test]
    fn single_accessor_object() {
        assert_eq!(extract(json!({ "url": { "href": URL } })).unwrap(), URL);
    }

    #[test]
    fn plain_url_property() {
        assert_eq!(extract(json!({ "url": URL, "size": 1024 })).unwrap(), URL);
    }

    #[test]
    fn string_conversion_of_single_value_wrapper() {
        let shape = classify(&json!({ "output": URL })).unwrap();

        assert_eq!(shape.url(), URL);
        assert_eq!(shape.method(), "string_conversion");
    }

    #[test]
    fn alternate_url_fields_in_order() {
        let shape = classify(&json!({ "uri": URL, "link": "https://other", "id": 4 })).unwrap();

        assert_eq!(
            shape,
            ResponseShape::PlainUrlField {
                field: "uri",
                url: URL.to_string()
            }
        );
    }

    #[test]
    fn accessor_wins_over_fallback_fields() {
        let shape = classify(&json!({ "url": { "href": URL }, "href": "https://other" })).unwrap();

        assert_eq!(shape.method(), "url_accessor");
    }

    #[test]
    fn non_url_strings_are_rejected() {
        assert!(extract(json!("data:image/png;base64,AAAA")).is_err());
        assert!(extract(json!({ "url": "ftp://example.com/x.png" })).is_err());
    }

    #[test]
    fn unsupported_shapes_fail_with_diagnostics() {
        let e = extract(json!({ "status": "succeeded", "id": "abc" })).unwrap_err();
        assert_eq!(e.observed_type, "object");
        assert_eq!(e.fields, vec!["id".to_string(), "status".to_string()]);

        assert_eq!(extract(json!([])).unwrap_err().observed_type, "empty array");
        assert_eq!(extract(json!(null)).unwrap_err().observed_type, "null");
        assert_eq!(extract(json!(42)).unwrap_err().observed_type, "number");
    }

    #[test]
    fn nested_sequences_are_not_descended() {
        let e = extract(json!([[URL]])).unwrap_err();

        assert_eq!(e.observed_type, "array of array");
    }

    #[test]
    fn emits_chosen_method() {
        let sink = MemorySink::default();

        extract_url(&json!([{ "url": URL }]), &sink).unwrap();

        assert_eq!(
            sink.events(),
            vec![PipelineEvent::ExtractionMethodChosen { method: "url" }]
        );
    }

    #[test]
    fn extraction_error_surfaces_as_unknown() {
        let e: GenerationError = extract(json!(false)).unwrap_err().into();

        assert_eq!(e.kind, GenerationErrorKind::Unknown);
    }
}
