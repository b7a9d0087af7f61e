//! Text document codec: RON/JSON/TOML documents to and from [`FieldBag`].
//!
//! Every format is first read into a `serde_json::Value` and then converted,
//! so the three formats share one set of conversion rules:
//!
//! - objects become nested bags, arrays become lists
//! - integers that fit in `i64` become `Int`, every other number `Float`
//! - `null` members are dropped, as if the field were absent

use crate::field_bag::{FieldBag, Value};
use std::path::Path;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while parsing a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The file has an extension we don't support.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// The text could not be parsed in its declared format.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The top level of the document is not an object.
    #[error("document top level must be an object, found {0}")]
    NotAnObject(&'static str),

    /// A list contained a `null` element, which has no field-bag form.
    #[error("null element in list '{0}'")]
    NullInList(String),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    /// Map a bare extension (`"json"`) to a format.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext {
            "ron" => Some(Format::Ron),
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DocumentError> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(Format::from_extension)
        .ok_or_else(|| DocumentError::UnsupportedFormat(path.display().to_string()))
}

// ===========================================================================
// Parsing
// ===========================================================================

/// Parse document text into a field bag.
pub fn parse_document(text: &str, format: Format) -> Result<FieldBag, DocumentError> {
    let value: serde_json::Value = match format {
        Format::Json => {
            serde_json::from_str(text).map_err(|e| DocumentError::Syntax(e.to_string()))?
        }
        Format::Ron => ron::from_str(text).map_err(|e| DocumentError::Syntax(e.to_string()))?,
        Format::Toml => toml::from_str(text).map_err(|e| DocumentError::Syntax(e.to_string()))?,
    };

    match value {
        serde_json::Value::Object(map) => object_to_bag(map, ""),
        other => Err(DocumentError::NotAnObject(json_kind(&other))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn object_to_bag(
    map: serde_json::Map<String, serde_json::Value>,
    prefix: &str,
) -> Result<FieldBag, DocumentError> {
    let mut bag = FieldBag::new();
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(converted) = convert(value, &path)? {
            bag.insert(key, converted);
        }
    }
    Ok(bag)
}

fn convert(value: serde_json::Value, path: &str) -> Result<Option<Value>, DocumentError> {
    let converted = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                match convert(item, path)? {
                    Some(v) => list.push(v),
                    None => return Err(DocumentError::NullInList(path.to_string())),
                }
            }
            Value::List(list)
        }
        serde_json::Value::Object(map) => Value::Bag(object_to_bag(map, path)?),
    };
    Ok(Some(converted))
}

// ===========================================================================
// Rendering
// ===========================================================================

/// Render a field bag as a JSON value.
pub fn to_json_value(bag: &FieldBag) -> serde_json::Value {
    serde_json::Value::Object(
        bag.iter()
            .map(|(k, v)| (k.to_string(), value_to_json(v)))
            .collect(),
    )
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        // Non-finite floats have no JSON form and render as null.
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Bag(bag) => to_json_value(bag),
    }
}

/// Render a field bag as pretty-printed JSON document text.
pub fn to_json_string(bag: &FieldBag) -> String {
    // Serializing a `serde_json::Value` cannot fail.
    serde_json::to_string_pretty(&to_json_value(bag)).unwrap_or_default()
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("a/pistol.json")).unwrap(), Format::Json);
        assert_eq!(detect_format(Path::new("pistol.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("pistol.toml")).unwrap(), Format::Toml);
        assert!(matches!(
            detect_format(Path::new("pistol.yaml")),
            Err(DocumentError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            detect_format(Path::new("pistol")),
            Err(DocumentError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn parse_json_scalars_and_nesting() {
        let bag = parse_document(
            r#"{"damage": 7, "spread": 1.5, "auto": true, "name": "x",
                "general": {"rate": 3}, "tags": ["a", "b"]}"#,
            Format::Json,
        )
        .unwrap();
        assert_eq!(bag.get("damage"), Some(&Value::Int(7)));
        assert_eq!(bag.get("spread"), Some(&Value::Float(1.5)));
        assert_eq!(bag.get("auto"), Some(&Value::Bool(true)));
        assert_eq!(bag.get("name"), Some(&Value::Str("x".into())));
        assert_eq!(bag.get_path("general.rate"), Some(&Value::Int(3)));
        assert_eq!(
            bag.get("tags"),
            Some(&Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]))
        );
    }

    #[test]
    fn json_float_with_zero_fraction_stays_float() {
        let bag = parse_document(r#"{"damage": 2.0}"#, Format::Json).unwrap();
        assert_eq!(bag.get("damage"), Some(&Value::Float(2.0)));
    }

    #[test]
    fn null_members_are_absent() {
        let bag = parse_document(r#"{"damage": 1, "sounds": null}"#, Format::Json).unwrap();
        assert!(!bag.contains("sounds"));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn null_list_element_rejected() {
        let result = parse_document(r#"{"general": {"tags": [1, null]}}"#, Format::Json);
        assert!(matches!(result, Err(DocumentError::NullInList(ref p)) if p == "general.tags"));
    }

    #[test]
    fn parse_ron_document() {
        let bag = parse_document(r#"{"damage": 4, "general": {"rate": 2}}"#, Format::Ron).unwrap();
        assert_eq!(bag.get("damage"), Some(&Value::Int(4)));
        assert_eq!(bag.get_path("general.rate"), Some(&Value::Int(2)));
    }

    #[test]
    fn parse_toml_document() {
        let bag = parse_document(
            "damage = 6.5\n\n[general]\nrate = 9\nauto = true\n",
            Format::Toml,
        )
        .unwrap();
        assert_eq!(bag.get("damage"), Some(&Value::Float(6.5)));
        assert_eq!(bag.get_path("general.rate"), Some(&Value::Int(9)));
        assert_eq!(bag.get_path("general.auto"), Some(&Value::Bool(true)));
    }

    #[test]
    fn syntax_error_reported() {
        let result = parse_document("this is not json {{{", Format::Json);
        assert!(matches!(result, Err(DocumentError::Syntax(_))));
    }

    #[test]
    fn non_object_top_level_rejected() {
        let result = parse_document("[1, 2, 3]", Format::Json);
        assert!(matches!(result, Err(DocumentError::NotAnObject("array"))));
    }

    #[test]
    fn json_rendering_reparses_to_same_bag() {
        let bag = FieldBag::new()
            .with("damage", 7.25)
            .with("rate", 3)
            .with("auto", false)
            .with("general", FieldBag::new().with("grip", "two_handed"))
            .with("tags", Value::List(vec![Value::Str("scope".into())]));
        let text = to_json_string(&bag);
        let reparsed = parse_document(&text, Format::Json).unwrap();
        assert_eq!(reparsed, bag);
    }
}
