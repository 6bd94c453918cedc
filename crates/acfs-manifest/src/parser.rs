//! YAML parsing.
//!
//! Manifest and registry documents are parsed with `serde_yaml`, then
//! converted to `serde_json::Value` so that schema validation and typed
//! deserialization run over one uniform value type.

use serde_json::Value;

use crate::error::ParseError;

/// Parse YAML source text into a JSON value.
///
/// # Errors
///
/// Returns a [`ParseError`] carrying the line/column reported by the YAML
/// parser, or a position-less error for mapping keys that cannot be
/// represented as JSON object keys.
pub fn parse_yaml(source: &str) -> Result<Value, ParseError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(source)?;
    yaml_to_json_value(&yaml).map_err(|message| ParseError {
        message,
        line: None,
        column: None,
    })
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Scalar mapping keys (numbers, booleans) are stringified; anything richer
/// is rejected. YAML tags are dropped and the tagged value kept.
fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent number {f} (NaN or infinite)"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .map(yaml_to_json_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML mapping key: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_document() {
        let v = parse_yaml(
            "version: 1\nmodules:\n  - id: base\n    install: |\n      apt-get update\n      apt-get install -y curl\n",
        )
        .unwrap();
        assert_eq!(v["version"], 1);
        assert_eq!(v["modules"][0]["id"], "base");
        assert_eq!(
            v["modules"][0]["install"],
            "apt-get update\napt-get install -y curl\n"
        );
    }

    #[test]
    fn syntax_error_has_position() {
        let err = parse_yaml("modules:\n  - id: a\n   bad: [\n").unwrap_err();
        assert!(err.line.is_some(), "expected a line number: {err}");
    }

    #[test]
    fn numeric_keys_are_stringified() {
        let v = parse_yaml("1: one\ntrue: yes\n").unwrap();
        assert_eq!(v["1"], "one");
        assert_eq!(v["true"], "yes");
    }

    #[test]
    fn sequence_keys_rejected() {
        let err = parse_yaml("? [a, b]\n: value\n").unwrap_err();
        assert!(err.message.contains("mapping key"));
        assert!(err.line.is_none());
    }

    #[test]
    fn anchors_resolve() {
        let v = parse_yaml("a: &x [one]\nb: *x\n").unwrap();
        assert_eq!(v["a"], v["b"]);
    }

    #[test]
    fn tags_are_dropped() {
        let v = parse_yaml("a: !custom value\n").unwrap();
        assert_eq!(v["a"], "value");
    }

    #[test]
    fn empty_document_is_null() {
        assert_eq!(parse_yaml("").unwrap(), Value::Null);
    }
}
