//! On-disk content formats.
//!
//! TOML documents are converted to and from the value tree explicitly.
//! TOML datetimes have no JSON counterpart; they travel through the tree
//! as a single-key map `{ TOML_DATETIME_KEY: "<datetime>" }` and are
//! written back as datetimes.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::error::FormatError;
use crate::Value;

/// Map key marking a TOML datetime inside a value tree.
///
/// Matches the key `toml` itself uses when a datetime is deserialized into
/// a generic map, so declaration files and parsed artifacts agree.
pub const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

/// How an artifact's value tree is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Format::Json),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Toml => "toml",
        }
    }

    /// Parse persisted text into a value tree.
    pub fn parse(self, text: &str) -> Result<Value, FormatError> {
        match self {
            Format::Json => serde_json::from_str(text).map_err(|e| FormatError::Parse {
                format: self.name(),
                detail: e.to_string(),
            }),
            Format::Toml => {
                let table: toml::Table = toml::from_str(text).map_err(|e| FormatError::Parse {
                    format: self.name(),
                    detail: e.to_string(),
                })?;
                from_toml(toml::Value::Table(table)).map_err(|detail| FormatError::Parse {
                    format: self.name(),
                    detail,
                })
            }
        }
    }

    /// Render a value tree to text, always newline-terminated.
    pub fn render(self, value: &Value) -> Result<String, FormatError> {
        let mut text = match self {
            Format::Json => {
                serde_json::to_string_pretty(value).map_err(|e| FormatError::Render {
                    format: self.name(),
                    detail: e.to_string(),
                })?
            }
            Format::Toml => {
                let render_error = |detail: String| FormatError::Render {
                    format: self.name(),
                    detail,
                };
                let toml::Value::Table(table) = to_toml(value).map_err(render_error)? else {
                    return Err(render_error(
                        "top-level value must be a table".to_string(),
                    ));
                };
                toml::to_string_pretty(&table).map_err(|e| render_error(e.to_string()))?
            }
        };
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a map stands for a TOML datetime.
pub(crate) fn is_datetime(map: &Map<String, Value>) -> bool {
    datetime_of(map).is_some()
}

fn datetime_of(map: &Map<String, Value>) -> Option<toml::value::Datetime> {
    if map.len() != 1 {
        return None;
    }
    map.get(TOML_DATETIME_KEY)?.as_str()?.parse().ok()
}

fn from_toml(value: toml::Value) -> Result<Value, String> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| format!("float {f} has no value-tree representation"))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => {
            let mut map = Map::new();
            map.insert(TOML_DATETIME_KEY.to_string(), Value::String(dt.to_string()));
            Value::Object(map)
        }
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_toml)
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| Ok((key, from_toml(value)?)))
                .collect::<Result<_, String>>()?,
        ),
    })
}

fn to_toml(value: &Value) -> Result<toml::Value, String> {
    Ok(match value {
        Value::Null => return Err("null has no TOML representation".to_string()),
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => toml::Value::Integer(i),
            _ if n.is_u64() => return Err(format!("integer {n} exceeds the TOML range")),
            (None, Some(f)) => toml::Value::Float(f),
            (None, None) => return Err(format!("unsupported number {n}")),
        },
        Value::String(s) => toml::Value::String(s.clone()),
        Value::Array(items) => toml::Value::Array(
            items.iter().map(to_toml).collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => match datetime_of(map) {
            Some(dt) => toml::Value::Datetime(dt),
            None => toml::Value::Table(
                map.iter()
                    .map(|(key, value)| Ok((key.clone(), to_toml(value)?)))
                    .collect::<Result<_, String>>()?,
            ),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infer_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/b.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("pyproject.toml")), Some(Format::Toml));
        assert_eq!(Format::from_path(Path::new("README")), None);
        assert_eq!(Format::from_path(Path::new("setup.cfg")), None);
    }

    #[test]
    fn json_render_is_pretty_and_terminated() {
        let text = Format::Json.render(&json!({"a": 1})).unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn json_preserves_key_order() {
        let value = Format::Json.parse(r#"{"zeta": 1, "alpha": 2}"#).unwrap();
        let text = Format::Json.render(&value).unwrap();
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
    }

    #[test]
    fn toml_parses_into_value_tree() {
        let value = Format::Toml
            .parse("[tool.lint]\nline-length = 100\nselect = [\"E\", \"F\"]\n")
            .unwrap();
        assert_eq!(value["tool"]["lint"]["line-length"], json!(100));
        assert_eq!(value["tool"]["lint"]["select"], json!(["E", "F"]));
    }

    #[test]
    fn toml_render_reparses() {
        let value = json!({"name": "demo", "tool": {"lint": {"strict": true}}});
        let text = Format::Toml.render(&value).unwrap();
        assert_eq!(Format::Toml.parse(&text).unwrap(), value);
    }

    #[test]
    fn toml_rejects_non_table_root() {
        assert!(Format::Toml.render(&json!([1, 2])).is_err());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = Format::Json.parse("{not json").unwrap_err();
        assert!(matches!(err, FormatError::Parse { format: "json", .. }));
    }

    #[test]
    fn toml_datetime_survives_round_trip() {
        let value = Format::Toml
            .parse("released = 1979-05-27T07:32:00Z\nday = 1979-05-27\n")
            .unwrap();
        assert_eq!(
            value["released"][TOML_DATETIME_KEY],
            json!("1979-05-27T07:32:00Z")
        );

        let text = Format::Toml.render(&value).unwrap();
        assert!(text.contains("released = 1979-05-27T07:32:00Z"));
        let reparsed: toml::Table = toml::from_str(&text).unwrap();
        assert!(reparsed["released"].is_datetime());
        assert!(reparsed["day"].is_datetime());
    }

    #[test]
    fn toml_preserves_key_order() {
        let value = Format::Toml.parse("zeta = 1\nalpha = 2\n").unwrap();
        let text = Format::Toml.render(&value).unwrap();
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
    }

    #[test]
    fn toml_non_finite_float_is_parse_error() {
        let err = Format::Toml.parse("ratio = nan\n").unwrap_err();
        assert!(matches!(err, FormatError::Parse { format: "toml", .. }));
    }

    #[test]
    fn toml_rejects_null() {
        let err = Format::Toml.render(&json!({"a": null})).unwrap_err();
        assert!(matches!(err, FormatError::Render { format: "toml", .. }));
    }
}
