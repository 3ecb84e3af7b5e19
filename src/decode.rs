//! Config file decoders.
//!
//! Every decoder turns file bytes into a [`DynamicMap`]. Values keep the
//! types the format gives them (numbers, booleans, nested tables) and the
//! coercion layer converts them into field types later.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::{Dynamic, DynamicMap};

/// A decoder failed. `TryAll` reports every attempt in `message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{decoder} decoder: {message}")]
pub struct DecodeError {
    pub decoder: String,
    pub message: String,
}

/// How config file contents are decoded.
#[derive(Clone, Copy)]
pub enum Decoder {
    Json,
    Toml,
    Yaml,
    /// YAML, then TOML, then JSON; the first success wins.
    TryAll,
    /// A user-supplied decoder.
    Custom {
        name: &'static str,
        decode: fn(&[u8]) -> Result<DynamicMap, String>,
    },
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decoder({})", self.name())
    }
}

impl Decoder {
    /// Pick a decoder from a file extension. Unknown extensions try all.
    pub fn for_path(path: &Path) -> Decoder {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Decoder::Json,
            Some("toml") => Decoder::Toml,
            Some("yaml" | "yml") => Decoder::Yaml,
            _ => Decoder::TryAll,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Decoder::Json => "json",
            Decoder::Toml => "toml",
            Decoder::Yaml => "yaml",
            Decoder::TryAll => "try-all",
            Decoder::Custom { name, .. } => *name,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicMap, DecodeError> {
        let result = match self {
            Decoder::Json => decode_json(bytes),
            Decoder::Toml => decode_toml(bytes),
            Decoder::Yaml => decode_yaml(bytes),
            Decoder::Custom { decode, .. } => decode(bytes),
            Decoder::TryAll => return try_all(bytes),
        };
        result.map_err(|message| DecodeError {
            decoder: self.name().to_string(),
            message,
        })
    }
}

fn try_all(bytes: &[u8]) -> Result<DynamicMap, DecodeError> {
    let mut failures = Vec::new();
    for decoder in [Decoder::Yaml, Decoder::Toml, Decoder::Json] {
        match decoder.decode(bytes) {
            Ok(map) => {
                tracing::trace!(decoder = decoder.name(), "decoded config file");
                return Ok(map);
            }
            Err(e) => failures.push(e.to_string()),
        }
    }
    Err(DecodeError {
        decoder: Decoder::TryAll.name().to_string(),
        message: failures.join("; "),
    })
}

fn top_level(value: Dynamic) -> Result<DynamicMap, String> {
    match value {
        Dynamic::Object(map) => Ok(map),
        other => Err(format!(
            "top level is a {}, not a map",
            crate::coerce::dynamic_kind(&other)
        )),
    }
}

fn decode_json(bytes: &[u8]) -> Result<DynamicMap, String> {
    let value: Dynamic = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    top_level(value)
}

fn decode_toml(bytes: &[u8]) -> Result<DynamicMap, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    let table: toml::Table = toml::from_str(text).map_err(|e| e.to_string())?;
    let mut map = DynamicMap::new();
    for (key, value) in table {
        map.insert(key, toml_to_dynamic(value)?);
    }
    Ok(map)
}

fn toml_to_dynamic(value: toml::Value) -> Result<Dynamic, String> {
    Ok(match value {
        toml::Value::String(s) => Dynamic::String(s),
        toml::Value::Integer(i) => Dynamic::from(i),
        toml::Value::Float(f) => float(f)?,
        toml::Value::Boolean(b) => Dynamic::Bool(b),
        toml::Value::Datetime(d) => Dynamic::String(d.to_string()),
        toml::Value::Array(items) => Dynamic::Array(
            items
                .into_iter()
                .map(toml_to_dynamic)
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => {
            let mut map = DynamicMap::new();
            for (key, value) in table {
                map.insert(key, toml_to_dynamic(value)?);
            }
            Dynamic::Object(map)
        }
    })
}

fn decode_yaml(bytes: &[u8]) -> Result<DynamicMap, String> {
    if bytes.trim_ascii().is_empty() {
        return Ok(DynamicMap::new());
    }
    let value: serde_yaml::Value = serde_yaml::from_slice(bytes).map_err(|e| e.to_string())?;
    match yaml_to_dynamic(value)? {
        // An empty document.
        Dynamic::Null => Ok(DynamicMap::new()),
        other => top_level(other),
    }
}

fn yaml_to_dynamic(value: serde_yaml::Value) -> Result<Dynamic, String> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Dynamic::Null,
        Yaml::Bool(b) => Dynamic::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(u) = n.as_u64() {
                Dynamic::from(u)
            } else {
                float(n.as_f64().unwrap_or(f64::NAN))?
            }
        }
        Yaml::String(s) => Dynamic::String(s),
        Yaml::Sequence(items) => Dynamic::Array(
            items
                .into_iter()
                .map(yaml_to_dynamic)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = DynamicMap::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, yaml_to_dynamic(value)?);
            }
            Dynamic::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_dynamic(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        Yaml::Sequence(_) | Yaml::Mapping(_) => {
            Err("mapping keys must be scalars".to_string())
        }
    }
}

fn float(f: f64) -> Result<Dynamic, String> {
    serde_json::Number::from_f64(f)
        .map(Dynamic::Number)
        .ok_or_else(|| format!("{f} cannot be represented"))
}
