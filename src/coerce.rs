//! Coercion of external representations into typed values.
//!
//! Two kinds of input reach a field: raw text (flags, environment variables,
//! declared defaults) and decoded values (config files, pre-built maps). The
//! [`Value`](crate::Value) impls dispatch on their own type and call the
//! helpers here for the actual parsing, so every type reports failures the
//! same way: with the offending input and the target type.

use std::fmt::Display;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use thiserror::Error;

use crate::Dynamic;
use crate::shape::Shape;

/// Boxed error returned by self-decoding text types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to convert an input into a field's type.
#[derive(Debug, Error)]
pub enum CoerceError {
    #[error("failed to parse '{raw}' into type {target}: {reason}")]
    Parse {
        raw: String,
        target: String,
        reason: String,
    },

    #[error("failed to decode '{raw}' into type {target}: {source}")]
    Decode {
        raw: String,
        target: String,
        source: BoxError,
    },

    #[error("incompatible type: {found} not convertible to {target}")]
    Incompatible { found: String, target: String },

    #[error("error parsing comma separated value '{raw}': {reason}")]
    Csv { raw: String, reason: String },

    #[error("cannot assign '{raw}' to map {target}: address a single entry by key")]
    KeyRequired { raw: String, target: String },

    #[error("type {target} has no keys (tried to set '{key}')")]
    NotAMap { key: String, target: String },

    #[error("found no option with id '{0}' in record")]
    UnknownField(String),

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        source: Box<CoerceError>,
    },

    #[error("key '{key}': {source}")]
    Entry {
        key: String,
        source: Box<CoerceError>,
    },

    #[error("field '{field}': {source}")]
    Field {
        field: String,
        source: Box<CoerceError>,
    },
}

impl CoerceError {
    pub(crate) fn parse(raw: &str, target: &Shape, reason: impl Display) -> Self {
        CoerceError::Parse {
            raw: raw.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn incompatible(found: &Dynamic, target: &Shape) -> Self {
        CoerceError::Incompatible {
            found: dynamic_kind(found).to_string(),
            target: target.to_string(),
        }
    }

    pub(crate) fn at_element(self, index: usize) -> Self {
        CoerceError::Element {
            index,
            source: Box::new(self),
        }
    }

    pub(crate) fn at_key(self, key: &str) -> Self {
        CoerceError::Entry {
            key: key.to_string(),
            source: Box::new(self),
        }
    }

    pub(crate) fn in_field(self, field: &str) -> Self {
        CoerceError::Field {
            field: field.to_string(),
            source: Box::new(self),
        }
    }
}

/// Name of a decoded value's kind, for error messages.
pub fn dynamic_kind(value: &Dynamic) -> &'static str {
    match value {
        Dynamic::Null => "null",
        Dynamic::Bool(_) => "bool",
        Dynamic::Number(_) => "number",
        Dynamic::String(_) => "string",
        Dynamic::Array(_) => "array",
        Dynamic::Object(_) => "object",
    }
}

/// Parse a boolean from the canonical token set.
pub(crate) fn parse_bool(raw: &str) -> Result<bool, CoerceError> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(CoerceError::parse(raw, &Shape::Bool, "invalid syntax")),
    }
}

/// Parse a base-10 number of the target's declared width.
///
/// Width checks come from the target's `FromStr`: `"300"` fails for `u8`
/// even though it fits any wider integer.
pub(crate) fn parse_number<T>(raw: &str, target: &Shape) -> Result<T, CoerceError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| CoerceError::parse(raw, target, e))
}

/// Parse a float at the declared precision.
///
/// Finite text that overflows the target is out of range; only an explicit
/// `inf`/`infinity` literal yields infinity.
pub(crate) fn parse_float<T>(raw: &str, target: &Shape) -> Result<T, CoerceError>
where
    T: FromStr + Into<f64> + Copy,
    T::Err: Display,
{
    let value: T = parse_number(raw, target)?;
    let literal = raw.trim_start_matches(['+', '-']).to_ascii_lowercase();
    if value.into().is_infinite() && literal != "inf" && literal != "infinity" {
        return Err(CoerceError::parse(raw, target, "value out of range"));
    }
    Ok(value)
}

/// Like [`parse_number`] but rejects any leading sign, including `+`.
pub(crate) fn parse_unsigned<T>(raw: &str, target: &Shape) -> Result<T, CoerceError>
where
    T: FromStr,
    T::Err: Display,
{
    if raw.starts_with(['+', '-']) {
        return Err(CoerceError::parse(raw, target, "unsigned value cannot carry a sign"));
    }
    parse_number(raw, target)
}

/// Convert a decoded number into an integer type, failing when out of range.
///
/// Floats convert only when they have no fractional part.
pub(crate) fn int_from_number<T>(n: &serde_json::Number, target: &Shape) -> Result<T, CoerceError>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    let out_of_range = || CoerceError::parse(&n.to_string(), target, "value out of range");

    if let Some(i) = n.as_i64() {
        return T::try_from(i).map_err(|_| out_of_range());
    }
    if let Some(u) = n.as_u64() {
        return T::try_from(u).map_err(|_| out_of_range());
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => {
            if f < 0.0 && f >= i64::MIN as f64 {
                T::try_from(f as i64).map_err(|_| out_of_range())
            } else if f >= 0.0 && f < u64::MAX as f64 {
                T::try_from(f as u64).map_err(|_| out_of_range())
            } else {
                Err(out_of_range())
            }
        }
        _ => Err(CoerceError::parse(
            &n.to_string(),
            target,
            "fractional value for an integer type",
        )),
    }
}

/// Decode standard base64 text into a byte buffer.
pub(crate) fn decode_base64(raw: &str) -> Result<Bytes, CoerceError> {
    STANDARD
        .decode(raw)
        .map(Bytes::from)
        .map_err(|e| CoerceError::parse(raw, &Shape::Bytes, e))
}

/// Split one record of comma separated values.
///
/// Quoting follows RFC 4180, so `a,"b,c"` yields `["a", "b,c"]`. The empty
/// string yields no elements.
pub(crate) fn split_csv(raw: &str) -> Result<Vec<String>, CoerceError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => Ok(record.iter().map(str::to_string).collect()),
        Some(Err(e)) => Err(CoerceError::Csv {
            raw: raw.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(Vec::new()),
    }
}
