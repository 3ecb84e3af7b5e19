//! Type descriptors and the classifier deciding which field types can be
//! loaded.
//!
//! Every [`Value`](crate::Value) reports a [`Shape`]: a small, serialization
//! independent description of its type. The tree builder runs [`check`] over
//! each field's shape before it creates an option, so an unsupported type is
//! reported once, up front, with the path of the field that introduced it.

use std::fmt;

use thiserror::Error;

/// Description of a field type.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Bool,
    /// Signed integer, carrying the Rust type name (`"i8"`, `"isize"`, ...).
    Int(&'static str),
    /// Unsigned integer, carrying the Rust type name.
    Uint(&'static str),
    Float(&'static str),
    Str,
    /// An open value holding whatever a source produced.
    Dynamic,
    /// A byte buffer, read from base64 text.
    Bytes,
    /// A type that decodes itself from text. Never inspected further.
    Text(&'static str),
    Seq(Box<Shape>),
    Map { key: Box<Shape>, value: Box<Shape> },
    /// An optional value; allocated on demand.
    Optional(Box<Shape>),
    Record {
        name: &'static str,
        fields: Vec<(&'static str, Shape)>,
    },
    /// A type the engine cannot represent, with the reason.
    Opaque(&'static str),
}

impl Shape {
    /// The shape with any `Optional` layers removed.
    pub fn unwrap_optional(&self) -> &Shape {
        match self {
            Shape::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self.unwrap_optional(), Shape::Record { .. })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Bool => write!(f, "bool"),
            Shape::Int(name) | Shape::Uint(name) | Shape::Float(name) => write!(f, "{name}"),
            Shape::Str => write!(f, "String"),
            Shape::Dynamic => write!(f, "Dynamic"),
            Shape::Bytes => write!(f, "Bytes"),
            Shape::Text(name) => write!(f, "{name}"),
            Shape::Seq(elem) => write!(f, "Vec<{elem}>"),
            Shape::Map { key, value } => write!(f, "Map<{key}, {value}>"),
            Shape::Optional(inner) => write!(f, "Option<{inner}>"),
            Shape::Record { name, .. } => write!(f, "{name}"),
            Shape::Opaque(reason) => write!(f, "<opaque: {reason}>"),
        }
    }
}

/// Why a shape was rejected, and where inside it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.describe())]
pub struct Unsupported {
    /// Field names from the checked shape down to the offending type. Empty
    /// when the checked shape itself is at fault.
    pub path: Vec<String>,
    pub reason: String,
}

impl Unsupported {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            reason: reason.into(),
        }
    }

    fn wrap(mut self, context: &str) -> Self {
        self.reason = format!("{context}: {}", self.reason);
        self
    }

    fn in_field(mut self, field: &str) -> Self {
        self.path.insert(0, field.to_string());
        self
    }

    fn describe(&self) -> String {
        if self.path.is_empty() {
            self.reason.clone()
        } else {
            format!("field '{}': {}", self.path.join("."), self.reason)
        }
    }
}

/// Decide whether `shape` can be loaded.
///
/// Self-decoding text types and byte buffers are leaves regardless of their
/// representation. Records, sequences and optionals are accepted when
/// everything inside them is. Maps must have string keys and dynamic values.
pub fn check(shape: &Shape) -> Result<(), Unsupported> {
    match shape {
        Shape::Text(_) | Shape::Bytes => Ok(()),
        Shape::Bool
        | Shape::Int(_)
        | Shape::Uint(_)
        | Shape::Float(_)
        | Shape::Str
        | Shape::Dynamic => Ok(()),
        Shape::Record { fields, .. } => {
            for (name, field) in fields {
                check(field).map_err(|e| e.in_field(name).wrap("record with unsupported type"))?;
            }
            Ok(())
        }
        Shape::Seq(elem) => check(elem).map_err(|e| e.wrap("sequence of unsupported type")),
        Shape::Optional(inner) => check(inner).map_err(|e| e.wrap("option of unsupported type")),
        Shape::Map { key, value } => {
            if **key != Shape::Str || **value != Shape::Dynamic {
                return Err(Unsupported::new(format!(
                    "only maps with String keys and Dynamic values are supported, found {shape}"
                )));
            }
            Ok(())
        }
        Shape::Opaque(reason) => Err(Unsupported::new(format!("type not supported ({reason})"))),
    }
}
