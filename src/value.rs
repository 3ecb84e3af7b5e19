//! The [`Value`] trait and its implementations for every supported field type.
//!
//! A `Value` is both a type descriptor (through [`Value::shape`]) and a live
//! write target. The two coercion entry points mirror the two kinds of
//! sources: [`Value::set_text`] for flags, environment variables and declared
//! defaults, [`Value::set_dynamic`] for decoded config files.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use bytes::Bytes;

use crate::Dynamic;
use crate::coerce::{self, BoxError, CoerceError};
use crate::shape::Shape;
use crate::tree::Config;

/// A type that can be loaded into a config field.
///
/// Implemented for primitives, `String`, [`Dynamic`], [`Bytes`], `Vec<T>`,
/// `Option<T>`, string-keyed maps, and (through `#[derive(Config)]`) records.
/// Types that parse themselves from text implement [`TextDecode`] and
/// register with [`text_value!`](crate::text_value).
pub trait Value {
    /// Type descriptor used to classify the field before loading.
    fn shape() -> Shape
    where
        Self: Sized;

    /// Object-safe access to [`Value::shape`].
    fn describe(&self) -> Shape;

    /// Whether the value is still its type's zero value. Declared defaults
    /// only replace zero values.
    fn is_zero(&self) -> bool;

    /// Assign from raw text.
    fn set_text(&mut self, raw: &str) -> Result<(), CoerceError>;

    /// Assign from a decoded value.
    fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError>;

    /// Assign a single map entry from raw text, overwriting the key.
    fn insert_text(&mut self, key: &str, raw: &str) -> Result<(), CoerceError> {
        let _ = raw;
        Err(CoerceError::NotAMap {
            key: key.to_string(),
            target: self.describe().to_string(),
        })
    }

    /// The nested record behind this value, allocating it if optional.
    fn as_config(&mut self) -> Option<&mut dyn Config> {
        None
    }
}

/// Capability of types that initialise themselves from UTF-8 text.
///
/// Register an implementor with [`text_value!`](crate::text_value) to use it
/// as a field:
///
/// ```
/// use optfig::TextDecode;
///
/// #[derive(Default, PartialEq)]
/// struct Hex(Vec<u8>);
///
/// impl TextDecode for Hex {
///     fn decode_text(&mut self, text: &[u8]) -> Result<(), optfig::BoxError> {
///         let text = std::str::from_utf8(text)?;
///         self.0 = (0..text.len())
///             .step_by(2)
///             .map(|i| u8::from_str_radix(&text[i..i + 2], 16))
///             .collect::<Result<_, _>>()?;
///         Ok(())
///     }
///
///     fn is_unset(&self) -> bool {
///         self.0.is_empty()
///     }
/// }
///
/// optfig::text_value!(Hex);
/// ```
pub trait TextDecode {
    fn decode_text(&mut self, text: &[u8]) -> Result<(), BoxError>;

    /// Whether a declared default may still replace this value.
    fn is_unset(&self) -> bool;
}

/// Implement [`Value`] for types implementing [`TextDecode`].
///
/// Text sources hand the raw bytes to the decoder. Decoded config values
/// must be strings.
#[macro_export]
macro_rules! text_value {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::Value for $ty {
            fn shape() -> $crate::Shape {
                $crate::Shape::Text(stringify!($ty))
            }

            fn describe(&self) -> $crate::Shape {
                <Self as $crate::Value>::shape()
            }

            fn is_zero(&self) -> bool {
                $crate::TextDecode::is_unset(self)
            }

            fn set_text(&mut self, raw: &str) -> ::std::result::Result<(), $crate::CoerceError> {
                $crate::TextDecode::decode_text(self, raw.as_bytes()).map_err(|source| {
                    $crate::CoerceError::Decode {
                        raw: raw.to_string(),
                        target: stringify!($ty).to_string(),
                        source,
                    }
                })
            }

            fn set_dynamic(
                &mut self,
                value: &$crate::Dynamic,
            ) -> ::std::result::Result<(), $crate::CoerceError> {
                match value {
                    $crate::Dynamic::String(raw) => <Self as $crate::Value>::set_text(self, raw),
                    other => Err($crate::CoerceError::Incompatible {
                        found: $crate::__private::dynamic_kind(other).to_string(),
                        target: stringify!($ty).to_string(),
                    }),
                }
            }
        }
    )+};
}

impl TextDecode for PathBuf {
    fn decode_text(&mut self, text: &[u8]) -> Result<(), BoxError> {
        *self = PathBuf::from(std::str::from_utf8(text)?);
        Ok(())
    }

    fn is_unset(&self) -> bool {
        self.as_os_str().is_empty()
    }
}

macro_rules! decode_ip {
    ($($ty:ty),*) => {$(
        impl TextDecode for $ty {
            fn decode_text(&mut self, text: &[u8]) -> Result<(), BoxError> {
                *self = std::str::from_utf8(text)?.parse()?;
                Ok(())
            }

            fn is_unset(&self) -> bool {
                self.is_unspecified()
            }
        }
    )*};
}

decode_ip!(IpAddr, Ipv4Addr, Ipv6Addr);

impl TextDecode for SocketAddr {
    fn decode_text(&mut self, text: &[u8]) -> Result<(), BoxError> {
        *self = std::str::from_utf8(text)?.parse()?;
        Ok(())
    }

    fn is_unset(&self) -> bool {
        self.ip().is_unspecified() && self.port() == 0
    }
}

text_value!(PathBuf, IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr);

impl Value for bool {
    fn shape() -> Shape {
        Shape::Bool
    }

    fn describe(&self) -> Shape {
        Shape::Bool
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
        *self = coerce::parse_bool(raw)?;
        Ok(())
    }

    fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
        match value {
            Dynamic::Bool(b) => {
                *self = *b;
                Ok(())
            }
            Dynamic::String(raw) => self.set_text(raw),
            other => Err(CoerceError::incompatible(other, &Shape::Bool)),
        }
    }
}

macro_rules! integer_value {
    ($variant:ident, $parse:ident: $($ty:ty),*) => {$(
        impl Value for $ty {
            fn shape() -> Shape {
                Shape::$variant(stringify!($ty))
            }

            fn describe(&self) -> Shape {
                Self::shape()
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }

            fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
                *self = coerce::$parse(raw, &Self::shape())?;
                Ok(())
            }

            fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
                match value {
                    Dynamic::Number(n) => {
                        *self = coerce::int_from_number(n, &Self::shape())?;
                        Ok(())
                    }
                    Dynamic::String(raw) => self.set_text(raw),
                    other => Err(CoerceError::incompatible(other, &Self::shape())),
                }
            }
        }
    )*};
}

integer_value!(Int, parse_number: i8, i16, i32, i64, isize);
integer_value!(Uint, parse_unsigned: u8, u16, u32, u64, usize);

macro_rules! float_value {
    ($($ty:ty),*) => {$(
        impl Value for $ty {
            fn shape() -> Shape {
                Shape::Float(stringify!($ty))
            }

            fn describe(&self) -> Shape {
                Self::shape()
            }

            fn is_zero(&self) -> bool {
                *self == 0.0
            }

            fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
                *self = coerce::parse_float(raw, &Self::shape())?;
                Ok(())
            }

            fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
                match value {
                    Dynamic::Number(n) => match n.as_f64() {
                        Some(f) if (f as $ty).is_infinite() && f.is_finite() => Err(
                            CoerceError::parse(&n.to_string(), &Self::shape(), "value out of range"),
                        ),
                        Some(f) => {
                            *self = f as $ty;
                            Ok(())
                        }
                        None => Err(CoerceError::parse(&n.to_string(), &Self::shape(), "not representable")),
                    },
                    Dynamic::String(raw) => self.set_text(raw),
                    other => Err(CoerceError::incompatible(other, &Self::shape())),
                }
            }
        }
    )*};
}

float_value!(f32, f64);

impl Value for String {
    fn shape() -> Shape {
        Shape::Str
    }

    fn describe(&self) -> Shape {
        Shape::Str
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
        raw.clone_into(self);
        Ok(())
    }

    fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
        match value {
            Dynamic::String(raw) => self.set_text(raw),
            other => Err(CoerceError::incompatible(other, &Shape::Str)),
        }
    }
}

impl Value for Dynamic {
    fn shape() -> Shape {
        Shape::Dynamic
    }

    fn describe(&self) -> Shape {
        Shape::Dynamic
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
        *self = Dynamic::String(raw.to_string());
        Ok(())
    }

    fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
        self.clone_from(value);
        Ok(())
    }
}

// Byte buffers only take text. A decoded array of numbers is not a byte
// buffer, even when every element fits in a u8.
impl Value for Bytes {
    fn shape() -> Shape {
        Shape::Bytes
    }

    fn describe(&self) -> Shape {
        Shape::Bytes
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
        *self = coerce::decode_base64(raw)?;
        Ok(())
    }

    fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
        match value {
            Dynamic::String(raw) => self.set_text(raw),
            other => Err(CoerceError::incompatible(other, &Shape::Bytes)),
        }
    }
}

impl<T: Value + Default> Value for Vec<T> {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }

    fn describe(&self) -> Shape {
        Self::shape()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    /// Splits `raw` as one CSV record; a bad element aborts the assignment.
    fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
        let parts = coerce::split_csv(raw)?;
        let mut out = Vec::with_capacity(parts.len());
        for (index, part) in parts.iter().enumerate() {
            let mut elem = T::default();
            elem.set_text(part).map_err(|e| e.at_element(index))?;
            out.push(elem);
        }
        *self = out;
        Ok(())
    }

    fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
        match value {
            Dynamic::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let mut elem = T::default();
                    elem.set_dynamic(item).map_err(|e| e.at_element(index))?;
                    out.push(elem);
                }
                *self = out;
                Ok(())
            }
            Dynamic::String(raw) => self.set_text(raw),
            other => Err(CoerceError::incompatible(other, &Self::shape())),
        }
    }
}

impl<T: Value + Default> Value for Option<T> {
    fn shape() -> Shape {
        Shape::Optional(Box::new(T::shape()))
    }

    fn describe(&self) -> Shape {
        Self::shape()
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
        let mut inner = T::default();
        inner.set_text(raw)?;
        *self = Some(inner);
        Ok(())
    }

    fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.set_dynamic(value)?;
        *self = Some(inner);
        Ok(())
    }

    fn insert_text(&mut self, key: &str, raw: &str) -> Result<(), CoerceError> {
        self.get_or_insert_with(T::default).insert_text(key, raw)
    }

    fn as_config(&mut self) -> Option<&mut dyn Config> {
        if !T::shape().is_record() {
            return None;
        }
        self.get_or_insert_with(T::default).as_config()
    }
}

fn map_entry<K, V>(key: &str) -> Result<(K, V), CoerceError>
where
    K: Value + Default,
    V: Value + Default,
{
    let mut k = K::default();
    k.set_text(key).map_err(|e| e.at_key(key))?;
    Ok((k, V::default()))
}

impl<K, V, S> Value for HashMap<K, V, S>
where
    K: Value + Default + Eq + Hash,
    V: Value + Default,
    S: BuildHasher + Default,
{
    fn shape() -> Shape {
        Shape::Map {
            key: Box::new(K::shape()),
            value: Box::new(V::shape()),
        }
    }

    fn describe(&self) -> Shape {
        Self::shape()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
        Err(CoerceError::KeyRequired {
            raw: raw.to_string(),
            target: Self::shape().to_string(),
        })
    }

    fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
        let Dynamic::Object(entries) = value else {
            return Err(CoerceError::incompatible(value, &Self::shape()));
        };
        let mut out = HashMap::with_capacity_and_hasher(entries.len(), S::default());
        for (key, item) in entries {
            let (k, mut v) = map_entry::<K, V>(key)?;
            v.set_dynamic(item).map_err(|e| e.at_key(key))?;
            out.insert(k, v);
        }
        *self = out;
        Ok(())
    }

    fn insert_text(&mut self, key: &str, raw: &str) -> Result<(), CoerceError> {
        let (k, mut v) = map_entry::<K, V>(key)?;
        v.set_text(raw).map_err(|e| e.at_key(key))?;
        self.insert(k, v);
        Ok(())
    }
}

impl<K, V> Value for BTreeMap<K, V>
where
    K: Value + Default + Ord,
    V: Value + Default,
{
    fn shape() -> Shape {
        Shape::Map {
            key: Box::new(K::shape()),
            value: Box::new(V::shape()),
        }
    }

    fn describe(&self) -> Shape {
        Self::shape()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
        Err(CoerceError::KeyRequired {
            raw: raw.to_string(),
            target: Self::shape().to_string(),
        })
    }

    fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
        let Dynamic::Object(entries) = value else {
            return Err(CoerceError::incompatible(value, &Self::shape()));
        };
        let mut out = BTreeMap::new();
        for (key, item) in entries {
            let (k, mut v) = map_entry::<K, V>(key)?;
            v.set_dynamic(item).map_err(|e| e.at_key(key))?;
            out.insert(k, v);
        }
        *self = out;
        Ok(())
    }

    fn insert_text(&mut self, key: &str, raw: &str) -> Result<(), CoerceError> {
        let (k, mut v) = map_entry::<K, V>(key)?;
        v.set_text(raw).map_err(|e| e.at_key(key))?;
        self.insert(k, v);
        Ok(())
    }
}
