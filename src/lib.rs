//! Struct-driven, layered configuration for Rust applications. Define a
//! struct, derive [`Config`], and load it.
//!
//! Optfig fills one record from four sources (compiled defaults, a config
//! file, environment variables and command-line flags) through a builder
//! API. The struct is the only schema: field names become option ids, flags,
//! file keys and variable names.
//!
//! ```no_run
//! use optfig::{Config, Optfig};
//!
//! #[derive(Config, Default)]
//! struct AppConfig {
//!     /// Worker count.
//!     #[config(short = 'c', default = 4)]
//!     pub workers: u32,
//!     pub server: Server,
//! }
//!
//! #[derive(Config, Default)]
//! struct Server {
//!     #[config(default = "localhost")]
//!     pub host: String,
//!     #[config(short = 'p', default = 8080)]
//!     pub port: u16,
//! }
//!
//! let mut config = AppConfig::default();
//! Optfig::builder()
//!     .app_name("myapp")
//!     .default_file("myapp.toml")
//!     .env_prefix("MYAPP_")
//!     .load(&mut config)?;
//! # Ok::<(), optfig::OptfigError>(())
//! ```
//!
//! That single call reads `myapp.toml` from the working directory if it
//! exists, then `MYAPP_WORKERS` and `MYAPP_SERVER_PORT`, then flags such as
//! `-c 8` or `--server.port 9000`.
//!
//! # Layer precedence
//!
//! ```text
//! Compiled defaults     #[config(default = ...)], only into zero values
//!        ↑ overridden by
//! Config file           JSON, YAML or TOML
//!        ↑ overridden by
//! Environment vars      PREFIX + PATH_WITH_UNDERSCORES
//!        ↑ overridden by
//! Flags                 --path.to.option value, -s value
//! ```
//!
//! Every layer is **sparse**. A source that says nothing about a field leaves
//! it alone; it never resets it to its default. A field the caller filled in
//! before loading keeps its value over the declared default.
//!
//! # The record
//!
//! `#[derive(Config)]` accepts, per field:
//!
//! - **`id = "name"`** replaces the derived id (the field name in kebab
//!   case: `pool_size` becomes `pool-size`).
//! - **`short = 'c'`** adds a one-letter flag, unique across the whole record.
//! - **`default = ...`** a string, number or bool literal, parsed like a flag
//!   value. Not allowed on nested records.
//! - **`desc = "..."`** help text. `///` doc comments are used when absent.
//!   A back-quoted word in it names the flag's value in usage text.
//! - **`hidden`** keeps the option out of usage text.
//! - **`skip`** keeps the field out of loading entirely. Private fields are
//!   skipped too.
//!
//! Supported field types are the primitives, `String`, [`Dynamic`],
//! [`bytes::Bytes`] (base64 text), `Vec<T>` (comma separated text),
//! `Option<T>`, string-keyed maps of [`Dynamic`], nested `Config` records,
//! and any type implementing [`TextDecode`] registered with [`text_value!`].
//! A record with an unsupported field, a duplicate id among siblings, a
//! duplicate short anywhere, or a default on a nested record is a
//! programming error: [`inspect`] reports it as a [`StructureError`] and
//! loading panics with it before any source is read.
//!
//! # Config file
//!
//! The file is the one named by the
//! [`config_file_option()`](OptfigBuilder::config_file_option) flag, else its
//! environment variable, else [`default_file()`](OptfigBuilder::default_file).
//! A missing default file is skipped; a missing file the user named is an
//! error. The decoder is picked from the extension unless set with
//! [`decoder()`](OptfigBuilder::decoder). Keys are matched after conversion
//! to kebab case, so `pool_size` and `poolSize` both reach `pool-size`.
//!
//! Unknown keys are ignored unless
//! [`strict_file(true)`](OptfigBuilder::strict_file) is set, in which case
//! loading fails with the file path, key name, and line number:
//!
//! ```text
//! Unknown key 'server.prot' in /etc/myapp.toml (line 5)
//! ```
//!
//! # Environment variables
//!
//! With env prefix `MYAPP_`, variables map by upper-casing the option path
//! and joining it with `_`:
//!
//! | Env var | Option |
//! |---------|--------|
//! | `MYAPP_WORKERS` | `workers` |
//! | `MYAPP_SERVER_PORT` | `server.port` |
//! | `MYAPP_LABELS_TEAM` | `labels["team"]` |
//!
//! # Flags
//!
//! `--key=value`, `--key value` and `-k value` are accepted. A bare
//! `--verbose` means `true`. Repeating a flag appends to a list. Unknown
//! flags are errors unless
//! [`ignore_unknown_flags(true)`](OptfigBuilder::ignore_unknown_flags) is
//! set. With the `clap` feature (on by default), `--help` makes `load`
//! return [`OptfigError::HelpRequested`] holding the usage text.
//!
//! # Error handling
//!
//! Input problems are returned as [`OptfigError`]: the option path, the
//! layer and the offending text are part of every coercion failure. Enable
//! the `rich-errors` feature for [`miette`](https://docs.rs/miette)
//! diagnostics.

extern crate self as optfig;

pub mod error;
pub mod types;

mod builder;
mod coerce;
mod decode;
mod env;
mod file;
mod flags;
#[cfg(feature = "clap")]
mod help;
mod resolve;
mod shape;
mod tree;
mod validate;
mod value;

#[cfg(test)]
mod fixtures;

pub use builder::{Optfig, OptfigBuilder};
pub use coerce::{BoxError, CoerceError};
pub use decode::{DecodeError, Decoder};
pub use error::{OptfigError, StructureError};
pub use shape::{Shape, Unsupported};
pub use tree::{Config, Field, Opt, OptKind, OptionTree, inspect};
pub use types::{Layer, SearchPath};
pub use value::{TextDecode, Value};

/// Derive [`Config`] and [`Value`] for a struct with named fields.
pub use optfig_derive::Config;

/// A decoded value of any shape, as produced by the file decoders.
pub type Dynamic = serde_json::Value;

/// A decoded table: string keys to [`Dynamic`] values.
pub type DynamicMap = serde_json::Map<String, Dynamic>;

#[doc(hidden)]
pub mod __private {
    pub use crate::coerce::dynamic_kind;
    pub use crate::tree::decode_record;
}
