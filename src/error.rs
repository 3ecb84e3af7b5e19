use std::path::PathBuf;

use thiserror::Error;

use crate::coerce::CoerceError;
use crate::decode::DecodeError;
use crate::shape::Unsupported;
use crate::types::Layer;

/// Errors caused by input: files, environment variables, and flags.
///
/// The config record may be partially written when one of these is returned.
#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum OptfigError {
    #[error("Invalid value for '{key}' from {layer}: {error}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(optfig::invalid_value)))]
    InvalidValue {
        key: String,
        layer: Layer,
        #[source]
        error: CoerceError,
    },

    #[error("Expected a table for '{key}', found {found}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(optfig::not_a_table)))]
    NotATable { key: String, found: &'static str },

    #[error("Unknown flag: {0}")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(optfig::unknown_flag), help("run with --help to list the options"))
    )]
    UnknownFlag(String),

    #[error("Unexpected argument '{0}': flag values follow a flag")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(optfig::unexpected_argument)))]
    UnexpectedArgument(String),

    #[error("Flag '--{key}' and its short form '-{short}' were both given")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(optfig::ambiguous_flag)))]
    AmbiguousFlag { key: String, short: char },

    #[error("Config file not found: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(optfig::config_file_not_found)))]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(optfig::parse_error)))]
    ParseError { path: PathBuf, source: DecodeError },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in config file")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(optfig::unknown_keys)))]
    UnknownKeys(#[cfg_attr(feature = "rich-errors", related)] Vec<OptfigError>),

    #[error("No base directory for {0}: home or platform directories are unavailable")]
    BaseDirUnavailable(String),

    /// `--help` was given. Holds the rendered usage text.
    #[error("{0}")]
    HelpRequested(String),
}

/// Faults in a record's definition, found before any source is read.
///
/// [`inspect`](crate::inspect) returns these; loading panics with them.
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("expected a config record, got {0}")]
    NotARecord(String),

    #[error("unsupported type for option '{path}': {reason}")]
    UnsupportedType { path: String, reason: Unsupported },

    #[error("invalid id '{id}' for field '{field}': ids must be non-empty, without dots or spaces")]
    InvalidId { field: &'static str, id: String },

    #[error("duplicate option id '{path}'")]
    DuplicateId { path: String },

    #[error("duplicate short flag '-{short}' on options '{first}' and '{second}'")]
    DuplicateShort {
        short: char,
        first: String,
        second: String,
    },

    #[error("option '{path}' is a record and cannot have a default")]
    DefaultOnComposite { path: String },

    #[error("invalid default for option '{path}': {error}")]
    InvalidDefault {
        path: String,
        #[source]
        error: CoerceError,
    },

    #[error("config file option '{0}' is not a top-level option of the record")]
    UnknownConfigFileOption(String),

    #[error("option '{path}' claims '{flag}', which is reserved for help")]
    ReservedFlag { path: String, flag: &'static str },
}

impl StructureError {
    /// Abort loading. Structural faults are programmer errors, never input errors.
    pub(crate) fn abort(self) -> ! {
        panic!("optfig: error in config structure: {self}")
    }
}
