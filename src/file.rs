//! Config file location, reading, and application.
//!
//! # Location
//!
//! The file comes from, in order:
//!
//! 1. the config-file option given as a flag (`--config path` or its short),
//! 2. the same option's environment variable,
//! 3. the default file name configured on the builder.
//!
//! Relative paths resolve against the base directory ([`SearchPath`], the
//! working directory unless configured). A missing default file is skipped
//! silently. A missing file that the user named is an error.
//!
//! # Application
//!
//! [`apply_map`] walks the decoded map alongside the option tree. Keys are
//! normalised to kebab-case before matching, so `pool_size`, `poolSize` and
//! `pool-size` all address the `pool-size` option. Keys that match nothing are
//! collected and ignored unless strict mode turns them into errors.

use std::path::{Path, PathBuf};

use crate::DynamicMap;
use crate::coerce::dynamic_kind;
use crate::error::OptfigError;
use crate::flags::FlagPair;
use crate::tree::{Opt, OptionTree};
use crate::types::{Layer, SearchPath};
use crate::{Dynamic, env};

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to construct the platform-specific
/// config directory (e.g. `~/.config/{app_name}/` on Linux).
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory found).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// A config file to read, and whether the user named it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChoice {
    pub path: PathBuf,
    pub explicit: bool,
}

/// The config file path the user asked for through the config-file option.
///
/// Flags are consulted before the environment.
pub fn requested_file(
    option: &Opt<'_>,
    flags: &[FlagPair],
    env_prefix: Option<&str>,
    vars: &[(String, String)],
) -> Option<String> {
    let key = option.key();
    let from_flags = flags.iter().rev().find(|p| {
        if p.short {
            option.short().is_some_and(|c| p.key.chars().eq(std::iter::once(c)))
        } else {
            p.key == key
        }
    });
    if let Some(pair) = from_flags {
        return Some(pair.value.clone());
    }
    let name = option.env_key(env_prefix.unwrap_or_default());
    env::lookup(vars, &name).map(str::to_string)
}

/// Pick the file to read: the requested path, else the default file.
pub fn choose_file(
    requested: Option<String>,
    default_file: Option<&Path>,
    base_dir: &Path,
) -> Option<FileChoice> {
    let (path, explicit) = match requested {
        Some(path) => (PathBuf::from(path), true),
        None => (default_file?.to_path_buf(), false),
    };
    let path = if path.is_relative() {
        base_dir.join(path)
    } else {
        path
    };
    Some(FileChoice { path, explicit })
}

/// Read the chosen file. A missing default file yields `None`.
pub fn read_file(choice: &FileChoice) -> Result<Option<Vec<u8>>, OptfigError> {
    match std::fs::read(&choice.path) {
        Ok(bytes) => {
            tracing::debug!(path = %choice.path.display(), bytes = bytes.len(), "read config file");
            Ok(Some(bytes))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if choice.explicit {
                Err(OptfigError::ConfigFileNotFound(choice.path.clone()))
            } else {
                tracing::debug!(path = %choice.path.display(), "default config file absent, skipping");
                Ok(None)
            }
        }
        Err(e) => Err(OptfigError::IoError {
            path: choice.path.clone(),
            source: e,
        }),
    }
}

/// Result of applying a decoded map.
#[derive(Debug, Default)]
pub struct Applied {
    /// Options written.
    pub count: usize,
    /// Dotted paths of keys that matched no option, as written in the file.
    pub unknown: Vec<String>,
}

/// Apply a decoded map to the option tree.
pub fn apply_map(tree: &mut OptionTree<'_>, map: &DynamicMap) -> Result<Applied, OptfigError> {
    let mut applied = Applied::default();
    apply_level(tree.options_mut(), map, "", &mut applied)?;
    Ok(applied)
}

fn apply_level(
    options: &mut [Opt<'_>],
    map: &DynamicMap,
    prefix: &str,
    applied: &mut Applied,
) -> Result<(), OptfigError> {
    for (key, value) in map {
        let written = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let Some(opt) = options.iter_mut().find(|o| o.matches_key(key)) else {
            applied.unknown.push(written);
            continue;
        };

        if opt.is_parent() {
            let Dynamic::Object(inner) = value else {
                return Err(OptfigError::NotATable {
                    key: opt.key(),
                    found: dynamic_kind(value),
                });
            };
            apply_level(opt.children_mut(), inner, &written, applied)?;
            continue;
        }

        opt.set_dynamic(value)
            .map_err(|error| OptfigError::InvalidValue {
                key: opt.key(),
                layer: Layer::File,
                error,
            })?;
        tracing::trace!(key = %opt.key(), "file value");
        applied.count += 1;
    }
    Ok(())
}
