//! Command-line flag source.
//!
//! Parsing happens in two steps. [`tokenize`] turns the argument vector into
//! ordered `(key, value)` pairs without knowing the options:
//!
//! - `--key=value`, `--key value`, `-k value`, `-k=value`
//! - `--key` alone (or followed by another flag) means `true`
//! - a repeated key accumulates, comma-joined, for later CSV splitting
//! - `--` ends flag parsing; anything after it is ignored
//! - a word that is not a flag value is an error
//!
//! [`apply_flags`] then matches the pairs against the option tree. An option
//! is addressed by its dotted path or its short, never both at once. Map
//! options take `--path.key value` entries.

use crate::error::{OptfigError, StructureError};
use crate::tree::{OptKind, OptionTree};
use crate::types::Layer;

/// One parsed flag. `short` records whether it was written as `-k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagPair {
    pub key: String,
    pub value: String,
    pub short: bool,
}

fn is_flag(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    // "-5" and "-.5" are values.
    !rest.is_empty() && !rest.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

/// Split an argument vector (without the program name) into flag pairs.
pub fn tokenize<S: AsRef<str>>(args: &[S]) -> Result<Vec<FlagPair>, OptfigError> {
    let mut pairs: Vec<FlagPair> = Vec::new();
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_ref();
        i += 1;

        if arg == "--" {
            break;
        }
        if !is_flag(arg) {
            return Err(OptfigError::UnexpectedArgument(arg.to_string()));
        }

        let (name, short) = match arg.strip_prefix("--") {
            Some(name) => (name, false),
            None => (&arg[1..], true),
        };

        let (key, value) = match name.split_once('=') {
            Some((key, value)) => (key, value.to_string()),
            None => match args.get(i).map(AsRef::as_ref) {
                Some(next) if !is_flag(next) && next != "--" => {
                    i += 1;
                    (name, next.to_string())
                }
                _ => (name, "true".to_string()),
            },
        };

        if key.is_empty() {
            return Err(OptfigError::UnknownFlag(arg.to_string()));
        }

        match pairs.iter_mut().find(|p| p.key == key && p.short == short) {
            Some(existing) => {
                existing.value.push(',');
                existing.value.push_str(&value);
            }
            None => pairs.push(FlagPair {
                key: key.to_string(),
                value,
                short,
            }),
        }
    }

    Ok(pairs)
}

/// Whether the pairs ask for help.
pub fn wants_help(pairs: &[FlagPair]) -> bool {
    pairs
        .iter()
        .any(|p| if p.short { p.key == "h" } else { p.key == "help" })
}

/// The first option claiming `--help` or `-h`, which help reserves.
pub fn help_claim(tree: &OptionTree<'_>) -> Option<StructureError> {
    tree.flatten().into_iter().find_map(|opt| {
        let flag = if opt.key() == "help" {
            "--help"
        } else if opt.short() == Some('h') {
            "-h"
        } else {
            return None;
        };
        Some(StructureError::ReservedFlag {
            path: opt.key(),
            flag,
        })
    })
}

/// Apply flag pairs to the option tree.
///
/// Unknown flags are an error unless `ignore_unknown` is set. Returns how many
/// options were written.
pub fn apply_flags(
    tree: &mut OptionTree<'_>,
    pairs: Vec<FlagPair>,
    ignore_unknown: bool,
) -> Result<usize, OptfigError> {
    let mut pending = pairs;
    let mut applied = 0;

    for opt in tree.leaves_mut() {
        let key = opt.key();

        if opt.kind() == OptKind::Map {
            let needle = format!("{key}.");
            let mut i = 0;
            while i < pending.len() {
                let entry = match pending[i].key.strip_prefix(&needle) {
                    Some(entry) if !pending[i].short && !entry.is_empty() => entry.to_string(),
                    _ => {
                        i += 1;
                        continue;
                    }
                };
                let pair = pending.remove(i);
                opt.insert_text(&entry, &pair.value)
                    .map_err(|error| OptfigError::InvalidValue {
                        key: pair.key.clone(),
                        layer: Layer::Flag,
                        error,
                    })?;
                tracing::trace!(key = %pair.key, "flag map entry");
                applied += 1;
            }
            continue;
        }

        let long = take(&mut pending, |p| !p.short && p.key == key);
        let short = opt.short().and_then(|c| {
            take(&mut pending, |p| p.short && p.key.chars().eq(std::iter::once(c)))
        });

        let value = match (long, short) {
            (Some(_), Some(_)) => {
                return Err(OptfigError::AmbiguousFlag {
                    key,
                    short: opt.short().unwrap_or_default(),
                });
            }
            (Some(pair), None) | (None, Some(pair)) => pair.value,
            (None, None) => continue,
        };

        opt.set_text(&value).map_err(|error| OptfigError::InvalidValue {
            key: key.clone(),
            layer: Layer::Flag,
            error,
        })?;
        tracing::trace!(key = %key, "flag value");
        applied += 1;
    }

    if !ignore_unknown && let Some(unknown) = pending.first() {
        let dashes = if unknown.short { "-" } else { "--" };
        return Err(OptfigError::UnknownFlag(format!("{dashes}{}", unknown.key)));
    }

    Ok(applied)
}

fn take(pending: &mut Vec<FlagPair>, pred: impl Fn(&FlagPair) -> bool) -> Option<FlagPair> {
    let index = pending.iter().position(pred)?;
    Some(pending.remove(index))
}
