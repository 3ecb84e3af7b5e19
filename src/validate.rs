//! Strict-mode validation: report unknown keys in config files.
//!
//! [`apply_map`](crate::file::apply_map) collects the keys that matched no
//! option. In strict mode each one becomes an [`OptfigError::UnknownKey`] with
//! its file path and a best-effort line number.

use std::path::Path;

use crate::error::OptfigError;

/// Turn unknown keys into an error. `Ok` when there are none.
pub fn reject_unknown_keys(
    unknown: Vec<String>,
    content: &str,
    path: &Path,
) -> Result<(), OptfigError> {
    if unknown.is_empty() {
        return Ok(());
    }

    let errors: Vec<OptfigError> = unknown
        .into_iter()
        .map(|key| {
            let line = find_key_line(content, &key);
            OptfigError::UnknownKey {
                key,
                path: path.to_path_buf(),
                line,
            }
        })
        .collect();

    Err(OptfigError::UnknownKeys(errors))
}

/// Find the 1-indexed line number for a dotted key. Returns 0 if not found.
///
/// Tries TOML layout first (`[section]` headers, `key =`), then nested layout
/// (YAML `key:` and JSON `"key":`, parents before children).
pub fn find_key_line(content: &str, dotted_key: &str) -> usize {
    match find_toml_key_line(content, dotted_key) {
        0 => find_nested_key_line(content, dotted_key),
        line => line,
    }
}

/// Scan TOML text for `leaf =` (bare or quoted) under the `[parent]` table
/// the unknown key was collected from. `apply_map` reports keys as written in
/// the file, so headers compare verbatim. Array tables and inline tables are
/// not followed.
fn find_toml_key_line(content: &str, dotted_key: &str) -> usize {
    let (table, leaf) = dotted_key.rsplit_once('.').unwrap_or(("", dotted_key));
    let quoted = format!("\"{leaf}\"");
    let mut current = String::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if let Some(header) = line.strip_prefix('[') {
            if header.starts_with('[') {
                current = String::from("[[");
                continue;
            }
            current = header
                .trim_end_matches(']')
                .split('.')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(".");
            continue;
        }
        if current != table {
            continue;
        }
        let assigns = [leaf, quoted.as_str()].iter().any(|key| {
            line.strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='))
        });
        if assigns {
            return index + 1;
        }
    }
    0
}

/// Finds each segment in turn, searching after the line of its parent.
fn find_nested_key_line(content: &str, dotted_key: &str) -> usize {
    let lines: Vec<&str> = content.lines().collect();
    let mut start = 0;
    let mut found = 0;

    for segment in dotted_key.split('.') {
        let quoted = format!("\"{segment}\"");
        let hit = lines[start..].iter().position(|line| {
            let trimmed = line.trim_start().trim_start_matches("- ");
            [segment, quoted.as_str()].iter().any(|key| {
                trimmed
                    .strip_prefix(key)
                    .is_some_and(|rest| rest.trim_start().starts_with(':'))
            })
        });
        match hit {
            Some(offset) => {
                found = start + offset + 1;
                start = found;
            }
            None => return 0,
        }
    }
    found
}
