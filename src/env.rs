//! Environment variable source.
//!
//! Each leaf option reads one variable, named by [`Opt::env_key`]: the prefix
//! followed by the option's path joined with `_`, upper-cased, hyphens folded
//! to underscores. `server.pool-size` under prefix `APP_` is `APP_SERVER_POOL_SIZE`.
//!
//! Map options collect every variable that extends their name with `_`; the
//! rest of the name, lower-cased, is the map key. `APP_LABELS_TEAM=core`
//! sets `labels["team"] = "core"`.
//!
//! Variables are passed in rather than read from the process, so tests can
//! use synthetic data.

use crate::error::OptfigError;
use crate::tree::{OptKind, OptionTree};
use crate::types::Layer;

/// Apply environment variables to every leaf option.
///
/// Returns how many options were written.
pub fn apply_env(
    tree: &mut OptionTree<'_>,
    prefix: &str,
    vars: &[(String, String)],
) -> Result<usize, OptfigError> {
    let mut applied = 0;

    for opt in tree.leaves_mut() {
        let name = opt.env_key(prefix);

        if opt.kind() == OptKind::Map {
            let needle = format!("{name}_");
            for (var, value) in vars {
                let Some(suffix) = var.strip_prefix(&needle) else {
                    continue;
                };
                if suffix.is_empty() {
                    continue;
                }
                let key = suffix.to_lowercase();
                opt.insert_text(&key, value)
                    .map_err(|error| OptfigError::InvalidValue {
                        key: format!("{}.{key}", opt.key()),
                        layer: Layer::Env,
                        error,
                    })?;
                tracing::trace!(var = %var, key = %opt.key(), "env map entry");
                applied += 1;
            }
            continue;
        }

        let Some(value) = lookup(vars, &name) else {
            continue;
        };
        opt.set_text(value).map_err(|error| OptfigError::InvalidValue {
            key: opt.key(),
            layer: Layer::Env,
            error,
        })?;
        tracing::trace!(var = %name, key = %opt.key(), "env value");
        applied += 1;
    }

    Ok(applied)
}

/// The value of `name`, if set. A later duplicate wins, as with a real
/// environment block.
pub fn lookup<'v>(vars: &'v [(String, String)], name: &str) -> Option<&'v str> {
    vars.iter()
        .rev()
        .find(|(var, _)| var == name)
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::ServiceConfig;
    use crate::tree::inspect;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(prefix: &str, pairs: &[(&str, &str)]) -> Result<ServiceConfig, OptfigError> {
        let mut config = ServiceConfig::default();
        let mut tree = inspect(&mut config).unwrap();
        apply_env(&mut tree, prefix, &vars(pairs))?;
        drop(tree);
        Ok(config)
    }

    #[test]
    fn simple_key() {
        let config = load("", &[("COUNT", "25")]).unwrap();
        assert_eq!(config.count, 25);
    }

    #[test]
    fn prefix_is_prepended_verbatim() {
        let config = load("MYAPP_", &[("MYAPP_COUNT", "5"), ("COUNT", "9")]).unwrap();
        assert_eq!(config.count, 5);
    }

    #[test]
    fn nested_key() {
        let config = load("", &[("SERVER_PORT", "8080"), ("SERVER_TLS_CERT", "/c.pem")]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.server.tls.unwrap().cert,
            std::path::PathBuf::from("/c.pem")
        );
    }

    #[test]
    fn csv_sequence_keeps_quoted_commas() {
        let config = load("", &[("TAGS", r#"a,b,"c,d""#)]).unwrap();
        assert_eq!(config.tags, vec!["a", "b", "c,d"]);
    }

    #[test]
    fn bytes_from_base64() {
        let config = load("", &[("TOKEN", "AQID")]).unwrap();
        assert_eq!(&config.token[..], &[1, 2, 3]);
    }

    #[test]
    fn bad_base64_is_input_error() {
        let err = load("", &[("TOKEN", "strng")]).unwrap_err();
        assert!(matches!(
            err,
            OptfigError::InvalidValue { ref key, layer: Layer::Env, .. } if key == "token"
        ));
    }

    #[test]
    fn map_entries_collected_by_prefix() {
        let config = load(
            "APP_",
            &[("APP_LABELS_TEAM", "core"), ("APP_LABELS_Region", "eu"), ("APP_LABELS", "x")],
        )
        .unwrap();
        assert_eq!(config.labels.len(), 2);
        assert_eq!(config.labels["team"], json!("core"));
        assert_eq!(config.labels["region"], json!("eu"));
    }

    #[test]
    fn unrelated_vars_ignored() {
        let config = load("APP_", &[("PATH", "/usr/bin"), ("APP_UNKNOWN", "1")]).unwrap();
        assert_eq!(config.count, 0);
    }

    #[test]
    fn missing_var_leaves_value() {
        let mut config = ServiceConfig {
            count: 7,
            ..Default::default()
        };
        let mut tree = inspect(&mut config).unwrap();
        assert_eq!(apply_env(&mut tree, "", &[]).unwrap(), 0);
        drop(tree);
        assert_eq!(config.count, 7);
    }

    #[test]
    fn overflow_names_key() {
        let err = load("", &[("SERVER_PORT", "70000")]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("server.port"));
        assert!(msg.contains("70000"));
    }

    #[test]
    fn lookup_last_wins() {
        let v = vars(&[("A", "1"), ("A", "2")]);
        assert_eq!(lookup(&v, "A"), Some("2"));
        assert_eq!(lookup(&v, "B"), None);
    }
}
