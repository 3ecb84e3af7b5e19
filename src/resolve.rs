//! Core resolution pipeline: apply every layer to one option tree.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Defaults are already in place
//! (the builder applies them right after inspecting the record). Steps:
//!
//! 1. Decode the config file (if any) and apply it
//! 2. Apply environment variables on top
//! 3. Apply command-line flags on top (highest priority)
//!
//! Each layer only writes the options it names. An absent value is a no-op,
//! never a reset. Nothing is rolled back when a layer fails part way.

use std::path::PathBuf;

use crate::DynamicMap;
use crate::decode::Decoder;
use crate::env;
use crate::error::OptfigError;
use crate::file;
use crate::flags::{self, FlagPair};
use crate::tree::OptionTree;
use crate::validate;

/// Where the file layer comes from.
#[derive(Debug, Default)]
pub enum FileInput {
    /// No file layer.
    #[default]
    None,
    /// Raw file contents, decoded here.
    Content {
        path: PathBuf,
        bytes: Vec<u8>,
        decoder: Decoder,
    },
    /// An already-decoded map.
    Map(DynamicMap),
}

/// All pre-loaded data needed to resolve a config. No I/O happens here.
#[derive(Debug, Default)]
pub struct ResolveInput {
    pub file: FileInput,
    /// Whether to reject unknown keys in the file layer.
    pub strict: bool,
    /// Env var prefix and the variables to read. `None` means env disabled.
    pub env: Option<(String, Vec<(String, String)>)>,
    /// Tokenized flags. `None` means flags disabled.
    pub flags: Option<Vec<FlagPair>>,
    pub ignore_unknown_flags: bool,
}

/// Resolve the file, env and flag layers into the tree's record.
pub fn resolve(tree: &mut OptionTree<'_>, input: ResolveInput) -> Result<(), OptfigError> {
    match input.file {
        FileInput::None => {}
        FileInput::Content {
            path,
            bytes,
            decoder,
        } => {
            let map = decoder
                .decode(&bytes)
                .map_err(|source| OptfigError::ParseError {
                    path: path.clone(),
                    source,
                })?;
            let applied = file::apply_map(tree, &map)?;
            tracing::debug!(
                path = %path.display(),
                decoder = decoder.name(),
                applied = applied.count,
                unknown = applied.unknown.len(),
                "applied config file"
            );
            if input.strict {
                let content = String::from_utf8_lossy(&bytes);
                validate::reject_unknown_keys(applied.unknown, &content, &path)?;
            }
        }
        FileInput::Map(map) => {
            let applied = file::apply_map(tree, &map)?;
            tracing::debug!(applied = applied.count, "applied config map");
            if input.strict {
                validate::reject_unknown_keys(applied.unknown, "", &PathBuf::from("<map>"))?;
            }
        }
    }

    if let Some((prefix, vars)) = &input.env {
        let applied = env::apply_env(tree, prefix, vars)?;
        tracing::debug!(prefix = %prefix, applied, "applied environment");
    }

    if let Some(pairs) = input.flags {
        let applied = flags::apply_flags(tree, pairs, input.ignore_unknown_flags)?;
        tracing::debug!(applied, "applied flags");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::ServiceConfig;
    use crate::tree::inspect;
    use crate::types::Layer;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn toml(content: &str) -> FileInput {
        FileInput::Content {
            path: "test.toml".into(),
            bytes: content.as_bytes().to_vec(),
            decoder: Decoder::Toml,
        }
    }

    fn run(config: &mut ServiceConfig, input: ResolveInput) -> Result<(), OptfigError> {
        let mut tree = inspect(config).unwrap();
        tree.apply_defaults().unwrap();
        resolve(&mut tree, input)
    }

    #[test]
    fn defaults_only() {
        let mut config = ServiceConfig::default();
        run(&mut config, ResolveInput::default()).unwrap();
        assert_eq!(config.count, 10);
        assert_eq!(config.tags, vec!["a", "b"]);
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 8080);
        assert!(!config.verbose);
    }

    #[test]
    fn file_overrides_default() {
        let mut config = ServiceConfig::default();
        let input = ResolveInput {
            file: toml("[server]\nport = 3000\n"),
            ..Default::default()
        };
        run(&mut config, input).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "localhost");
    }

    #[test]
    fn env_overrides_file() {
        let mut config = ServiceConfig::default();
        let input = ResolveInput {
            file: toml("count = 3\n"),
            env: Some(("APP_".into(), vars(&[("APP_COUNT", "5")]))),
            ..Default::default()
        };
        run(&mut config, input).unwrap();
        assert_eq!(config.count, 5);
    }

    #[test]
    fn flags_override_everything() {
        let mut config = ServiceConfig::default();
        let input = ResolveInput {
            file: toml("count = 3\n"),
            env: Some(("".into(), vars(&[("COUNT", "5")]))),
            flags: Some(flags::tokenize(&["-c", "7"]).unwrap()),
            ..Default::default()
        };
        run(&mut config, input).unwrap();
        assert_eq!(config.count, 7);
    }

    #[test]
    fn disjoint_layers_each_keep_their_value() {
        let mut config = ServiceConfig::default();
        let input = ResolveInput {
            file: toml("[server]\nhost = \"file.example\"\n"),
            env: Some(("".into(), vars(&[("SERVER_PORT", "9000")]))),
            flags: Some(flags::tokenize(&["--verbose"]).unwrap()),
            ..Default::default()
        };
        run(&mut config, input).unwrap();
        assert_eq!(config.server.host, "file.example");
        assert_eq!(config.server.port, 9000);
        assert!(config.verbose);
        assert_eq!(config.count, 10);
    }

    #[test]
    fn prepopulated_value_beats_default_but_not_sources() {
        let mut config = ServiceConfig {
            count: 42,
            ..Default::default()
        };
        run(&mut config, ResolveInput::default()).unwrap();
        assert_eq!(config.count, 42);

        let input = ResolveInput {
            flags: Some(flags::tokenize(&["--count", "1"]).unwrap()),
            ..Default::default()
        };
        run(&mut config, input).unwrap();
        assert_eq!(config.count, 1);
    }

    #[test]
    fn map_input_is_applied() {
        let mut config = ServiceConfig::default();
        let map = serde_json::json!({"server": {"port": 81}, "verbose": true});
        let serde_json::Value::Object(map) = map else {
            unreachable!()
        };
        let input = ResolveInput {
            file: FileInput::Map(map),
            ..Default::default()
        };
        run(&mut config, input).unwrap();
        assert_eq!(config.server.port, 81);
        assert!(config.verbose);
    }

    #[test]
    fn parse_error_names_file() {
        let mut config = ServiceConfig::default();
        let input = ResolveInput {
            file: toml("count = = 3\n"),
            ..Default::default()
        };
        let err = run(&mut config, input).unwrap_err();
        match err {
            OptfigError::ParseError { path, source } => {
                assert_eq!(path, PathBuf::from("test.toml"));
                assert_eq!(source.decoder, "toml");
            }
            other => panic!("Expected ParseError, got: {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_ignored_unless_strict() {
        let mut config = ServiceConfig::default();
        let input = ResolveInput {
            file: toml("count = 3\ntypo = 1\n"),
            ..Default::default()
        };
        run(&mut config, input).unwrap();
        assert_eq!(config.count, 3);

        let input = ResolveInput {
            file: toml("count = 3\ntypo = 1\n"),
            strict: true,
            ..Default::default()
        };
        let err = run(&mut config, input).unwrap_err();
        match err {
            OptfigError::UnknownKeys(keys) => match &keys[0] {
                OptfigError::UnknownKey { key, line, .. } => {
                    assert_eq!(key, "typo");
                    assert_eq!(*line, 2);
                }
                other => panic!("Expected UnknownKey, got: {other:?}"),
            },
            other => panic!("Expected UnknownKeys, got: {other:?}"),
        }
    }

    #[test]
    fn bad_env_value_reports_layer() {
        let mut config = ServiceConfig::default();
        let input = ResolveInput {
            env: Some(("".into(), vars(&[("COUNT", "many")]))),
            ..Default::default()
        };
        let err = run(&mut config, input).unwrap_err();
        assert!(matches!(err, OptfigError::InvalidValue { layer: Layer::Env, .. }));
    }

    #[test]
    fn defaults_not_applied_here() {
        let mut config = ServiceConfig::default();
        let mut tree = inspect(&mut config).unwrap();
        resolve(&mut tree, ResolveInput::default()).unwrap();
        drop(tree);
        assert_eq!(config.count, 0);
        assert!(config.server.host.is_empty());
    }
}
