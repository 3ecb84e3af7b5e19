use std::path::{Path, PathBuf};

use crate::decode::Decoder;
use crate::error::{OptfigError, StructureError};
use crate::file;
use crate::flags::{self, FlagPair};
use crate::resolve::{self, FileInput, ResolveInput};
use crate::tree::{Config, OptionTree, inspect};
use crate::types::SearchPath;
use crate::{DynamicMap, Value};

/// Entry point for building an optfig loader.
pub struct Optfig;

impl Optfig {
    pub fn builder() -> OptfigBuilder {
        OptfigBuilder::new()
    }
}

enum FileSource {
    Discover,
    Content(Vec<u8>),
    Map(DynamicMap),
}

/// Builder for configuring and loading layered configuration.
///
/// Layers apply in a fixed order, each overriding the last:
///
/// - **Defaults** declared with `#[config(default = ...)]`
/// - **File**: [`default_file()`](Self::default_file), or the path given
///   through [`config_file_option()`](Self::config_file_option)
/// - **Environment**: variables named after the option path, under
///   [`env_prefix()`](Self::env_prefix)
/// - **Flags**: `--path.to.option value` and declared shorts
///
/// Environment and arguments are read from the process unless injected with
/// [`env_vars()`](Self::env_vars) and [`args()`](Self::args).
#[cfg_attr(not(feature = "clap"), allow(dead_code))]
pub struct OptfigBuilder {
    app_name: Option<String>,
    config_file_option: Option<String>,
    default_file: Option<PathBuf>,
    file_enabled: bool,
    decoder: Option<Decoder>,
    base_dir: SearchPath,
    strict: bool,
    env_prefix: String,
    env_enabled: bool,
    env_vars: Option<Vec<(String, String)>>,
    args: Option<Vec<String>>,
    program_name: Option<String>,
    flags_enabled: bool,
    ignore_unknown_flags: bool,
    help_enabled: bool,
    help_message: Option<String>,
    help_description: String,
}

impl OptfigBuilder {
    fn new() -> Self {
        Self {
            app_name: None,
            config_file_option: None,
            default_file: None,
            file_enabled: true,
            decoder: None,
            base_dir: SearchPath::Cwd,
            strict: false,
            env_prefix: String::new(),
            env_enabled: true,
            env_vars: None,
            args: None,
            program_name: None,
            flags_enabled: true,
            ignore_unknown_flags: false,
            help_enabled: true,
            help_message: None,
            help_description: "print this help menu".to_string(),
        }
    }

    /// Set the application name. Used for [`SearchPath::Platform`] and as the
    /// program name in usage text when arguments are injected.
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Name the top-level option whose value is the config file path.
    ///
    /// Its flag is consulted first, then its environment variable, then
    /// [`default_file()`](Self::default_file). The option must exist in the
    /// record; loading panics otherwise.
    pub fn config_file_option(mut self, id: &str) -> Self {
        self.config_file_option = Some(id.to_string());
        self
    }

    /// File read when no path is requested. Skipped silently if absent.
    pub fn default_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_file = Some(path.into());
        self
    }

    /// Disable the file layer entirely.
    pub fn no_file(mut self) -> Self {
        self.file_enabled = false;
        self
    }

    /// Decoder for the config file (default: picked from the file extension).
    pub fn decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Directory relative file paths resolve against (default: [`SearchPath::Cwd`]).
    pub fn base_dir(mut self, base: SearchPath) -> Self {
        self.base_dir = base;
        self
    }

    /// Enable or disable strict mode (default: `false`).
    /// In strict mode, unknown keys in config files produce errors.
    pub fn strict_file(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Prefix prepended verbatim to every environment variable name
    /// (default: none). `"APP_"` maps `server.port` to `APP_SERVER_PORT`.
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Disable environment variable loading entirely.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Use these variables instead of the process environment.
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Use these arguments (without the program name) instead of the
    /// process arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Program name shown in usage text.
    pub fn program_name(mut self, name: &str) -> Self {
        self.program_name = Some(name.to_string());
        self
    }

    /// Disable command-line flags entirely.
    pub fn no_flags(mut self) -> Self {
        self.flags_enabled = false;
        self
    }

    /// Skip flags that match no option instead of failing (default: `false`).
    pub fn ignore_unknown_flags(mut self, ignore: bool) -> Self {
        self.ignore_unknown_flags = ignore;
        self
    }

    /// Treat `--help` and `-h` as ordinary flags.
    ///
    /// While help is enabled, an option claiming either one is a
    /// [`StructureError::ReservedFlag`].
    pub fn no_help(mut self) -> Self {
        self.help_enabled = false;
        self
    }

    /// Replace the `Usage of <program>:` header of the usage text.
    pub fn help_message(mut self, message: &str) -> Self {
        self.help_message = Some(message.to_string());
        self
    }

    /// Description of the `--help` flag itself.
    pub fn help_description(mut self, description: &str) -> Self {
        self.help_description = description.to_string();
        self
    }

    /// Load every layer into `config`.
    ///
    /// Fields already holding non-zero values keep them unless a file,
    /// variable or flag names them. Returns [`OptfigError::HelpRequested`]
    /// with the usage text when `--help` is given.
    ///
    /// # Panics
    ///
    /// When the record's definition is invalid (see [`StructureError`]).
    /// That is checked before any source is read.
    pub fn load<C: Config>(self, config: &mut C) -> Result<(), OptfigError> {
        self.run(config, FileSource::Discover)
    }

    /// Like [`load()`](Self::load), with the file contents supplied directly.
    ///
    /// The decoder is the configured one, else picked from
    /// [`default_file()`](Self::default_file)'s extension, else try-all.
    pub fn load_with_content<C: Config>(
        self,
        config: &mut C,
        content: impl Into<Vec<u8>>,
    ) -> Result<(), OptfigError> {
        self.run(config, FileSource::Content(content.into()))
    }

    /// Like [`load()`](Self::load), with the file layer supplied as a decoded map.
    pub fn load_with_map<C: Config>(self, config: &mut C, map: DynamicMap) -> Result<(), OptfigError> {
        self.run(config, FileSource::Map(map))
    }

    fn run(mut self, config: &mut dyn Value, source: FileSource) -> Result<(), OptfigError> {
        let mut tree = inspect(config).unwrap_or_else(|err| err.abort());
        let file_option = self.config_file_option.as_deref().map(|id| {
            tree.options()
                .iter()
                .position(|opt| opt.id() == id)
                .unwrap_or_else(|| StructureError::UnknownConfigFileOption(id.to_string()).abort())
        });
        if cfg!(feature = "clap")
            && self.help_enabled
            && self.flags_enabled
            && let Some(err) = flags::help_claim(&tree)
        {
            err.abort();
        }
        let defaults = tree.apply_defaults().unwrap_or_else(|err| err.abort());
        tracing::debug!(applied = defaults, "applied defaults");

        let program = self.effective_program_name();
        tracing::debug!(program = %program, "loading configuration");

        let vars = if self.env_enabled {
            self.env_vars
                .take()
                .unwrap_or_else(|| std::env::vars().collect())
        } else {
            Vec::new()
        };
        let pairs = if self.flags_enabled {
            let args = self
                .args
                .take()
                .unwrap_or_else(|| std::env::args().skip(1).collect());
            Some(flags::tokenize(&args)?)
        } else {
            None
        };

        if let Some(usage) = self.usage_if_requested(&tree, pairs.as_deref(), &program) {
            return Err(OptfigError::HelpRequested(usage));
        }

        let file = match source {
            FileSource::Content(bytes) => {
                let path = self
                    .default_file
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("<content>"));
                let decoder = self.decoder.unwrap_or_else(|| Decoder::for_path(&path));
                FileInput::Content {
                    path,
                    bytes,
                    decoder,
                }
            }
            FileSource::Map(map) => FileInput::Map(map),
            FileSource::Discover if self.file_enabled => {
                let requested = file_option.and_then(|index| {
                    file::requested_file(
                        &tree.options()[index],
                        pairs.as_deref().unwrap_or_default(),
                        Some(self.env_prefix.as_str()),
                        &vars,
                    )
                });
                self.discover(requested)?
            }
            FileSource::Discover => FileInput::None,
        };

        let input = ResolveInput {
            file,
            strict: self.strict,
            env: self.env_enabled.then(|| (self.env_prefix.clone(), vars)),
            flags: pairs,
            ignore_unknown_flags: self.ignore_unknown_flags,
        };
        resolve::resolve(&mut tree, input)
    }

    /// Locate and read the config file.
    fn discover(&self, requested: Option<String>) -> Result<FileInput, OptfigError> {
        let needs_base = requested
            .as_deref()
            .map(Path::new)
            .or(self.default_file.as_deref())
            .is_some_and(Path::is_relative);
        let base_dir = if needs_base {
            let app_name = self.app_name.as_deref().unwrap_or_default();
            file::resolve_search_path(&self.base_dir, app_name)
                .ok_or_else(|| OptfigError::BaseDirUnavailable(format!("{:?}", self.base_dir)))?
        } else {
            PathBuf::new()
        };

        let Some(choice) = file::choose_file(requested, self.default_file.as_deref(), &base_dir)
        else {
            tracing::debug!("no config file configured");
            return Ok(FileInput::None);
        };
        tracing::debug!(
            path = %choice.path.display(),
            explicit = choice.explicit,
            "resolved config file"
        );

        let Some(bytes) = file::read_file(&choice)? else {
            return Ok(FileInput::None);
        };
        let decoder = self
            .decoder
            .unwrap_or_else(|| Decoder::for_path(&choice.path));
        Ok(FileInput::Content {
            path: choice.path,
            bytes,
            decoder,
        })
    }

    /// Explicit name, else the invoked binary's name, else the app name.
    fn effective_program_name(&self) -> String {
        if let Some(name) = &self.program_name {
            return name.clone();
        }
        let from_argv = match self.args {
            Some(_) => None,
            None => std::env::args_os().next().and_then(|arg0| {
                Path::new(&arg0)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            }),
        };
        from_argv
            .or_else(|| self.app_name.clone())
            .unwrap_or_else(|| "optfig".to_string())
    }

    #[cfg(feature = "clap")]
    fn usage_if_requested(
        &self,
        tree: &OptionTree<'_>,
        pairs: Option<&[FlagPair]>,
        program: &str,
    ) -> Option<String> {
        let pairs = pairs?;
        if !self.help_enabled || !flags::wants_help(pairs) {
            return None;
        }
        let settings = crate::help::HelpSettings {
            program,
            message: self.help_message.as_deref(),
            help_description: &self.help_description,
        };
        Some(crate::help::render(tree, &settings))
    }

    #[cfg(not(feature = "clap"))]
    fn usage_if_requested(
        &self,
        _tree: &OptionTree<'_>,
        _pairs: Option<&[FlagPair]>,
        _program: &str,
    ) -> Option<String> {
        None
    }
}
