use std::fmt;
use std::path::PathBuf;

/// Base directory that relative config file paths resolve against.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
}

/// The four sources, lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Default,
    File,
    Env,
    Flag,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Default => "defaults",
            Layer::File => "config file",
            Layer::Env => "environment",
            Layer::Flag => "flags",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_order_by_priority() {
        assert!(Layer::Default < Layer::File);
        assert!(Layer::File < Layer::Env);
        assert!(Layer::Env < Layer::Flag);
    }

    #[test]
    fn layer_names() {
        assert_eq!(Layer::Env.to_string(), "environment");
        assert_eq!(Layer::File.to_string(), "config file");
    }
}
