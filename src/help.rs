//! Clap adapter for usage text.
//!
//! This module is compiled only when the `clap` Cargo feature is enabled (on
//! by default). It never parses arguments; flags are tokenized by
//! [`flags`](crate::flags). Clap is only asked to lay out the usage text:
//! every visible leaf option becomes one [`clap::Arg`] and the command's
//! help is rendered to a string.
//!
//! - long name: the dotted full path (`--server.port`); map options show as
//!   `--labels.<key> <value>`
//! - value name: a back-quoted word in the description (``the `file` to
//!   read``), else one derived from the type; booleans take none
//! - a `(default ...)` suffix when a default is declared, quoted for text

use clap::{Arg, ArgAction, Command};

use crate::shape::Shape;
use crate::tree::{Opt, OptKind, OptionTree};

/// Usage settings taken from the builder.
#[derive(Debug, Clone)]
pub struct HelpSettings<'s> {
    pub program: &'s str,
    /// Replaces the `Usage of <program>:` header.
    pub message: Option<&'s str>,
    /// Description of `--help` itself.
    pub help_description: &'s str,
}

/// Render usage text for every visible leaf option.
pub fn render(tree: &OptionTree<'_>, settings: &HelpSettings<'_>) -> String {
    let header = match settings.message {
        Some(message) => message.to_string(),
        None => format!("Usage of {}:", settings.program),
    };

    let mut command = Command::new(settings.program.to_string())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .help_template("{before-help}\n{all-args}")
        .before_help(header);

    let options = tree.flatten();
    for opt in options.iter().filter(|o| !o.is_parent() && !o.is_hidden()) {
        command = command.arg(describe(opt));
    }

    command = command.arg(
        Arg::new("optfig-help")
            .long("help")
            .short('h')
            .help(settings.help_description.to_string())
            .action(ArgAction::SetTrue),
    );

    command.render_help().to_string()
}

fn describe(opt: &Opt<'_>) -> Arg {
    let key = opt.key();
    let (quoted_name, mut text) = split_value_name(opt.description());

    if let Some(literal) = opt.default_literal() {
        if !text.is_empty() {
            text.push(' ');
        }
        if is_textual(opt.shape()) {
            text.push_str(&format!("(default {literal:?})"));
        } else {
            text.push_str(&format!("(default {literal})"));
        }
    }

    let long = match opt.kind() {
        OptKind::Map => format!("{key}.<key>"),
        _ => key.clone(),
    };
    let mut arg = Arg::new(key).long(long).help(text);
    if let Some(short) = opt.short() {
        arg = arg.short(short);
    }

    match quoted_name.or_else(|| type_name(opt.shape())) {
        Some(name) => arg.value_name(name.to_string()).action(ArgAction::Set),
        None => arg.action(ArgAction::SetTrue),
    }
}

/// Split out the first back-quoted word, keeping it in the text without quotes.
fn split_value_name(description: &str) -> (Option<&str>, String) {
    if let Some(start) = description.find('`')
        && let Some(len) = description[start + 1..].find('`')
    {
        let name = &description[start + 1..start + 1 + len];
        let text = format!(
            "{}{}{}",
            &description[..start],
            name,
            &description[start + len + 2..]
        );
        return (Some(name), text);
    }
    (None, description.to_string())
}

fn type_name(shape: &Shape) -> Option<&'static str> {
    match shape.unwrap_optional() {
        Shape::Bool => None,
        Shape::Int(_) => Some("int"),
        Shape::Uint(_) => Some("uint"),
        Shape::Float(_) => Some("float"),
        Shape::Str => Some("string"),
        Shape::Bytes => Some("base64"),
        Shape::Seq(_) => Some("list"),
        _ => Some("value"),
    }
}

fn is_textual(shape: &Shape) -> bool {
    matches!(shape.unwrap_optional(), Shape::Str | Shape::Text(_))
}
