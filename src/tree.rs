//! The option tree: a record's fields as addressable options.
//!
//! [`inspect`] walks a record through [`Config::fields`], classifies every
//! field type, and returns an [`OptionTree`] of [`Opt`]s. Leaves hold a live
//! `&mut` handle into the caller's struct and every source writes through it.
//! The tree borrows the record for as long as it lives, so it is built at the
//! start of a load and dropped at the end.
//!
//! Structural invariants are checked here, before any source is consulted:
//! sibling ids are unique at each level, shorts are unique across the whole
//! tree, and defaults only sit on leaves.

use heck::ToKebabCase;

use crate::coerce::CoerceError;
use crate::error::StructureError;
use crate::shape::{self, Shape};
use crate::value::Value;
use crate::{Dynamic, DynamicMap};

/// A record whose fields are config options.
///
/// Usually derived with `#[derive(Config)]`. A hand-written impl returns one
/// [`Field`] per option, in declaration order.
pub trait Config: Value {
    fn fields(&mut self) -> Vec<Field<'_>>;
}

/// One struct field, its metadata, and a handle into the struct.
pub struct Field<'a> {
    name: &'static str,
    id: Option<&'static str>,
    short: Option<char>,
    default: Option<&'static str>,
    description: &'static str,
    hidden: bool,
    target: &'a mut dyn Value,
}

impl<'a> Field<'a> {
    pub fn new(name: &'static str, target: &'a mut dyn Value) -> Self {
        Self {
            name,
            id: None,
            short: None,
            default: None,
            description: "",
            hidden: false,
            target,
        }
    }

    /// Override the identifier derived from the field name.
    pub fn id(mut self, id: &'static str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Literal applied through text coercion when the field is still zero.
    pub fn default_value(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    pub fn description(mut self, text: &'static str) -> Self {
        self.description = text;
        self
    }

    /// Leave the option out of help output.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// How an option takes its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptKind {
    Scalar,
    /// A self-decoding type.
    TextCodec,
    /// Base64 text into a byte buffer.
    ByteBuffer,
    /// A sequence, from CSV text or a decoded array.
    Repeated,
    /// String keys to dynamic values, one entry at a time.
    Map,
    /// A nested record. Has children and no handle of its own.
    Parent,
}

impl OptKind {
    fn of(shape: &Shape) -> Self {
        match shape.unwrap_optional() {
            Shape::Text(_) => OptKind::TextCodec,
            Shape::Bytes => OptKind::ByteBuffer,
            Shape::Seq(_) => OptKind::Repeated,
            Shape::Map { .. } => OptKind::Map,
            Shape::Record { .. } => OptKind::Parent,
            _ => OptKind::Scalar,
        }
    }
}

enum Node<'a> {
    Leaf(&'a mut dyn Value),
    Parent(Vec<Opt<'a>>),
}

/// One option in the tree.
pub struct Opt<'a> {
    id: String,
    path: Vec<String>,
    short: Option<char>,
    default: Option<&'static str>,
    description: &'static str,
    hidden: bool,
    kind: OptKind,
    shape: Shape,
    node: Node<'a>,
}

impl<'a> Opt<'a> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether a decoded key addresses this option: verbatim, or after
    /// kebab-case normalisation.
    pub(crate) fn matches_key(&self, key: &str) -> bool {
        self.id == key || self.id == derive_id(key)
    }

    /// Ids from the top-level ancestor down to this option.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Dotted full path, as used by flags and file errors.
    pub fn key(&self) -> String {
        self.path.join(".")
    }

    /// Environment variable name: `PREFIX` + underscore-joined path, hyphens
    /// folded to underscores, upper-cased.
    pub fn env_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.path.join("_").replace('-', "_")).to_uppercase()
    }

    pub fn short(&self) -> Option<char> {
        self.short
    }

    pub fn default_literal(&self) -> Option<&'static str> {
        self.default
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn kind(&self) -> OptKind {
        self.kind
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn is_parent(&self) -> bool {
        matches!(self.node, Node::Parent(_))
    }

    /// Nested options. Empty for leaves.
    pub fn children(&self) -> &[Opt<'a>] {
        match &self.node {
            Node::Parent(children) => children,
            Node::Leaf(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [Opt<'a>] {
        match &mut self.node {
            Node::Parent(children) => children,
            Node::Leaf(_) => &mut [],
        }
    }

    pub fn is_zero(&self) -> bool {
        match &self.node {
            Node::Leaf(target) => target.is_zero(),
            Node::Parent(children) => children.iter().all(Opt::is_zero),
        }
    }

    pub fn set_text(&mut self, raw: &str) -> Result<(), CoerceError> {
        match &mut self.node {
            Node::Leaf(target) => target.set_text(raw),
            Node::Parent(_) => Err(CoerceError::Incompatible {
                found: "text".to_string(),
                target: self.shape.to_string(),
            }),
        }
    }

    pub fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
        match &mut self.node {
            Node::Leaf(target) => target.set_dynamic(value),
            Node::Parent(children) => match value {
                Dynamic::Object(map) => decode_into(children, map),
                other => Err(CoerceError::incompatible(other, &self.shape)),
            },
        }
    }

    pub fn insert_text(&mut self, key: &str, raw: &str) -> Result<(), CoerceError> {
        match &mut self.node {
            Node::Leaf(target) => target.insert_text(key, raw),
            Node::Parent(_) => Err(CoerceError::NotAMap {
                key: key.to_string(),
                target: self.shape.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for Opt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opt")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .field("short", &self.short)
            .field("default", &self.default)
            .field("children", &self.children())
            .finish()
    }
}

/// The options of one record, with handles into it.
#[derive(Debug)]
pub struct OptionTree<'a> {
    options: Vec<Opt<'a>>,
}

impl<'a> OptionTree<'a> {
    /// Top-level options only.
    pub fn options(&self) -> &[Opt<'a>] {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut [Opt<'a>] {
        &mut self.options
    }

    /// Every option, parents included, depth first in declaration order.
    pub fn flatten(&self) -> Vec<&Opt<'a>> {
        fn walk<'t, 'a>(opts: &'t [Opt<'a>], out: &mut Vec<&'t Opt<'a>>) {
            for opt in opts {
                out.push(opt);
                walk(opt.children(), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.options, &mut out);
        out
    }

    /// Every leaf option, depth first in declaration order.
    pub fn leaves_mut(&mut self) -> Vec<&mut Opt<'a>> {
        fn walk<'t, 'a>(opts: &'t mut [Opt<'a>], out: &mut Vec<&'t mut Opt<'a>>) {
            for opt in opts {
                if opt.is_parent() {
                    walk(opt.children_mut(), out);
                } else {
                    out.push(opt);
                }
            }
        }
        let mut out = Vec::new();
        walk(&mut self.options, &mut out);
        out
    }

    /// Look up an option by its dotted full path.
    pub fn find(&self, key: &str) -> Option<&Opt<'a>> {
        self.flatten().into_iter().find(|opt| opt.key() == key)
    }

    /// Apply declared defaults to every leaf still holding its zero value.
    ///
    /// Returns how many defaults were applied.
    pub fn apply_defaults(&mut self) -> Result<usize, StructureError> {
        let mut applied = 0;
        for opt in self.leaves_mut() {
            let Some(literal) = opt.default else {
                continue;
            };
            if !opt.is_zero() {
                continue;
            }
            opt.set_text(literal)
                .map_err(|error| StructureError::InvalidDefault {
                    path: opt.key(),
                    error,
                })?;
            tracing::trace!(key = %opt.key(), default = literal, "applied default");
            applied += 1;
        }
        Ok(applied)
    }
}

/// Build the option tree of a record.
///
/// Optional nested records are allocated so their fields have a target.
pub fn inspect(target: &mut dyn Value) -> Result<OptionTree<'_>, StructureError> {
    let shape = target.describe();
    let Some(config) = target.as_config() else {
        return Err(StructureError::NotARecord(shape.to_string()));
    };
    let options = build_level(config, &[])?;
    check_shorts(&options)?;
    Ok(OptionTree { options })
}

/// Kebab-case identifier for a field name or file key.
pub(crate) fn derive_id(name: &str) -> String {
    name.to_kebab_case()
}

fn build_level<'a>(
    config: &'a mut dyn Config,
    parent: &[String],
) -> Result<Vec<Opt<'a>>, StructureError> {
    let mut options: Vec<Opt<'a>> = Vec::new();
    for field in config.fields() {
        let opt = build_option(field, parent)?;
        if options.iter().any(|o| o.id == opt.id) {
            return Err(StructureError::DuplicateId { path: opt.key() });
        }
        options.push(opt);
    }
    Ok(options)
}

fn build_option<'a>(field: Field<'a>, parent: &[String]) -> Result<Opt<'a>, StructureError> {
    let id = match field.id {
        Some(id) => {
            if id.is_empty() || id.contains('.') || id.contains(char::is_whitespace) {
                return Err(StructureError::InvalidId {
                    field: field.name,
                    id: id.to_string(),
                });
            }
            id.to_string()
        }
        None => derive_id(field.name),
    };
    let mut path = parent.to_vec();
    path.push(id.clone());

    let shape = field.target.describe();
    shape::check(&shape).map_err(|reason| StructureError::UnsupportedType {
        path: path.join("."),
        reason,
    })?;
    let kind = OptKind::of(&shape);

    let node = if kind == OptKind::Parent {
        if field.default.is_some() {
            return Err(StructureError::DefaultOnComposite {
                path: path.join("."),
            });
        }
        let Some(config) = field.target.as_config() else {
            return Err(StructureError::NotARecord(shape.to_string()));
        };
        Node::Parent(build_level(config, &path)?)
    } else {
        Node::Leaf(field.target)
    };

    Ok(Opt {
        id,
        path,
        short: field.short,
        default: field.default,
        description: field.description,
        hidden: field.hidden,
        kind,
        shape,
        node,
    })
}

fn check_shorts(options: &[Opt<'_>]) -> Result<(), StructureError> {
    fn walk(opts: &[Opt<'_>], seen: &mut Vec<(char, String)>) -> Result<(), StructureError> {
        for opt in opts {
            if let Some(short) = opt.short {
                if let Some((_, first)) = seen.iter().find(|(c, _)| *c == short) {
                    return Err(StructureError::DuplicateShort {
                        short,
                        first: first.clone(),
                        second: opt.key(),
                    });
                }
                seen.push((short, opt.key()));
            }
            walk(opt.children(), seen)?;
        }
        Ok(())
    }
    walk(options, &mut Vec::new())
}

fn decode_into(options: &mut [Opt<'_>], map: &DynamicMap) -> Result<(), CoerceError> {
    for (key, value) in map {
        let Some(opt) = options.iter_mut().find(|o| o.matches_key(key)) else {
            return Err(CoerceError::UnknownField(key.clone()));
        };
        opt.set_dynamic(value).map_err(|e| e.in_field(key))?;
    }
    Ok(())
}

/// Decode an object into a record, as for elements of `Vec<Record>`.
///
/// Unlike the file source, unknown keys are errors here.
///
/// # Panics
///
/// Panics if the record's structure is invalid.
pub fn decode_record(config: &mut dyn Config, value: &Dynamic) -> Result<(), CoerceError> {
    let shape = config.describe();
    let Dynamic::Object(map) = value else {
        return Err(CoerceError::incompatible(value, &shape));
    };
    let mut options = build_level(config, &[]).unwrap_or_else(|err| err.abort());
    decode_into(&mut options, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::*;
    use serde_json::json;

    fn keys(tree: &OptionTree<'_>) -> Vec<String> {
        tree.flatten().iter().map(|o| o.key()).collect()
    }

    // --- construction ---

    #[test]
    fn flattened_view_includes_nested_options() {
        let mut config = ServiceConfig::default();
        let tree = inspect(&mut config).unwrap();
        assert_eq!(
            keys(&tree),
            vec![
                "count",
                "tags",
                "server",
                "server.host",
                "server.port",
                "server.tls",
                "server.tls.cert",
                "token",
                "labels",
                "verbose",
            ]
        );
    }

    #[test]
    fn top_level_view_excludes_descendants() {
        let mut config = ServiceConfig::default();
        let tree = inspect(&mut config).unwrap();
        let ids: Vec<_> = tree.options().iter().map(Opt::id).collect();
        assert_eq!(ids, vec!["count", "tags", "server", "token", "labels", "verbose"]);
    }

    #[test]
    fn private_and_skipped_fields_are_not_options() {
        let mut config = WithPrivate::default();
        let tree = inspect(&mut config).unwrap();
        assert_eq!(keys(&tree), vec!["visible"]);
    }

    #[test]
    fn ids_derived_from_field_names() {
        let mut config = Naming::default();
        let tree = inspect(&mut config).unwrap();
        assert_eq!(keys(&tree), vec!["pool-size", "int32-var", "explicit"]);
    }

    #[test]
    fn derived_ids_are_idempotent() {
        for name in ["pool_size", "PoolSize", "poolSize", "pool-size", "int32_var", "HTTPServer"] {
            let once = derive_id(name);
            assert_eq!(derive_id(&once), once, "{name}");
        }
    }

    #[test]
    fn kinds_follow_shapes() {
        let mut config = ServiceConfig::default();
        let tree = inspect(&mut config).unwrap();
        let kind = |key: &str| tree.find(key).unwrap().kind();
        assert_eq!(kind("count"), OptKind::Scalar);
        assert_eq!(kind("tags"), OptKind::Repeated);
        assert_eq!(kind("server"), OptKind::Parent);
        assert_eq!(kind("server.tls.cert"), OptKind::TextCodec);
        assert_eq!(kind("token"), OptKind::ByteBuffer);
        assert_eq!(kind("labels"), OptKind::Map);
    }

    #[test]
    fn env_keys_fold_hyphens_and_nesting() {
        let mut config = ServiceConfig::default();
        let tree = inspect(&mut config).unwrap();
        assert_eq!(tree.find("server.port").unwrap().env_key(""), "SERVER_PORT");
        assert_eq!(tree.find("count").unwrap().env_key("app_"), "APP_COUNT");

        let mut naming = Naming::default();
        let tree = inspect(&mut naming).unwrap();
        assert_eq!(tree.find("pool-size").unwrap().env_key("X"), "XPOOL_SIZE");
    }

    #[test]
    fn optional_record_allocated_during_construction() {
        let mut config = ServiceConfig::default();
        assert!(config.server.tls.is_none());
        inspect(&mut config).unwrap();
        assert!(config.server.tls.is_some());
    }

    // --- structural errors ---

    #[test]
    fn non_record_rejected() {
        let mut n = 5u32;
        let err = inspect(&mut n).unwrap_err();
        assert!(matches!(err, StructureError::NotARecord(ref s) if s == "u32"));
    }

    #[test]
    fn duplicate_sibling_ids_rejected() {
        let mut config = DuplicateIds::default();
        let err = inspect(&mut config).unwrap_err();
        assert!(matches!(err, StructureError::DuplicateId { ref path } if path == "name"));
    }

    #[test]
    fn duplicate_ids_rejected_when_nested() {
        let mut config = NestedDuplicateIds::default();
        let err = inspect(&mut config).unwrap_err();
        assert!(matches!(err, StructureError::DuplicateId { ref path } if path == "inner.name"));
    }

    #[test]
    fn same_id_at_different_levels_is_fine() {
        let mut config = SameIdDifferentLevels::default();
        assert!(inspect(&mut config).is_ok());
    }

    #[test]
    fn duplicate_short_across_branches_rejected() {
        let mut config = DuplicateShorts::default();
        let err = inspect(&mut config).unwrap_err();
        match err {
            StructureError::DuplicateShort { short, first, second } => {
                assert_eq!(short, 'x');
                assert_eq!(first, "first");
                assert_eq!(second, "nested.second");
            }
            other => panic!("expected DuplicateShort, got {other:?}"),
        }
    }

    #[test]
    fn default_on_record_rejected() {
        let mut config = DefaultOnRecord::default();
        let err = inspect(&mut config).unwrap_err();
        assert!(matches!(err, StructureError::DefaultOnComposite { ref path } if path == "inner"));
    }

    #[test]
    fn dotted_explicit_id_rejected() {
        let mut config = DottedId::default();
        assert!(matches!(
            inspect(&mut config).unwrap_err(),
            StructureError::InvalidId { field: "value", .. }
        ));
    }

    #[test]
    fn unsupported_field_type_names_path() {
        let mut config = WithCallback::default();
        let err = inspect(&mut config).unwrap_err();
        match err {
            StructureError::UnsupportedType { path, reason } => {
                assert_eq!(path, "hook");
                assert!(reason.to_string().contains("function"));
            }
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn map_with_concrete_values_rejected() {
        let mut config = ConcreteMap::default();
        assert!(matches!(
            inspect(&mut config).unwrap_err(),
            StructureError::UnsupportedType { .. }
        ));
    }

    // --- defaults ---

    #[test]
    fn defaults_fill_zero_leaves() {
        let mut config = ServiceConfig::default();
        let mut tree = inspect(&mut config).unwrap();
        assert_eq!(tree.apply_defaults().unwrap(), 4);
        drop(tree);
        assert_eq!(config.count, 10);
        assert_eq!(config.tags, vec!["a", "b"]);
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn prepopulated_value_beats_default() {
        let mut config = ServiceConfig {
            count: 3,
            ..Default::default()
        };
        let mut tree = inspect(&mut config).unwrap();
        tree.apply_defaults().unwrap();
        drop(tree);
        assert_eq!(config.count, 3);
    }

    #[test]
    fn bad_default_is_structural() {
        let mut config = BadDefault::default();
        let mut tree = inspect(&mut config).unwrap();
        let err = tree.apply_defaults().unwrap_err();
        assert!(matches!(err, StructureError::InvalidDefault { ref path, .. } if path == "level"));
    }

    // --- writes through handles ---

    #[test]
    fn leaf_writes_reach_the_record() {
        let mut config = ServiceConfig::default();
        let mut tree = inspect(&mut config).unwrap();
        for opt in tree.leaves_mut() {
            match opt.key().as_str() {
                "server.port" => opt.set_text("9000").unwrap(),
                "labels" => opt.insert_text("team", "core").unwrap(),
                _ => {}
            }
        }
        drop(tree);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.labels["team"], json!("core"));
    }

    #[test]
    fn parent_takes_objects_only() {
        let mut config = ServiceConfig::default();
        let mut tree = inspect(&mut config).unwrap();
        let server = &mut tree.options_mut()[2];
        assert!(server.set_text("x").is_err());
        server.set_dynamic(&json!({"port": 1234})).unwrap();
        drop(tree);
        assert_eq!(config.server.port, 1234);
    }

    // --- sequences of records ---

    #[test]
    fn records_decoded_from_array_of_objects() {
        let mut config = WithEndpoints::default();
        let mut tree = inspect(&mut config).unwrap();
        tree.options_mut()[0]
            .set_dynamic(&json!([
                {"name": "a", "weight": 1},
                {"name": "b", "weight": "2"}
            ]))
            .unwrap();
        drop(tree);
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[1].name, "b");
        assert_eq!(config.endpoints[1].weight, 2);
    }

    #[test]
    fn unknown_key_in_record_element_rejected() {
        let mut config = WithEndpoints::default();
        let mut tree = inspect(&mut config).unwrap();
        let err = tree.options_mut()[0]
            .set_dynamic(&json!([{"name": "a", "bogus": 1}]))
            .unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn optional_records_in_sequence_allocated() {
        let mut list: Vec<Option<Endpoint>> = Vec::new();
        list.set_dynamic(&json!([{"name": "x"}, null])).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].as_ref().unwrap().name, "x");
        assert!(list[1].is_none());
    }
}
