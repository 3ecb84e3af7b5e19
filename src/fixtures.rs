#[cfg(test)]
pub mod test {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use bytes::Bytes;

    use crate::{CoerceError, Config, Dynamic, Shape, Value};

    #[derive(Config, Debug, Default, PartialEq)]
    pub struct ServiceConfig {
        /// Worker count.
        #[config(short = 'c', default = 10)]
        pub count: i64,

        /// Tags applied to every request.
        #[config(default = "a,b")]
        pub tags: Vec<String>,

        /// Listener settings.
        pub server: Server,

        /// API token, base64 encoded.
        pub token: Bytes,

        /// Free-form labels.
        pub labels: HashMap<String, Dynamic>,

        #[config(short = 'v')]
        pub verbose: bool,
    }

    #[derive(Config, Debug, Default, PartialEq)]
    pub struct Server {
        /// Host to bind.
        #[config(default = "localhost")]
        pub host: String,

        /// Port to listen on.
        #[config(short = 'p', default = 8080)]
        pub port: u16,

        pub tls: Option<Tls>,
    }

    #[derive(Config, Debug, Default, PartialEq)]
    pub struct Tls {
        /// Certificate chain in PEM format.
        pub cert: PathBuf,
    }

    /// A record whose config file is named by one of its own options.
    #[derive(Config, Debug, Default, PartialEq)]
    pub struct FileBacked {
        /// Path to the `file` to read.
        #[config(short = 'f')]
        pub config: String,

        #[config(default = 1)]
        pub level: u8,

        pub name: String,

        pub server: Server,
    }

    // -- Structure fixtures ----------------------------------------------------

    #[derive(Config, Debug, Default)]
    pub struct WithPrivate {
        pub visible: u8,
        #[allow(dead_code)]
        hidden_state: u8,
        #[config(skip)]
        pub skipped: u8,
    }

    #[derive(Config, Debug, Default)]
    pub struct Naming {
        pub pool_size: u32,
        pub int32_var: i32,
        #[config(id = "explicit")]
        pub renamed: String,
    }

    #[derive(Config, Debug, Default)]
    pub struct DuplicateIds {
        pub name: String,
        #[config(id = "name")]
        pub other: String,
    }

    #[derive(Config, Debug, Default)]
    pub struct NestedDuplicateIds {
        pub inner: DuplicateIds,
    }

    #[derive(Config, Debug, Default)]
    pub struct NameOnly {
        pub name: String,
    }

    #[derive(Config, Debug, Default)]
    pub struct SameIdDifferentLevels {
        pub name: String,
        pub nested: NameOnly,
    }

    #[derive(Config, Debug, Default)]
    pub struct ShortX {
        #[config(short = 'x')]
        pub second: bool,
    }

    #[derive(Config, Debug, Default)]
    pub struct DuplicateShorts {
        #[config(short = 'x')]
        pub first: bool,
        pub nested: ShortX,
    }

    #[derive(Config, Debug, Default)]
    pub struct ClaimsHelp {
        #[config(short = 'h')]
        pub hearty: bool,
    }

    #[derive(Config, Debug, Default, PartialEq)]
    pub struct SnakeId {
        #[config(id = "db_url")]
        pub url: String,
        pub pool_size: u32,
    }

    #[derive(Config, Debug, Default)]
    pub struct DefaultOnRecord {
        #[config(default = "x")]
        pub inner: NameOnly,
    }

    #[derive(Config, Debug, Default)]
    pub struct DottedId {
        #[config(id = "a.b")]
        pub value: u8,
    }

    /// Stands in for a field type the engine cannot represent.
    #[derive(Debug, Default)]
    pub struct Callback;

    impl Value for Callback {
        fn shape() -> Shape {
            Shape::Opaque("function")
        }

        fn describe(&self) -> Shape {
            Self::shape()
        }

        fn is_zero(&self) -> bool {
            true
        }

        fn set_text(&mut self, _raw: &str) -> Result<(), CoerceError> {
            Err(CoerceError::Incompatible {
                found: "text".into(),
                target: "function".into(),
            })
        }

        fn set_dynamic(&mut self, value: &Dynamic) -> Result<(), CoerceError> {
            Err(CoerceError::Incompatible {
                found: crate::coerce::dynamic_kind(value).into(),
                target: "function".into(),
            })
        }
    }

    #[derive(Config, Debug, Default)]
    pub struct WithCallback {
        pub hook: Callback,
    }

    #[derive(Config, Debug, Default)]
    pub struct ConcreteMap {
        pub ports: HashMap<String, u16>,
    }

    #[derive(Config, Debug, Default)]
    pub struct BadDefault {
        #[config(default = "loud")]
        pub level: u8,
    }

    #[derive(Config, Debug, Default, PartialEq)]
    pub struct Endpoint {
        pub name: String,
        pub weight: u32,
    }

    #[derive(Config, Debug, Default)]
    pub struct WithEndpoints {
        pub endpoints: Vec<Endpoint>,
    }
}
