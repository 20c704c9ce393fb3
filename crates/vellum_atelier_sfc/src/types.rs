//! SFC descriptor types.
//!
//! A descriptor is built once per distinct parse input and shared through the
//! parse cache, so every block owns its strings.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sourcemap::SourceMap;
use vellum_carton::{FxHashMap, String};
use vellum_relief::ast::SourceLocation;
use vellum_relief::errors::CompilerError;

/// Parsed `.vue` file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SfcDescriptor {
    pub filename: String,
    /// The whole input document
    pub source: String,
    pub template: Option<SfcBlock>,
    pub script: Option<SfcBlock>,
    pub styles: Vec<SfcBlock>,
    pub custom_blocks: Vec<SfcBlock>,
}

impl SfcDescriptor {
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            source: source.into(),
            template: None,
            script: None,
            styles: Vec::new(),
            custom_blocks: Vec::new(),
        }
    }
}

/// Value of a block attribute. Bare and empty attributes are `True`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str(String),
    True,
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::True => None,
        }
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::True => serializer.serialize_bool(true),
        }
    }
}

impl<'de> Deserialize<'de> for AttrValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Self::True),
            Raw::Flag(false) => Err(de::Error::custom("attribute flag must be `true`")),
            Raw::Str(s) if s.is_empty() => Ok(Self::True),
            Raw::Str(s) => Ok(Self::Str(s)),
        }
    }
}

/// One top-level block of the document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SfcBlock {
    /// Tag name of the block
    #[serde(rename = "type")]
    pub block_type: String,
    /// Inner text, with padding prepended when requested
    pub content: String,
    /// Location of the inner text in the input document
    pub loc: SourceLocation,
    pub attrs: FxHashMap<String, AttrValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub scoped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<AttrValue>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub functional: bool,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_map"
    )]
    pub map: Option<SourceMap>,
}

impl SfcBlock {
    pub fn new(block_type: impl Into<String>, content: impl Into<String>, loc: SourceLocation) -> Self {
        Self {
            block_type: block_type.into(),
            content: content.into(),
            loc,
            attrs: FxHashMap::default(),
            lang: None,
            src: None,
            scoped: false,
            module: None,
            functional: false,
            map: None,
        }
    }
}

fn serialize_map<S: Serializer>(map: &Option<SourceMap>, serializer: S) -> Result<S::Ok, S::Error> {
    use serde::ser::Error;

    match map {
        Some(map) => crate::source_map::to_json_value(map)
            .map_err(S::Error::custom)?
            .serialize(serializer),
        None => serializer.serialize_none(),
    }
}

/// How the content of non-template blocks is padded so that its line numbers
/// match the input document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadMode {
    #[default]
    None,
    /// Prepend newlines (`//` comment lines for plain scripts)
    Line,
    /// Replace everything before the block with spaces
    Space,
}

impl PadMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "false",
            Self::Line => "line",
            Self::Space => "space",
        }
    }
}

/// Markup parser used to split the document into blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCompilerKind {
    #[default]
    Dom,
    Ssr,
}

impl TemplateCompilerKind {
    /// Stable identity used in the parse cache key.
    pub fn id(self) -> &'static str {
        match self {
            Self::Dom => "dom",
            Self::Ssr => "ssr",
        }
    }
}

/// Options of [`parse_sfc`](crate::parse_sfc).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SfcParseOptions {
    #[serde(default = "default_true")]
    pub source_map: bool,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default)]
    pub source_root: String,
    #[serde(default)]
    pub pad: PadMode,
    #[serde(default)]
    pub compiler: TemplateCompilerKind,
}

fn default_true() -> bool {
    true
}

fn default_filename() -> String {
    String::const_new("component.vue")
}

impl Default for SfcParseOptions {
    fn default() -> Self {
        Self {
            source_map: true,
            filename: default_filename(),
            source_root: String::default(),
            pad: PadMode::None,
            compiler: TemplateCompilerKind::Dom,
        }
    }
}

/// Output of [`parse_sfc`](crate::parse_sfc).
#[derive(Debug, Clone, Serialize)]
pub struct SfcParseResult {
    pub descriptor: SfcDescriptor,
    /// Markup errors found while splitting the document
    pub errors: Vec<CompilerError>,
}
