//! Compiler options.

use serde::{Deserialize, Serialize};
use vellum_carton::String;

use crate::ast::{ElementNode, Namespace, RuntimeHelper};

/// Text mode for different contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    /// Normal text parsing (default)
    #[default]
    Data,
    /// RCDATA (e.g., textarea, title): entities decoded, no tags
    RcData,
    /// Raw text (e.g., script, style): nothing decoded, no tags
    RawText,
    /// CDATA section
    CData,
    /// Attribute value
    AttributeValue,
}

/// Parser options
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Whether to condense whitespace
    pub whitespace: WhitespaceStrategy,
    /// Custom delimiters for interpolation (default: ["{{", "}}"])
    pub delimiters: (String, String),
    /// Whether whitespace inside this tag is preserved
    pub is_pre_tag: fn(&str) -> bool,
    /// Whether is a native tag
    pub is_native_tag: Option<fn(&str) -> bool>,
    /// Whether is a custom element
    pub is_custom_element: fn(&str) -> bool,
    /// Whether is a void tag
    pub is_void_tag: fn(&str) -> bool,
    /// Platform built-in components (e.g. Transition)
    pub is_builtin_component: fn(&str) -> Option<RuntimeHelper>,
    /// Namespace of `tag` given its parent element
    pub get_namespace: fn(&str, Option<&ElementNode>) -> Namespace,
    /// Text mode for the children of `tag` (tag, its namespace, its parent)
    pub get_text_mode: fn(&str, Namespace, Option<&ElementNode>) -> TextMode,
    /// Keep comments in the AST
    pub comments: bool,
    /// Decode HTML entities in text and attribute values
    pub decode_entities: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            whitespace: WhitespaceStrategy::Condense,
            delimiters: (String::from("{{"), String::from("}}")),
            is_pre_tag: |_| false,
            is_native_tag: None,
            is_custom_element: |_| false,
            is_void_tag: vellum_carton::is_void_tag,
            is_builtin_component: |_| None,
            get_namespace: |_, parent| parent.map(|p| p.ns).unwrap_or_default(),
            get_text_mode: |_, _, _| TextMode::Data,
            comments: true,
            decode_entities: true,
        }
    }
}

/// Whitespace handling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceStrategy {
    /// Condense whitespace (default)
    #[default]
    Condense,
    /// Preserve all whitespace
    Preserve,
}

/// Codegen output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodegenMode {
    /// Generate a function (default)
    #[default]
    Function,
    /// Generate an ES module
    Module,
}
