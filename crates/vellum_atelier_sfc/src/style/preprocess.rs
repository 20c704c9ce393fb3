//! Style preprocessor contract.
//!
//! No engines ship with the crate; callers plug them in through a
//! [`PreprocessorResolver`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sourcemap::SourceMap;

use super::{StyleCompileOptions, StyleError};
use crate::source_map::merge_source_maps;

/// Languages with a preprocessing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessLang {
    Less,
    Sass,
    Scss,
    Styl,
    Stylus,
}

impl PreprocessLang {
    pub fn from_lang(lang: &str) -> Option<Self> {
        Some(match lang {
            "less" => Self::Less,
            "sass" => Self::Sass,
            "scss" => Self::Scss,
            "styl" => Self::Styl,
            "stylus" => Self::Stylus,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Less => "less",
            Self::Sass => "sass",
            Self::Scss => "scss",
            Self::Styl => "styl",
            Self::Stylus => "stylus",
        }
    }
}

impl fmt::Display for PreprocessLang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options handed to an engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreprocessOptions {
    pub filename: String,
    /// Caller options; `sass` also gets `indentedSyntax: true`
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Engine output. A failed run reports `errors` and may leave `code` empty.
#[derive(Debug, Clone, Default)]
pub struct PreprocessResult {
    pub code: String,
    /// Maps `code` to the engine input
    pub map: Option<SourceMap>,
    pub errors: Vec<String>,
}

pub trait StylePreprocessor: Send + Sync {
    fn render(&self, source: &str, map: Option<&SourceMap>, options: &PreprocessOptions) -> PreprocessResult;
}

/// Supplies engines by language.
pub trait PreprocessorResolver: Send + Sync {
    fn resolve(&self, lang: PreprocessLang) -> Option<Arc<dyn StylePreprocessor>>;
}

#[derive(Debug, Default)]
pub(crate) struct Preprocessed {
    pub code: String,
    pub map: Option<SourceMap>,
    pub errors: Vec<StyleError>,
}

pub(crate) fn preprocess(options: &StyleCompileOptions, lang: PreprocessLang) -> Preprocessed {
    let engine = options
        .preprocess_custom_require
        .as_ref()
        .and_then(|resolver| resolver.resolve(lang));
    let Some(engine) = engine else {
        return Preprocessed {
            errors: vec![StyleError::PreprocessorUnavailable { lang }],
            ..Default::default()
        };
    };

    let mut engine_options = options.preprocess_options.clone();
    if lang == PreprocessLang::Sass {
        engine_options.insert("indentedSyntax".into(), serde_json::Value::Bool(true));
    }
    let engine_options = PreprocessOptions {
        filename: options.filename.clone(),
        options: engine_options,
    };

    let result = engine.render(&options.source, options.map.as_ref(), &engine_options);
    if !result.errors.is_empty() {
        tracing::debug!(%lang, errors = result.errors.len(), "style preprocessor failed");
        return Preprocessed {
            errors: result
                .errors
                .into_iter()
                .map(|message| StyleError::Preprocess { lang, message })
                .collect(),
            ..Default::default()
        };
    }

    let map = match options.map.clone() {
        Some(inbound) => merge_source_maps(Some(inbound), result.map),
        None => None,
    };
    Preprocessed {
        code: result.code,
        map,
        errors: Vec::new(),
    }
}
