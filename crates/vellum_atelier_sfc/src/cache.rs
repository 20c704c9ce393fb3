//! Process-wide memo of parse results.

use std::sync::Arc;

use once_cell::sync::Lazy;
use vellum_carton::hash::hash_str;
use vellum_carton::SharedLruCache;

use crate::types::{SfcParseOptions, SfcParseResult};

/// Entries kept before the least recently used one is dropped.
pub const SFC_CACHE_MAX_SIZE: usize = 500;

/// Full parse input. The xxh3 digest makes lookups cheap; the key text keeps
/// colliding digests apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseCacheKey {
    digest: u64,
    key: Arc<str>,
}

impl ParseCacheKey {
    pub fn new(source: &str, options: &SfcParseOptions) -> Self {
        let key = format!(
            "{source}{}{}{}{}{}",
            options.source_map,
            options.filename,
            options.source_root,
            options.pad.as_str(),
            options.compiler.id()
        );
        Self {
            digest: hash_str(&key),
            key: Arc::from(key),
        }
    }
}

pub type SfcParseCache = SharedLruCache<ParseCacheKey, Arc<SfcParseResult>>;

pub(crate) static PARSE_CACHE: Lazy<SfcParseCache> =
    Lazy::new(|| SharedLruCache::new(SFC_CACHE_MAX_SIZE));

/// Drop every memoized parse result.
pub fn clear_parse_cache() {
    PARSE_CACHE.clear();
}
