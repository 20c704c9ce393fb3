//! Carton - The toolbox shared by every vellum crate.
//!
//! A carton is the case an artist carries their brushes in. This crate holds the
//! small pieces every other stage of the compiler reaches for: string helpers,
//! HTML/SVG tag tables, patch flags, content hashing, a bounded LRU cache and the
//! code-frame printer used in diagnostics.
//!
//! # Example
//!
//! ```
//! use vellum_carton::{camelize, SharedLruCache};
//!
//! assert_eq!(camelize("update-value").as_str(), "updateValue");
//!
//! let cache = SharedLruCache::new(2);
//! cache.insert("a", 1);
//! cache.insert("b", 2);
//! cache.insert("c", 3);
//! assert!(cache.get(&"a").is_none());
//! ```

pub mod cache;
pub mod code_frame;
pub mod dom_tag_config;
pub mod flags;
pub mod general;
pub mod hash;

// Re-export compact_str::CompactString for convenience
pub use compact_str::CompactString;
pub use compact_str::CompactString as String;
pub use compact_str::format_compact;

// Re-export bitflags for flag types
pub use bitflags::bitflags;

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};

// Re-export phf for compile-time perfect hash functions
pub use phf::{phf_map, phf_set, Map as PhfMap, Set as PhfSet};

// Re-export shared utilities
pub use code_frame::generate_code_frame;
pub use dom_tag_config::*;
pub use flags::*;
pub use general::*;
pub use cache::SharedLruCache;
