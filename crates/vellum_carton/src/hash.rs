//! Fast hashing utilities using xxHash3.
//!
//! Used for cache keys and for generated CSS-module class names.

use xxhash_rust::xxh3::xxh3_64;

/// Compute a 64-bit hash of the given string using xxHash3.
#[inline]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

/// Convert a hash to a hex string (16 characters).
#[inline]
pub fn hash_to_hex(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Compute hash of a string and return as hex.
#[inline]
pub fn content_hash(content: &str) -> String {
    hash_to_hex(hash_str(content))
}

/// Short identifier-safe digest (`[a-zA-Z0-9_-]`) of `len` characters.
pub fn short_hash(content: &str, len: usize) -> String {
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut value = hash_str(content);
    let mut out = String::with_capacity(len);
    for _ in 0..len.min(10) {
        out.push(ALPHABET[(value & 63) as usize] as char);
        value >>= 6;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        let content = "Hello, World!";
        assert_eq!(hash_str(content), hash_str(content));
        assert_ne!(hash_str("Hello"), hash_str("World"));
    }

    #[test]
    fn test_content_hash() {
        let hash = content_hash("template content");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_short_hash() {
        let hash = short_hash("button.css", 5);
        assert_eq!(hash.len(), 5);
        assert_eq!(hash, short_hash("button.css", 5));
    }
}
