//! Character reference decoding for text and attribute values.

use std::borrow::Cow;

/// Decode HTML character references. Attribute values follow the legacy
/// attribute rules (a bare `&amp` followed by `=` or an alphanumeric stays
/// literal).
pub(crate) fn decode_entities(raw: &str, in_attribute: bool) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    if in_attribute {
        htmlize::unescape_attribute(raw)
    } else {
        htmlize::unescape(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_and_numeric() {
        assert_eq!(decode_entities("a &lt; b &#38; &#x41;", false), "a < b & A");
    }

    #[test]
    fn test_plain_text_is_borrowed() {
        assert!(matches!(decode_entities("plain", false), Cow::Borrowed(_)));
    }
}
