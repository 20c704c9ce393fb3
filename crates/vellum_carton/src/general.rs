//! General string helpers shared across the compiler.

use crate::String;

/// Convert a kebab-case name to camelCase (`update-value` -> `updateValue`).
pub fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    if upper_next {
        out.push('-');
    }
    out
}

/// Uppercase the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(s.len());
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => String::default(),
    }
}

/// Convert camelCase to kebab-case (`fooBar` -> `foo-bar`).
pub fn hyphenate(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.char_indices() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `click` -> `onClick`, `update:modelValue` -> `onUpdate:modelValue`.
pub fn to_handler_key(event: &str) -> String {
    let cap = capitalize(&camelize(event));
    let mut out = String::with_capacity(cap.len() + 2);
    out.push_str("on");
    out.push_str(&cap);
    out
}

/// Whether `name` is a plain JS identifier.
pub fn is_simple_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' || !c.is_ascii() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || !c.is_ascii())
}

/// Whether `exp` is a member expression path such as `foo.bar[baz]`.
pub fn is_member_expression(exp: &str) -> bool {
    let exp = exp.trim();
    if exp.is_empty() {
        return false;
    }
    let mut depth = 0i32;
    let mut expect_ident = true;
    let mut in_string: Option<char> = None;
    for c in exp.chars() {
        if let Some(q) = in_string {
            if c == q {
                in_string = None;
            }
            continue;
        }
        if depth > 0 {
            match c {
                '[' => depth += 1,
                ']' => depth -= 1,
                '\'' | '"' | '`' => in_string = Some(c),
                _ => {}
            }
            continue;
        }
        match c {
            '[' => {
                if expect_ident {
                    return false;
                }
                depth += 1;
            }
            '.' => {
                if expect_ident {
                    return false;
                }
                expect_ident = true;
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '$' || !c.is_ascii() => {
                if expect_ident && c.is_ascii_digit() {
                    return false;
                }
                expect_ident = false;
            }
            c if c.is_whitespace() => {}
            _ => return false,
        }
    }
    depth == 0 && !expect_ident
}

/// Serialize a string as a JSON string literal.
pub fn to_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&std::format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("select-koma").as_str(), "selectKoma");
        assert_eq!(camelize("click").as_str(), "click");
    }

    #[test]
    fn test_handler_key() {
        assert_eq!(to_handler_key("click").as_str(), "onClick");
        assert_eq!(to_handler_key("update:modelValue").as_str(), "onUpdate:modelValue");
        assert_eq!(to_handler_key("my-event").as_str(), "onMyEvent");
    }

    #[test]
    fn test_hyphenate() {
        assert_eq!(hyphenate("fontSize").as_str(), "font-size");
    }

    #[test]
    fn test_member_expression() {
        assert!(is_member_expression("foo"));
        assert!(is_member_expression("foo.bar"));
        assert!(is_member_expression("foo[bar].baz"));
        assert!(!is_member_expression("foo()"));
        assert!(!is_member_expression("a + b"));
        assert!(!is_member_expression(".foo"));
    }

    #[test]
    fn test_json_string() {
        assert_eq!(to_json_string("a\"b").as_str(), "\"a\\\"b\"");
    }
}
