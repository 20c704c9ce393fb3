//! Block maps and map stitching.
//!
//! Blocks get a line-level map back into the `.vue` document. Compiler output
//! maps point into the block content, so the two are composed with
//! [`merge_source_maps`] and diagnostics are shifted with [`patch_errors`].
//!
//! Lines and columns are 0-based, as in the `sourcemap` crate.

use sourcemap::{SourceMap, SourceMapBuilder};
use thiserror::Error;
use vellum_relief::errors::CompilerError;

/// Failure to read or write a map.
#[derive(Debug, Error)]
pub enum SourceMapError {
    #[error("invalid source map: {0}")]
    Decode(#[from] sourcemap::Error),
    #[error("source map is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Position in an original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub name: Option<String>,
}

/// Map every non-blank line of `generated` to column 0 of the same line in
/// `filename`, shifted down by `line_offset`. Lines holding only `//` are
/// treated as blank so line padding stays unmapped.
pub fn generate_source_map(
    filename: &str,
    source: &str,
    generated: &str,
    source_root: &str,
    line_offset: u32,
) -> SourceMap {
    let file = filename.replace('\\', "/");
    let mut builder = SourceMapBuilder::new(Some(file.as_str()));
    let root = source_root.replace('\\', "/");
    builder.set_source_root(Some(root.as_str()));
    let source_id = builder.add_source(filename);
    builder.set_source_contents(source_id, Some(source));

    for (index, line) in generated.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if is_blank_line(line) {
            continue;
        }
        let index = index as u32;
        builder.add_raw(index, 0, index + line_offset, 0, Some(source_id), None, false);
    }
    builder.into_sourcemap()
}

fn is_blank_line(line: &str) -> bool {
    line.strip_prefix("//").unwrap_or(line).trim().is_empty()
}

/// Compose `new` (generated from the content `old` describes) with `old`.
///
/// The result keeps `old`'s file, root, sources and contents. Original lines
/// come from `old`; columns are kept from `new` because block maps only
/// carry lines. Mappings of `new` that `old` cannot resolve are dropped.
pub fn merge_source_maps(old: Option<SourceMap>, new: Option<SourceMap>) -> Option<SourceMap> {
    let (old, new) = match (old, new) {
        (Some(old), Some(new)) => (old, new),
        (old, None) => return old,
        (None, new) => return new,
    };

    let mut builder = SourceMapBuilder::new(old.get_file());
    builder.set_source_root(old.get_source_root());
    for (index, source) in old.sources().enumerate() {
        let id = builder.add_source(source);
        builder.set_source_contents(id, old.get_source_contents(index as u32));
    }

    for token in new.tokens() {
        if token.get_source().is_none() {
            continue;
        }
        let Some(original) = original_position_for(&old, token.get_src_line(), token.get_src_col())
        else {
            continue;
        };
        let source_id = builder.add_source(&original.source);
        let name_id = original.name.as_deref().map(|name| builder.add_name(name));
        builder.add_raw(
            token.get_dst_line(),
            token.get_dst_col(),
            original.line,
            token.get_src_col(),
            Some(source_id),
            name_id,
            false,
        );
    }
    Some(builder.into_sourcemap())
}

/// Closest mapping at or before `column` on generated `line`.
pub fn original_position_for(map: &SourceMap, line: u32, column: u32) -> Option<OriginalPosition> {
    let token = map.lookup_token(line, column)?;
    if token.get_dst_line() != line {
        return None;
    }
    let source = token.get_source()?;
    Some(OriginalPosition {
        source: source.to_string(),
        line: token.get_src_line(),
        column: token.get_src_col(),
        name: token.get_name().map(str::to_string),
    })
}

/// Shift error locations from block coordinates into document coordinates.
///
/// `source` is the block content compiled; its position is found in the first
/// source content of `in_map`.
pub fn patch_errors(errors: &mut [CompilerError], source: &str, in_map: &SourceMap) {
    let Some(original) = in_map.get_source_contents(0) else {
        return;
    };
    let Some(offset) = original.find(source) else {
        return;
    };
    let line_offset = original[..offset].matches('\n').count() as u32;
    let offset = offset as u32;

    for error in errors.iter_mut() {
        let Some(loc) = error.loc.as_mut() else {
            continue;
        };
        for point in [&mut loc.start, &mut loc.end] {
            point.line += line_offset;
            point.offset += offset;
        }
    }
}

/// Serialize to source map v3 JSON.
pub fn encode_source_map(map: &SourceMap) -> Result<String, SourceMapError> {
    let mut buf = Vec::new();
    map.to_writer(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn decode_source_map(json: &str) -> Result<SourceMap, SourceMapError> {
    Ok(SourceMap::from_slice(json.as_bytes())?)
}

pub(crate) fn to_json_value(map: &SourceMap) -> Result<serde_json::Value, SourceMapError> {
    let mut buf = Vec::new();
    map.to_writer(&mut buf)?;
    Ok(serde_json::from_slice(&buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_relief::ast::{Position, SourceLocation};

    const DOCUMENT: &str = "<template>\n  <div>\n    {{ msg }}\n  </div>\n</template>\n";

    #[test]
    fn test_generate_skips_blank_and_comment_lines() {
        let map = generate_source_map("src\\App.vue", DOCUMENT, "a\n\n//\nb\r\n  ", "root\\dir", 4);
        assert_eq!(map.get_file(), Some("src/App.vue"));
        assert_eq!(map.get_source_root(), Some("root/dir"));
        assert_eq!(map.get_source_contents(0), Some(DOCUMENT));

        let mapped: Vec<(u32, u32)> = map
            .tokens()
            .map(|t| (t.get_dst_line(), t.get_src_line()))
            .collect();
        assert_eq!(mapped, vec![(0, 4), (3, 7)]);
    }

    #[test]
    fn test_lookup_stays_on_the_generated_line() {
        let map = generate_source_map("a.vue", DOCUMENT, "x\n\ny", "", 0);
        let hit = original_position_for(&map, 0, 12).unwrap();
        assert_eq!((hit.source.as_str(), hit.line, hit.column), ("a.vue", 0, 0));
        assert!(original_position_for(&map, 1, 0).is_none());
    }

    #[test]
    fn test_merge_keeps_new_columns_and_old_lines() {
        let block = generate_source_map("App.vue", DOCUMENT, "\n  <div>\n    {{ msg }}\n  </div>\n", "", 0);

        let mut compiled = SourceMapBuilder::new(Some("render.js"));
        let id = compiled.add_source("App.vue");
        compiled.add_raw(3, 10, 2, 7, Some(id), None, false);
        compiled.add_raw(4, 0, 9, 0, Some(id), None, false);
        let compiled = compiled.into_sourcemap();

        let merged = merge_source_maps(Some(block), Some(compiled)).unwrap();
        assert_eq!(merged.get_file(), Some("App.vue"));
        assert_eq!(merged.get_source_contents(0), Some(DOCUMENT));
        let tokens: Vec<_> = merged
            .tokens()
            .map(|t| (t.get_dst_line(), t.get_dst_col(), t.get_src_line(), t.get_src_col()))
            .collect();
        assert_eq!(tokens, vec![(3, 10, 2, 7)]);

        let position = original_position_for(&merged, 3, 12).unwrap();
        assert_eq!(position.line, 2);
    }

    #[test]
    fn test_merge_with_missing_side_returns_other() {
        let map = generate_source_map("a.vue", "x", "x", "", 0);
        assert!(merge_source_maps(None, Some(map.clone())).is_some());
        assert!(merge_source_maps(Some(map), None).is_some());
        assert!(merge_source_maps(None, None).is_none());
    }

    #[test]
    fn test_patch_errors_shifts_into_document() {
        let content = "\n  <div>\n    {{ msg }}\n  </div>\n";
        let map = generate_source_map("a.vue", DOCUMENT, content, "", 0);
        let start = Position::new(8, 2, 5);
        let end = Position::new(17, 2, 14);
        let mut errors = vec![
            CompilerError::custom("spanning", Some(SourceLocation::new(start, end, "{{ msg }}"))),
            CompilerError::custom("point", Some(SourceLocation::new(start, start, ""))),
            CompilerError::custom("nowhere", None),
        ];
        patch_errors(&mut errors, content, &map);

        let spanning = errors[0].loc.as_ref().unwrap();
        assert_eq!((spanning.start.line, spanning.start.offset), (2, 18));
        assert_eq!((spanning.end.line, spanning.end.offset), (2, 27));
        let point = errors[1].loc.as_ref().unwrap();
        assert_eq!(point.start, point.end);
        assert_eq!((point.start.line, point.start.offset), (2, 18));
    }

    #[test]
    fn test_patch_errors_keeps_zero_width_spans() {
        let document = "<template>\n\n<div>{{ a }}</div>\n</template>\n";
        let content = "\n\n<div>{{ a }}</div>\n";
        let map = generate_source_map("a.vue", document, content, "", 0);
        let at = Position::new(5, 2, 3);
        let mut errors = vec![CompilerError::custom(
            "point",
            Some(SourceLocation::new(at, at, "")),
        )];
        patch_errors(&mut errors, content, &map);

        let loc = errors[0].loc.as_ref().unwrap();
        assert_eq!(loc.start, loc.end);
        assert_eq!((loc.start.line, loc.start.offset), (2, 15));
    }

    #[test]
    fn test_json_round_trip() {
        let map = generate_source_map("a.vue", DOCUMENT, "a\nb", "", 1);
        let json = encode_source_map(&map).unwrap();
        assert!(json.contains(r#""sourcesContent""#));
        let decoded = decode_source_map(&json).unwrap();
        assert_eq!(decoded.get_token_count(), 2);
        assert!(decode_source_map("{not json").is_err());
    }
}
