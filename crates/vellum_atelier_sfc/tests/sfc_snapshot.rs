//! End-to-end SFC tests: parse a document, then compile its blocks.

use vellum_atelier_sfc::{
    compile_style, compile_template, original_position_for, parse_sfc, SfcParseOptions,
    SfcTemplateCompileOptions, StyleCompileOptions,
};

const COMPONENT: &str = r#"<template>
  <div class="card">
    <img src="./logo.png" srcset="./logo.png 2x, ./logo@3x.png 3x">
    <span>{{ msg }}</span>
  </div>
</template>

<script>
export default { data: () => ({ msg: 'hi' }) }
</script>

<style scoped>
.a .b { color: red; }
.c::v-deep(.d) { top: 0; }
@media (max-width: 600px) {
  .e:hover { margin: 0; }
}
@keyframes spin { to { transform: rotate(1turn); } }
.f { animation: spin 1s linear; }
</style>
"#;

fn options() -> SfcParseOptions {
    SfcParseOptions {
        filename: "Card.vue".into(),
        ..Default::default()
    }
}

#[test]
fn scoped_style_block() {
    let parsed = parse_sfc(COMPONENT, options());
    assert!(parsed.errors.is_empty());
    let style = &parsed.descriptor.styles[0];
    assert!(style.scoped);

    let result = compile_style(StyleCompileOptions {
        source: style.content.to_string(),
        filename: "Card.vue".to_string(),
        id: "data-v-abc".to_string(),
        scoped: style.scoped,
        ..Default::default()
    })
    .unwrap();
    assert!(result.errors.is_empty());
    insta::assert_snapshot!(result.code.trim(), @r"
    .a .b[data-v-abc] { color: red;
    }
    .c[data-v-abc] .d { top: 0;
    }
    @media (max-width: 600px) {
    .e[data-v-abc]:hover { margin: 0;
    }
    }
    @keyframes spin-data-v-abc {
    to { transform: rotate(1turn);
    }
    }
    .f[data-v-abc] { animation: spin-data-v-abc 1s linear;
    }
    ");
}

#[test]
fn style_map_resolves_into_document() {
    let parsed = parse_sfc(COMPONENT, options());
    let style = &parsed.descriptor.styles[0];
    let result = compile_style(StyleCompileOptions {
        source: style.content.to_string(),
        filename: "Card.vue".to_string(),
        map: style.map.clone(),
        trim: false,
        ..Default::default()
    })
    .unwrap();
    let map = result.map.expect("style map");
    // 0-based: `.c::v-deep(.d)` is output line 2 and document line 13
    let original = original_position_for(&map, 2, 0).unwrap();
    assert_eq!(original.line, 13);
    assert_eq!(original.source, "Card.vue");
}

#[test]
fn template_block_imports_assets() {
    let parsed = parse_sfc(COMPONENT, options());
    let template = parsed.descriptor.template.as_ref().unwrap();
    let result = compile_template(SfcTemplateCompileOptions {
        filename: "Card.vue".into(),
        source: template.content.to_string(),
        in_map: template.map.clone(),
        ..Default::default()
    });
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    let code = result.code.as_str();
    let first = code.find("import _imports_0 from './logo.png'").unwrap();
    let second = code.find("import _imports_1 from './logo@3x.png'").unwrap();
    assert!(first < second);
    assert!(code.contains("_imports_0 + ' 2x, ' + _imports_1 + ' 3x'"));
    assert!(code.contains("src: _imports_0"));
    assert!(code.contains("export function render(_ctx, _cache) {"));
    assert_eq!(code.matches("import _imports_").count(), 2);
    assert!(result.map.is_some());
}
