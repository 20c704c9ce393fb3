//! DOM compiler snapshot tests.
//!
//! These tests compare the full generated render function for small templates.

use vellum_atelier_dom::{compile, DomCompilerOptions};
use vellum_relief::CodegenMode;

/// Helper to get the compiled code
fn get_compiled(src: &str, options: &DomCompilerOptions) -> String {
    let result = compile(src, options);
    if !result.errors.is_empty() {
        panic!("Compilation errors: {:?}", result.errors);
    }
    result.code
}

fn module() -> DomCompilerOptions {
    DomCompilerOptions {
        mode: CodegenMode::Module,
        ..Default::default()
    }
}

// =============================================================================
// Function mode
// =============================================================================

mod function_mode {
    use super::*;

    #[test]
    fn static_text() {
        insta::assert_snapshot!(get_compiled("<div>hello</div>", &DomCompilerOptions::default()), @r#"
        const _Vue = Vue

        return function render(_ctx, _cache) {
          with (_ctx) {
            const { openBlock: _openBlock, createElementBlock: _createElementBlock } = _Vue

            return (_openBlock(), _createElementBlock("div", null, "hello"))
          }
        }
        "#);
    }

    #[test]
    fn prefixed_identifiers_skip_with_block() {
        let options = DomCompilerOptions {
            prefix_identifiers: true,
            ..Default::default()
        };
        let code = get_compiled("<p>{{ msg }}</p>", &options);
        assert!(code.starts_with("const { toDisplayString: _toDisplayString"));
        assert!(!code.contains("with (_ctx)"));
        assert!(code.contains("_toDisplayString(_ctx.msg)"));
    }
}

// =============================================================================
// Module mode
// =============================================================================

mod module_mode {
    use super::*;

    #[test]
    fn class_event_and_text() {
        insta::assert_snapshot!(
            get_compiled(r#"<div :class="cls" @click="onClick">{{ msg }}</div>"#, &module()),
            @r#"
        import { toDisplayString as _toDisplayString, normalizeClass as _normalizeClass, openBlock as _openBlock, createElementBlock as _createElementBlock } from "vue"

        export function render(_ctx, _cache) {
          return (_openBlock(), _createElementBlock("div", {
            class: _normalizeClass(_ctx.cls),
            onClick: _ctx.onClick
          }, _toDisplayString(_ctx.msg), 11 /* TEXT, CLASS, PROPS */, ["onClick"]))
        }
        "#
        );
    }

    #[test]
    fn directives_import_helpers() {
        let code = get_compiled(
            r#"<input v-model="text" v-show="visible" @keyup.enter="save">"#,
            &module(),
        );
        assert!(code.contains("vModelText as _vModelText"));
        assert!(code.contains("vShow as _vShow"));
        assert!(code.contains("withKeys as _withKeys"));
        assert!(code.contains("withDirectives as _withDirectives"));
        assert!(code.contains(r#"onKeyup: _withKeys(_ctx.save, ["enter"])"#));
    }

    #[test]
    fn hoisted_static_style() {
        let options = DomCompilerOptions {
            hoist_static: true,
            ..module()
        };
        let code = get_compiled(r#"<div><span style="color: red">x</span>{{ a }}</div>"#, &options);
        assert!(code.contains("const _hoisted_1 = /*#__PURE__*/_createElementVNode(\"span\""));
        assert!(code.contains(r#"{"color":"red"}"#));
    }
}

// =============================================================================
// Parsing rules
// =============================================================================

mod parsing {
    use super::*;

    #[test]
    fn svg_is_block() {
        let code = get_compiled("<div><svg><circle/></svg></div>", &module());
        assert!(code.contains(r#"(_openBlock(), _createElementBlock("svg", null, ["#));
    }

    #[test]
    fn pre_keeps_whitespace() {
        let code = get_compiled("<pre>\n  a  b\n</pre>", &module());
        assert!(code.contains(r#""  a  b\n""#));
    }

    #[test]
    fn raw_text_in_script() {
        let result = compile("<div><script>if (a < b) {}</script></div>", &module());
        assert!(result.code.contains(r#""if (a < b) {}""#));
    }
}
