//! SSR compiler snapshot tests.
//!
//! Full render functions for small templates, plus targeted checks of the
//! markup produced for bindings, components and slots.

use vellum_atelier_ssr::{compile_ssr, SsrCompilerOptions, SsrErrorCode};
use vellum_relief::CodegenMode;

fn get_compiled(src: &str, options: &SsrCompilerOptions) -> String {
    let result = compile_ssr(src, options);
    if !result.errors.is_empty() {
        panic!("Compilation errors: {:?}", result.errors);
    }
    result.code
}

fn ssr(src: &str) -> String {
    get_compiled(src, &SsrCompilerOptions::default())
}

fn module() -> SsrCompilerOptions {
    SsrCompilerOptions {
        mode: CodegenMode::Module,
        ..Default::default()
    }
}

// =============================================================================
// Text and elements
// =============================================================================

mod elements {
    use super::*;

    #[test]
    fn interpolation() {
        insta::assert_snapshot!(ssr("<div>{{ msg }}</div>"), @r#"
        const { ssrRenderAttrs: _ssrRenderAttrs, ssrInterpolate: _ssrInterpolate } = require("vue/server-renderer")

        return function ssrRender(_ctx, _push, _parent, _attrs) {
          _push(`<div${_ssrRenderAttrs(_attrs)}>${_ssrInterpolate(_ctx.msg)}</div>`)
        }
        "#);
    }

    #[test]
    fn nested_static_markup_is_one_push() {
        let code = ssr(r#"<div><p id="a">x</p><br><img src="a.png"></div>"#);
        assert!(code.contains(
            r#"_push(`<div${_ssrRenderAttrs(_attrs)}><p id="a">x</p><br><img src="a.png"></div>`)"#
        ));
        assert_eq!(code.matches("_push(").count(), 1);
    }

    #[test]
    fn template_literal_is_escaped() {
        let code = ssr("<div>`${a}`</div>");
        assert!(code.contains(r#">\`\${a}\`</div>"#));
    }

    #[test]
    fn multiple_roots_form_a_fragment() {
        let code = ssr("<div/><p/>");
        assert!(code.contains("_push(`<!--[--><div></div><p></p><!--]-->`)"));
        assert!(!code.contains("_ssrRenderAttrs"));
    }

    #[test]
    fn scope_id_is_printed() {
        let options = SsrCompilerOptions {
            scope_id: Some("data-v-7ba5bd90".into()),
            ..Default::default()
        };
        let code = get_compiled("<div><span/></div>", &options);
        assert!(code.contains("<div${_ssrRenderAttrs(_attrs)} data-v-7ba5bd90><span data-v-7ba5bd90></span></div>"));
    }

    #[test]
    fn comments_are_opt_in() {
        assert!(!ssr("<div><!-- c --></div>").contains("<!-- c -->"));
        let options = SsrCompilerOptions {
            comments: true,
            ..Default::default()
        };
        assert!(get_compiled("<div><!-- c --></div>", &options).contains("<!-- c -->"));
    }
}

// =============================================================================
// Attributes
// =============================================================================

mod attrs {
    use super::*;

    #[test]
    fn class_and_style_merge() {
        let code = ssr(r#"<div><p class="a" :class="b" style="color:red" v-show="s"></p></div>"#);
        assert!(code.contains(r#"<p class="${_ssrRenderClass(["a", _ctx.b])}""#));
        assert!(code.contains(
            r#"style="${_ssrRenderStyle([{"color":"red"}, (_ctx.s) ? null : { display: "none" }])}""#
        ));
        assert_eq!(code.matches("class=").count(), 1);
    }

    #[test]
    fn bound_attributes() {
        let code = ssr(r#"<div><a :href="url" :disabled="off" v-bind="rest"></a></div>"#);
        assert!(code.contains(r#"${_ssrRenderAttr("href", _ctx.url)}"#));
        assert!(code.contains(r#"${(_ssrIncludeBooleanAttr(_ctx.off)) ? " disabled" : ""}"#));
        assert!(code.contains("${_ssrRenderAttrs(_ctx.rest)}"));
    }

    #[test]
    fn listeners_leave_no_markup() {
        let code = ssr(r#"<div><button @click="go">ok</button></div>"#);
        assert!(code.contains("<button>ok</button>"));
        assert!(!code.contains("go"));
    }

    #[test]
    fn inner_html_and_text() {
        let code = ssr(r#"<div><p v-html="raw"></p><span v-text="t"></span></div>"#);
        assert!(code.contains("<p>${_ctx.raw}</p>"));
        assert!(code.contains("<span>${_ssrInterpolate(_ctx.t)}</span>"));
    }

    #[test]
    fn model_on_form_elements() {
        let code = ssr(r#"<div><input v-model="text"><textarea v-model="body"></textarea></div>"#);
        assert!(code.contains(r#"<input${_ssrRenderAttr("value", _ctx.text)}>"#));
        assert!(code.contains("<textarea>${_ssrInterpolate(_ctx.body)}</textarea>"));

        let code = ssr(r#"<div><input type="checkbox" v-model="c" value="x"></div>"#);
        assert!(code.contains(
            r#"${(_ssrIncludeBooleanAttr((Array.isArray(_ctx.c)) ? _ssrLooseContain(_ctx.c, "x") : _ctx.c)) ? " checked" : ""}"#
        ));

        let code = ssr(r#"<div><input type="radio" v-model="r" :value="v"></div>"#);
        assert!(code.contains(
            r#"${(_ssrIncludeBooleanAttr(_ssrLooseEqual(_ctx.r, _ctx.v))) ? " checked" : ""}"#
        ));

        let code = ssr(r#"<div><input :type="t" v-model="m"></div>"#);
        assert!(code.contains("_ssrRenderDynamicModel(_ctx.t, _ctx.m, null)"));
    }

    #[test]
    fn css_vars_on_root() {
        let options = SsrCompilerOptions {
            ssr_css_vars: Some(r#"{ "--color": (_ctx.color) }"#.into()),
            ..module()
        };
        insta::assert_snapshot!(get_compiled("<div/>", &options), @r#"
        import { mergeProps as _mergeProps } from "vue"
        import { ssrRenderAttrs as _ssrRenderAttrs } from "vue/server-renderer"

        export function ssrRender(_ctx, _push, _parent, _attrs) {
          const _cssVars = { style: { "--color": (_ctx.color) } }

          _push(`<div${_ssrRenderAttrs(_mergeProps(_attrs, _cssVars))}></div>`)
        }
        "#);
    }
}

// =============================================================================
// Control flow
// =============================================================================

mod control_flow {
    use super::*;

    #[test]
    fn if_else_chain() {
        insta::assert_snapshot!(
            get_compiled(r#"<div v-if="ok">a</div><span v-else>b</span>"#, &module()),
            @r#"
        import { ssrRenderAttrs as _ssrRenderAttrs } from "vue/server-renderer"

        export function ssrRender(_ctx, _push, _parent, _attrs) {
          if (_ctx.ok) {
            _push(`<div${_ssrRenderAttrs(_attrs)}>a</div>`)
          } else {
            _push(`<span${_ssrRenderAttrs(_attrs)}>b</span>`)
          }
        }
        "#
        );
    }

    #[test]
    fn if_without_else_renders_placeholder() {
        let code = ssr(r#"<div><p v-if="ok">a</p></div>"#);
        assert!(code.contains("} else {\n    _push(`<!---->`)\n  }"));
    }

    #[test]
    fn list_rendering() {
        let code = ssr(r#"<ul><li v-for="(item, i) in items" :key="i">{{ item }}</li></ul>"#);
        assert!(code.contains("_push(`<ul${_ssrRenderAttrs(_attrs)}><!--[-->`)"));
        assert!(code.contains("_ssrRenderList(_ctx.items, (item, i) => {\n    _push(`<li>${_ssrInterpolate(item)}</li>`)\n  })"));
        assert!(code.contains("_push(`<!--]--></ul>`)"));
    }

    #[test]
    fn template_list_with_several_children() {
        let code = ssr(r#"<div><template v-for="x in xs"><b>{{ x }}</b><i/></template></div>"#);
        assert!(code.contains("_push(`<!--[--><b>${_ssrInterpolate(x)}</b><i></i><!--]-->`)"));
    }
}

// =============================================================================
// Components and slots
// =============================================================================

mod components {
    use super::*;

    #[test]
    fn component_with_default_slot() {
        let code = get_compiled(r#"<Foo :msg="m" @click="x"><span>hi</span></Foo>"#, &module());
        assert!(code.starts_with("import { resolveComponent as _resolveComponent, mergeProps as _mergeProps, withCtx as _withCtx } from \"vue\"\n"));
        assert!(code.contains("  const _component_Foo = _resolveComponent(\"Foo\")\n\n"));
        assert!(code.contains(
            "_push(_ssrRenderComponent(_component_Foo, _mergeProps({ msg: _ctx.m }, _attrs), {\n    default: _withCtx((_, _push, _parent, _scopeId) => {\n      _push(`<span>hi</span>`)\n    }),\n    _: 1\n  }, _parent))"
        ));
    }

    #[test]
    fn component_without_slots() {
        let code = ssr(r#"<div><my-comp v-model="v" title="t"/></div>"#);
        assert!(code.contains(
            r#"_push(_ssrRenderComponent(_component_my_comp, { modelValue: _ctx.v, "onUpdate:modelValue": $event => ((_ctx.v) = $event), title: "t" }, null, _parent))"#
        ));
    }

    #[test]
    fn named_and_scoped_slots() {
        let code = ssr(
            r#"<div><List><template #item="{ row }">{{ row.id }}</template><template #footer>f</template></List></div>"#,
        );
        assert!(code.contains("item: _withCtx(({ row }, _push, _parent, _scopeId) => {"));
        assert!(code.contains("_push(`${_ssrInterpolate(row.id)}`)"));
        assert!(code.contains("footer: _withCtx((_, _push, _parent, _scopeId) => {"));
        assert!(!code.contains("default:"));
    }

    #[test]
    fn conditional_slots_use_create_slots() {
        let code = ssr(r#"<div><Comp><template v-if="a" #x>1</template><template v-else #y>2</template></Comp></div>"#);
        assert!(code.contains("_createSlots({"));
        assert!(code.contains("_: 2"));
        assert!(code.contains("(_ctx.a) ? {\n      name: \"x\","));
        assert!(code.contains("} : {\n      name: \"y\","));
        assert!(code.contains("key: \"1\""));
    }

    #[test]
    fn slot_content_carries_scope_id() {
        let options = SsrCompilerOptions {
            scope_id: Some("data-v-1".into()),
            ..Default::default()
        };
        let code = get_compiled("<div><Comp><i/></Comp></div>", &options);
        assert!(code.contains("_push(`<i data-v-1${_scopeId}></i>`)"));
    }

    #[test]
    fn dynamic_component() {
        let code = ssr(r#"<div><component :is="view" a="1"/></div>"#);
        assert!(code.contains(r#"_ssrRenderComponent(_resolveDynamicComponent(_ctx.view), { a: "1" }, null, _parent)"#));
    }

    #[test]
    fn slot_outlet_with_fallback() {
        let options = SsrCompilerOptions {
            scope_id: Some("data-v-1".into()),
            ..Default::default()
        };
        let code = get_compiled(r#"<div><slot name="head" :item="it">fallback</slot></div>"#, &options);
        assert!(code.contains(
            "_ssrRenderSlot(_ctx.$slots, \"head\", { item: _ctx.it }, () => {\n    _push(`fallback`)\n  }, _push, _parent, \"data-v-1-s\")"
        ));
    }

    #[test]
    fn empty_slot_outlet() {
        let code = ssr("<div><slot/></div>");
        assert!(code.contains("_ssrRenderSlot(_ctx.$slots, \"default\", {}, null, _push, _parent)"));
    }
}

// =============================================================================
// Built-in components
// =============================================================================

mod builtins {
    use super::*;

    #[test]
    fn teleport() {
        let code = ssr(r##"<Teleport to="#modal"><p>x</p></Teleport>"##);
        assert!(code.contains(
            "_ssrRenderTeleport(_push, (_push) => {\n    _push(`<p>x</p>`)\n  }, \"#modal\", false, _parent)"
        ));
    }

    #[test]
    fn teleport_without_target() {
        let result = compile_ssr("<Teleport><p/></Teleport>", &SsrCompilerOptions::default());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, SsrErrorCode::NoTeleportTarget.code());
        assert!(!result.code.contains("_ssrRenderTeleport"));
    }

    #[test]
    fn transition_renders_in_place() {
        let code = ssr("<Transition><div>a</div></Transition>");
        assert!(code.contains("_push(`<div${_ssrRenderAttrs(_attrs)}>a</div>`)"));
        assert!(!code.contains("Transition"));
    }

    #[test]
    fn transition_group() {
        let code = ssr(r#"<TransitionGroup tag="ul"><li v-for="i in list" :key="i">{{ i }}</li></TransitionGroup>"#);
        assert!(code.contains("_push(`<ul>`)"));
        assert!(!code.contains("<!--[-->"));
        assert!(code.contains("_push(`</ul>`)"));

        let code = ssr(r#"<TransitionGroup><li v-for="i in list" :key="i">{{ i }}</li></TransitionGroup>"#);
        assert!(code.contains("_push(`<!--[-->`)"));
    }
}
