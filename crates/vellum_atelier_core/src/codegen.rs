//! Render function code generation.
//!
//! Prints the transformed AST as JavaScript. Function mode produces a script that
//! returns the render function (with a `with (_ctx)` block unless identifiers are
//! prefixed); module mode produces an ES module exporting `render`.

mod context;
mod node;

use vellum_carton::to_json_string;
use vellum_relief::ast::{ExpressionNode, RuntimeHelper, TemplateAst};
use vellum_relief::errors::{CompilerError, ErrorCode};
use vellum_relief::CodegenMode;

pub use context::{CodegenContext, CodegenResult};

use crate::options::CompilerOptions;
use node::{gen_assets, gen_expression, gen_node};

fn alias_helper(helper: RuntimeHelper) -> String {
    format!("{}: _{}", helper.name(), helper.name())
}

/// Generate code for a transformed AST.
pub fn generate(ast: &TemplateAst, options: &CompilerOptions) -> CodegenResult {
    let mut ctx = CodegenContext::new(options, &ast.source);
    let mut errors = Vec::new();
    let root = ast.root();
    let is_module = options.mode == CodegenMode::Module;
    let prefix = options.effective_prefix_identifiers();
    let use_with_block = !prefix && !is_module;
    let has_helpers = !root.helpers.is_empty();

    if options.scope_id.is_some() && !is_module {
        errors.push(CompilerError::new(ErrorCode::ScopeIdNotSupported, None));
    }

    if is_module {
        gen_module_preamble(&mut ctx, ast);
    } else {
        gen_function_preamble(&mut ctx, ast);
    }
    let preamble = if is_module {
        ctx.code.clone()
    } else {
        String::new()
    };

    let (function_name, args) = if options.ssr {
        ("ssrRender", vec!["_ctx", "_push", "_parent", "_attrs"])
    } else {
        ("render", vec!["_ctx", "_cache"])
    };
    let signature = if options.is_ts {
        args.iter()
            .map(|a| format!("{a}: any"))
            .collect::<Vec<_>>()
            .join(",")
    } else {
        args.join(", ")
    };
    ctx.push(&format!("function {function_name}({signature}) {{"));
    ctx.indent();

    if use_with_block {
        ctx.push("with (_ctx) {");
        ctx.indent();
        if has_helpers {
            let aliases: Vec<String> = root.helpers.iter().map(|h| alias_helper(*h)).collect();
            ctx.push(&format!("const {{ {} }} = _Vue", aliases.join(", ")));
            ctx.push("\n");
            ctx.newline();
        }
    }

    if !root.components.is_empty() {
        gen_assets(&mut ctx, &root.components, "component");
        if !root.directives.is_empty() {
            ctx.newline();
        }
    }
    if !root.directives.is_empty() {
        gen_assets(&mut ctx, &root.directives, "directive");
    }
    if !root.components.is_empty() || !root.directives.is_empty() {
        ctx.push("\n");
        ctx.newline();
    }

    if !options.ssr {
        ctx.push("return ");
    }
    match &root.codegen_node {
        Some(node) => gen_node(&mut ctx, ast, node),
        None => ctx.push("null"),
    }

    if use_with_block {
        ctx.deindent(false);
        ctx.push("}");
    }
    ctx.deindent(false);
    ctx.push("}");

    let (code, map) = ctx.finish();
    tracing::debug!(
        mode = ?options.mode,
        helpers = root.helpers.len(),
        hoists = root.hoists.len(),
        bytes = code.len(),
        "generated render function"
    );
    CodegenResult {
        code,
        preamble,
        map,
        errors,
    }
}

fn gen_function_preamble(ctx: &mut CodegenContext<'_>, ast: &TemplateAst) {
    let root = ast.root();
    let options = ctx.options;
    let vue_binding = if options.ssr {
        format!("require({})", to_json_string(&options.runtime_module_name))
    } else {
        options.runtime_global_name.to_string()
    };
    let (ssr_helpers, helpers): (Vec<RuntimeHelper>, Vec<RuntimeHelper>) =
        root.helpers.iter().copied().partition(|h| h.is_ssr());

    if !helpers.is_empty() {
        if options.effective_prefix_identifiers() {
            let aliases: Vec<String> = helpers.iter().map(|h| alias_helper(*h)).collect();
            ctx.push(&format!("const {{ {} }} = {}\n", aliases.join(", "), vue_binding));
        } else {
            ctx.push(&format!("const _Vue = {vue_binding}\n"));
            if !root.hoists.is_empty() {
                let static_helpers: Vec<String> = [
                    RuntimeHelper::CreateVNode,
                    RuntimeHelper::CreateElementVNode,
                    RuntimeHelper::CreateComment,
                    RuntimeHelper::CreateText,
                    RuntimeHelper::CreateStatic,
                ]
                .into_iter()
                .filter(|h| helpers.contains(h))
                .map(alias_helper)
                .collect();
                ctx.push(&format!("const {{ {} }} = _Vue\n", static_helpers.join(", ")));
            }
        }
    }
    if !ssr_helpers.is_empty() {
        let aliases: Vec<String> = ssr_helpers.iter().map(|h| alias_helper(*h)).collect();
        ctx.push(&format!(
            "const {{ {} }} = require(\"{}/server-renderer\")\n",
            aliases.join(", "),
            options.runtime_module_name
        ));
    }
    gen_hoists(ctx, ast);
    ctx.newline();
    ctx.push("return ");
}

fn gen_module_preamble(ctx: &mut CodegenContext<'_>, ast: &TemplateAst) {
    let root = ast.root();
    let options = ctx.options;
    let (ssr_helpers, helpers): (Vec<RuntimeHelper>, Vec<RuntimeHelper>) =
        root.helpers.iter().copied().partition(|h| h.is_ssr());

    let import_list = |helpers: &[RuntimeHelper]| {
        helpers
            .iter()
            .map(|h| format!("{} as _{}", h.name(), h.name()))
            .collect::<Vec<_>>()
            .join(", ")
    };
    if !helpers.is_empty() {
        ctx.push(&format!(
            "import {{ {} }} from {}\n",
            import_list(&helpers),
            to_json_string(&options.runtime_module_name)
        ));
    }
    if !ssr_helpers.is_empty() {
        ctx.push(&format!(
            "import {{ {} }} from \"{}/server-renderer\"\n",
            import_list(&ssr_helpers),
            options.runtime_module_name
        ));
    }
    if !root.imports.is_empty() {
        for import in &root.imports {
            ctx.push("import ");
            gen_expression(ctx, &ExpressionNode::Simple(import.exp.clone()));
            ctx.push(&format!(" from '{}'", import.path));
            ctx.newline();
        }
        ctx.newline();
    }
    gen_hoists(ctx, ast);
    ctx.newline();
    ctx.push("export ");
}

fn gen_hoists(ctx: &mut CodegenContext<'_>, ast: &TemplateAst) {
    let hoists = &ast.root().hoists;
    if hoists.is_empty() {
        return;
    }
    ctx.pure = true;
    ctx.newline();
    for (i, hoist) in hoists.iter().enumerate() {
        ctx.push(&format!("const _hoisted_{} = ", i + 1));
        gen_node(ctx, ast, hoist);
        ctx.newline();
    }
    ctx.pure = false;
}
