//! Style command - Compile the style blocks of a Vue SFC file

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use vellum_atelier_sfc::{
    compile_style, compile_style_async, StyleCompileOptions, StyleCompileResult,
};

use super::{component_id, parse_file, report, OutputFormat};
use crate::config::VellumConfig;

#[derive(Args)]
pub struct StyleArgs {
    /// The .vue file to compile
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "code")]
    pub format: OutputFormat,

    /// Scope every style block
    #[arg(long)]
    pub scoped: bool,

    /// Component id used for scoping
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct StyleOutput {
    index: usize,
    code: String,
    errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modules: Option<BTreeMap<String, String>>,
}

pub fn run(args: StyleArgs, config: &VellumConfig) {
    let (source, parsed) = parse_file(&args.file, config);
    for error in &parsed.errors {
        report(&args.file, &source, error);
    }
    let descriptor = &parsed.descriptor;
    let id = format!(
        "data-v-{}",
        component_id(&args.file, args.id.as_deref().or(config.id.as_deref()))
    );

    let mut outputs = Vec::with_capacity(descriptor.styles.len());
    let mut failed = false;
    for (index, style) in descriptor.styles.iter().enumerate() {
        let options = StyleCompileOptions {
            source: style.content.to_string(),
            filename: descriptor.filename.to_string(),
            id: id.clone(),
            map: style.map.clone(),
            scoped: args.scoped || config.scoped || style.scoped,
            modules: style.module.is_some(),
            preprocess_lang: style.lang.as_ref().map(|lang| lang.to_string()),
            ..Default::default()
        };
        tracing::debug!(index, scoped = options.scoped, modules = options.modules, "compiling style block");

        let compiled = if options.modules {
            futures::executor::block_on(compile_style_async(options))
        } else {
            compile_style(options)
        };
        let result: StyleCompileResult = match compiled {
            Ok(result) => result,
            Err(e) => {
                eprintln!("{}: style #{index}: {e}", args.file.display());
                std::process::exit(1);
            }
        };

        for error in &result.errors {
            eprintln!("{}: style #{index}: {error}", args.file.display());
        }
        failed |= !result.errors.is_empty();
        outputs.push(StyleOutput {
            index,
            code: result.code,
            errors: result.errors.iter().map(ToString::to_string).collect(),
            modules: result.modules.map(|modules| modules.into_iter().collect()),
        });
    }

    match args.format {
        OutputFormat::Code => {
            for output in &outputs {
                println!("{}", output.code);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outputs).unwrap_or_default());
        }
    }

    if failed {
        std::process::exit(1);
    }
}
