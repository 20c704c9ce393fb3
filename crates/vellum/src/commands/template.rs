//! Template command - Compile the template block of a Vue SFC file

use std::path::PathBuf;

use clap::Args;
use vellum_atelier_sfc::{compile_template, encode_source_map, SfcTemplateCompileOptions};

use super::{component_id, parse_file, report, OutputFormat};
use crate::config::VellumConfig;

#[derive(Args)]
pub struct TemplateArgs {
    /// The .vue file to compile
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "code")]
    pub format: OutputFormat,

    /// Enable SSR mode
    #[arg(long)]
    pub ssr: bool,

    /// Component id used for the scope attribute
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct TemplateOutput {
    filename: String,
    code: String,
    errors: Vec<String>,
    tips: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    map: Option<serde_json::Value>,
}

pub fn run(args: TemplateArgs, config: &VellumConfig) {
    let (source, parsed) = parse_file(&args.file, config);
    for error in &parsed.errors {
        report(&args.file, &source, error);
    }
    let descriptor = &parsed.descriptor;
    let Some(template) = descriptor.template.as_ref() else {
        eprintln!("{} has no <template> block", args.file.display());
        std::process::exit(1);
    };

    let scoped = config.scoped || descriptor.styles.iter().any(|style| style.scoped);
    let id = component_id(&args.file, args.id.as_deref().or(config.id.as_deref()));
    let result = compile_template(SfcTemplateCompileOptions {
        filename: descriptor.filename.clone(),
        source: template.content.to_string(),
        in_map: template.map.clone(),
        ssr: args.ssr || config.ssr,
        id: id.into(),
        scoped,
        transform_asset_urls: config.transform_asset_urls.clone(),
        preprocess_lang: template.lang.clone().filter(|lang| lang.as_str() != "html"),
        ..Default::default()
    });

    for error in &result.errors {
        report(&args.file, &source, error);
    }
    for tip in &result.tips {
        eprintln!("tip: {tip}");
    }

    match args.format {
        OutputFormat::Code => println!("{}", result.code),
        OutputFormat::Json => {
            let map = result
                .map
                .as_ref()
                .and_then(|map| encode_source_map(map).ok())
                .and_then(|json| serde_json::from_str(&json).ok());
            let output = TemplateOutput {
                filename: descriptor.filename.to_string(),
                code: result.code.to_string(),
                errors: result.errors.iter().map(|e| e.message.to_string()).collect(),
                tips: result.tips.clone(),
                map,
            };
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        }
    }

    if !result.errors.is_empty() {
        std::process::exit(1);
    }
}
