//! Parse command - Print the block descriptor of a Vue SFC file

use std::path::PathBuf;

use clap::Args;

use super::{parse_file, report, OutputFormat};
use crate::config::VellumConfig;

#[derive(Args)]
pub struct ParseArgs {
    /// The .vue file to parse
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

pub fn run(args: ParseArgs, config: &VellumConfig) {
    let (source, parsed) = parse_file(&args.file, config);
    for error in &parsed.errors {
        report(&args.file, &source, error);
    }

    match args.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&*parsed) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize descriptor: {e}");
                std::process::exit(1);
            }
        },
        OutputFormat::Code => {
            let descriptor = &parsed.descriptor;
            let blocks = descriptor
                .template
                .iter()
                .chain(descriptor.script.iter())
                .chain(descriptor.styles.iter())
                .chain(descriptor.custom_blocks.iter());
            for block in blocks {
                println!(
                    "<{}> {}:{}-{}:{}{}",
                    block.block_type,
                    block.loc.start.line,
                    block.loc.start.column,
                    block.loc.end.line,
                    block.loc.end.column,
                    block
                        .lang
                        .as_ref()
                        .map(|lang| format!(" lang={lang}"))
                        .unwrap_or_default()
                );
            }
        }
    }

    if !parsed.errors.is_empty() {
        std::process::exit(1);
    }
}
