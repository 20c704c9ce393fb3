//! Subcommand implementations.

pub mod parse;
pub mod style;
pub mod template;

use std::path::Path;
use std::sync::Arc;

use clap::ValueEnum;
use vellum_atelier_sfc::{generate_code_frame, parse_sfc, SfcParseOptions, SfcParseResult};
use vellum_carton::hash::content_hash;
use vellum_relief::errors::CompilerError;

use crate::config::VellumConfig;

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Output generated code
    #[default]
    Code,
    /// Output JSON with code and metadata
    Json,
}

/// Read and parse a `.vue` file, exiting on I/O failure.
pub(crate) fn parse_file(path: &Path, config: &VellumConfig) -> (String, Arc<SfcParseResult>) {
    let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path.display(), e);
        std::process::exit(1);
    });
    let options = SfcParseOptions {
        filename: path.display().to_string().into(),
        source_map: config.source_map,
        pad: config.pad,
        ..Default::default()
    };
    let parsed = parse_sfc(&source, options);
    (source, parsed)
}

/// Component id without the `data-v-` prefix.
pub(crate) fn component_id(path: &Path, explicit: Option<&str>) -> String {
    match explicit {
        Some(id) => id.strip_prefix("data-v-").unwrap_or(id).to_string(),
        None => content_hash(&path.display().to_string())[..8].to_string(),
    }
}

/// Print a diagnostic with a code frame when it has a location.
pub(crate) fn report(path: &Path, source: &str, error: &CompilerError) {
    match &error.loc {
        Some(loc) => {
            eprintln!(
                "{}:{}:{}: {}",
                path.display(),
                loc.start.line,
                loc.start.column,
                error.message
            );
            eprintln!(
                "{}",
                generate_code_frame(source, loc.start.offset as usize, loc.end.offset as usize)
            );
        }
        None => eprintln!("{}: {}", path.display(), error.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_id() {
        let path = Path::new("src/App.vue");
        assert_eq!(component_id(path, Some("data-v-1234")), "1234");
        assert_eq!(component_id(path, Some("abcd")), "abcd");
        let derived = component_id(path, None);
        assert_eq!(derived.len(), 8);
        assert_eq!(derived, component_id(path, None));
    }
}
