//! Configuration file loading for vellum.
//!
//! Reads `vellum.config.json` from the current working directory. Command
//! line flags take precedence over these defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use vellum_atelier_sfc::{AssetUrlConfig, PadMode};

pub const CONFIG_FILE: &str = "vellum.config.json";

/// Top-level vellum configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct VellumConfig {
    /// JSON Schema reference (for editor autocompletion).
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Generate block source maps.
    pub source_map: bool,

    /// Padding of block content so lines match the `.vue` file.
    pub pad: PadMode,

    /// Compile templates for server rendering.
    pub ssr: bool,

    /// Scope every style block, not only `<style scoped>`.
    pub scoped: bool,

    /// Component id used for scoping. Derived from the file name when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// `false`, `true` or a tag to attributes table.
    pub transform_asset_urls: AssetUrlConfig,
}

impl Default for VellumConfig {
    fn default() -> Self {
        Self {
            schema: None,
            source_map: true,
            pad: PadMode::None,
            ssr: false,
            scoped: false,
            id: None,
            transform_asset_urls: AssetUrlConfig::default(),
        }
    }
}

/// Load `vellum.config.json` from the given directory (or CWD if None).
///
/// A missing file gives the defaults; an unreadable or invalid one is
/// reported and also gives the defaults.
pub fn load_config(dir: Option<&Path>) -> VellumConfig {
    let base = dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let config_path = base.join(CONFIG_FILE);

    if !config_path.exists() {
        return VellumConfig::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %config_path.display(), "invalid config: {e}");
            eprintln!(
                "\x1b[33mWarning:\x1b[0m Failed to parse {}: {}",
                config_path.display(),
                e
            );
            VellumConfig::default()
        }),
        Err(e) => {
            eprintln!(
                "\x1b[33mWarning:\x1b[0m Failed to read {}: {}",
                config_path.display(),
                e
            );
            VellumConfig::default()
        }
    }
}

pub fn parse_config(content: &str) -> Result<VellumConfig, serde_json::Error> {
    serde_json::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config, VellumConfig::default());
        assert!(config.source_map);
        assert_eq!(config.transform_asset_urls, AssetUrlConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"{
              "$schema": "./schema.json",
              "sourceMap": false,
              "pad": "line",
              "ssr": true,
              "scoped": true,
              "id": "data-v-1",
              "transformAssetUrls": false
            }"#,
        )
        .unwrap();
        assert!(!config.source_map);
        assert_eq!(config.pad, PadMode::Line);
        assert!(config.ssr && config.scoped);
        assert_eq!(config.id.as_deref(), Some("data-v-1"));
        assert_eq!(config.transform_asset_urls, AssetUrlConfig::Disabled);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(parse_config(r#"{"sourcemap": true}"#).is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = std::env::temp_dir().join("vellum-config-test-missing");
        assert_eq!(load_config(Some(&dir)), VellumConfig::default());
    }
}
