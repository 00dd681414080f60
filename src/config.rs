//! Configuration for schema-compat
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-compat.toml)
//! - Environment variables (SCHEMA_COMPAT__*)
//!
//! ## Example config file (schema-compat.toml):
//! ```toml
//! [loader]
//! extensions = ["json"]
//! schemas_subdir = "schemas"
//!
//! [engine]
//! max_depth = 64
//!
//! [report]
//! format = "comment"
//! comment_limit = 5
//!
//! [policy]
//! forbidden_fields = ["email", "otp"]
//! required_draft = "draft/2020-12"
//! require_closed_objects = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatConfig {
    /// Corpus loading settings
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Comparison settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Output settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Content policy settings
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Corpus loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// File extensions treated as schema documents
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Skip documents whose relative path starts with one of these prefixes
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,

    /// Subdirectory joined to every source before loading
    #[serde(default)]
    pub schemas_subdir: Option<PathBuf>,
}

/// Compatibility engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum nesting depth followed when comparing sub-schemas
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default rendering for the `check` command
    #[serde(default)]
    pub format: OutputFormat,

    /// Number of non-breaking changes listed in a review comment
    #[serde(default = "default_comment_limit")]
    pub comment_limit: usize,
}

/// Rendering selected for a comparison result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Machine-readable JSON summary
    Summary,
    /// Long-form markdown report
    #[default]
    Report,
    /// Condensed review comment
    Comment,
}

/// Content policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Property names that must not appear in any schema
    #[serde(default)]
    pub forbidden_fields: Vec<String>,

    /// Substring the `$schema` keyword must contain (e.g. "draft/2020-12")
    #[serde(default)]
    pub required_draft: Option<String>,

    /// Root object schemas must declare `unevaluatedProperties: false`
    #[serde(default)]
    pub require_closed_objects: bool,

    /// Every document must compile as a JSON Schema
    #[serde(default = "default_true")]
    pub validate_meta_schema: bool,
}

// Default value functions
fn default_extensions() -> Vec<String> {
    vec!["json".to_string()]
}

fn default_skip_prefixes() -> Vec<String> {
    vec![
        "target/".to_string(),
        ".git/".to_string(),
        "node_modules/".to_string(),
    ]
}

fn default_max_depth() -> usize {
    64
}

fn default_comment_limit() -> usize {
    crate::report::DEFAULT_COMMENT_LIMIT
}

fn default_true() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            skip_prefixes: default_skip_prefixes(),
            schemas_subdir: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Report,
            comment_limit: default_comment_limit(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            forbidden_fields: Vec::new(),
            required_draft: None,
            require_closed_objects: false,
            validate_meta_schema: true,
        }
    }
}

impl LoaderConfig {
    /// Resolve the directory actually walked for a source root
    pub fn source_dir(&self, root: &Path) -> PathBuf {
        match &self.schemas_subdir {
            Some(sub) => root.join(sub),
            None => root.to_path_buf(),
        }
    }
}

impl CompatConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "schema-compat.toml",
            ".schema-compat.toml",
            "config/schema-compat.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "schema-compat") {
            let xdg_config = config_dir.config_dir().join("schema-compat.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_COMPAT")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("policy.forbidden_fields")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompatConfig::default();
        assert_eq!(config.loader.extensions, vec!["json"]);
        assert_eq!(config.engine.max_depth, 64);
        assert_eq!(config.report.comment_limit, 5);
        assert_eq!(config.report.format, OutputFormat::Report);
        assert!(config.policy.forbidden_fields.is_empty());
        assert!(config.policy.validate_meta_schema);
    }

    #[test]
    fn test_serialize_config() {
        let config = CompatConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[loader]"));
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[policy]"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: CompatConfig = toml::from_str(
            r#"
            [policy]
            forbidden_fields = ["email", "tckn"]

            [report]
            format = "comment"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.policy.forbidden_fields, vec!["email", "tckn"]);
        assert_eq!(parsed.report.format, OutputFormat::Comment);
        assert_eq!(parsed.report.comment_limit, 5);
        assert_eq!(parsed.engine.max_depth, 64);
    }

    #[test]
    fn test_source_dir_joins_subdir() {
        let loader = LoaderConfig {
            schemas_subdir: Some(PathBuf::from("schemas")),
            ..LoaderConfig::default()
        };
        assert_eq!(loader.source_dir(Path::new("/tmp/v1")), PathBuf::from("/tmp/v1/schemas"));
    }
}
