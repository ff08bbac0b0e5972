//! Application settings loaded from TOML.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::parser::CipherPolicy;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_outbound_tag() -> String {
    "proxy".to_string()
}

/// Common settings section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonSettings {
    /// Default `env_logger` filter, `RUST_LOG` still wins
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CommonSettings {
    fn default() -> Self {
        CommonSettings {
            log_level: default_log_level(),
        }
    }
}

/// Outbound rendering section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundSettings {
    #[serde(default = "default_outbound_tag")]
    pub tag: String,
    /// Use the link remark as tag when it has one
    pub tag_from_remark: bool,
}

impl Default for OutboundSettings {
    fn default() -> Self {
        OutboundSettings {
            tag: default_outbound_tag(),
            tag_from_remark: false,
        }
    }
}

/// Link parser section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    pub cipher_policy: CipherPolicy,
}

/// Settings structure to hold the application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub common: CommonSettings,
    pub outbound: OutboundSettings,
    pub parser: ParserSettings,
}

impl Settings {
    /// Parses settings from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settings TOML")
    }

    /// Loads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.outbound.tag, "proxy");
        assert_eq!(settings.common.log_level, "info");
        assert_eq!(settings.parser.cipher_policy, CipherPolicy::Permissive);
    }

    #[test]
    fn test_partial_toml() {
        let settings = Settings::from_toml_str(
            r#"
[outbound]
tag_from_remark = true

[parser]
cipher_policy = "fallback-none"
"#,
        )
        .unwrap();

        assert!(settings.outbound.tag_from_remark);
        assert_eq!(settings.outbound.tag, "proxy");
        assert_eq!(settings.parser.cipher_policy, CipherPolicy::FallbackNone);
    }

    #[test]
    fn test_invalid_policy_is_an_error() {
        let result = Settings::from_toml_str("[parser]\ncipher_policy = \"loose\"\n");
        assert!(result.is_err());
    }
}
