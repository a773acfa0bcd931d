//! Settings file for the audit tools

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default settings file looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "auditsheet.toml";

/// Tokens that mark the checklist header row
pub const DEFAULT_HEADER_TOKENS: [&str; 3] = ["CUMPLE", "ITEMS", "ÍTEMS"];

/// Tool settings, loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the stored configuration and source files
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    /// Worksheet to read; the first sheet when unset
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default = "default_header_tokens")]
    pub header_tokens: Vec<String>,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".auditsheet")
}

fn default_header_tokens() -> Vec<String> {
    DEFAULT_HEADER_TOKENS.iter().map(|t| t.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            sheet: None,
            header_tokens: default_header_tokens(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.header_tokens.iter().all(|t| t.trim().is_empty()) {
            anyhow::bail!("Configuration error: header_tokens must contain at least one token");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.header_tokens[0], "CUMPLE");
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_toml(
            r#"
store_dir = "/tmp/audits"
sheet = "Lista de chequeo"
header_tokens = ["CUMPLE"]
"#,
        )
        .unwrap();
        assert_eq!(settings.store_dir, PathBuf::from("/tmp/audits"));
        assert_eq!(settings.sheet.as_deref(), Some("Lista de chequeo"));
        assert_eq!(settings.header_tokens, vec!["CUMPLE".to_string()]);
    }

    #[test]
    fn test_empty_tokens_rejected() {
        assert!(Settings::from_toml("header_tokens = []").is_err());
        assert!(Settings::from_toml("header_tokens = [\" \"]").is_err());
    }
}
