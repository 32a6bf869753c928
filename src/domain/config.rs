use std::path::Path;

use serde::{Deserialize, Serialize};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".boardtree.toml";

/// Tool configuration.
///
/// Holds the default board coordinates and the names of the project fields
/// that drive hierarchy inference, so boards labelled in another language or
/// convention can rebind them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default organization, used when `--org` and `GITHUB_ORG` are absent.
    pub org: Option<String>,

    /// Default project number, used when `--project` is absent.
    pub project: Option<u64>,

    /// Project field names with reserved meaning.
    pub fields: FieldNames,
}

/// The board field names the resolver and renderers care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// The status column.
    pub status: String,
    /// The acceptance-criteria field marking requirement-like items.
    pub acceptance: String,
    /// The test-classification field marking test-like items.
    pub test_type: String,
    /// The test identifier field used for fallback grouping.
    pub test_id: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            status: "Status".to_string(),
            acceptance: "Acceptance".to_string(),
            test_type: "Test type".to_string(),
            test_id: "Test ID".to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Loads `.boardtree.toml` from the given directory, falling back to
    /// defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only when the file exists but cannot be read or
    /// parsed.
    pub fn load_or_default(dir: &Path) -> Result<Self, String> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or
    /// if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_the_conventional_field_names() {
        let config = Config::default();
        assert_eq!(config.fields.status, "Status");
        assert_eq!(config.fields.acceptance, "Acceptance");
        assert_eq!(config.fields.test_type, "Test type");
        assert_eq!(config.fields.test_id, "Test ID");
        assert!(config.org.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            org = "acme"
            project = 745

            [fields]
            test_id = "Case ID"
            "#,
        )
        .unwrap();

        assert_eq!(config.org.as_deref(), Some("acme"));
        assert_eq!(config.project, Some(745));
        assert_eq!(config.fields.test_id, "Case ID");
        assert_eq!(config.fields.status, "Status");
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = Config {
            org: Some("acme".to_string()),
            project: Some(7),
            fields: FieldNames::default(),
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }
}
