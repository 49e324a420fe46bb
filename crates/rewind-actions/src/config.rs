use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_STORAGE_DIR: &str = ".rewind";
pub const DEFAULT_ACTIONS_FILE: &str = "actions.json";
pub const DEFAULT_COMPENSATIONS_FILE: &str = "compensations.json";

/// Where the file-backed stores keep their documents.
///
/// ```toml
/// directory = ".rewind"
/// actions-file = "actions.json"
/// compensations-file = "compensations.json"
/// pretty = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct StorageConfig {
    directory: PathBuf,
    actions_file: String,
    compensations_file: String,
    pretty: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_STORAGE_DIR),
            actions_file: String::from(DEFAULT_ACTIONS_FILE),
            compensations_file: String::from(DEFAULT_COMPENSATIONS_FILE),
            pretty: true,
        }
    }
}

impl StorageConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the file names are unusable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if `content` is not a valid storage config.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, name) in [
            ("actions-file", &self.actions_file),
            ("compensations-file", &self.compensations_file),
        ] {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be a plain file name, got '{name}'"
                )));
            }
        }
        if self.actions_file == self.compensations_file {
            return Err(ConfigError::Invalid(
                "actions-file and compensations-file must differ".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn pretty(&self) -> bool {
        self.pretty
    }

    #[must_use]
    pub fn actions_path(&self) -> PathBuf {
        self.directory.join(&self.actions_file)
    }

    #[must_use]
    pub fn compensations_path(&self) -> PathBuf {
        self.directory.join(&self.compensations_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_into_dot_rewind() {
        let config = StorageConfig::default();

        assert_eq!(config.actions_path(), PathBuf::from(".rewind/actions.json"));
        assert_eq!(
            config.compensations_path(),
            PathBuf::from(".rewind/compensations.json")
        );
        assert!(config.pretty());
    }

    #[test]
    fn parses_partial_toml_with_defaults() -> anyhow::Result<()> {
        let config = StorageConfig::from_toml_str(
            r#"
            directory = "/var/lib/ledger"
            pretty = false
            "#,
        )?;

        assert_eq!(config.directory(), Path::new("/var/lib/ledger"));
        assert!(!config.pretty());
        assert_eq!(
            config.actions_path(),
            PathBuf::from("/var/lib/ledger/actions.json")
        );
        Ok(())
    }

    #[test]
    fn rejects_unknown_keys() {
        let result = StorageConfig::from_toml_str("journal = \"x\"");

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn rejects_shared_file_names() {
        let result = StorageConfig::from_toml_str(
            r#"
            actions-file = "history.json"
            compensations-file = "history.json"
            "#,
        );

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_paths_as_file_names() {
        let result = StorageConfig::from_toml_str("actions-file = \"../escape.json\"");

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_missing_file_returns_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;

        let config = StorageConfig::load(&dir.path().join("rewind.toml"))?;

        assert_eq!(config, StorageConfig::default());
        Ok(())
    }

    #[test]
    fn load_reads_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rewind.toml");
        fs::write(&path, "compensations-file = \"undo.json\"\n")?;

        let config = StorageConfig::load(&path)?;

        assert_eq!(config.compensations_path(), PathBuf::from(".rewind/undo.json"));
        Ok(())
    }
}
