//! Harness config files
//!
//! A config file is YAML or JSON, chosen by extension, with the harness
//! settings nested under `harness:`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{CrashPolicy, HarnessConfig, RunMode};

/// Searched in order; the first existing file wins
const SEARCH_PATHS: &[&str] = &[
    "./spindle.yaml",
    "./spindle.yml",
    "./.spindle.yaml",
    "~/.config/spindle/config.yaml",
];

const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

const FORMATS: &[&str] = &["text", "summary", "json", "json-pretty", "csv"];

/// Encoding of a config file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Encoding {
    Yaml,
    Json,
}

impl Encoding {
    /// `.yaml`/`.yml` are YAML; everything else is read as JSON
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Encoding::Yaml,
            _ => Encoding::Json,
        }
    }

    fn parse(self, content: &str) -> Result<ConfigFile> {
        let parsed = match self {
            Encoding::Yaml => serde_yaml::from_str(content)?,
            Encoding::Json => serde_json::from_str(content)?,
        };
        Ok(parsed)
    }

    fn render(self, config: &ConfigFile) -> Result<String> {
        let rendered = match self {
            Encoding::Yaml => serde_yaml::to_string(config)?,
            Encoding::Json => serde_json::to_string_pretty(config)?,
        };
        Ok(rendered)
    }
}

/// On-disk configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "current_version")]
    pub version: String,

    #[serde(default)]
    pub harness: HarnessConfig,
}

fn current_version() -> String {
    SUPPORTED_VERSIONS[0].to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: current_version(),
            harness: HarnessConfig::default(),
        }
    }
}

impl ConfigFile {
    /// First config file that exists on the search path
    pub fn find() -> Option<PathBuf> {
        SEARCH_PATHS
            .iter()
            .map(|candidate| home_relative(candidate))
            .find(|path| path.is_file())
    }

    /// Load the discovered config file, or defaults when there is none
    pub fn load_default() -> Result<Self> {
        Self::find()
            .map(|path| Self::load(&path))
            .unwrap_or_else(|| Ok(Self::default()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;

        let config = Encoding::of(path)
            .parse(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config, creating missing parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = Encoding::of(path).render(self)?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create {}", dir.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Cannot write config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            bail!("Unsupported config version {}", self.version);
        }
        let harness = &self.harness;
        if !FORMATS.contains(&harness.format.as_str()) {
            bail!(
                "Unknown output format {} (expected one of {})",
                harness.format,
                FORMATS.join(", ")
            );
        }
        if harness.fail_exit_code == 0 {
            bail!("fail_exit_code must be non-zero; use exit_zero to ignore failures");
        }
        Ok(())
    }

    /// Starter config written by `spindle config init`
    pub fn example() -> Self {
        Self {
            version: current_version(),
            harness: HarnessConfig {
                suffix: Some(".spec.yaml".to_string()),
                mode: RunMode::Parallel,
                workers: 4,
                crash_policy: CrashPolicy::Record,
                retry_crashed: true,
                ..HarnessConfig::default()
            },
        }
    }
}

/// Resolve a leading `~/` against the home directory
fn home_relative(candidate: &str) -> PathBuf {
    match (candidate.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        assert!(config.validate().is_ok());
        assert!(ConfigFile::example().validate().is_ok());
    }

    #[test]
    fn test_example_survives_both_encodings() {
        let dir = tempdir().unwrap();

        for name in ["nested/spindle.yaml", "spindle.json"] {
            let path = dir.path().join(name);
            ConfigFile::example().save(&path).unwrap();

            let harness = ConfigFile::load(&path).unwrap().harness;
            assert_eq!(harness.mode, RunMode::Parallel);
            assert_eq!(harness.workers, 4);
            assert_eq!(harness.suffix.as_deref(), Some(".spec.yaml"));
            assert!(harness.retry_crashed);
        }
    }

    #[test]
    fn test_rejects_bad_settings() {
        let mut config = ConfigFile::default();
        config.harness.format = "xml".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("xml"));

        let mut config = ConfigFile::default();
        config.version = "9.9".to_string();
        assert!(config.validate().is_err());

        let mut config = ConfigFile::default();
        config.harness.fail_exit_code = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_encoding_by_extension() {
        assert_eq!(Encoding::of(Path::new("a.yml")), Encoding::Yaml);
        assert_eq!(Encoding::of(Path::new("a.json")), Encoding::Json);
        assert_eq!(Encoding::of(Path::new("a")), Encoding::Json);
    }

    #[test]
    fn test_home_relative() {
        assert_eq!(home_relative("./spindle.yaml"), PathBuf::from("./spindle.yaml"));
    }
}
