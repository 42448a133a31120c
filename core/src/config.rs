use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to do when a table holds two live rows with the same primary key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateKeyPolicy {
    /// Keep the first row per key and report the rest
    #[default]
    FirstWins,
    /// Fail the merge
    Reject,
}

/// What to do when two tables to be merged have incompatible schemas
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaMismatchPolicy {
    /// Produce an empty schema clone and report the mismatch
    #[default]
    Skip,
    /// Fail the merge
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MergeConfig {
    #[serde(default)]
    pub duplicate_keys: DuplicateKeyPolicy,
    #[serde(default)]
    pub schema_mismatch: SchemaMismatchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Rows listed per state in pretty output
    pub sample_rows: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { sample_rows: 3 }
    }
}

/// Runtime options for merges and synchronization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub duplicate_keys: DuplicateKeyPolicy,
    pub schema_mismatch: SchemaMismatchPolicy,
}

impl MergeOptions {
    /// Fail on duplicate keys and incompatible schemas instead of reporting them
    pub fn strict() -> Self {
        Self {
            duplicate_keys: DuplicateKeyPolicy::Reject,
            schema_mismatch: SchemaMismatchPolicy::Reject,
        }
    }
}

impl MergeConfig {
    pub fn to_options(&self) -> MergeOptions {
        MergeOptions {
            duplicate_keys: self.duplicate_keys,
            schema_mismatch: self.schema_mismatch,
        }
    }
}

impl From<MergeOptions> for MergeConfig {
    fn from(options: MergeOptions) -> Self {
        Self {
            duplicate_keys: options.duplicate_keys,
            schema_mismatch: options.schema_mismatch,
        }
    }
}

impl std::str::FromStr for DuplicateKeyPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "first-wins" | "first_wins" => Ok(Self::FirstWins),
            "reject" => Ok(Self::Reject),
            other => Err(anyhow::anyhow!("Unknown duplicate key policy '{}'", other)),
        }
    }
}

impl std::str::FromStr for SchemaMismatchPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "reject" => Ok(Self::Reject),
            other => Err(anyhow::anyhow!("Unknown schema mismatch policy '{}'", other)),
        }
    }
}

/// Location of the saved global config file
pub fn global_config_path() -> PathBuf {
    let config_dir = if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(".tablesync")
    } else {
        PathBuf::from(".tablesync")
    };
    config_dir.join("global.toml")
}

pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config '{}': {}", path.display(), e))?;
    let config = toml::from_str::<Config>(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {}", path.display(), e))?;
    Ok(config)
}

pub fn get_config() -> Result<Config> {
    // Priority order (highest to lowest):
    // 1. Explicit config file via TABLESYNC_CONFIG env var
    // 2. Local config file (tablesync.toml)
    // 3. Saved global config file (~/.tablesync/global.toml)
    // 4. Default configuration
    // Environment overrides are applied on top in every case.

    if let Ok(config_path) = env::var("TABLESYNC_CONFIG") {
        let mut config = load_config_file(Path::new(&config_path))?;
        apply_env_overrides(&mut config)?;
        return Ok(config);
    }

    let mut config = Config::default();

    let global_path = global_config_path();
    if global_path.exists() {
        match load_config_file(&global_path) {
            Ok(loaded) => config = loaded,
            Err(e) => log::warn!("Ignoring global config: {e}"),
        }
    }

    if let Ok(current_dir) = env::current_dir() {
        let local_config_path = current_dir.join("tablesync.toml");
        if local_config_path.exists() {
            match load_config_file(&local_config_path) {
                Ok(local) => config = local,
                Err(e) => log::warn!("Ignoring local config: {e}"),
            }
        }
    }

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load an explicitly named config file, or resolve the usual way when `None`
pub fn get_config_from(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let mut config = load_config_file(path)?;
            apply_env_overrides(&mut config)?;
            Ok(config)
        }
        None => get_config(),
    }
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(policy) = env::var("TABLESYNC_DUPLICATE_KEYS") {
        config.merge.duplicate_keys = policy.parse()?;
    }
    if let Ok(policy) = env::var("TABLESYNC_SCHEMA_MISMATCH") {
        config.merge.schema_mismatch = policy.parse()?;
    }
    Ok(())
}

pub fn get_merge_options() -> Result<MergeOptions> {
    Ok(get_config()?.merge.to_options())
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let config_toml = toml::to_string_pretty(config)?;
    fs::write(path, config_toml)?;
    Ok(())
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &global_config_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_fail_open() {
        let options = Config::default().merge.to_options();
        assert_eq!(options.duplicate_keys, DuplicateKeyPolicy::FirstWins);
        assert_eq!(options.schema_mismatch, SchemaMismatchPolicy::Skip);
        assert_eq!(Config::default().output.sample_rows, 3);
    }

    #[test]
    fn test_parse_toml() {
        let toml_content = r#"
[merge]
duplicate_keys = "reject"
schema_mismatch = "skip"

[output]
sample_rows = 10
"#;
        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.merge.duplicate_keys, DuplicateKeyPolicy::Reject);
        assert_eq!(config.merge.schema_mismatch, SchemaMismatchPolicy::Skip);
        assert_eq!(config.output.sample_rows, 10);
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("[merge]\nschema_mismatch = \"reject\"\n").unwrap();
        assert_eq!(config.merge.duplicate_keys, DuplicateKeyPolicy::FirstWins);
        assert_eq!(config.merge.schema_mismatch, SchemaMismatchPolicy::Reject);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("global.toml");
        let config = Config {
            merge: MergeOptions::strict().into(),
            ..Default::default()
        };

        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_file(&path).unwrap(), config);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "first-wins".parse::<DuplicateKeyPolicy>().unwrap(),
            DuplicateKeyPolicy::FirstWins
        );
        assert_eq!(
            "REJECT".parse::<SchemaMismatchPolicy>().unwrap(),
            SchemaMismatchPolicy::Reject
        );
        assert!("sometimes".parse::<DuplicateKeyPolicy>().is_err());
    }
}
