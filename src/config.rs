use crate::defaults;
use crate::params::RawEffectParameters;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Effect values used when no flag overrides them
    pub effects: RawEffectParameters,
    pub params: ParamsConfig,
}

/// Parameter dump configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParamsConfig {
    /// Write the effect parameters next to every processed file
    pub save: bool,
    pub dir: PathBuf,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            save: false,
            dir: PathBuf::from(defaults::PARAMS_DIR),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - NIGHTCORE_PARAMS_DIR → params.dir
    /// - NIGHTCORE_SAVE_PARAMS → params.save (`1`/`true`/`yes` or `0`/`false`/`no`)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("NIGHTCORE_PARAMS_DIR")
            && !dir.is_empty()
        {
            self.params.dir = PathBuf::from(dir);
        }

        if let Ok(save) = std::env::var("NIGHTCORE_SAVE_PARAMS")
            && let Some(save) = parse_bool(&save)
        {
            self.params.save = save;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/nightcore/config.toml on Linux, or a path relative
    /// to the working directory when no config directory is known.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nightcore")
            .join("config.toml")
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_nightcore_env() {
        remove_env("NIGHTCORE_PARAMS_DIR");
        remove_env("NIGHTCORE_SAVE_PARAMS");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.effects.pitch, 1.0);
        assert_eq!(config.effects.tempo, 1.0);
        assert_eq!(config.effects.bass_boost_db, 0.0);
        assert_eq!(config.effects.reverb_delay_ms, 0);

        assert!(!config.params.save);
        assert_eq!(config.params.dir, PathBuf::from("./"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [effects]
            pitch = 1.25
            tempo = 1.15
            bass_boost_db = 5.0
            reverb_delay_ms = 200
            reverb_intensity = 0.3
            reverb_feedback = 0.25

            [params]
            save = true
            dir = "/tmp/nightcore"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.effects.pitch, 1.25);
        assert_eq!(config.effects.tempo, 1.15);
        assert_eq!(config.effects.bass_boost_db, 5.0);
        assert_eq!(config.effects.reverb_delay_ms, 200);
        assert_eq!(config.effects.reverb_intensity, 0.3);
        assert_eq!(config.effects.reverb_feedback, 0.25);

        assert!(config.params.save);
        assert_eq!(config.params.dir, PathBuf::from("/tmp/nightcore"));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [effects]
            pitch = 1.5
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.effects.pitch, 1.5);
        assert_eq!(config.effects.tempo, 1.0);
        assert_eq!(config.params, ParamsConfig::default());
    }

    #[test]
    fn test_env_override_dir() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_nightcore_env();

        set_env("NIGHTCORE_PARAMS_DIR", "/srv/dumps");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.params.dir, PathBuf::from("/srv/dumps"));
        assert!(!config.params.save); // Not overridden

        clear_nightcore_env();
    }

    #[test]
    fn test_env_override_save() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_nightcore_env();

        set_env("NIGHTCORE_SAVE_PARAMS", "yes");
        assert!(Config::default().with_env_overrides().params.save);

        set_env("NIGHTCORE_SAVE_PARAMS", "maybe");
        assert!(!Config::default().with_env_overrides().params.save);

        clear_nightcore_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_nightcore_env();

        set_env("NIGHTCORE_PARAMS_DIR", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.params.dir, PathBuf::from("./"));

        clear_nightcore_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [effects
            pitch = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_default_path_ends_in_nightcore_dir() {
        let path = Config::default_path();
        assert!(path.ends_with("nightcore/config.toml"));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[effects]"));
        assert!(text.contains("[params]"));
        assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
    }
}
