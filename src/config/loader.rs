//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SERIAL_COMM";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "serial-comm.toml";

/// Environment variable for explicit config path
pub const CONFIG_PATH_ENV: &str = "SERIAL_COMM_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERIAL_COMM_CONFIG` environment variable (explicit path)
    /// 2. `./serial-comm.toml` (current directory)
    /// 3. `serial-comm.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();
        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };
        apply_env_overrides(&mut config)?;
        config.validate()?;

        debug!(path = ?config_path, "configuration loaded");
        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path, which must exist.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(Self {
            config_path: None,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    default_config_path().filter(|path| path.exists())
}

/// Where a per-user config file lives on this platform.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "serial-comm").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn env_value<T: FromStr>(key: &str, what: &str) -> ConfigResult<Option<T>> {
    let var = format!("{ENV_PREFIX}_{key}");
    match std::env::var(&var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env(var, format!("invalid {what}: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

fn parse_format(raw: &str) -> Option<LogFormat> {
    match raw.to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" => Some(LogFormat::Pretty),
        "compact" => Some(LogFormat::Compact),
        _ => None,
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Variables follow the pattern `SERIAL_COMM_<SECTION>_<KEY>`, e.g.
/// `SERIAL_COMM_SERIAL_BAUD_RATE=115200` or `SERIAL_COMM_LOGGING_LEVEL=debug`.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some(baud) = env_value("SERIAL_BAUD_RATE", "baud rate")? {
        config.serial.baud_rate = baud;
    }
    if let Some(bits) = env_value("SERIAL_DATA_BITS", "data bits")? {
        config.serial.data_bits = bits;
    }
    if let Some(ms) = env_value("SERIAL_READ_TIMEOUT_MS", "timeout")? {
        config.serial.read_timeout_ms = ms;
    }
    if let Some(ms) = env_value("SERIAL_WRITE_TIMEOUT_MS", "timeout")? {
        config.serial.write_timeout_ms = ms;
    }
    if let Some(level) = env_value::<String>("LOGGING_LEVEL", "level")? {
        config.logging.level = level;
    }
    if let Some(raw) = env_value::<String>("LOGGING_FORMAT", "format")? {
        config.logging.format = parse_format(&raw).ok_or_else(|| {
            ConfigError::env(
                format!("{ENV_PREFIX}_LOGGING_FORMAT"),
                format!("expected json, pretty or compact, got '{raw}'"),
            )
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults().unwrap();
        assert_eq!(loader.config().serial.baud_rate, 9600);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("SERIAL_COMM_SERIAL_BAUD_RATE", "57600");
        env::set_var("SERIAL_COMM_LOGGING_FORMAT", "json");

        let loader = ConfigLoader::with_defaults().unwrap();
        assert_eq!(loader.config().serial.baud_rate, 57600);
        assert_eq!(loader.config().logging.format, LogFormat::Json);

        env::remove_var("SERIAL_COMM_SERIAL_BAUD_RATE");
        env::remove_var("SERIAL_COMM_LOGGING_FORMAT");
    }

    #[test]
    #[serial]
    fn test_bad_env_value() {
        env::set_var("SERIAL_COMM_SERIAL_BAUD_RATE", "fast");
        let result = ConfigLoader::with_defaults();
        env::remove_var("SERIAL_COMM_SERIAL_BAUD_RATE");
        assert!(matches!(result, Err(ConfigError::Env { .. })));
    }

    #[test]
    #[serial]
    fn test_load_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[serial]\nbaud_rate = 19200\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let loader = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loader.config().serial.baud_rate, 19200);
        assert_eq!(loader.config().logging.level, "debug");

        let copy = dir.path().join("nested").join("copy.toml");
        loader.save_to(&copy).unwrap();
        let reloaded = ConfigLoader::load_from(&copy).unwrap();
        assert_eq!(reloaded.config(), loader.config());
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::load_from("/definitely/not/here/serial-comm.toml");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    #[serial]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[serial\nbaud_rate = ").unwrap();
        match ConfigLoader::load_from(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
