//! Application settings.
//!
//! Layered with the `config` crate, later sources win:
//! built-in defaults, then `finance.toml` (optional), then `FINANCE_*`
//! environment variables (e.g. `FINANCE_DATABASE_PATH=/tmp/x.db`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "finance.toml";
pub const ENV_PREFIX: &str = "FINANCE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    /// Fixed monthly income used for the balance figure
    pub monthly_income: f64,
    /// How many expenses the "recent" list shows
    pub recent_limit: usize,
    pub log_level: String,
    /// Address the API server binds to
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_path: PathBuf::from("finance.db"),
            monthly_income: 2000.0,
            recent_limit: 5,
            log_level: "info".to_string(),
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Settings {
    /// Defaults + `finance.toml` if present + environment
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Same layering; an explicit file must exist
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::layered(file, environment())
    }

    fn layered(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file_source)
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.database_path, PathBuf::from("finance.db"));
        assert_eq!(settings.monthly_income, 2000.0);
        assert_eq!(settings.recent_limit, 5);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "database_path = \"/tmp/other.db\"").unwrap();
        writeln!(file, "monthly_income = 3500.5").unwrap();
        writeln!(file, "recent_limit = 10").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.database_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(settings.monthly_income, 3500.5);
        assert_eq!(settings.recent_limit, 10);
        // untouched keys keep their defaults
        assert_eq!(settings.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_environment_overrides_file_and_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "database_path = \"/tmp/other.db\"").unwrap();
        writeln!(file, "monthly_income = 3500.5").unwrap();

        let vars: config::Map<String, String> = [
            ("FINANCE_DATABASE_PATH", "/tmp/env.db"),
            ("FINANCE_MONTHLY_INCOME", "3100.5"),
            ("FINANCE_RECENT_LIMIT", "9"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let settings = Settings::layered(Some(file.path()), environment().source(Some(vars))).unwrap();
        assert_eq!(settings.database_path, PathBuf::from("/tmp/env.db"));
        assert_eq!(settings.monthly_income, 3100.5);
        assert_eq!(settings.recent_limit, 9);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
