use std::fmt;
use std::path::Path;

use config::{Config, ConfigError, File};
use secrecy::Secret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Environment variables and the file keys they override.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("dm_driver", "DM_DRIVER"),
    ("dm_host", "DM_HOST"),
    ("dm_port", "DM_PORT"),
    ("dm_username", "DM_USERNAME"),
    ("dm_password", "DM_PASSWORD"),
    ("dm_database", "DM_DATABASE"),
    ("service_host", "SERVICE_HOST"),
    ("service_port", "SERVICE_PORT"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[serde(alias = "postgresql")]
    Postgres,
    Mysql,
    Sqlite,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub driver: Driver,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
    /// Database (schema) name; a file path for SQLite.
    pub database: String,
}

impl DatabaseSettings {
    /// Private in-memory SQLite database.
    pub fn sqlite_memory() -> Self {
        Self {
            driver: Driver::Sqlite,
            host: String::new(),
            port: 0,
            username: String::new(),
            password: Secret::new(String::new()),
            database: ":memory:".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub service: ServiceSettings,
}

#[derive(Deserialize)]
struct RawSettings {
    dm_driver: Driver,
    dm_host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    dm_port: u16,
    dm_username: String,
    dm_password: Secret<String>,
    dm_database: String,
    service_host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    service_port: u16,
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        Self {
            database: DatabaseSettings {
                driver: raw.dm_driver,
                host: raw.dm_host,
                port: raw.dm_port,
                username: raw.dm_username,
                password: raw.dm_password,
                database: raw.dm_database,
            },
            service: ServiceSettings {
                host: raw.service_host,
                port: raw.service_port,
            },
        }
    }
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// With `path` set the file must exist; otherwise `config.json` in the
    /// working directory is read when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |var| std::env::var(var).ok())
    }

    /// Same as [`Settings::load`] with an explicit environment lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let mut builder = Config::builder()
            .set_default("dm_driver", "postgres")?
            .set_default("dm_host", "localhost")?
            .set_default("dm_port", 5236)?
            .set_default("dm_username", "SYSDBA")?
            .set_default("dm_password", "SYSDBA")?
            .set_default("dm_database", "")?
            .set_default("service_host", "0.0.0.0")?
            .set_default("service_port", 7860)?
            .add_source(file);

        for &(key, var) in ENV_OVERRIDES {
            builder = builder.set_override_option(key, lookup(var))?;
        }

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        Ok(raw.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn config_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let settings = Settings::load_with(None, no_env).unwrap();
        assert_eq!(settings.database.driver, Driver::Postgres);
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 5236);
        assert_eq!(settings.database.username, "SYSDBA");
        assert_eq!(settings.database.password.expose_secret(), "SYSDBA");
        assert_eq!(settings.database.database, "");
        assert_eq!(settings.service.host, "0.0.0.0");
        assert_eq!(settings.service.port, 7860);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(Settings::load_with(Some(&missing), no_env).is_err());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = config_file(
            ".json",
            r#"{
                "dm_host": "db.internal",
                "dm_port": "5300",
                "dm_database": "SALES",
                "service_port": 8080
            }"#,
        );

        let settings = Settings::load_with(Some(file.path()), no_env).unwrap();
        assert_eq!(settings.database.host, "db.internal");
        assert_eq!(settings.database.port, 5300);
        assert_eq!(settings.database.database, "SALES");
        assert_eq!(settings.database.username, "SYSDBA");
        assert_eq!(settings.service.port, 8080);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = config_file(
            ".toml",
            "dm_host = \"from-file\"\ndm_driver = \"mysql\"\ndm_username = \"admin\"\n",
        );
        let env: HashMap<&str, &str> = [("DM_HOST", "from-env"), ("DM_PORT", "6000"), ("DM_DRIVER", "sqlite")]
            .into_iter()
            .collect();

        let settings =
            Settings::load_with(Some(file.path()), |var| env.get(var).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.database.host, "from-env");
        assert_eq!(settings.database.port, 6000);
        assert_eq!(settings.database.driver, Driver::Sqlite);
        assert_eq!(settings.database.username, "admin");
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let result = Settings::load_with(None, |var| (var == "SERVICE_PORT").then(|| "not-a-port".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let settings = Settings::load_with(None, no_env).unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("password: \"SYSDBA\""));
        assert!(debug.contains("REDACTED"));
    }
}
