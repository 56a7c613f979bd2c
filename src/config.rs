//! Runtime configuration read from the environment.
//!
//! | Variable          | Default      |
//! |-------------------|--------------|
//! | `TASKD_HOST`      | `0.0.0.0`    |
//! | `TASKD_PORT`      | `3000`       |
//! | `TASKD_DATA_FILE` | `tasks.json` |
//!
//! Empty or whitespace-only values count as unset.

use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_FILE: &str = "tasks.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid port")]
    InvalidPort { var: &'static str, value: String },

    #[error("{var} is not valid UTF-8")]
    NotUnicode { var: &'static str },
}

/// Where the service listens and where it keeps its tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var))
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Result<String, std::env::VarError>,
    {
        let read = |var: &'static str| -> Result<Option<String>, ConfigError> {
            match lookup(var) {
                Ok(value) => {
                    let value = value.trim();
                    Ok((!value.is_empty()).then(|| value.to_owned()))
                }
                Err(std::env::VarError::NotPresent) => Ok(None),
                Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode { var }),
            }
        };

        let defaults = Self::default();

        let host = read("TASKD_HOST")?.unwrap_or(defaults.host);
        let port = match read("TASKD_PORT")? {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidPort {
                var: "TASKD_PORT",
                value,
            })?,
            None => defaults.port,
        };
        let data_file = read("TASKD_DATA_FILE")?
            .map(PathBuf::from)
            .unwrap_or(defaults.data_file);

        Ok(Self {
            host,
            port,
            data_file,
        })
    }

    /// The `host:port` pair to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
