//! Process configuration.
//!
//! A [`MigrationConfig`] is built once at start-up (usually via [`MigrationConfig::from_env`])
//! and passed by reference into every pipeline entry point.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MigrationError, MigrationResult};

/// Default region used when `AWS_REGION` is unset.
pub const DEFAULT_REGION: &str = "eu-west-3";
/// Default database used when `MONGO_DATABASE` is unset.
pub const DEFAULT_DATABASE: &str = "Meteo_data_db";
/// Default connect timeout for the document store.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Settings consumed by the migration pipeline.
#[derive(Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Source bucket name (`AWS_S3_BUCKET`).
    pub bucket: String,
    /// Storage access key (`AWS_ACCESS_KEY_ID`).
    pub access_key_id: Option<String>,
    /// Storage secret (`AWS_SECRET_ACCESS_KEY`).
    pub secret_access_key: Option<String>,
    /// Storage region (`AWS_REGION`).
    pub region: String,
    /// Document store URI (`MONGO_URI`).
    pub store_uri: String,
    /// Target database name (`MONGO_DATABASE`).
    pub database: String,
    /// Root directory holding bucket directories for the local object store (`STORAGE_ROOT`).
    pub storage_root: PathBuf,
    /// Timeout applied when opening a document store session (`STORE_CONNECT_TIMEOUT_MS`).
    pub connect_timeout: Duration,
}

impl fmt::Debug for MigrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("region", &self.region)
            .field("store_uri", &self.store_uri)
            .field("database", &self.database)
            .field("storage_root", &self.storage_root)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl MigrationConfig {
    /// Load a `.env` file (if any) and build the config from the process environment.
    ///
    /// When `env_file` is `None`, a `.env` in the current directory (or a parent) is used if
    /// present. An explicitly named file that cannot be read is an error.
    pub fn from_env(env_file: Option<&Path>) -> MigrationResult<Self> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| MigrationError::Config {
                    message: format!("cannot load env file {}: {e}", path.display()),
                })?;
            }
            None => {
                if let Err(e) = dotenvy::dotenv() {
                    if !e.not_found() {
                        return Err(MigrationError::Config {
                            message: format!("cannot load .env: {e}"),
                        });
                    }
                }
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> MigrationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| MigrationError::Config {
                message: format!("missing required setting {key}"),
            })
        };

        let connect_timeout = match get("STORE_CONNECT_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| MigrationError::Config {
                    message: format!("invalid STORE_CONNECT_TIMEOUT_MS '{raw}': {e}"),
                })?,
            None => DEFAULT_CONNECT_TIMEOUT,
        };

        Ok(Self {
            bucket: required("AWS_S3_BUCKET")?,
            access_key_id: get("AWS_ACCESS_KEY_ID"),
            secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            store_uri: required("MONGO_URI")?,
            database: get("MONGO_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            storage_root: get("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            connect_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_for_optional_settings() {
        let cfg = MigrationConfig::from_lookup(lookup(&[
            ("AWS_S3_BUCKET", "meteo"),
            ("MONGO_URI", "file:///tmp/store"),
        ]))
        .unwrap();
        assert_eq!(cfg.region, DEFAULT_REGION);
        assert_eq!(cfg.database, DEFAULT_DATABASE);
        assert_eq!(cfg.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(cfg.access_key_id, None);
    }

    #[test]
    fn missing_bucket_is_a_config_error() {
        let err = MigrationConfig::from_lookup(lookup(&[("MONGO_URI", "file:///tmp")])).unwrap_err();
        assert!(err.to_string().contains("AWS_S3_BUCKET"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = MigrationConfig::from_lookup(lookup(&[
            ("AWS_S3_BUCKET", "meteo"),
            ("MONGO_URI", "   "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("MONGO_URI"));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = MigrationConfig::from_lookup(lookup(&[
            ("AWS_S3_BUCKET", "meteo"),
            ("MONGO_URI", "file:///tmp"),
            ("STORE_CONNECT_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("STORE_CONNECT_TIMEOUT_MS"));
    }

    #[test]
    fn debug_redacts_secret() {
        let cfg = MigrationConfig::from_lookup(lookup(&[
            ("AWS_S3_BUCKET", "meteo"),
            ("MONGO_URI", "file:///tmp"),
            ("AWS_SECRET_ACCESS_KEY", "hunter2"),
        ]))
        .unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
