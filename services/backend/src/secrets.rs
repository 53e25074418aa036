// secrets
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use axum::http::StatusCode;
use thiserror::Error;
use tracing::info;

use crate::seed::SeedMode;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DATABASE: &str = "songs";
const DEFAULT_SEED_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/songs.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dev,
    Prod,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing MongoDB server in the {0} variable")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Process settings, read once at startup and handed to whoever needs them.
#[derive(Debug, Clone)]
pub struct SecretManager {
    pub mode: Mode,
    pub mongodb_service: String,
    credentials: Option<(String, String)>,
    pub database: String,
    pub port: u16,
    pub seed_file: PathBuf,
    pub seed_mode: SeedMode,
    pub conflict_status: StatusCode,
}

impl SecretManager {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut secrets: HashMap<&'static str, String> = HashMap::new();
        for key in [
            "MODE",
            "MONGODB_SERVICE",
            "MONGODB_USERNAME",
            "MONGODB_PASSWORD",
            "MONGODB_DATABASE",
            "PORT",
            "SEED_FILE",
            "SEED_MODE",
            "CONFLICT_STATUS",
        ] {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                secrets.insert(key, value);
            }
        }

        let mode = match secrets.get("MODE") {
            Some(mode) if mode.to_lowercase() == "prod" => Mode::Prod,
            _ => Mode::Dev,
        };

        let mongodb_service = secrets
            .get("MONGODB_SERVICE")
            .cloned()
            .ok_or(ConfigError::Missing("MONGODB_SERVICE"))?;

        let credentials = match (secrets.get("MONGODB_USERNAME"), secrets.get("MONGODB_PASSWORD")) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        let port = match secrets.get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let seed_mode = match secrets.get("SEED_MODE") {
            Some(raw) => raw.parse::<SeedMode>().map_err(|_| ConfigError::Invalid {
                key: "SEED_MODE",
                value: raw.clone(),
            })?,
            // Dropping the collection on every boot is a development convenience only
            None if mode == Mode::Prod => SeedMode::Upsert,
            None => SeedMode::Reset,
        };

        let conflict_status = match secrets.get("CONFLICT_STATUS").map(String::as_str) {
            None | Some("302") => StatusCode::FOUND,
            Some("409") => StatusCode::CONFLICT,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "CONFLICT_STATUS",
                    value: other.to_string(),
                });
            }
        };

        // Log which secrets are configured (NOT their values!)
        let mut configured: Vec<&str> = secrets.keys().copied().collect();
        configured.sort_unstable();
        info!("Secrets configured: {:?}", configured);

        Ok(SecretManager {
            mode,
            mongodb_service,
            credentials,
            database: secrets
                .get("MONGODB_DATABASE")
                .cloned()
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            port,
            seed_file: secrets
                .get("SEED_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SEED_FILE)),
            seed_mode,
            conflict_status,
        })
    }

    pub fn mongodb_url(&self) -> String {
        match &self.credentials {
            Some((user, password)) => format!(
                "mongodb://{}:{}@{}",
                urlencoding::encode(user),
                urlencoding::encode(password),
                self.mongodb_service
            ),
            None => format!("mongodb://{}", self.mongodb_service),
        }
    }

    /// Connection URL safe to log.
    pub fn redacted_mongodb_url(&self) -> String {
        match &self.credentials {
            Some((user, _)) => format!(
                "mongodb://{}:****@{}",
                urlencoding::encode(user),
                self.mongodb_service
            ),
            None => self.mongodb_url(),
        }
    }
}
