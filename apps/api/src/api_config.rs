use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use seatkeeper_core::AppError;
use seatkeeper_infrastructure::{DEFAULT_USER_SERVICE_PAGE_SIZE, StoreWriteConfig};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Which relationship store backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackendConfig {
    Memory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserServiceConfig {
    pub url: Url,
    pub page_size: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub api_host: String,
    pub api_port: u16,
    pub store_backend: StoreBackendConfig,
    pub store_write: StoreWriteConfig,
    pub permission_schema_path: Option<PathBuf>,
    pub user_service: Option<UserServiceConfig>,
    pub request_timeout: Duration,
    pub dev_seed: bool,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(env::args().nth(1).as_deref() == Some("migrate"), |name| {
            env::var(name).ok()
        })
    }

    pub(crate) fn from_lookup<F>(migrate_only: bool, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_host = optional("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or(&lookup, "API_PORT", 8081_u16)?;

        let store_backend = match optional("STORE_BACKEND")
            .unwrap_or_else(|| "memory".to_owned())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StoreBackendConfig::Memory,
            "postgres" => StoreBackendConfig::Postgres {
                database_url: optional("DATABASE_URL").ok_or_else(|| {
                    AppError::Validation(
                        "DATABASE_URL is required when STORE_BACKEND=postgres".to_owned(),
                    )
                })?,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10_u32)?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "STORE_BACKEND must be either 'memory' or 'postgres', got '{other}'"
                )));
            }
        };

        if migrate_only && store_backend == StoreBackendConfig::Memory {
            return Err(AppError::Validation(
                "migrate requires STORE_BACKEND=postgres".to_owned(),
            ));
        }

        let store_write = StoreWriteConfig {
            max_attempts: parse_or(&lookup, "STORE_WRITE_MAX_ATTEMPTS", 5_u8)?,
            retry_backoff_ms: parse_or(&lookup, "STORE_WRITE_RETRY_BACKOFF_MS", 25_u64)?,
        };
        if store_write.max_attempts == 0 {
            return Err(AppError::Validation(
                "STORE_WRITE_MAX_ATTEMPTS must be greater than zero".to_owned(),
            ));
        }

        let user_service = optional("USER_SERVICE_URL")
            .map(|value| -> Result<UserServiceConfig, AppError> {
                let url = Url::parse(value.as_str()).map_err(|error| {
                    AppError::Validation(format!("invalid USER_SERVICE_URL: {error}"))
                })?;

                Ok(UserServiceConfig {
                    url,
                    page_size: parse_or(
                        &lookup,
                        "USER_SERVICE_PAGE_SIZE",
                        DEFAULT_USER_SERVICE_PAGE_SIZE,
                    )?,
                    timeout: Duration::from_secs(parse_or(
                        &lookup,
                        "USER_SERVICE_TIMEOUT_SECONDS",
                        10_u64,
                    )?),
                })
            })
            .transpose()?;

        Ok(Self {
            migrate_only,
            api_host,
            api_port,
            store_backend,
            store_write,
            permission_schema_path: optional("PERMISSION_SCHEMA_PATH").map(PathBuf::from),
            user_service,
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECONDS",
                30_u64,
            )?),
            dev_seed: optional("DEV_SEED").is_some_and(|value| value.eq_ignore_ascii_case("true")),
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name).filter(|value| !value.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}
