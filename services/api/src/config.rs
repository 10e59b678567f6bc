//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where document version and analysis records are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataBackend {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    /// Process-local tables; contents are lost on restart.
    Memory,
}

/// Which object storage holds uploaded bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageProvider {
    MinIO,
    AwsS3,
    Local,
    Memory,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    /// Bucket name, also the first segment of every location token.
    pub bucket: String,
    /// Root directory for the `Local` provider; the bucket is a subdirectory.
    pub root: PathBuf,
    pub region: String,
    pub endpoint: String,
    pub secure: bool,
    pub access_key: String,
    pub secret_key: String,
}

impl StorageConfig {
    /// The endpoint with an explicit scheme, derived from `secure` when absent.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            self.endpoint.clone()
        } else if self.secure {
            format!("https://{}", self.endpoint)
        } else {
            format!("http://{}", self.endpoint)
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    /// Use the local heuristic analyzer instead of the remote model.
    pub use_mock: bool,
    pub openai_api_key: Option<String>,
    pub model: String,
    pub max_input_chars: usize,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub metadata: MetadataBackend,
    pub storage: StorageConfig,
    pub analyzer: AnalyzerConfig,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server Settings ---
        let bind_address =
            parse_var::<SocketAddr>("BIND_ADDRESS", &var("BIND_ADDRESS", "0.0.0.0:8000"))?;

        let log_level_str = var("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let max_upload_bytes =
            parse_var::<usize>("MAX_UPLOAD_BYTES", &var("MAX_UPLOAD_BYTES", "10485760"))?;

        // --- Metadata Store ---
        let metadata = match var("METADATA_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" | "postgresql" => MetadataBackend::Postgres {
                database_url: lookup("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?,
                max_connections: parse_var(
                    "DATABASE_MAX_CONNECTIONS",
                    &var("DATABASE_MAX_CONNECTIONS", "5"),
                )?,
            },
            "memory" => MetadataBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "METADATA_BACKEND".to_string(),
                    format!("unknown backend '{}'", other),
                ))
            }
        };

        // --- Content Store ---
        let provider = match var("STORAGE_PROVIDER", "minio").to_lowercase().as_str() {
            "minio" => StorageProvider::MinIO,
            "s3" | "aws_s3" => StorageProvider::AwsS3,
            "local" => StorageProvider::Local,
            "memory" => StorageProvider::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORAGE_PROVIDER".to_string(),
                    format!("unknown provider '{}'", other),
                ))
            }
        };
        let bucket = var("STORAGE_BUCKET", "documents");
        if bucket.is_empty() || bucket.contains('/') {
            return Err(ConfigError::InvalidValue(
                "STORAGE_BUCKET".to_string(),
                format!("'{}' must be a non-empty name without '/'", bucket),
            ));
        }
        let storage = StorageConfig {
            provider,
            bucket,
            root: PathBuf::from(var("STORAGE_PATH", "./storage")),
            region: var("STORAGE_REGION", "us-east-1"),
            endpoint: var("MINIO_ENDPOINT", "localhost:9000"),
            secure: parse_bool("MINIO_SECURE", &var("MINIO_SECURE", "false"))?,
            access_key: var("MINIO_ACCESS_KEY", "minioadmin"),
            secret_key: var("MINIO_SECRET_KEY", "minioadmin"),
        };

        // --- Analysis Capability ---
        let analyzer = AnalyzerConfig {
            use_mock: parse_bool("USE_MOCK_ANALYZER", &var("USE_MOCK_ANALYZER", "true"))?,
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()),
            model: var("ANALYSIS_MODEL", "gpt-4o-mini"),
            max_input_chars: parse_var(
                "ANALYSIS_MAX_INPUT_CHARS",
                &var("ANALYSIS_MAX_INPUT_CHARS", "15000"),
            )?,
        };
        if !analyzer.use_mock && analyzer.openai_api_key.is_none() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        }

        Ok(Self {
            bind_address,
            log_level,
            metadata,
            storage,
            analyzer,
            max_upload_bytes,
        })
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a boolean", value),
        )),
    }
}
