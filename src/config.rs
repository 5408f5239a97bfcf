use crate::services::s3_storage::S3Settings;
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Which `ObjectStorage` implementation holds the video binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "local" => Ok(Self::Local),
            other => bail!("unknown storage backend `{}` (expected `s3` or `local`)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables, an optional `.env` file and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub storage_backend: StorageBackend,
    pub bucket: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
    pub local_storage_dir: PathBuf,
    pub local_base_url: Option<String>,
    pub max_upload_bytes: usize,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Video upload and metadata API")]
pub struct Args {
    /// Host to bind to (overrides VIDEOS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEOS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Metadata database URL (overrides DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Where video binaries are stored (overrides STORAGE_BACKEND)
    #[arg(long, value_enum)]
    pub storage_backend: Option<StorageBackend>,

    /// S3 bucket name (overrides S3_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// AWS region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint (overrides AWS_ENDPOINT_URL)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Directory for the local backend (overrides LOCAL_STORAGE_DIR)
    #[arg(long)]
    pub local_storage_dir: Option<PathBuf>,

    /// URL prefix for objects stored by the local backend (overrides LOCAL_BASE_URL)
    #[arg(long)]
    pub local_base_url: Option<String>,

    /// Largest accepted upload body in bytes (overrides MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// S3 connect timeout in seconds (overrides S3_CONNECT_TIMEOUT_SECS)
    #[arg(long)]
    pub connect_timeout_secs: Option<u64>,

    /// S3 request timeout in seconds (overrides S3_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Retries per S3 request (overrides S3_MAX_RETRIES)
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

const REQUIRED_S3_VARS: [&str; 2] = ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"];

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        dotenvy::dotenv().ok();
        let args = Args::parse();
        Self::from_sources(args, |key| env::var(key).ok())
    }

    /// Merge `args` over values looked up through `env`, then validate.
    pub fn from_sources(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<(Self, bool)> {
        let storage_backend = match args.storage_backend {
            Some(backend) => backend,
            None => env_parse(&env, "STORAGE_BACKEND")?.unwrap_or(StorageBackend::S3),
        };
        let local_storage_dir = args
            .local_storage_dir
            .or_else(|| env("LOCAL_STORAGE_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("./data/objects"));

        let cfg = Self {
            host: args
                .host
                .or_else(|| env("VIDEOS_HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: pick(args.port, env_parse(&env, "VIDEOS_PORT")?, 8000),
            database_url: args
                .database_url
                .or_else(|| env("DATABASE_URL"))
                .unwrap_or_else(|| "sqlite://./data/meta/videos.db".into()),
            storage_backend,
            bucket: args.bucket.or_else(|| env("S3_BUCKET")),
            region: args
                .region
                .or_else(|| env("AWS_REGION"))
                .unwrap_or_else(|| "us-east-1".into()),
            endpoint: args.endpoint.or_else(|| env("AWS_ENDPOINT_URL")),
            local_storage_dir,
            local_base_url: args.local_base_url.or_else(|| env("LOCAL_BASE_URL")),
            max_upload_bytes: pick(
                args.max_upload_bytes,
                env_parse(&env, "MAX_UPLOAD_BYTES")?,
                2 * 1024 * 1024 * 1024,
            ),
            connect_timeout: Duration::from_secs(pick(
                args.connect_timeout_secs,
                env_parse(&env, "S3_CONNECT_TIMEOUT_SECS")?,
                300,
            )),
            request_timeout: Duration::from_secs(pick(
                args.request_timeout_secs,
                env_parse(&env, "S3_REQUEST_TIMEOUT_SECS")?,
                600,
            )),
            max_retries: pick(args.max_retries, env_parse(&env, "S3_MAX_RETRIES")?, 3),
        };

        if cfg.storage_backend == StorageBackend::S3 {
            let mut missing: Vec<&str> = REQUIRED_S3_VARS
                .into_iter()
                .filter(|key| env(*key).is_none_or(|v| v.is_empty()))
                .collect();
            if cfg.bucket.as_deref().is_none_or(str::is_empty) {
                missing.insert(0, "S3_BUCKET");
            }
            if !missing.is_empty() {
                bail!("missing required environment variables: {}", missing.join(", "));
            }
        }

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// S3 client settings; only meaningful when the backend is S3.
    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            bucket: self.bucket.clone().unwrap_or_default(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
        }
    }
}

fn pick<T>(arg: Option<T>, env: Option<T>, default: T) -> T {
    arg.or(env).unwrap_or(default)
}

fn env_parse<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env(key) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(None),
    }
}
