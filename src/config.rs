use crate::auth::Credentials;
use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Url;
use std::{env, path::PathBuf};

const DEFAULT_ENDPOINT: &str = "https://kr.object.ncloudstorage.com";
const DEFAULT_REGION: &str = "kr-standard";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub staging_dir: PathBuf,
    pub seed_user: Option<String>,
    pub storage: ObjectStorageConfig,
}

/// Where and as whom objects are stored. `Debug` never prints the secret.
#[derive(Debug, Clone)]
pub struct ObjectStorageConfig {
    pub endpoint: Url,
    pub region: String,
    pub bucket: String,
    pub credentials: Credentials,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Profile image API backed by S3-compatible object storage")]
pub struct Args {
    /// Host to bind to (overrides PROFILE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PROFILE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides PROFILE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory uploads are staged in (overrides PROFILE_STORE_STAGING_DIR)
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Create this user at startup if missing (overrides PROFILE_STORE_SEED_USER)
    #[arg(long)]
    pub seed_user: Option<String>,

    /// Object storage endpoint (overrides OBJECT_STORAGE_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Object storage region (overrides OBJECT_STORAGE_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Bucket holding profile images (overrides OBJECT_STORAGE_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |name| env::var(name).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge `args` over values produced by `lookup` (normally the process
    /// environment).
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = lookup("PROFILE_STORE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match lookup("PROFILE_STORE_PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PROFILE_STORE_PORT value `{}`", value))?,
            None => 8080,
        };
        let env_db = lookup("PROFILE_STORE_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://./data/profile_store.db".into());
        let env_staging = lookup("PROFILE_STORE_STAGING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let endpoint = args
            .endpoint
            .or_else(|| lookup("OBJECT_STORAGE_ENDPOINT"))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.into());
        let endpoint = Url::parse(&endpoint)
            .with_context(|| format!("parsing object storage endpoint `{}`", endpoint))?;
        let region = args
            .region
            .or_else(|| lookup("OBJECT_STORAGE_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.into());
        let bucket = args
            .bucket
            .or_else(|| lookup("OBJECT_STORAGE_BUCKET"))
            .context("OBJECT_STORAGE_BUCKET is not set")?;
        let access_key =
            lookup("OBJECT_STORAGE_ACCESS_KEY").context("OBJECT_STORAGE_ACCESS_KEY is not set")?;
        let secret_key =
            lookup("OBJECT_STORAGE_SECRET_KEY").context("OBJECT_STORAGE_SECRET_KEY is not set")?;

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            staging_dir: args.staging_dir.unwrap_or(env_staging),
            seed_user: args.seed_user.or_else(|| lookup("PROFILE_STORE_SEED_USER")),
            storage: ObjectStorageConfig {
                endpoint,
                region,
                bucket,
                credentials: Credentials::new(access_key, secret_key),
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
