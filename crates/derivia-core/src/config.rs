//! Configuration module
//!
//! Configuration is read once from the environment (and an optional `.env`
//! file) at process start, then handed by reference to every component
//! constructor. Nothing else in the workspace reads environment variables.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 4000;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_WIDTH: u32 = 3840;
const MAX_HEIGHT: u32 = 2160;
const JPEG_QUALITY: u8 = 80;
const CACHE_CONTROL: &str = "public, max-age=86400";
const ALLOWED_CONTENT_TYPES: &str =
    "image/jpeg,image/png,image/webp,image/gif,image/tiff,image/svg+xml";
const PASSTHROUGH_CONTENT_TYPES: &str = "image/gif,image/svg+xml";

/// How a successful derivative is returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Derivative bytes in the response body
    #[default]
    InlineBody,
    /// 301 to the derivative's public URL
    RedirectToStored,
}

impl FromStr for ResponseMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inline" => Ok(ResponseMode::InlineBody),
            "redirect" => Ok(ResponseMode::RedirectToStored),
            _ => Err(anyhow::anyhow!(
                "Invalid response mode: {} (expected inline or redirect)",
                s
            )),
        }
    }
}

/// Process-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub request_timeout_secs: u64,
}

/// Derivative service configuration
#[derive(Clone, Debug)]
pub struct DerivativeConfig {
    pub base: BaseConfig,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub bucket: String,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    // Request validation
    pub whitelist: Option<Vec<String>>,
    pub max_width: u32,
    pub max_height: u32,
    pub enforce_dimension_limits: bool,
    pub enforce_mime_types: bool,
    pub allowed_content_types: Vec<String>,
    pub passthrough_content_types: Vec<String>,
    // Transform behaviour
    pub allow_enlargement: bool,
    pub jpeg_quality: u8,
    /// ImageMagick `convert` binary for the shadow effect; in-process when unset
    pub shadow_filter_path: Option<String>,
    // Persist / respond
    pub cache_control: String,
    pub response_mode: ResponseMode,
    pub public_url: Option<String>,
    pub single_flight: bool,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<DerivativeConfig>);

impl Config {
    fn inner(&self) -> &DerivativeConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = DerivativeConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    /// Defaults for `bucket` with no environment involved.
    pub fn for_bucket(bucket: impl Into<String>) -> Self {
        Config(Box::new(DerivativeConfig::with_bucket(bucket)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.inner().base.request_timeout_secs
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn bucket(&self) -> &str {
        &self.inner().bucket
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.inner().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn whitelist(&self) -> Option<&[String]> {
        self.inner().whitelist.as_deref()
    }

    pub fn max_width(&self) -> u32 {
        self.inner().max_width
    }

    pub fn max_height(&self) -> u32 {
        self.inner().max_height
    }

    pub fn enforce_dimension_limits(&self) -> bool {
        self.inner().enforce_dimension_limits
    }

    pub fn enforce_mime_types(&self) -> bool {
        self.inner().enforce_mime_types
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.inner().allowed_content_types
    }

    pub fn passthrough_content_types(&self) -> &[String] {
        &self.inner().passthrough_content_types
    }

    pub fn allow_enlargement(&self) -> bool {
        self.inner().allow_enlargement
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.inner().jpeg_quality
    }

    pub fn shadow_filter_path(&self) -> Option<&str> {
        self.inner().shadow_filter_path.as_deref()
    }

    pub fn cache_control(&self) -> &str {
        &self.inner().cache_control
    }

    pub fn response_mode(&self) -> ResponseMode {
        self.inner().response_mode
    }

    pub fn public_url(&self) -> Option<&str> {
        self.inner().public_url.as_deref()
    }

    pub fn single_flight(&self) -> bool {
        self.inner().single_flight
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().to_lowercase().parse().ok())
        .unwrap_or(default)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Space-separated whitelist tokens; an empty value means no whitelist.
fn parse_whitelist(value: &str) -> Option<Vec<String>> {
    let tokens: Vec<String> = value.split_whitespace().map(String::from).collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens)
    }
}

impl DerivativeConfig {
    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        DerivativeConfig {
            base: BaseConfig {
                server_port: SERVER_PORT,
                environment: "development".to_string(),
                request_timeout_secs: REQUEST_TIMEOUT_SECS,
            },
            storage_backend: StorageBackend::S3,
            bucket: bucket.into(),
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: None,
            whitelist: None,
            max_width: MAX_WIDTH,
            max_height: MAX_HEIGHT,
            enforce_dimension_limits: true,
            enforce_mime_types: true,
            allowed_content_types: split_list(ALLOWED_CONTENT_TYPES),
            passthrough_content_types: split_list(PASSTHROUGH_CONTENT_TYPES),
            allow_enlargement: false,
            jpeg_quality: JPEG_QUALITY,
            shadow_filter_path: None,
            cache_control: CACHE_CONTROL.to_string(),
            response_mode: ResponseMode::InlineBody,
            public_url: None,
            single_flight: true,
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let bucket = env::var("BUCKET")
            .or_else(|_| env::var("S3_BUCKET"))
            .map_err(|_| anyhow::anyhow!("BUCKET must be set"))?;

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REQUEST_TIMEOUT_SECS),
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::S3,
        };

        let response_mode = match env::var("RESPONSE_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => ResponseMode::InlineBody,
        };

        let whitelist = env::var("WHITELISTED_DIMENSIONS")
            .or_else(|_| env::var("WHITELIST"))
            .ok()
            .and_then(|v| parse_whitelist(&v));

        let config = DerivativeConfig {
            base,
            storage_backend,
            bucket,
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            whitelist,
            max_width: env::var("MAX_WIDTH")
                .unwrap_or_else(|_| MAX_WIDTH.to_string())
                .parse()
                .unwrap_or(MAX_WIDTH),
            max_height: env::var("MAX_HEIGHT")
                .unwrap_or_else(|_| MAX_HEIGHT.to_string())
                .parse()
                .unwrap_or(MAX_HEIGHT),
            enforce_dimension_limits: env_bool("ENFORCE_DIMENSION_LIMITS", true),
            enforce_mime_types: env_bool("ENFORCE_MIME_TYPES", true),
            allowed_content_types: split_list(
                &env::var("ALLOWED_CONTENT_TYPES")
                    .unwrap_or_else(|_| ALLOWED_CONTENT_TYPES.to_string()),
            ),
            passthrough_content_types: split_list(
                &env::var("PASSTHROUGH_CONTENT_TYPES")
                    .unwrap_or_else(|_| PASSTHROUGH_CONTENT_TYPES.to_string()),
            ),
            allow_enlargement: env_bool("ALLOW_ENLARGEMENT", false),
            jpeg_quality: env::var("JPEG_QUALITY")
                .unwrap_or_else(|_| JPEG_QUALITY.to_string())
                .parse()
                .unwrap_or(JPEG_QUALITY),
            shadow_filter_path: env::var("SHADOW_FILTER_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            cache_control: env::var("CACHE_CONTROL").unwrap_or_else(|_| CACHE_CONTROL.to_string()),
            response_mode,
            public_url: env::var("URL").ok().filter(|s| !s.trim().is_empty()),
            single_flight: env_bool("SINGLE_FLIGHT", true),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.bucket.trim().is_empty() || self.bucket.contains('/') {
            return Err(anyhow::anyhow!(
                "BUCKET must be a non-empty name without '/'"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        if self.response_mode == ResponseMode::RedirectToStored && self.public_url.is_none() {
            return Err(anyhow::anyhow!(
                "URL must be set when RESPONSE_MODE=redirect"
            ));
        }

        if self.max_width == 0 || self.max_height == 0 {
            return Err(anyhow::anyhow!("MAX_WIDTH and MAX_HEIGHT must be positive"));
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow::anyhow!("JPEG_QUALITY must be between 1 and 100"));
        }

        if self.enforce_mime_types && self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_CONTENT_TYPES must not be empty when ENFORCE_MIME_TYPES=true"
            ));
        }

        if self.cache_control.trim().is_empty() {
            return Err(anyhow::anyhow!("CACHE_CONTROL must not be empty"));
        }

        Ok(())
    }
}
