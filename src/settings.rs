use config::{Config, ConfigError, Environment, File};
use dotenv::dotenv;
use serde::Deserialize;
use std::{env, fmt, str::FromStr};

pub const MIN_PRESIGN_TTL_SECS: u64 = 60;
pub const MAX_PRESIGN_TTL_SECS: u64 = 86_400;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_aws_region")]
    pub aws_region: String,

    /// Custom endpoint for S3/DynamoDB, e.g. a LocalStack URL. Production
    /// deployments leave this unset and use the real AWS endpoints.
    #[serde(default)]
    pub aws_endpoint_url: Option<String>,

    #[serde(default = "default_s3_bucket")]
    pub s3_bucket: String,

    #[serde(default = "default_dynamodb_table")]
    pub dynamodb_table: String,

    #[serde(default = "default_presign_ttl")]
    pub presign_ttl_secs: u64,

    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_name() -> String {
    "Imagehost-API".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_aws_region() -> String {
    "us-east-1".to_string()
}
fn default_s3_bucket() -> String {
    "imagehost-images".to_string()
}
fn default_dynamodb_table() -> String {
    "ImageMetadata".to_string()
}
fn default_presign_ttl() -> u64 {
    3600
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)
            .map_err(|_| ConfigError::Message(format!("Invalid APP_ENV value: {}", raw_env)))?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                File::with_name(&format!("config/{}", env_name.to_string().to_lowercase()))
                    .required(false),
            )
            .add_source(Environment::with_prefix("APP").separator("_").ignore_empty(true));

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.env = env_name;

        if config.aws_endpoint_url.is_none() {
            config.aws_endpoint_url = env::var("APP_AWS_ENDPOINT_URL").ok();
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.s3_bucket.trim().is_empty() {
            errors.push("S3_BUCKET cannot be empty".to_string());
        }
        if self.dynamodb_table.trim().is_empty() {
            errors.push("DYNAMODB_TABLE cannot be empty".to_string());
        }
        if !(MIN_PRESIGN_TTL_SECS..=MAX_PRESIGN_TTL_SECS).contains(&self.presign_ttl_secs) {
            errors.push(format!(
                "PRESIGN_TTL_SECS must be between {} and {}",
                MIN_PRESIGN_TTL_SECS, MAX_PRESIGN_TTL_SECS
            ));
        }
        if self.is_production() && self.cors_origins().iter().any(|o| o == "*") {
            errors.push("Wildcard CORS (*) is not allowed in production".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .iter()
            .flat_map(|origin| origin.split(','))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}
