use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub grpc: GrpcConfig,
    pub policy: PolicyConfig,
    pub log: LogConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrpcConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub path: Option<PathBuf>,
    pub inline: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "0.0.0.0".to_string(),
            port: 9090,
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e.to_string()))?;
            toml::from_str::<AppConfig>(&contents)
                .map_err(|e| ConfigError::ParseToml(e.to_string()))?
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TURNSTILE_GRPC_HOST") {
            self.grpc.host = v;
        }
        if let Ok(v) = std::env::var("TURNSTILE_GRPC_PORT")
            && let Ok(port) = v.parse()
        {
            self.grpc.port = port;
        }
        if let Ok(v) = std::env::var("TURNSTILE_POLICY_PATH") {
            self.policy.path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("TURNSTILE_POLICY") {
            self.policy.inline = Some(v);
        }
        if let Ok(v) = std::env::var("TURNSTILE_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Ok(v) = std::env::var("TURNSTILE_LOG_FORMAT") {
            match v.as_str() {
                "json" => self.log.format = LogFormat::Json,
                "pretty" => self.log.format = LogFormat::Pretty,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("TURNSTILE_METRICS_ENABLED")
            && let Ok(enabled) = v.parse()
        {
            self.metrics.enabled = enabled;
        }
        if let Ok(v) = std::env::var("TURNSTILE_METRICS_PORT")
            && let Ok(port) = v.parse()
        {
            self.metrics.port = port;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.grpc.port == 0 {
            return Err(ConfigError::Validation(
                "grpc.port must be non-zero".to_string(),
            ));
        }
        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Validation(
                "metrics.port must be non-zero when metrics are enabled".to_string(),
            ));
        }
        if self.policy.path.is_some() && self.policy.inline.is_some() {
            return Err(ConfigError::Validation(
                "set only one of policy.path and policy.inline".to_string(),
            ));
        }
        Ok(())
    }

    pub fn read_policy(&self) -> Result<String, ConfigError> {
        match (&self.policy.path, &self.policy.inline) {
            (Some(path), _) => std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadPolicy(path.display().to_string(), e.to_string())),
            (None, Some(inline)) => Ok(inline.clone()),
            (None, None) => Err(ConfigError::Validation(
                "no access policy configured (policy.path or policy.inline)".to_string(),
            )),
        }
    }

    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.grpc.host, self.grpc.port)
    }

    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.metrics.host, self.metrics.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    ReadFile(String, String),

    #[error("failed to parse TOML config: {0}")]
    ParseToml(String),

    #[error("failed to read policy file '{0}': {1}")]
    ReadPolicy(String, String),

    #[error("config validation failed: {0}")]
    Validation(String),
}
