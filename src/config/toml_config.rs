use crate::utils::error::{OngkirError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub carrier_api: CarrierApiConfig,
    pub datastore: DatastoreConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// 運費 API 設定，建構時明確傳入而非讀取全域環境變數
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierApiConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_carriers")]
    pub carriers: Vec<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl CarrierApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl DatastoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// 無任何物流商報價時使用的線性估價模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub base_rate: f64,
    pub per_km_rate: f64,
    pub per_kg_rate: f64,
    pub placeholder_distance_km: f64,
    pub use_geodesic_distance: bool,
    pub carrier_code: String,
    pub carrier_name: String,
    pub service: String,
    pub description: String,
    pub etd: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            base_rate: 10_000.0,
            per_km_rate: 2_000.0,
            per_kg_rate: 5_000.0,
            placeholder_distance_km: 10.0,
            use_geodesic_distance: false,
            carrier_code: "jne".to_string(),
            carrier_name: "Jalur Nugraha Ekakurir (JNE)".to_string(),
            service: "REG".to_string(),
            description: "Layanan Reguler".to_string(),
            etd: "3-5".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub verbose: bool,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_carriers() -> Vec<String> {
    vec!["jne".to_string(), "pos".to_string(), "tiki".to_string()]
}

fn default_timeout_seconds() -> u64 {
    10
}

impl ServiceConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OngkirError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| OngkirError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RAJAONGKIR_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| OngkirError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("server.bind_address", &self.server.bind_address)?;

        validation::validate_url("carrier_api.base_url", &self.carrier_api.base_url)?;
        validation::validate_resolved("carrier_api.api_key", &self.carrier_api.api_key)?;
        validation::validate_non_empty_string("carrier_api.api_key", &self.carrier_api.api_key)?;
        validation::validate_range("carrier_api.timeout_seconds", self.carrier_api.timeout_seconds, 1, 120)?;

        if self.carrier_api.carriers.is_empty() {
            return Err(OngkirError::InvalidConfigValueError {
                field: "carrier_api.carriers".to_string(),
                value: "[]".to_string(),
                reason: "At least one carrier is required".to_string(),
            });
        }
        for carrier in &self.carrier_api.carriers {
            validation::validate_non_empty_string("carrier_api.carriers", carrier)?;
        }

        validation::validate_url("datastore.url", &self.datastore.url)?;
        validation::validate_resolved("datastore.api_key", &self.datastore.api_key)?;
        validation::validate_non_empty_string("datastore.api_key", &self.datastore.api_key)?;
        validation::validate_positive_number("datastore.timeout_seconds", self.datastore.timeout_seconds, 1)?;

        let fallback = &self.fallback;
        for (field, value) in [
            ("fallback.base_rate", fallback.base_rate),
            ("fallback.per_km_rate", fallback.per_km_rate),
            ("fallback.per_kg_rate", fallback.per_kg_rate),
            ("fallback.placeholder_distance_km", fallback.placeholder_distance_km),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(OngkirError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "Value must be a non-negative number".to_string(),
                });
            }
        }
        validation::validate_non_empty_string("fallback.carrier_code", &fallback.carrier_code)?;

        tracing::debug!("✅ Service configuration validation passed");
        Ok(())
    }
}
