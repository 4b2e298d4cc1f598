use std::env;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub clearance: ClearanceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            clearance: ClearanceConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Business settings for the clearance lifecycle.
#[derive(Debug, Clone)]
pub struct ClearanceConfig {
    /// Calendar months a released clearance stays valid.
    pub validity_months: u32,
    /// Prefix stamped onto every reference number.
    pub reference_prefix: String,
    /// Seconds between expiry sweeps when the background job is running.
    pub expiry_sweep_seconds: u64,
}

impl ClearanceConfig {
    fn load() -> Result<Self, ConfigError> {
        let validity_months = env::var("CLEARANCE_VALIDITY_MONTHS")
            .unwrap_or_else(|_| "6".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidValidity)?;
        if validity_months == 0 {
            return Err(ConfigError::InvalidValidity);
        }

        let reference_prefix =
            env::var("CLEARANCE_REFERENCE_PREFIX").unwrap_or_else(|_| "CLR".to_string());

        let expiry_sweep_seconds = env::var("CLEARANCE_EXPIRY_SWEEP_SECONDS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidSweepInterval)?;

        Ok(Self {
            validity_months,
            reference_prefix,
            expiry_sweep_seconds,
        })
    }
}

impl Default for ClearanceConfig {
    fn default() -> Self {
        Self {
            validity_months: 6,
            reference_prefix: "CLR".to_string(),
            expiry_sweep_seconds: 86_400,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("CLEARANCE_VALIDITY_MONTHS must be a positive integer")]
    InvalidValidity,
    #[error("CLEARANCE_EXPIRY_SWEEP_SECONDS must be a positive integer")]
    InvalidSweepInterval,
}
