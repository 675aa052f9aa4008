//! Configuration management for Inventa
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with INVENTA__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Physical asset token settings
    pub assets: AssetConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key used to verify bearer tokens issued by the login service
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetConfig {
    /// Prefix of generated QR tokens
    pub token_prefix: String,

    /// Insert attempts per unit before a batch fails on token collisions
    pub token_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    pub format: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("INVENTA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("assets.token_prefix", "INV")?
            .set_default("assets.token_attempts", 3)?
            .set_default("logging.format", "pretty")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (INVENTA__ prefix)
            .add_source(
                Environment::with_prefix("INVENTA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_host(host: &str, port: u16) -> Config {
        Config {
            environment: "test".to_string(),
            server: ServerConfig {
                host: host.to_string(),
                port,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/inventa_test".to_string(),
                max_connections: 1,
                min_connections: 1,
            },
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
            },
            assets: AssetConfig {
                token_prefix: "INV".to_string(),
                token_attempts: 3,
            },
            logging: LoggingConfig {
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn test_bind_address_keeps_host_as_given() {
        assert_eq!(config_with_host("0.0.0.0", 3000).bind_address(), "0.0.0.0:3000");
        assert_eq!(config_with_host("localhost", 8080).bind_address(), "localhost:8080");
    }

    #[tokio::test]
    async fn test_listener_binds_to_hostname() {
        let config = config_with_host("localhost", 0);
        let listener = tokio::net::TcpListener::bind(config.bind_address())
            .await
            .unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }
}
