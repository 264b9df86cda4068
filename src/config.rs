//! Environment-backed configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set")]
    MissingDatabaseUrl,
}

/// Service configuration.
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: listen port (default `8083`)
/// - `NATS_URL`: optional event bus; absent disables publishing
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub nats_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;
        Ok(Self {
            database_url,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8083),
            nats_url: std::env::var("NATS_URL").ok(),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            database_url: "postgres://localhost/agromart".into(),
            host: "127.0.0.1".into(),
            port: 8083,
            nats_url: None,
        };
        assert_eq!(config.addr(), "127.0.0.1:8083");
    }
}
