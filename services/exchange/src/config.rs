//! Service configuration

use std::{env, str::FromStr};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

/// Which store backend the service runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("Unknown store backend '{}'", other)),
        }
    }
}

/// Exchange service configuration
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    pub store: StoreKind,
}

impl ExchangeConfig {
    /// Create a new ExchangeConfig from environment variables
    ///
    /// # Environment Variables
    /// - `EXCHANGE_BIND_ADDR`: Listen address (default: "0.0.0.0:3001")
    /// - `EXCHANGE_STORE`: `postgres` or `memory` (default: "postgres")
    pub fn from_env() -> Result<Self, String> {
        let bind_addr =
            env::var("EXCHANGE_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let store = match env::var("EXCHANGE_STORE") {
            Ok(value) => value.parse()?,
            Err(_) => StoreKind::default(),
        };

        Ok(Self { bind_addr, store })
    }
}

/// Bearer token verification settings
#[derive(Debug, Clone)]
pub enum JwtConfig {
    /// RS256 with the identity service's public key (PEM)
    PublicKey(String),
    /// HS256 with a shared secret
    Secret(String),
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PUBLIC_KEY`: PEM public key, or a path to one
    /// - `JWT_SECRET`: Shared HS256 secret, used when no public key is set
    pub fn from_env() -> Result<Self, String> {
        if let Ok(public_key) = env::var("JWT_PUBLIC_KEY") {
            // Anything that is not inline PEM is read as a file path.
            let public_key = if public_key.starts_with("-----BEGIN") {
                public_key
            } else {
                std::fs::read_to_string(&public_key)
                    .map_err(|e| format!("Failed to read public key file: {}", e))?
                    .trim()
                    .to_string()
            };
            return Ok(JwtConfig::PublicKey(public_key));
        }

        match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => Ok(JwtConfig::Secret(secret)),
            _ => Err("Either JWT_PUBLIC_KEY or JWT_SECRET must be set".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "EXCHANGE_BIND_ADDR",
            "EXCHANGE_STORE",
            "JWT_PUBLIC_KEY",
            "JWT_SECRET",
        ] {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_exchange_config_defaults() {
        clear_env();

        let config = ExchangeConfig::from_env().unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.store, StoreKind::Postgres);
    }

    #[test]
    #[serial]
    fn test_exchange_config_from_env() {
        clear_env();
        unsafe {
            std::env::set_var("EXCHANGE_BIND_ADDR", "127.0.0.1:8080");
            std::env::set_var("EXCHANGE_STORE", "Memory");
        }

        let config = ExchangeConfig::from_env().unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.store, StoreKind::Memory);

        unsafe {
            std::env::set_var("EXCHANGE_STORE", "mongo");
        }
        assert!(ExchangeConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_jwt_config_requires_a_key() {
        clear_env();
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::set_var("JWT_SECRET", "shared-secret");
        }
        assert!(matches!(
            JwtConfig::from_env().unwrap(),
            JwtConfig::Secret(secret) if secret == "shared-secret"
        ));

        clear_env();
    }
}
