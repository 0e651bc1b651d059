use crate::error::{AppError, Result};
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_address: String,
    pub storage_dir: String,
    pub max_upload_size: usize,
    pub default_quota: i64,
    pub min_quota: i64,
    pub admin_quota: i64,
    pub admin_contact: String,
    pub cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://stratus.db".to_string()),

            server_address: env::var("SERVER_ADDRESS")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string()),

            storage_dir: env::var("STORAGE_DIR").unwrap_or_else(|_| "./storage".to_string()),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .unwrap_or_else(|_| "100".to_string()) // Default 100MB
                .parse::<usize>()
                .map_err(|_| AppError::ConfigError("Invalid MAX_UPLOAD_SIZE".to_string()))?
                * 1024
                * 1024, // Convert MB to bytes

            default_quota: env::var("DEFAULT_QUOTA")
                .unwrap_or_else(|_| "5120".to_string()) // Default 5GB
                .parse::<i64>()
                .map_err(|_| AppError::ConfigError("Invalid DEFAULT_QUOTA".to_string()))?
                * 1024
                * 1024, // Convert MB to bytes

            min_quota: env::var("MIN_QUOTA")
                .unwrap_or_else(|_| "1".to_string()) // Default 1MB
                .parse::<i64>()
                .map_err(|_| AppError::ConfigError("Invalid MIN_QUOTA".to_string()))?
                * 1024
                * 1024, // Convert MB to bytes

            admin_quota: env::var("ADMIN_QUOTA")
                .unwrap_or_else(|_| "10240".to_string()) // Default 10GB
                .parse::<i64>()
                .map_err(|_| AppError::ConfigError("Invalid ADMIN_QUOTA".to_string()))?
                * 1024
                * 1024, // Convert MB to bytes

            admin_contact: env::var("ADMIN_CONTACT")
                .unwrap_or_else(|_| "admin@example.com".to_string()),

            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| AppError::ConfigError("Invalid CACHE_TTL_SECS".to_string()))?,
        })
    }
}
