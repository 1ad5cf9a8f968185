use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

use super::password::Argon2PasswordHasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(anyhow!(
                "unknown storage backend '{other}', expecting 'memory' or 'postgres'"
            )),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Postgres => f.write_str("postgres"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_level: String,
    pub password_hash_memory_kib: u32,
    pub password_hash_iterations: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Собирает настройки из произвольного источника `key -> value`.
    pub fn from_source(source: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let storage_backend = source("STORAGE_BACKEND")
            .map(|raw| raw.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::Postgres);

        let database_url = source("DATABASE_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(anyhow!(
                "DATABASE_URL is required when STORAGE_BACKEND=postgres"
            ));
        }

        let database_max_connections = parse_u32(&source, "DATABASE_MAX_CONNECTIONS", 5)?;
        // запасной уровень: RUST_LOG, если задан, читает сам EnvFilter
        let log_level = source("LOG_LEVEL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "info".to_string());
        let password_hash_memory_kib = parse_u32(
            &source,
            "PASSWORD_HASH_MEMORY_KIB",
            Argon2PasswordHasher::DEFAULT_MEMORY_KIB,
        )?;
        let password_hash_iterations = parse_u32(
            &source,
            "PASSWORD_HASH_ITERATIONS",
            Argon2PasswordHasher::DEFAULT_ITERATIONS,
        )?;

        Ok(Self {
            storage_backend,
            database_url,
            database_max_connections,
            log_level,
            password_hash_memory_kib,
            password_hash_iterations,
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL is required")
    }
}

fn parse_u32(source: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> Result<u32> {
    let value = match source(key) {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?,
        None => default,
    };

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}
