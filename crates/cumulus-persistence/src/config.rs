//! Configuración de conexión del store relacional.
//!
//! Variables: `DATABASE_URL` (obligatoria), `DATABASE_MIN_CONNECTIONS` y
//! `DATABASE_MAX_CONNECTIONS` (opcionales; un valor ilegible usa el default).

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const MIN_CONNECTIONS_ENV: &str = "DATABASE_MIN_CONNECTIONS";
pub const MAX_CONNECTIONS_ENV: &str = "DATABASE_MAX_CONNECTIONS";

const DEFAULT_MIN_CONNECTIONS: u32 = 2;
const DEFAULT_MAX_CONNECTIONS: u32 = 16;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv();
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        Lazy::force(&DOTENV_LOADED);
        let url = env::var(DATABASE_URL_ENV).ok()
                                            .filter(|v| !v.trim().is_empty())
                                            .ok_or_else(|| {
                                                PersistenceError::Configuration(format!("{DATABASE_URL_ENV} no definido"))
                                            })?;
        Ok(Self::from_parts(url,
                            env::var(MIN_CONNECTIONS_ENV).ok().as_deref(),
                            env::var(MAX_CONNECTIONS_ENV).ok().as_deref()))
    }

    /// Arma la configuración a partir de valores crudos.
    pub fn from_parts(url: impl Into<String>, min: Option<&str>, max: Option<&str>) -> Self {
        Self { url: url.into(),
               min_connections: pool_size(min, DEFAULT_MIN_CONNECTIONS),
               max_connections: pool_size(max, DEFAULT_MAX_CONNECTIONS) }
    }
}

fn pool_size(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Fuerza la carga de .env (idempotente).
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
