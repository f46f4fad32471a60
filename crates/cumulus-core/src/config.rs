//! Configuración del motor desde variables de entorno.
//! Convención: `RDS_DEPLOYMENT_CUMULUS_VERSION` define la versión de corte
//! a partir de la cual los productores escriben también en el store relacional.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

pub const CUTOVER_VERSION_ENV: &str = "RDS_DEPLOYMENT_CUMULUS_VERSION";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Versión de corte tal como viene configurada. `None` si no está definida;
    /// el gate lo reporta como error de configuración al evaluar.
    pub relational_cutover_version: Option<String>,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let relational_cutover_version = env::var(CUTOVER_VERSION_ENV).ok().filter(|v| !v.trim().is_empty());
        Self { relational_cutover_version }
    }

    pub fn with_cutover(version: impl Into<String>) -> Self {
        Self { relational_cutover_version: Some(version.into()) }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
