//! cumulus-persistence
//!
//! Implementación Postgres (Diesel) de `RelationalStore` con paridad respecto
//! al backend en memoria de `cumulus-core`.
//!
//! Módulos:
//! - `pg`: store relacional, transacciones y consultas por tabla.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgPool, PgRelationalStore, PgTx, PoolProvider};
