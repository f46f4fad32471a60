//! Implementación Postgres (Diesel) de `RelationalStore`.
//!
//! - Paridad con `InMemoryRelationalStore`: mismas restricciones (unicidad de
//!   `arn` y del par gránulo/ejecución, llaves foráneas, CHECK de `status`).
//! - Cada `transaction` toma una conexión del pool y corre el trabajo dentro de
//!   `build_transaction().read_write()`; un `Err` del trabajo provoca ROLLBACK.
//! - `read_transaction` usa `read_only()`.
//! - Sin reintentos: la política de reintento pertenece al consumidor de la
//!   cola, que ve `RelationalError::is_retryable`.

pub mod models;

use cumulus_core::{Execution, ExecutionRecord, GranuleExecution, GranuleExecutionQuery, RelationalError,
                   RelationalStore, RelationalTx};
use cumulus_message::CollectionRef;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
///
/// Al construirlo se corren las migraciones pendientes (una sola vez).
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real o un proveedor de prueba sin acoplar a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Error interno de `TransactionBuilder::run`: distingue el error del trabajo
/// (se devuelve tal cual) del error de Diesel (BEGIN / COMMIT).
enum TxAbort {
    Work(RelationalError),
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for TxAbort {
    fn from(err: diesel::result::Error) -> Self {
        Self::Db(err)
    }
}

impl TxAbort {
    fn into_relational(self) -> RelationalError {
        match self {
            Self::Work(e) => e,
            Self::Db(e) => PersistenceError::from(e).into(),
        }
    }
}

/// Store relacional sobre Postgres.
pub struct PgRelationalStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgRelationalStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl PgRelationalStore<PoolProvider> {
    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(PoolProvider { pool })
    }
}

impl<P: ConnectionProvider> RelationalStore for PgRelationalStore<P> {
    fn transaction<T, F>(&self, work: F) -> Result<T, RelationalError>
        where F: FnOnce(&mut dyn RelationalTx) -> Result<T, RelationalError>
    {
        let mut conn = self.provider.connection()?;
        conn.build_transaction()
            .read_write()
            .run(|tx_conn| {
                let mut tx = PgTx { conn: tx_conn };
                work(&mut tx).map_err(TxAbort::Work)
            })
            .map_err(|e: TxAbort| {
                let e = e.into_relational();
                warn!("pg_tx:rollback err={e}");
                e
            })
    }

    fn read_transaction<T, F>(&self, work: F) -> Result<T, RelationalError>
        where F: FnOnce(&mut dyn RelationalTx) -> Result<T, RelationalError>
    {
        let mut conn = self.provider.connection()?;
        conn.build_transaction()
            .read_only()
            .run(|tx_conn| {
                let mut tx = PgTx { conn: tx_conn };
                work(&mut tx).map_err(TxAbort::Work)
            })
            .map_err(TxAbort::into_relational)
    }
}

/// Transacción abierta sobre una conexión.
pub struct PgTx<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgTx<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

impl RelationalTx for PgTx<'_> {
    fn collection_cumulus_id(&mut self, collection: &CollectionRef) -> Result<Option<i64>, RelationalError> {
        Ok(models::collection_cumulus_id(self.conn, collection)?)
    }

    fn async_operation_cumulus_id(&mut self, async_operation_id: &str) -> Result<Option<i64>, RelationalError> {
        Ok(models::async_operation_cumulus_id(self.conn, async_operation_id)?)
    }

    fn execution_cumulus_id(&mut self, arn: &str) -> Result<Option<i64>, RelationalError> {
        Ok(models::execution_cumulus_id(self.conn, arn)?)
    }

    fn granule_cumulus_id(&mut self, granule_id: &str) -> Result<Option<i64>, RelationalError> {
        Ok(models::granule_cumulus_id(self.conn, granule_id)?)
    }

    fn get_execution(&mut self, arn: &str) -> Result<Option<Execution>, RelationalError> {
        Ok(models::get_execution(self.conn, arn)?)
    }

    fn upsert_execution(&mut self, record: &ExecutionRecord) -> Result<i64, RelationalError> {
        debug!("pg_upsert_execution:start arn={}", record.arn);
        let cumulus_id = models::upsert_execution(self.conn, record)?;
        debug!("pg_upsert_execution:done arn={} cumulus_id={cumulus_id}", record.arn);
        Ok(cumulus_id)
    }

    fn create_granule_execution(&mut self, pair: GranuleExecution) -> Result<(), RelationalError> {
        Ok(models::create_granule_execution(self.conn, pair)?)
    }

    fn upsert_granule_execution(&mut self, pair: GranuleExecution) -> Result<(), RelationalError> {
        Ok(models::upsert_granule_execution(self.conn, pair)?)
    }

    fn granule_execution_exists(&mut self, pair: GranuleExecution) -> Result<bool, RelationalError> {
        Ok(models::granule_execution_exists(self.conn, pair)?)
    }

    fn search_granule_executions(&mut self,
                                 query: GranuleExecutionQuery)
                                 -> Result<Vec<GranuleExecution>, RelationalError> {
        Ok(models::search_granule_executions(self.conn, query)?)
    }

    fn delete_granule_execution(&mut self, pair: GranuleExecution) -> Result<usize, RelationalError> {
        Ok(models::delete_granule_execution(self.conn, pair)?)
    }

    fn execution_cumulus_ids_for_granules(&mut self, granule_cumulus_ids: &[i64]) -> Result<Vec<i64>, RelationalError> {
        Ok(models::execution_cumulus_ids_for_granules(self.conn, granule_cumulus_ids)?)
    }
}

/// Construye un pool Postgres r2d2 a partir de URL.
///
/// - Si `min_size > max_size`, usa `min_size = max_size`.
/// - Ejecuta migraciones inmediatamente tras el primer `get()`.
/// - Devuelve `PersistenceError::TransientIo` ante errores del pool/manager.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = if min_size == 0 { 1 } else { min_size };
    let validated_max = if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración (DATABASE_URL,
/// tamaños) y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
