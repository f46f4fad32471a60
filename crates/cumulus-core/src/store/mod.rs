//! Contratos de los dos stores durables.
//!
//! - `ExecutionStatusStore`: store clave/valor, fuente de verdad del estado
//!   en vivo. Upsert por ARN.
//! - `RelationalStore`: store relacional con transacción acotada. El trabajo
//!   recibe un `&mut dyn RelationalTx`; `Ok` confirma y `Err` revierte.
//!
//! Cada backend (memoria / Postgres) debe comportarse igual ante los mismos
//! datos: mismas restricciones de unicidad y de llaves foráneas.

pub mod memory;

use cumulus_message::{CollectionRef, CumulusMessage};

use crate::errors::{KvStoreError, RelationalError};
use crate::model::{Execution, ExecutionRecord, ExecutionStatusRecord, GranuleExecution, GranuleExecutionQuery};

pub use memory::{InMemoryExecutionStatusStore, InMemoryRelationalStore};

pub trait ExecutionStatusStore: Send + Sync {
    /// Traduce el mensaje a registro y hace upsert por `arn`.
    fn store_execution_from_message(&self, message: &CumulusMessage) -> Result<ExecutionStatusRecord, KvStoreError>;
    fn exists(&self, arn: &str) -> Result<bool, KvStoreError>;
    fn get(&self, arn: &str) -> Result<Option<ExecutionStatusRecord>, KvStoreError>;
}

/// Operaciones disponibles dentro de una transacción relacional.
pub trait RelationalTx {
    fn collection_cumulus_id(&mut self, collection: &CollectionRef) -> Result<Option<i64>, RelationalError>;
    fn async_operation_cumulus_id(&mut self, async_operation_id: &str) -> Result<Option<i64>, RelationalError>;
    fn execution_cumulus_id(&mut self, arn: &str) -> Result<Option<i64>, RelationalError>;
    fn granule_cumulus_id(&mut self, granule_id: &str) -> Result<Option<i64>, RelationalError>;

    fn get_execution(&mut self, arn: &str) -> Result<Option<Execution>, RelationalError>;
    /// Inserta o actualiza por `arn`; devuelve el `cumulus_id` (estable entre
    /// upserts del mismo ARN).
    fn upsert_execution(&mut self, record: &ExecutionRecord) -> Result<i64, RelationalError>;

    /// Falla con `UniqueViolation` si el par ya existe.
    fn create_granule_execution(&mut self, pair: GranuleExecution) -> Result<(), RelationalError>;
    /// Inserta o no hace nada si el par ya existe.
    fn upsert_granule_execution(&mut self, pair: GranuleExecution) -> Result<(), RelationalError>;
    fn granule_execution_exists(&mut self, pair: GranuleExecution) -> Result<bool, RelationalError>;
    /// Pares que coinciden con la clave parcial, en orden de inserción.
    fn search_granule_executions(&mut self,
                                 query: GranuleExecutionQuery)
                                 -> Result<Vec<GranuleExecution>, RelationalError>;
    /// Idempotente: devuelve la cantidad de filas borradas (0 o 1).
    fn delete_granule_execution(&mut self, pair: GranuleExecution) -> Result<usize, RelationalError>;
    /// `execution_cumulus_id` distintos asociados a los gránulos dados.
    fn execution_cumulus_ids_for_granules(&mut self, granule_cumulus_ids: &[i64]) -> Result<Vec<i64>, RelationalError>;
}

pub trait RelationalStore: Send + Sync {
    /// Ejecuta `work` en una transacción de lectura/escritura.
    fn transaction<T, F>(&self, work: F) -> Result<T, RelationalError>
        where F: FnOnce(&mut dyn RelationalTx) -> Result<T, RelationalError>;

    /// Lecturas sin efectos. Por defecto usa la misma transacción.
    fn read_transaction<T, F>(&self, work: F) -> Result<T, RelationalError>
        where F: FnOnce(&mut dyn RelationalTx) -> Result<T, RelationalError>
    {
        self.transaction(work)
    }
}

impl<S: RelationalStore> RelationalStore for &S {
    fn transaction<T, F>(&self, work: F) -> Result<T, RelationalError>
        where F: FnOnce(&mut dyn RelationalTx) -> Result<T, RelationalError>
    {
        (**self).transaction(work)
    }

    fn read_transaction<T, F>(&self, work: F) -> Result<T, RelationalError>
        where F: FnOnce(&mut dyn RelationalTx) -> Result<T, RelationalError>
    {
        (**self).read_transaction(work)
    }
}

impl<S: ExecutionStatusStore + ?Sized> ExecutionStatusStore for &S {
    fn store_execution_from_message(&self, message: &CumulusMessage) -> Result<ExecutionStatusRecord, KvStoreError> {
        (**self).store_execution_from_message(message)
    }
    fn exists(&self, arn: &str) -> Result<bool, KvStoreError> {
        (**self).exists(arn)
    }
    fn get(&self, arn: &str) -> Result<Option<ExecutionStatusRecord>, KvStoreError> {
        (**self).get(arn)
    }
}
