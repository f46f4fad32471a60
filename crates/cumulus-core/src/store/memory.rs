//! Backends en memoria con paridad respecto a Postgres.
//!
//! - `InMemoryExecutionStatusStore`: `DashMap` por ARN (upsert concurrente
//!   sin lock global).
//! - `InMemoryRelationalStore`: estado completo detrás de un `Mutex`. Cada
//!   transacción trabaja sobre una copia y sólo la publica si el trabajo
//!   devuelve `Ok`; un `Err` descarta la copia. El mutex se
//!   mantiene durante toda la transacción, así que las transacciones quedan
//!   serializadas.
//!
//! Las secuencias de ids viven fuera de la copia: un id asignado en una
//! transacción revertida no se reutiliza (igual que un BIGSERIAL).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use cumulus_message::{CollectionRef, CumulusMessage};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use uuid::Uuid;

use super::{ExecutionStatusStore, RelationalStore, RelationalTx};
use crate::errors::{KvStoreError, RelationalError};
use crate::model::{Execution, ExecutionRecord, ExecutionStatusRecord, GranuleExecution, GranuleExecutionQuery};
use crate::translate::build_status_record;

#[derive(Debug, Default)]
pub struct InMemoryExecutionStatusStore {
    records: DashMap<String, ExecutionStatusRecord>,
}

impl InMemoryExecutionStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ExecutionStatusStore for InMemoryExecutionStatusStore {
    fn store_execution_from_message(&self, message: &CumulusMessage) -> Result<ExecutionStatusRecord, KvStoreError> {
        let arn = message.execution_arn()
                         .ok_or_else(|| KvStoreError::InvalidRecord("message does not yield an execution arn".into()))?;
        debug!("kv_store_execution:start arn={arn}");
        let record = build_status_record(message, &arn, Utc::now());
        let stored = match self.records.entry(arn) {
            Entry::Occupied(mut e) => {
                e.get_mut().merge_from(record);
                e.get().clone()
            }
            Entry::Vacant(e) => e.insert(record).value().clone(),
        };
        debug!("kv_store_execution:done arn={} status={}", stored.arn, stored.status.as_str());
        Ok(stored)
    }

    fn exists(&self, arn: &str) -> Result<bool, KvStoreError> {
        Ok(self.records.contains_key(arn))
    }

    fn get(&self, arn: &str) -> Result<Option<ExecutionStatusRecord>, KvStoreError> {
        Ok(self.records.get(arn).map(|r| r.value().clone()))
    }
}

/// Tablas relacionales. Los `IndexMap`/`IndexSet` conservan orden de
/// inserción para `search`.
#[derive(Debug, Clone, Default)]
struct RelationalState {
    collections: IndexMap<CollectionRef, i64>,
    async_operations: IndexMap<Uuid, i64>,
    granules: IndexMap<String, i64>,
    executions: IndexMap<String, Execution>,
    granule_executions: IndexSet<GranuleExecution>,
}

impl RelationalState {
    fn has_execution_id(&self, cumulus_id: i64) -> bool {
        self.executions.values().any(|e| e.cumulus_id == cumulus_id)
    }

    fn has_granule_id(&self, cumulus_id: i64) -> bool {
        self.granules.values().any(|id| *id == cumulus_id)
    }

    fn check_pair_references(&self, pair: &GranuleExecution) -> Result<(), RelationalError> {
        if !self.has_execution_id(pair.execution_cumulus_id) {
            return Err(RelationalError::ForeignKeyViolation(format!("execution_cumulus_id={} not present",
                                                                    pair.execution_cumulus_id)));
        }
        if !self.has_granule_id(pair.granule_cumulus_id) {
            return Err(RelationalError::ForeignKeyViolation(format!("granule_cumulus_id={} not present",
                                                                    pair.granule_cumulus_id)));
        }
        Ok(())
    }

    fn check_execution_references(&self, record: &ExecutionRecord) -> Result<(), RelationalError> {
        if let Some(id) = record.collection_cumulus_id {
            if !self.collections.values().any(|c| *c == id) {
                return Err(RelationalError::ForeignKeyViolation(format!("collection_cumulus_id={id} not present")));
            }
        }
        if let Some(id) = record.parent_cumulus_id {
            if !self.has_execution_id(id) {
                return Err(RelationalError::ForeignKeyViolation(format!("parent_cumulus_id={id} not present")));
            }
        }
        if let Some(id) = record.async_operation_cumulus_id {
            if !self.async_operations.values().any(|a| *a == id) {
                return Err(RelationalError::ForeignKeyViolation(format!("async_operation_cumulus_id={id} not present")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRelationalStore {
    state: Mutex<RelationalState>,
    execution_seq: AtomicI64,
    reference_seq: AtomicI64,
}

impl InMemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Un pánico dentro de una transacción envenena el mutex, pero la copia
    /// de trabajo se descarta en el unwind: el estado publicado sigue íntegro.
    fn lock(&self) -> MutexGuard<'_, RelationalState> {
        self.state.lock().unwrap_or_else(|poisoned| {
                              warn!("memory_store:lock recovered after panic in a transaction");
                              PoisonError::into_inner(poisoned)
                          })
    }

    fn next_reference_id(&self) -> i64 {
        self.reference_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Registra una colección (idempotente) y devuelve su `cumulus_id`.
    pub fn insert_collection(&self, collection: &CollectionRef) -> Result<i64, RelationalError> {
        let mut state = self.lock();
        if let Some(id) = state.collections.get(collection) {
            return Ok(*id);
        }
        let id = self.next_reference_id();
        state.collections.insert(collection.clone(), id);
        Ok(id)
    }

    /// El id debe ser un UUID (misma columna `UUID` que en Postgres).
    pub fn insert_async_operation(&self, async_operation_id: &str) -> Result<i64, RelationalError> {
        let key = Uuid::parse_str(async_operation_id).map_err(|e| {
                      RelationalError::CheckViolation(format!("async operation id {async_operation_id:?} is not a UUID: {e}"))
                  })?;
        let mut state = self.lock();
        if let Some(id) = state.async_operations.get(&key) {
            return Ok(*id);
        }
        let id = self.next_reference_id();
        state.async_operations.insert(key, id);
        Ok(id)
    }

    pub fn insert_granule(&self, granule_id: &str) -> Result<i64, RelationalError> {
        let mut state = self.lock();
        if let Some(id) = state.granules.get(granule_id) {
            return Ok(*id);
        }
        let id = self.next_reference_id();
        state.granules.insert(granule_id.to_string(), id);
        Ok(id)
    }

    pub fn execution(&self, arn: &str) -> Result<Option<Execution>, RelationalError> {
        Ok(self.lock().executions.get(arn).cloned())
    }

    pub fn execution_count(&self) -> Result<usize, RelationalError> {
        Ok(self.lock().executions.len())
    }

    pub fn granule_execution_count(&self) -> Result<usize, RelationalError> {
        Ok(self.lock().granule_executions.len())
    }
}

impl RelationalStore for InMemoryRelationalStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, RelationalError>
        where F: FnOnce(&mut dyn RelationalTx) -> Result<T, RelationalError>
    {
        let mut guard = self.lock();
        let mut working = guard.clone();
        let mut tx = MemoryTx { state: &mut working, execution_seq: &self.execution_seq };
        match work(&mut tx) {
            Ok(value) => {
                *guard = working;
                Ok(value)
            }
            Err(e) => {
                debug!("memory_tx:rollback err={e}");
                Err(e)
            }
        }
    }
}

struct MemoryTx<'a> {
    state: &'a mut RelationalState,
    execution_seq: &'a AtomicI64,
}

impl RelationalTx for MemoryTx<'_> {
    fn collection_cumulus_id(&mut self, collection: &CollectionRef) -> Result<Option<i64>, RelationalError> {
        Ok(self.state.collections.get(collection).copied())
    }

    /// Un id que no es UUID no puede existir.
    fn async_operation_cumulus_id(&mut self, async_operation_id: &str) -> Result<Option<i64>, RelationalError> {
        let Ok(key) = Uuid::parse_str(async_operation_id) else {
            return Ok(None);
        };
        Ok(self.state.async_operations.get(&key).copied())
    }

    fn execution_cumulus_id(&mut self, arn: &str) -> Result<Option<i64>, RelationalError> {
        Ok(self.state.executions.get(arn).map(|e| e.cumulus_id))
    }

    fn granule_cumulus_id(&mut self, granule_id: &str) -> Result<Option<i64>, RelationalError> {
        Ok(self.state.granules.get(granule_id).copied())
    }

    fn get_execution(&mut self, arn: &str) -> Result<Option<Execution>, RelationalError> {
        Ok(self.state.executions.get(arn).cloned())
    }

    fn upsert_execution(&mut self, record: &ExecutionRecord) -> Result<i64, RelationalError> {
        self.state.check_execution_references(record)?;
        if let Some(existing) = self.state.executions.get_mut(&record.arn) {
            existing.record.merge_from(record.clone());
            return Ok(existing.cumulus_id);
        }
        let cumulus_id = self.execution_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .executions
            .insert(record.arn.clone(), Execution { cumulus_id, record: record.clone() });
        Ok(cumulus_id)
    }

    fn create_granule_execution(&mut self, pair: GranuleExecution) -> Result<(), RelationalError> {
        self.state.check_pair_references(&pair)?;
        if !self.state.granule_executions.insert(pair) {
            return Err(RelationalError::UniqueViolation(format!("granules_executions pair ({}, {}) already exists",
                                                                pair.execution_cumulus_id,
                                                                pair.granule_cumulus_id)));
        }
        Ok(())
    }

    fn upsert_granule_execution(&mut self, pair: GranuleExecution) -> Result<(), RelationalError> {
        self.state.check_pair_references(&pair)?;
        self.state.granule_executions.insert(pair);
        Ok(())
    }

    fn granule_execution_exists(&mut self, pair: GranuleExecution) -> Result<bool, RelationalError> {
        Ok(self.state.granule_executions.contains(&pair))
    }

    fn search_granule_executions(&mut self,
                                 query: GranuleExecutionQuery)
                                 -> Result<Vec<GranuleExecution>, RelationalError> {
        Ok(self.state.granule_executions.iter().filter(|p| query.matches(p)).copied().collect())
    }

    fn delete_granule_execution(&mut self, pair: GranuleExecution) -> Result<usize, RelationalError> {
        Ok(usize::from(self.state.granule_executions.shift_remove(&pair)))
    }

    fn execution_cumulus_ids_for_granules(&mut self, granule_cumulus_ids: &[i64]) -> Result<Vec<i64>, RelationalError> {
        let ids: IndexSet<i64> = self.state
                                     .granule_executions
                                     .iter()
                                     .filter(|p| granule_cumulus_ids.contains(&p.granule_cumulus_id))
                                     .map(|p| p.execution_cumulus_id)
                                     .collect();
        Ok(ids.into_iter().collect())
    }
}
