//! Modelo de la relación gránulo ↔ ejecución.
//!
//! Todas las operaciones reciben la transacción del llamador, salvo
//! `search_by_granule_cumulus_ids`, que se une a la transacción si se la
//! pasan y si no abre su propia lectura.

use log::debug;

use crate::errors::RelationalError;
use crate::model::{GranuleExecution, GranuleExecutionQuery};
use crate::store::{RelationalStore, RelationalTx};

#[derive(Debug, Clone, Copy, Default)]
pub struct GranulesExecutions;

impl GranulesExecutions {
    /// Inserción estricta: un par duplicado es `UniqueViolation`.
    pub fn create(&self, tx: &mut dyn RelationalTx, pair: GranuleExecution) -> Result<(), RelationalError> {
        debug!("granules_executions:create execution={} granule={}",
               pair.execution_cumulus_id,
               pair.granule_cumulus_id);
        tx.create_granule_execution(pair)
    }

    pub fn upsert(&self, tx: &mut dyn RelationalTx, pair: GranuleExecution) -> Result<(), RelationalError> {
        tx.upsert_granule_execution(pair)
    }

    pub fn exists(&self, tx: &mut dyn RelationalTx, pair: GranuleExecution) -> Result<bool, RelationalError> {
        tx.granule_execution_exists(pair)
    }

    pub fn search(&self,
                  tx: &mut dyn RelationalTx,
                  query: GranuleExecutionQuery)
                  -> Result<Vec<GranuleExecution>, RelationalError> {
        tx.search_granule_executions(query)
    }

    /// Borrado idempotente. Devuelve la cantidad de filas borradas.
    pub fn delete(&self, tx: &mut dyn RelationalTx, pair: GranuleExecution) -> Result<usize, RelationalError> {
        tx.delete_granule_execution(pair)
    }

    /// `execution_cumulus_id` distintos vinculados a los gránulos dados.
    pub fn search_by_granule_cumulus_ids<R: RelationalStore>(&self,
                                                             store: &R,
                                                             trx: Option<&mut dyn RelationalTx>,
                                                             granule_cumulus_ids: &[i64])
                                                             -> Result<Vec<i64>, RelationalError> {
        if granule_cumulus_ids.is_empty() {
            return Ok(Vec::new());
        }
        match trx {
            Some(tx) => tx.execution_cumulus_ids_for_granules(granule_cumulus_ids),
            None => store.read_transaction(|tx| tx.execution_cumulus_ids_for_granules(granule_cumulus_ids)),
        }
    }
}
