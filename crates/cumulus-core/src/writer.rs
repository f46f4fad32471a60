//! Coordinador de doble escritura de ejecuciones.
//!
//! Orden por evento:
//! 0. pre-chequeo: el mensaje produce un ARN y la versión de corte está
//!    configurada (si falla, no se escribe nada);
//! 1. upsert en el store clave/valor (si falla, no hay escritura relacional);
//! 2. resolución de la colección (un fallo cuenta como ausente);
//! 3. gate de versión;
//! 4. una transacción relacional: revalidar referencias, upsert de la
//!    ejecución por `arn` y vínculos gránulo/ejecución.
//!
//! La escritura clave/valor no se revierte si falla la relacional: el store
//! clave/valor siempre tiene el estado más reciente.

use chrono::Utc;
use cumulus_message::CumulusMessage;
use log::{debug, error, warn};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::errors::{RelationalError, WriteError};
use crate::existence::{require_reference_in, ReferenceKind};
use crate::gate::{GateDecision, SkipReason, VersionGate};
use crate::model::GranuleExecution;
use crate::store::{ExecutionStatusStore, RelationalStore, RelationalTx};
use crate::translate::{build_execution_record, ResolvedReferences};

/// Resultado de una escritura exitosa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Fila relacional confirmada con su `cumulus_id`.
    Written { cumulus_id: i64 },
    /// Sólo se escribió el store clave/valor.
    RelationalSkipped { reason: SkipReason },
}

impl WriteOutcome {
    /// `None` es el centinela de "relacional omitido".
    pub fn relational_id(&self) -> Option<i64> {
        match self {
            Self::Written { cumulus_id } => Some(*cumulus_id),
            Self::RelationalSkipped { .. } => None,
        }
    }
}

pub struct ExecutionWriter<K, R> {
    kv: K,
    relational: R,
    gate: VersionGate,
}

impl<K: ExecutionStatusStore, R: RelationalStore> ExecutionWriter<K, R> {
    pub fn new(kv: K, relational: R, gate: VersionGate) -> Self {
        Self { kv, relational, gate }
    }

    pub fn from_config(kv: K, relational: R, config: &EngineConfig) -> Self {
        Self::new(kv, relational, VersionGate::new(config))
    }

    pub fn kv_store(&self) -> &K {
        &self.kv
    }

    pub fn relational_store(&self) -> &R {
        &self.relational
    }

    pub fn gate(&self) -> &VersionGate {
        &self.gate
    }

    /// Valida el JSON crudo del evento y lo escribe.
    pub fn write_execution_value(&self, event: Value) -> Result<WriteOutcome, WriteError> {
        let message = CumulusMessage::from_value(event)?;
        self.write_execution(&message)
    }

    pub fn write_execution(&self, message: &CumulusMessage) -> Result<WriteOutcome, WriteError> {
        let arn = message.execution_arn()
                         .ok_or_else(|| WriteError::InvalidMessage("message does not yield an execution arn".into()))?;
        self.gate.cutover()?;
        debug!("write_execution:start arn={arn}");

        self.kv.store_execution_from_message(message).map_err(|e| {
                                                          error!("write_execution:kv_failed arn={arn} err={e}");
                                                          WriteError::KeyValueWrite(e)
                                                      })?;

        let collection_cumulus_id = self.lookup_collection(message);
        let reason = match self.gate.evaluate(&self.relational, message, collection_cumulus_id)? {
            GateDecision::Write => None,
            GateDecision::Skip(reason) => Some(reason),
        };
        if let Some(reason) = reason {
            debug!("write_execution:done arn={arn} relational=skipped reason={reason:?}");
            return Ok(WriteOutcome::RelationalSkipped { reason });
        }

        let cumulus_id = self.relational
                             .transaction(|tx| write_relational(tx, message, &arn, collection_cumulus_id))
                             .map_err(|e| {
                                 error!("write_execution:relational_failed arn={arn} retryable={} err={e}",
                                        e.is_retryable());
                                 WriteError::RelationalTransaction(e)
                             })?;
        debug!("write_execution:done arn={arn} cumulus_id={cumulus_id}");
        Ok(WriteOutcome::Written { cumulus_id })
    }

    /// Resuelve `meta.collection` a su `cumulus_id`. Un fallo de consulta se
    /// registra y se trata como colección ausente.
    fn lookup_collection(&self, message: &CumulusMessage) -> Option<i64> {
        let collection = message.collection()?;
        match self.relational.read_transaction(|tx| tx.collection_cumulus_id(&collection)) {
            Ok(id) => id,
            Err(e) => {
                warn!("collection_lookup:failed collection={} err={e}", collection.collection_id());
                None
            }
        }
    }
}

fn write_relational(tx: &mut dyn RelationalTx,
                    message: &CumulusMessage,
                    arn: &str,
                    collection_cumulus_id: Option<i64>)
                    -> Result<i64, RelationalError> {
    let parent_cumulus_id = require_reference_in(tx, ReferenceKind::ParentExecution, message)?;
    let async_operation_cumulus_id = require_reference_in(tx, ReferenceKind::AsyncOperation, message)?;
    let refs = ResolvedReferences { collection_cumulus_id, parent_cumulus_id, async_operation_cumulus_id };
    let record = build_execution_record(message, arn, refs, Utc::now());
    let cumulus_id = tx.upsert_execution(&record)?;

    // Sólo se vinculan gránulos que ya existen en el store relacional.
    for granule_id in message.granule_ids() {
        match tx.granule_cumulus_id(granule_id)? {
            Some(granule_cumulus_id) => {
                tx.upsert_granule_execution(GranuleExecution { execution_cumulus_id: cumulus_id, granule_cumulus_id })?
            }
            None => debug!("write_execution:granule_not_found granule_id={granule_id} arn={arn}"),
        }
    }
    Ok(cumulus_id)
}
