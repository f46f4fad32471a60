//! Traducción de un mensaje de ejecución a los registros de cada store.

use chrono::{DateTime, Utc};
use cumulus_message::CumulusMessage;
use serde_json::Value;

use crate::model::{ExecutionRecord, ExecutionStatus, ExecutionStatusRecord};

/// Ids relacionales ya resueltos para las referencias del mensaje.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedReferences {
    pub collection_cumulus_id: Option<i64>,
    pub parent_cumulus_id: Option<i64>,
    pub async_operation_cumulus_id: Option<i64>,
}

/// Campos comunes a ambos registros.
struct Common {
    status: ExecutionStatus,
    error: Option<Value>,
    original_payload: Option<Value>,
    final_payload: Option<Value>,
    duration: Option<f64>,
    created_at: DateTime<Utc>,
}

fn common(message: &CumulusMessage, now: DateTime<Utc>) -> Common {
    let status = ExecutionStatus::parse_lossy(message.meta_status());
    let payload = (!message.payload.is_null()).then(|| message.payload.clone());
    let (original_payload, final_payload) = if status == ExecutionStatus::Running {
        (payload, None)
    } else {
        (None, payload)
    };

    let start = message.cumulus_meta.workflow_start_time();
    let stop = message.cumulus_meta.workflow_stop_time();
    let duration = match (start, stop) {
        (Some(start), Some(stop)) => stop.checked_sub(start).map(|ms| ms as f64 / 1000.0),
        _ => None,
    };
    let created_at = start.and_then(DateTime::<Utc>::from_timestamp_millis).unwrap_or(now);

    // Sólo un objeto no vacío cuenta como error (el motor envía "None" como texto).
    let error = message.exception()
                       .filter(|e| e.as_object().is_some_and(|o| !o.is_empty()))
                       .cloned();

    Common { status, error, original_payload, final_payload, duration, created_at }
}

/// Fila relacional para el ARN dado.
pub fn build_execution_record(message: &CumulusMessage,
                              arn: &str,
                              refs: ResolvedReferences,
                              now: DateTime<Utc>)
                              -> ExecutionRecord {
    let c = common(message, now);
    ExecutionRecord { arn: arn.to_string(),
                      name: message.execution_name().to_string(),
                      status: c.status,
                      workflow_name: message.workflow_name().map(str::to_string),
                      cumulus_version: message.cumulus_version().map(str::to_string),
                      error: c.error,
                      original_payload: c.original_payload,
                      final_payload: c.final_payload,
                      duration: c.duration,
                      collection_cumulus_id: refs.collection_cumulus_id,
                      parent_cumulus_id: refs.parent_cumulus_id,
                      async_operation_cumulus_id: refs.async_operation_cumulus_id,
                      created_at: c.created_at,
                      updated_at: now }
}

/// Registro de estado para el store clave/valor.
pub fn build_status_record(message: &CumulusMessage, arn: &str, now: DateTime<Utc>) -> ExecutionStatusRecord {
    let c = common(message, now);
    ExecutionStatusRecord { arn: arn.to_string(),
                            name: message.execution_name().to_string(),
                            status: c.status,
                            workflow_name: message.workflow_name().map(str::to_string),
                            collection_id: message.collection().map(|c| c.collection_id()),
                            parent_arn: message.parent_execution_arn().map(str::to_string),
                            async_operation_id: message.async_operation_id().map(str::to_string),
                            cumulus_version: message.cumulus_version().map(str::to_string),
                            error: c.error,
                            original_payload: c.original_payload,
                            final_payload: c.final_payload,
                            duration: c.duration,
                            created_at: c.created_at,
                            updated_at: now }
}
