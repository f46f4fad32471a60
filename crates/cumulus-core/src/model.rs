//! Modelo de datos compartido por ambos stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Estado de una ejecución. El store relacional lo restringe por CHECK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Unknown,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    /// Parse tolerante: cualquier valor no reconocido es `Unknown`.
    pub fn parse_lossy(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("running") => Self::Running,
            Some("completed") => Self::Completed,
            Some("failed") => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Fila lógica de `executions` (sin `cumulus_id`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub arn: String,
    pub name: String,
    pub status: ExecutionStatus,
    pub workflow_name: Option<String>,
    pub cumulus_version: Option<String>,
    pub error: Option<Value>,
    pub original_payload: Option<Value>,
    pub final_payload: Option<Value>,
    /// Segundos.
    pub duration: Option<f64>,
    pub collection_cumulus_id: Option<i64>,
    pub parent_cumulus_id: Option<i64>,
    pub async_operation_cumulus_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Aplica un evento posterior sobre la fila existente: columnas ausentes
    /// en `incoming` conservan el valor previo.
    pub fn merge_from(&mut self, incoming: ExecutionRecord) {
        self.name = incoming.name;
        self.status = incoming.status;
        self.created_at = incoming.created_at;
        self.updated_at = incoming.updated_at;
        overwrite(&mut self.workflow_name, incoming.workflow_name);
        overwrite(&mut self.cumulus_version, incoming.cumulus_version);
        overwrite(&mut self.error, incoming.error);
        overwrite(&mut self.original_payload, incoming.original_payload);
        overwrite(&mut self.final_payload, incoming.final_payload);
        overwrite(&mut self.duration, incoming.duration);
        overwrite(&mut self.collection_cumulus_id, incoming.collection_cumulus_id);
        overwrite(&mut self.parent_cumulus_id, incoming.parent_cumulus_id);
        overwrite(&mut self.async_operation_cumulus_id, incoming.async_operation_cumulus_id);
    }
}

fn overwrite<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

/// Ejecución persistida en el store relacional.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub cumulus_id: i64,
    pub record: ExecutionRecord,
}

/// Registro de estado en el store clave/valor (clave natural: `arn`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatusRecord {
    pub arn: String,
    pub name: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulus_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionStatusRecord {
    /// Misma semántica que [`ExecutionRecord::merge_from`].
    pub fn merge_from(&mut self, incoming: ExecutionStatusRecord) {
        self.name = incoming.name;
        self.status = incoming.status;
        self.created_at = incoming.created_at;
        self.updated_at = incoming.updated_at;
        overwrite(&mut self.workflow_name, incoming.workflow_name);
        overwrite(&mut self.collection_id, incoming.collection_id);
        overwrite(&mut self.parent_arn, incoming.parent_arn);
        overwrite(&mut self.async_operation_id, incoming.async_operation_id);
        overwrite(&mut self.cumulus_version, incoming.cumulus_version);
        overwrite(&mut self.error, incoming.error);
        overwrite(&mut self.original_payload, incoming.original_payload);
        overwrite(&mut self.final_payload, incoming.final_payload);
        overwrite(&mut self.duration, incoming.duration);
    }
}

/// Par de la tabla `granules_executions`. Único por par.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GranuleExecution {
    pub execution_cumulus_id: i64,
    pub granule_cumulus_id: i64,
}

/// Clave parcial para `search`; un campo `None` no filtra.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GranuleExecutionQuery {
    pub execution_cumulus_id: Option<i64>,
    pub granule_cumulus_id: Option<i64>,
}

impl GranuleExecutionQuery {
    pub fn by_execution(execution_cumulus_id: i64) -> Self {
        Self { execution_cumulus_id: Some(execution_cumulus_id), granule_cumulus_id: None }
    }

    pub fn by_granule(granule_cumulus_id: i64) -> Self {
        Self { execution_cumulus_id: None, granule_cumulus_id: Some(granule_cumulus_id) }
    }

    pub fn matches(&self, pair: &GranuleExecution) -> bool {
        self.execution_cumulus_id.map_or(true, |id| id == pair.execution_cumulus_id)
        && self.granule_cumulus_id.map_or(true, |id| id == pair.granule_cumulus_id)
    }
}
