//! Tipos del mensaje de workflow.
//!
//! El mensaje llega como JSON poco estructurado. Aquí se fijan los campos
//! requeridos y opcionales de `cumulus_meta`; el resto viaja en mapas `extra`
//! aplanados para que reenviar el mensaje no pierda información.
//!
//! Invariante de `CumulusMeta`: la ausencia de `parentExecutionArn` /
//! `asyncOperationId` se serializa como ausencia de clave (nunca `null`); los
//! consumidores distinguen "sin vínculo" de un `null` explícito.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MessageError;
use crate::executions::build_execution_arn;

pub type JsonMap = Map<String, Value>;

pub const EXECUTION_NAME_KEY: &str = "execution_name";
pub const STATE_MACHINE_KEY: &str = "state_machine";
pub const PARENT_EXECUTION_ARN_KEY: &str = "parentExecutionArn";
pub const ASYNC_OPERATION_ID_KEY: &str = "asyncOperationId";
pub const WORKFLOW_NAME_KEY: &str = "workflow_name";

/// Bloque de identidad de una ejecución encolada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulusMeta {
    pub execution_name: String,
    pub state_machine: String,
    #[serde(rename = "parentExecutionArn", default, skip_serializing_if = "Option::is_none")]
    pub parent_execution_arn: Option<String>,
    #[serde(rename = "asyncOperationId", default, skip_serializing_if = "Option::is_none")]
    pub async_operation_id: Option<String>,
    /// Campos base heredados del template (`cumulus_version`,
    /// `workflow_start_time`, `queueUrl`, ...).
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl CumulusMeta {
    /// ARN de la ejecución derivado del state machine y del nombre.
    pub fn execution_arn(&self) -> Option<String> {
        build_execution_arn(&self.state_machine, &self.execution_name)
    }

    pub fn cumulus_version(&self) -> Option<&str> {
        self.extra.get("cumulus_version").and_then(Value::as_str)
    }

    /// Epoch en milisegundos.
    pub fn workflow_start_time(&self) -> Option<i64> {
        self.extra.get("workflow_start_time").and_then(Value::as_i64)
    }

    /// Epoch en milisegundos.
    pub fn workflow_stop_time(&self) -> Option<i64> {
        self.extra.get("workflow_stop_time").and_then(Value::as_i64)
    }

    /// Superpone esta identidad sobre un `base` provisto por el llamador.
    ///
    /// `execution_name` y `state_machine` siempre ganan; los vínculos y los
    /// campos base se fusionan en profundidad con precedencia de `self`.
    pub fn layered_over(self, base: &JsonMap) -> CumulusMeta {
        let mut extra = base.clone();
        extra.remove(EXECUTION_NAME_KEY);
        extra.remove(STATE_MACHINE_KEY);
        let base_parent = take_link(&mut extra, PARENT_EXECUTION_ARN_KEY);
        let base_async = take_link(&mut extra, ASYNC_OPERATION_ID_KEY);
        crate::merge::deep_merge_into(&mut extra, &self.extra);
        CumulusMeta { execution_name: self.execution_name,
                      state_machine: self.state_machine,
                      parent_execution_arn: self.parent_execution_arn.or(base_parent),
                      async_operation_id: self.async_operation_id.or(base_async),
                      extra }
    }
}

/// Extrae un vínculo opcional de un mapa JSON. Sólo un string no vacío cuenta
/// como vínculo; cualquier otra forma se descarta.
pub(crate) fn take_link(map: &mut JsonMap, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Referencia a una colección (`meta.collection`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionRef {
    pub name: String,
    pub version: String,
}

impl CollectionRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self { name: name.into(), version: version.into() }
    }

    /// Identificador compuesto `name___version`.
    pub fn collection_id(&self) -> String {
        format!("{}___{}", self.name, self.version)
    }
}

/// Workflow destino: nombre lógico y ARN del state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub arn: String,
}

/// Template de mensaje de un workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMessageTemplate {
    #[serde(default)]
    pub cumulus_meta: JsonMap,
    #[serde(default)]
    pub meta: JsonMap,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl WorkflowMessageTemplate {
    /// Valida la forma del template (`cumulus_meta` y `meta` deben ser
    /// objetos si están presentes).
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        if !value.is_object() {
            return Err(MessageError::InvalidShape("template must be a JSON object".into()));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Mensaje completo que consume el motor de workflows y que luego vuelve como
/// evento de ejecución.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulusMessage {
    pub cumulus_meta: CumulusMeta,
    #[serde(default)]
    pub meta: JsonMap,
    #[serde(default)]
    pub payload: Value,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl CumulusMessage {
    /// Parsea y valida un mensaje entrante.
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        let message: CumulusMessage = serde_json::from_value(value)?;
        if message.cumulus_meta.execution_name.is_empty() {
            return Err(MessageError::MissingField(EXECUTION_NAME_KEY));
        }
        if message.cumulus_meta.state_machine.is_empty() {
            return Err(MessageError::MissingField(STATE_MACHINE_KEY));
        }
        Ok(message)
    }

    pub fn execution_arn(&self) -> Option<String> {
        self.cumulus_meta.execution_arn()
    }

    pub fn execution_name(&self) -> &str {
        &self.cumulus_meta.execution_name
    }

    pub fn workflow_name(&self) -> Option<&str> {
        self.meta.get(WORKFLOW_NAME_KEY).and_then(Value::as_str)
    }

    /// `meta.status` tal como lo reporta el motor.
    pub fn meta_status(&self) -> Option<&str> {
        self.meta.get("status").and_then(Value::as_str)
    }

    pub fn collection(&self) -> Option<CollectionRef> {
        let collection = self.meta.get("collection")?.as_object()?;
        let name = collection.get("name")?.as_str()?;
        let version = collection.get("version")?.as_str()?;
        Some(CollectionRef::new(name, version))
    }

    pub fn cumulus_version(&self) -> Option<&str> {
        self.cumulus_meta.cumulus_version()
    }

    pub fn parent_execution_arn(&self) -> Option<&str> {
        self.cumulus_meta.parent_execution_arn.as_deref().filter(|s| !s.is_empty())
    }

    pub fn async_operation_id(&self) -> Option<&str> {
        self.cumulus_meta.async_operation_id.as_deref().filter(|s| !s.is_empty())
    }

    /// `payload.granules[].granuleId`, en orden y sin entradas inválidas.
    pub fn granule_ids(&self) -> Vec<&str> {
        self.payload
            .get("granules")
            .and_then(Value::as_array)
            .map(|granules| granules.iter().filter_map(|g| g.get("granuleId").and_then(Value::as_str)).collect())
            .unwrap_or_default()
    }

    pub fn exception(&self) -> Option<&Value> {
        self.extra.get("exception")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message_value() -> Value {
        json!({
            "cumulus_meta": {
                "execution_name": "exec-1",
                "state_machine": "arn:aws:states:us-east-1:12345:stateMachine:IngestGranule",
                "cumulus_version": "4.0.0",
                "workflow_start_time": 122
            },
            "meta": {
                "status": "running",
                "workflow_name": "IngestGranule",
                "collection": {"name": "MOD09GQ", "version": "006"}
            },
            "payload": {"granules": [{"granuleId": "g-1"}, {"nope": 1}, {"granuleId": "g-2"}]},
            "exception": "None"
        })
    }

    #[test]
    fn accessors_read_typed_fields() {
        let message = CumulusMessage::from_value(message_value()).expect("valid message");
        assert_eq!(message.execution_arn().as_deref(),
                   Some("arn:aws:states:us-east-1:12345:execution:IngestGranule:exec-1"));
        assert_eq!(message.cumulus_version(), Some("4.0.0"));
        assert_eq!(message.cumulus_meta.workflow_start_time(), Some(122));
        assert_eq!(message.meta_status(), Some("running"));
        assert_eq!(message.workflow_name(), Some("IngestGranule"));
        assert_eq!(message.collection(), Some(CollectionRef::new("MOD09GQ", "006")));
        assert_eq!(message.granule_ids(), vec!["g-1", "g-2"]);
        assert_eq!(message.exception(), Some(&json!("None")));
        assert!(message.parent_execution_arn().is_none());
    }

    #[test]
    fn missing_execution_name_is_rejected() {
        let mut value = message_value();
        value["cumulus_meta"]["execution_name"] = json!("");
        assert!(matches!(CumulusMessage::from_value(value), Err(MessageError::MissingField(EXECUTION_NAME_KEY))));
    }

    #[test]
    fn non_object_cumulus_meta_is_rejected() {
        let value = json!({"cumulus_meta": "nope"});
        assert!(matches!(CumulusMessage::from_value(value), Err(MessageError::InvalidShape(_))));
        assert!(WorkflowMessageTemplate::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn absent_links_are_not_serialized() {
        let message = CumulusMessage::from_value(message_value()).expect("valid message");
        let out = serde_json::to_value(&message).expect("serialize");
        let meta = out["cumulus_meta"].as_object().expect("object");
        assert!(!meta.contains_key(PARENT_EXECUTION_ARN_KEY));
        assert!(!meta.contains_key(ASYNC_OPERATION_ID_KEY));
        assert_eq!(meta["cumulus_version"], json!("4.0.0"));
    }

    #[test]
    fn collection_id_joins_name_and_version() {
        assert_eq!(CollectionRef::new("MOD09GQ", "006").collection_id(), "MOD09GQ___006");
    }
}
