//! Gate de versión: decide si un evento también se escribe en el store
//! relacional.
//!
//! Reglas, en orden:
//! 1. sin versión de corte configurada (o inválida) -> `ConfigurationError`;
//! 2. productor sin versión, versión ilegible o menor al corte -> omitir;
//! 3. sin colección resuelta -> omitir;
//! 4. padre u operación asíncrona declarados y no satisfechos -> omitir.
//!    Una consulta fallida también omite: nunca es error.

use cumulus_message::CumulusMessage;
use log::{debug, warn};

use crate::config::EngineConfig;
use crate::errors::ConfigurationError;
use crate::existence::{check_reference, ReferenceCheck, ReferenceKind};
use crate::store::RelationalStore;
use crate::version::ProducerVersion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `producer` es `None` cuando el mensaje no trae versión o no se pudo
    /// interpretar.
    PreCutoverVersion { producer: Option<String>, cutover: String },
    MissingCollection,
    ReferencesUnmet { parent: ReferenceCheck, async_operation: ReferenceCheck },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Write,
    Skip(SkipReason),
}

impl GateDecision {
    pub fn should_write(&self) -> bool {
        matches!(self, Self::Write)
    }
}

#[derive(Debug, Clone)]
pub struct VersionGate {
    cutover: Option<String>,
}

impl VersionGate {
    pub fn new(config: &EngineConfig) -> Self {
        Self { cutover: config.relational_cutover_version.clone() }
    }

    pub fn with_cutover(version: impl Into<String>) -> Self {
        Self { cutover: Some(version.into()) }
    }

    /// Versión de corte ya interpretada.
    pub fn cutover(&self) -> Result<ProducerVersion, ConfigurationError> {
        let raw = self.cutover.as_deref().ok_or(ConfigurationError::MissingCutoverVersion)?;
        raw.parse().map_err(|reason| ConfigurationError::InvalidCutoverVersion { value: raw.to_string(), reason })
    }

    /// Evalúa el gate para un mensaje y la colección ya resuelta.
    pub fn evaluate<R: RelationalStore>(&self,
                                        store: &R,
                                        message: &CumulusMessage,
                                        collection_cumulus_id: Option<i64>)
                                        -> Result<GateDecision, ConfigurationError> {
        let cutover = self.cutover()?;

        let producer = message.cumulus_version();
        let parsed = producer.and_then(|v| v.parse::<ProducerVersion>().ok());
        if !parsed.as_ref().is_some_and(|p| *p >= cutover) {
            debug!("gate:skip pre_cutover producer={producer:?} cutover={cutover}");
            return Ok(GateDecision::Skip(SkipReason::PreCutoverVersion { producer: producer.map(str::to_string),
                                                                           cutover: cutover.to_string() }));
        }

        if collection_cumulus_id.is_none() {
            debug!("gate:skip missing_collection");
            return Ok(GateDecision::Skip(SkipReason::MissingCollection));
        }

        let parent = check_reference(store, ReferenceKind::ParentExecution, message);
        let async_operation = check_reference(store, ReferenceKind::AsyncOperation, message);
        if parent.is_satisfied() && async_operation.is_satisfied() {
            return Ok(GateDecision::Write);
        }
        if matches!(parent, ReferenceCheck::CheckFailed(_)) || matches!(async_operation, ReferenceCheck::CheckFailed(_)) {
            warn!("gate:skip reference check failed, failing closed parent={parent:?} async={async_operation:?}");
        } else {
            debug!("gate:skip references_unmet parent={parent:?} async={async_operation:?}");
        }
        Ok(GateDecision::Skip(SkipReason::ReferencesUnmet { parent, async_operation }))
    }

    /// Forma booleana del gate.
    pub fn should_write_to_relational_store<R: RelationalStore>(&self,
                                                                store: &R,
                                                                message: &CumulusMessage,
                                                                collection_cumulus_id: Option<i64>)
                                                                -> Result<bool, ConfigurationError> {
        Ok(self.evaluate(store, message, collection_cumulus_id)?.should_write())
    }
}
