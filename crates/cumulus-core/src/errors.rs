//! Errores del motor de doble escritura.

use cumulus_message::MessageError;
use thiserror::Error;

/// Configuración ausente o inválida. Fatal: aborta el intento completo.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("RDS_DEPLOYMENT_CUMULUS_VERSION is not configured")]
    MissingCutoverVersion,
    #[error("invalid cutover version {value:?}: {reason}")]
    InvalidCutoverVersion { value: String, reason: String },
}

/// Errores del store relacional, ya traducidos del backend concreto.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelationalError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    /// Una referencia validada en el gate desapareció (o aún no existe) dentro
    /// de la transacción.
    #[error("referenced {entity} {key:?} does not exist")]
    ReferenceMissing { entity: &'static str, key: String },
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection error: {0}")]
    TransientIo(String),
    #[error("relational backend error: {0}")]
    Backend(String),
}

impl RelationalError {
    /// El llamador (cola / trigger) puede reintentar el evento completo.
    pub fn is_retryable(&self) -> bool {
        matches!(self,
                 Self::ReferenceMissing { .. }
                 | Self::ForeignKeyViolation(_)
                 | Self::SerializationConflict
                 | Self::TransientIo(_))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_) | Self::ForeignKeyViolation(_) | Self::CheckViolation(_))
    }
}

/// Errores del store clave/valor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KvStoreError {
    #[error("key/value store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid execution record: {0}")]
    InvalidRecord(String),
}

/// Resultado de error de `ExecutionWriter::write_execution`.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("invalid execution message: {0}")]
    InvalidMessage(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("key/value write failed: {0}")]
    KeyValueWrite(#[source] KvStoreError),
    #[error("relational transaction failed: {0}")]
    RelationalTransaction(#[source] RelationalError),
}

impl WriteError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RelationalTransaction(e) => e.is_retryable(),
            Self::KeyValueWrite(KvStoreError::Unavailable(_)) => true,
            _ => false,
        }
    }
}

impl From<MessageError> for WriteError {
    fn from(err: MessageError) -> Self {
        Self::InvalidMessage(err.to_string())
    }
}
