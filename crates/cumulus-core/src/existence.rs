//! Verificación de referencias foráneas (ejecución padre / operación asíncrona).
//!
//! Internamente el resultado tiene tres valores (existe / falta / falló la
//! consulta) más "no referenciado". Sólo el gate y los helpers booleanos lo
//! colapsan a `bool`, y lo hacen cerrando: una consulta fallida cuenta como
//! referencia no satisfecha.

use cumulus_message::CumulusMessage;
use log::warn;

use crate::errors::RelationalError;
use crate::store::{RelationalStore, RelationalTx};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceCheck {
    /// El mensaje no declara la referencia.
    NotReferenced,
    Exists(i64),
    Missing,
    CheckFailed(String),
}

impl ReferenceCheck {
    /// Colapso a booleano (fail closed).
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::NotReferenced | Self::Exists(_))
    }

    pub fn cumulus_id(&self) -> Option<i64> {
        match self {
            Self::Exists(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    ParentExecution,
    AsyncOperation,
}

impl ReferenceKind {
    pub fn entity(&self) -> &'static str {
        match self {
            Self::ParentExecution => "parent execution",
            Self::AsyncOperation => "async operation",
        }
    }

    /// Clave natural declarada en el mensaje, si la hay.
    pub fn key<'m>(&self, message: &'m CumulusMessage) -> Option<&'m str> {
        match self {
            Self::ParentExecution => message.parent_execution_arn(),
            Self::AsyncOperation => message.async_operation_id(),
        }
    }

    fn lookup(&self, tx: &mut dyn RelationalTx, key: &str) -> Result<Option<i64>, RelationalError> {
        match self {
            Self::ParentExecution => tx.execution_cumulus_id(key),
            Self::AsyncOperation => tx.async_operation_cumulus_id(key),
        }
    }
}

/// Verifica una referencia dentro de una transacción ya abierta.
pub fn check_reference_in(tx: &mut dyn RelationalTx, kind: ReferenceKind, message: &CumulusMessage) -> ReferenceCheck {
    let Some(key) = kind.key(message) else {
        return ReferenceCheck::NotReferenced;
    };
    match kind.lookup(tx, key) {
        Ok(Some(id)) => ReferenceCheck::Exists(id),
        Ok(None) => ReferenceCheck::Missing,
        Err(e) => {
            warn!("reference_check:failed kind={} key={key} err={e}", kind.entity());
            ReferenceCheck::CheckFailed(e.to_string())
        }
    }
}

/// Verifica una referencia abriendo su propia lectura.
pub fn check_reference<R: RelationalStore>(store: &R, kind: ReferenceKind, message: &CumulusMessage) -> ReferenceCheck {
    if kind.key(message).is_none() {
        return ReferenceCheck::NotReferenced;
    }
    match store.read_transaction(|tx| Ok(check_reference_in(tx, kind, message))) {
        Ok(check) => check,
        Err(e) => {
            warn!("reference_check:failed kind={} err={e}", kind.entity());
            ReferenceCheck::CheckFailed(e.to_string())
        }
    }
}

/// Variante para revalidar dentro de la transacción de escritura: una
/// referencia faltante es `ReferenceMissing` (reintentable) y un fallo de
/// consulta se propaga tal cual.
pub fn require_reference_in(tx: &mut dyn RelationalTx,
                            kind: ReferenceKind,
                            message: &CumulusMessage)
                            -> Result<Option<i64>, RelationalError> {
    let Some(key) = kind.key(message) else {
        return Ok(None);
    };
    match kind.lookup(tx, key)? {
        Some(id) => Ok(Some(id)),
        None => Err(RelationalError::ReferenceMissing { entity: kind.entity(), key: key.to_string() }),
    }
}

/// `true` si el mensaje no declara padre o si el padre existe.
pub fn has_no_parent_execution_or_exists<R: RelationalStore>(store: &R, message: &CumulusMessage) -> bool {
    check_reference(store, ReferenceKind::ParentExecution, message).is_satisfied()
}

/// `true` si el mensaje no declara operación asíncrona o si existe.
pub fn has_no_async_op_or_exists<R: RelationalStore>(store: &R, message: &CumulusMessage) -> bool {
    check_reference(store, ReferenceKind::AsyncOperation, message).is_satisfied()
}
