//! Cumulus Records
//!
//! Fachada del workspace:
//! - `cumulus_message`: identidad de ejecución y ensamblado de mensajes de cola.
//! - `cumulus_core`: doble escritura (clave/valor + relacional) con gate de versión.
//! - `cumulus_persistence`: backend Postgres del store relacional.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub use cumulus_core;
pub use cumulus_message;
pub use cumulus_persistence;

use cumulus_core::{ExecutionStatusStore, ExecutionWriter, RelationalStore, WriteError, WriteOutcome};
use cumulus_message::{build_queue_message_from_template, CumulusMessage, QueueMessageParams};

/// Ensambla el mensaje de cola y registra la ejecución en ambos stores como
/// el primer evento del workflow.
///
/// Devuelve el mensaje (listo para encolar) junto con el resultado de la
/// escritura; un error deja el mensaje sin encolar.
pub fn enqueue_and_record<K, R>(writer: &ExecutionWriter<K, R>,
                                params: QueueMessageParams<'_>)
                                -> Result<(CumulusMessage, WriteOutcome), WriteError>
    where K: ExecutionStatusStore,
          R: RelationalStore
{
    let message = build_queue_message_from_template(params);
    let outcome = writer.write_execution(&message)?;
    Ok((message, outcome))
}
