//! Mensajes de workflow: identidad de ejecución y ensamblado desde templates.
//!
//! Este crate no toca almacenamiento. Produce los identificadores
//! (`execution_name`, ARN, vínculos padre / operación asíncrona) que luego
//! reconcilia `cumulus-core` contra ambos stores.

pub mod build;
pub mod error;
pub mod executions;
pub mod merge;
pub mod types;

pub use build::{build_cumulus_meta, build_execution_name, build_queue_message_from_template, CumulusMetaParams,
                QueueMessageParams};
pub use error::MessageError;
pub use executions::build_execution_arn;
pub use merge::{deep_merge_into, merge_json};
pub use types::{CollectionRef, CumulusMessage, CumulusMeta, JsonMap, Workflow, WorkflowMessageTemplate,
                ASYNC_OPERATION_ID_KEY, PARENT_EXECUTION_ARN_KEY};
