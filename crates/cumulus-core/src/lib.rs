//! cumulus-core: motor de doble escritura de ejecuciones.
//!
//! Persiste cada evento de ejecución en un store clave/valor (estado en vivo)
//! y, si el gate de versión lo permite, en un store relacional con
//! integridad referencial.

pub mod config;
pub mod errors;
pub mod existence;
pub mod gate;
pub mod granules_executions;
pub mod model;
pub mod store;
pub mod translate;
pub mod version;
pub mod writer;

pub use config::{init_dotenv, EngineConfig};
pub use errors::{ConfigurationError, KvStoreError, RelationalError, WriteError};
pub use existence::{has_no_async_op_or_exists, has_no_parent_execution_or_exists, ReferenceCheck, ReferenceKind};
pub use gate::{GateDecision, SkipReason, VersionGate};
pub use granules_executions::GranulesExecutions;
pub use model::{Execution, ExecutionRecord, ExecutionStatus, ExecutionStatusRecord, GranuleExecution,
                GranuleExecutionQuery};
pub use store::{ExecutionStatusStore, InMemoryExecutionStatusStore, InMemoryRelationalStore, RelationalStore,
                RelationalTx};
pub use version::ProducerVersion;
pub use writer::{ExecutionWriter, WriteOutcome};
