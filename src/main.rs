//! Demo `main-core`: arma un mensaje de cola desde un template, lo registra
//! en ambos stores y luego aplica el evento de fin del mismo workflow.
//!
//! Por defecto usa los stores en memoria. Con `--features pg_demo` y
//! `DATABASE_URL` definido escribe la parte relacional en Postgres.

use std::error::Error;

use cumulus_records::cumulus_core::{ExecutionStatusStore, ExecutionWriter, InMemoryExecutionStatusStore,
                                    InMemoryRelationalStore, RelationalStore, VersionGate, WriteOutcome};
use cumulus_records::cumulus_message::{CollectionRef, JsonMap, QueueMessageParams, Workflow,
                                       WorkflowMessageTemplate};
use cumulus_records::enqueue_and_record;
use serde_json::{json, Value};

const CUTOVER: &str = "3.0.0";
const GRANULE_ID: &str = "demo-granule-1";
const STATE_MACHINE: &str = "arn:aws:states:us-east-1:123456789012:stateMachine:DemoIngestGranule";

fn object(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        _ => JsonMap::new(),
    }
}

/// Escribe un evento "running" al encolar y un "completed" al terminar.
fn run_flow<R: RelationalStore>(relational: R,
                                 collection: &CollectionRef,
                                 async_operation_id: &str)
                                 -> Result<(), Box<dyn Error>> {
    let kv = InMemoryExecutionStatusStore::new();
    let writer = ExecutionWriter::new(&kv, relational, VersionGate::with_cutover(CUTOVER));

    let template = WorkflowMessageTemplate::from_value(json!({
        "cumulus_meta": {"system_bucket": "demo-internal", "queueExecutionLimits": {}},
        "meta": {"stack": "demo", "provider": {"id": "demo-provider"}}
    }))?;
    let workflow = Workflow { name: "DemoIngestGranule".into(), arn: STATE_MACHINE.into() };
    let custom_cumulus_meta = object(json!({"cumulus_version": "4.0.0", "workflow_start_time": 1_700_000_000_000_i64}));
    let custom_meta = object(json!({
        "status": "running",
        "collection": {"name": collection.name, "version": collection.version}
    }));

    let (message, outcome) =
        enqueue_and_record(&writer,
                           QueueMessageParams { message_template: &template,
                                                workflow: &workflow,
                                                payload: json!({"granules": [{"granuleId": GRANULE_ID}]}),
                                                parent_execution_arn: None,
                                                async_operation_id: Some(async_operation_id),
                                                custom_cumulus_meta: Some(&custom_cumulus_meta),
                                                custom_meta: Some(&custom_meta),
                                                execution_name_prefix: Some("demo") })?;
    let arn = message.execution_arn().unwrap_or_default();
    println!("[DEMO] mensaje encolado: execution_name={} arn={arn}", message.execution_name());
    print_outcome("running", &outcome);

    // Evento de fin: mismo mensaje con estado y hora de término.
    let mut finished = message.clone();
    finished.meta.insert("status".into(), json!("completed"));
    finished.cumulus_meta.extra.insert("workflow_stop_time".into(), json!(1_700_000_042_000_i64));
    finished.payload = json!({"granules": [{"granuleId": GRANULE_ID, "published": true}]});
    print_outcome("completed", &writer.write_execution(&finished)?);

    if let Some(record) = kv.get(&arn)? {
        println!("[DEMO] kv: arn={} status={}", record.arn, record.status.as_str());
    }
    Ok(())
}

fn print_outcome(label: &str, outcome: &WriteOutcome) {
    match outcome {
        WriteOutcome::Written { cumulus_id } => println!("[DEMO] {label}: relacional cumulus_id={cumulus_id}"),
        WriteOutcome::RelationalSkipped { reason } => println!("[DEMO] {label}: relacional omitido ({reason:?})"),
    }
}

fn run_in_memory() -> Result<(), Box<dyn Error>> {
    let relational = InMemoryRelationalStore::new();
    let collection = CollectionRef::new("DEMO_COLLECTION", "006");
    let async_operation_id = uuid::Uuid::new_v4().to_string();
    relational.insert_collection(&collection)?;
    relational.insert_async_operation(&async_operation_id)?;
    relational.insert_granule(GRANULE_ID)?;
    run_flow(&relational, &collection, &async_operation_id)?;
    println!("[DEMO] memoria: ejecuciones={} vinculos={}",
             relational.execution_count()?,
             relational.granule_execution_count()?);
    Ok(())
}

#[cfg(feature = "pg_demo")]
fn run_postgres() -> Result<(), Box<dyn Error>> {
    use cumulus_records::cumulus_persistence::pg::models;
    use cumulus_records::cumulus_persistence::{build_dev_pool_from_env, ConnectionProvider, PgRelationalStore};

    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("[PG DEMO] DATABASE_URL no definido; omitiendo demo PG");
        return Ok(());
    }
    let store = PgRelationalStore::from_pool(build_dev_pool_from_env()?);
    let collection = CollectionRef::new("DEMO_COLLECTION", "006");
    let async_operation_id = uuid::Uuid::new_v4();
    {
        let mut conn = store.provider.connection()?;
        let collection_cumulus_id = models::insert_collection(&mut conn, &collection)?;
        models::insert_async_operation(&mut conn, async_operation_id)?;
        models::insert_granule(&mut conn, GRANULE_ID, collection_cumulus_id)?;
    }
    run_flow(&store, &collection, &async_operation_id.to_string())
}

fn main() {
    // Cargar variables de entorno desde .env si existe (antes de leer DATABASE_URL)
    let _ = dotenvy::dotenv();

    println!("--- Demo en memoria ---");
    if let Err(e) = run_in_memory() {
        eprintln!("[DEMO] Error: {e}");
    }

    #[cfg(feature = "pg_demo")]
    {
        println!("--- Demo Postgres ---");
        if let Err(e) = run_postgres() {
            eprintln!("[PG DEMO] Error: {e}");
        }
    }
}
