//! Filas Diesel y consultas por tabla.
//!
//! Cada función recibe la conexión de la transacción en curso; ninguna abre
//! transacciones propias.

use chrono::{DateTime, Utc};
use cumulus_core::{Execution, ExecutionRecord, ExecutionStatus, GranuleExecution, GranuleExecutionQuery};
use cumulus_message::CollectionRef;
use diesel::dsl::exists;
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::schema::{async_operations, collections, executions, granules, granules_executions};

/// Fila para insertar/actualizar en `executions`.
///
/// Como `AsChangeset`, los campos `None` se omiten del `UPDATE`: un evento
/// posterior no borra columnas que no trae.
#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = executions)]
pub struct ExecutionChangeset<'a> {
    pub arn: &'a str,
    pub name: &'a str,
    pub status: &'a str,
    pub workflow_name: Option<&'a str>,
    pub cumulus_version: Option<&'a str>,
    pub error: Option<&'a Value>,
    pub original_payload: Option<&'a Value>,
    pub final_payload: Option<&'a Value>,
    pub duration: Option<f64>,
    pub collection_cumulus_id: Option<i64>,
    pub parent_cumulus_id: Option<i64>,
    pub async_operation_cumulus_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a ExecutionRecord> for ExecutionChangeset<'a> {
    fn from(r: &'a ExecutionRecord) -> Self {
        Self { arn: &r.arn,
               name: &r.name,
               status: r.status.as_str(),
               workflow_name: r.workflow_name.as_deref(),
               cumulus_version: r.cumulus_version.as_deref(),
               error: r.error.as_ref(),
               original_payload: r.original_payload.as_ref(),
               final_payload: r.final_payload.as_ref(),
               duration: r.duration,
               collection_cumulus_id: r.collection_cumulus_id,
               parent_cumulus_id: r.parent_cumulus_id,
               async_operation_cumulus_id: r.async_operation_cumulus_id,
               created_at: r.created_at,
               updated_at: r.updated_at }
    }
}

/// Fila mapeada de `executions` (orden de columnas del esquema).
#[derive(Queryable, Debug)]
pub struct ExecutionRow {
    pub cumulus_id: i64,
    pub arn: String,
    pub name: String,
    pub status: String,
    pub workflow_name: Option<String>,
    pub cumulus_version: Option<String>,
    pub error: Option<Value>,
    pub original_payload: Option<Value>,
    pub final_payload: Option<Value>,
    pub duration: Option<f64>,
    pub collection_cumulus_id: Option<i64>,
    pub parent_cumulus_id: Option<i64>,
    pub async_operation_cumulus_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ExecutionRow> for Execution {
    fn from(row: ExecutionRow) -> Self {
        Execution { cumulus_id: row.cumulus_id,
                    record: ExecutionRecord { arn: row.arn,
                                              name: row.name,
                                              status: ExecutionStatus::parse_lossy(Some(&row.status)),
                                              workflow_name: row.workflow_name,
                                              cumulus_version: row.cumulus_version,
                                              error: row.error,
                                              original_payload: row.original_payload,
                                              final_payload: row.final_payload,
                                              duration: row.duration,
                                              collection_cumulus_id: row.collection_cumulus_id,
                                              parent_cumulus_id: row.parent_cumulus_id,
                                              async_operation_cumulus_id: row.async_operation_cumulus_id,
                                              created_at: row.created_at,
                                              updated_at: row.updated_at } }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = granules_executions)]
pub struct NewGranuleExecutionRow {
    pub execution_cumulus_id: i64,
    pub granule_cumulus_id: i64,
}

impl From<GranuleExecution> for NewGranuleExecutionRow {
    fn from(p: GranuleExecution) -> Self {
        Self { execution_cumulus_id: p.execution_cumulus_id, granule_cumulus_id: p.granule_cumulus_id }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = collections)]
struct NewCollectionRow<'a> {
    name: &'a str,
    version: &'a str,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = granules)]
struct NewGranuleRow<'a> {
    granule_id: &'a str,
    collection_cumulus_id: i64,
}

// --- collections -----------------------------------------------------------

pub fn collection_cumulus_id(conn: &mut PgConnection, c: &CollectionRef) -> Result<Option<i64>, PersistenceError> {
    collections::table.filter(collections::name.eq(&c.name))
                      .filter(collections::version.eq(&c.version))
                      .select(collections::cumulus_id)
                      .first::<i64>(conn)
                      .optional()
                      .map_err(PersistenceError::from)
}

/// Registra una colección (idempotente por `(name, version)`).
pub fn insert_collection(conn: &mut PgConnection, c: &CollectionRef) -> Result<i64, PersistenceError> {
    diesel::insert_into(collections::table).values(NewCollectionRow { name: &c.name, version: &c.version })
                                           .on_conflict((collections::name, collections::version))
                                           .do_nothing()
                                           .execute(conn)?;
    collection_cumulus_id(conn, c)?.ok_or(PersistenceError::NotFound)
}

// --- async_operations ------------------------------------------------------

/// Un id que no es UUID no puede existir en la tabla.
pub fn async_operation_cumulus_id(conn: &mut PgConnection, id: &str) -> Result<Option<i64>, PersistenceError> {
    let Ok(id) = Uuid::parse_str(id) else {
        return Ok(None);
    };
    async_operations::table.filter(async_operations::id.eq(id))
                           .select(async_operations::cumulus_id)
                           .first::<i64>(conn)
                           .optional()
                           .map_err(PersistenceError::from)
}

pub fn insert_async_operation(conn: &mut PgConnection, id: Uuid) -> Result<i64, PersistenceError> {
    diesel::insert_into(async_operations::table).values(async_operations::id.eq(id))
                                                .on_conflict(async_operations::id)
                                                .do_nothing()
                                                .execute(conn)?;
    async_operation_cumulus_id(conn, &id.to_string())?.ok_or(PersistenceError::NotFound)
}

// --- granules --------------------------------------------------------------

pub fn granule_cumulus_id(conn: &mut PgConnection, granule_id: &str) -> Result<Option<i64>, PersistenceError> {
    granules::table.filter(granules::granule_id.eq(granule_id))
                   .select(granules::cumulus_id)
                   .first::<i64>(conn)
                   .optional()
                   .map_err(PersistenceError::from)
}

pub fn insert_granule(conn: &mut PgConnection,
                      granule_id: &str,
                      collection_cumulus_id: i64)
                      -> Result<i64, PersistenceError> {
    diesel::insert_into(granules::table).values(NewGranuleRow { granule_id, collection_cumulus_id })
                                        .on_conflict(granules::granule_id)
                                        .do_nothing()
                                        .execute(conn)?;
    granule_cumulus_id(conn, granule_id)?.ok_or(PersistenceError::NotFound)
}

// --- executions ------------------------------------------------------------

pub fn execution_cumulus_id(conn: &mut PgConnection, arn: &str) -> Result<Option<i64>, PersistenceError> {
    executions::table.filter(executions::arn.eq(arn))
                     .select(executions::cumulus_id)
                     .first::<i64>(conn)
                     .optional()
                     .map_err(PersistenceError::from)
}

pub fn get_execution(conn: &mut PgConnection, arn: &str) -> Result<Option<Execution>, PersistenceError> {
    let row = executions::table.filter(executions::arn.eq(arn))
                               .first::<ExecutionRow>(conn)
                               .optional()?;
    Ok(row.map(Execution::from))
}

/// `INSERT .. ON CONFLICT (arn) DO UPDATE .. RETURNING cumulus_id`.
pub fn upsert_execution(conn: &mut PgConnection, record: &ExecutionRecord) -> Result<i64, PersistenceError> {
    let row = ExecutionChangeset::from(record);
    diesel::insert_into(executions::table).values(&row)
                                          .on_conflict(executions::arn)
                                          .do_update()
                                          .set(&row)
                                          .returning(executions::cumulus_id)
                                          .get_result::<i64>(conn)
                                          .map_err(PersistenceError::from)
}

// --- granules_executions ---------------------------------------------------

pub fn create_granule_execution(conn: &mut PgConnection, pair: GranuleExecution) -> Result<(), PersistenceError> {
    diesel::insert_into(granules_executions::table).values(NewGranuleExecutionRow::from(pair))
                                                   .execute(conn)?;
    Ok(())
}

pub fn upsert_granule_execution(conn: &mut PgConnection, pair: GranuleExecution) -> Result<(), PersistenceError> {
    diesel::insert_into(granules_executions::table).values(NewGranuleExecutionRow::from(pair))
                                                   .on_conflict((granules_executions::execution_cumulus_id,
                                                                 granules_executions::granule_cumulus_id))
                                                   .do_nothing()
                                                   .execute(conn)?;
    Ok(())
}

pub fn granule_execution_exists(conn: &mut PgConnection, pair: GranuleExecution) -> Result<bool, PersistenceError> {
    let row = granules_executions::table.filter(granules_executions::execution_cumulus_id.eq(pair.execution_cumulus_id))
                                        .filter(granules_executions::granule_cumulus_id.eq(pair.granule_cumulus_id));
    diesel::select(exists(row)).get_result::<bool>(conn).map_err(PersistenceError::from)
}

pub fn search_granule_executions(conn: &mut PgConnection,
                                 query: GranuleExecutionQuery)
                                 -> Result<Vec<GranuleExecution>, PersistenceError> {
    let mut q = granules_executions::table.select((granules_executions::execution_cumulus_id,
                                                   granules_executions::granule_cumulus_id))
                                          .order(granules_executions::seq.asc())
                                          .into_boxed();
    if let Some(id) = query.execution_cumulus_id {
        q = q.filter(granules_executions::execution_cumulus_id.eq(id));
    }
    if let Some(id) = query.granule_cumulus_id {
        q = q.filter(granules_executions::granule_cumulus_id.eq(id));
    }
    let rows: Vec<(i64, i64)> = q.load(conn)?;
    Ok(rows.into_iter()
           .map(|(execution_cumulus_id, granule_cumulus_id)| GranuleExecution { execution_cumulus_id,
                                                                                granule_cumulus_id })
           .collect())
}

pub fn delete_granule_execution(conn: &mut PgConnection, pair: GranuleExecution) -> Result<usize, PersistenceError> {
    let row = granules_executions::table.filter(granules_executions::execution_cumulus_id.eq(pair.execution_cumulus_id))
                                        .filter(granules_executions::granule_cumulus_id.eq(pair.granule_cumulus_id));
    diesel::delete(row).execute(conn).map_err(PersistenceError::from)
}

pub fn execution_cumulus_ids_for_granules(conn: &mut PgConnection,
                                          granule_cumulus_ids: &[i64])
                                          -> Result<Vec<i64>, PersistenceError> {
    granules_executions::table.filter(granules_executions::granule_cumulus_id.eq_any(granule_cumulus_ids.to_vec()))
                              .select(granules_executions::execution_cumulus_id)
                              .distinct()
                              .load::<i64>(conn)
                              .map_err(PersistenceError::from)
}
