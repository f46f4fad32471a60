//! Construcción de identidad y ensamblado de mensajes para encolar.
//!
//! Todo aquí es puro: no hay I/O ni efectos de persistencia. La única fuente
//! de no-determinismo es el UUID v4 del nombre de ejecución.

use serde_json::Value;
use uuid::Uuid;

use crate::merge::deep_merge_into;
use crate::types::{take_link, CumulusMessage, CumulusMeta, JsonMap, Workflow, WorkflowMessageTemplate,
                   ASYNC_OPERATION_ID_KEY, EXECUTION_NAME_KEY, PARENT_EXECUTION_ARN_KEY, STATE_MACHINE_KEY,
                   WORKFLOW_NAME_KEY};

/// Nombre de ejecución único: `<prefix>-<uuid v4>` o `<uuid v4>`.
///
/// Un prefijo vacío se trata como ausente.
pub fn build_execution_name(prefix: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}-{id}"),
        None => id.to_string(),
    }
}

/// Parámetros de [`build_cumulus_meta`].
#[derive(Debug, Clone, Copy)]
pub struct CumulusMetaParams<'a> {
    /// `cumulus_meta` base del template.
    pub template_cumulus_meta: &'a JsonMap,
    pub state_machine_arn: &'a str,
    pub execution_name_prefix: Option<&'a str>,
    pub parent_execution_arn: Option<&'a str>,
    pub async_operation_id: Option<&'a str>,
}

/// Construye el bloque `cumulus_meta` de una ejecución nueva.
///
/// Parte de la base del template, fija `execution_name` y `state_machine`, y
/// agrega los vínculos sólo si vienen con valor. Un vínculo explícito del
/// llamador tiene prioridad sobre el que traiga el template.
pub fn build_cumulus_meta(params: CumulusMetaParams<'_>) -> CumulusMeta {
    let mut extra = params.template_cumulus_meta.clone();
    extra.remove(EXECUTION_NAME_KEY);
    extra.remove(STATE_MACHINE_KEY);
    let template_parent = take_link(&mut extra, PARENT_EXECUTION_ARN_KEY);
    let template_async = take_link(&mut extra, ASYNC_OPERATION_ID_KEY);

    let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_owned);
    CumulusMeta { execution_name: build_execution_name(params.execution_name_prefix),
                  state_machine: params.state_machine_arn.to_owned(),
                  parent_execution_arn: non_empty(params.parent_execution_arn).or(template_parent),
                  async_operation_id: non_empty(params.async_operation_id).or(template_async),
                  extra }
}

/// Parámetros de [`build_queue_message_from_template`].
#[derive(Debug, Clone)]
pub struct QueueMessageParams<'a> {
    pub message_template: &'a WorkflowMessageTemplate,
    pub workflow: &'a Workflow,
    pub payload: Value,
    pub parent_execution_arn: Option<&'a str>,
    pub async_operation_id: Option<&'a str>,
    pub custom_cumulus_meta: Option<&'a JsonMap>,
    pub custom_meta: Option<&'a JsonMap>,
    pub execution_name_prefix: Option<&'a str>,
}

/// Ensambla el mensaje que se encola para iniciar un workflow.
///
/// - `meta = merge(template.meta, custom_meta, {workflow_name})`
/// - `cumulus_meta = merge(custom_cumulus_meta, identidad)`; la identidad
///   construida gana en colisión.
/// - `payload` se adjunta tal cual.
pub fn build_queue_message_from_template(params: QueueMessageParams<'_>) -> CumulusMessage {
    let template = params.message_template;

    let cumulus_meta = build_cumulus_meta(CumulusMetaParams { template_cumulus_meta: &template.cumulus_meta,
                                                             state_machine_arn: &params.workflow.arn,
                                                             execution_name_prefix: params.execution_name_prefix,
                                                             parent_execution_arn: params.parent_execution_arn,
                                                             async_operation_id: params.async_operation_id });
    let cumulus_meta = match params.custom_cumulus_meta {
        Some(custom) => cumulus_meta.layered_over(custom),
        None => cumulus_meta,
    };

    let mut meta = template.meta.clone();
    if let Some(custom) = params.custom_meta {
        deep_merge_into(&mut meta, custom);
    }
    meta.insert(WORKFLOW_NAME_KEY.to_owned(), Value::String(params.workflow.name.clone()));

    let mut extra = template.extra.clone();
    extra.remove("payload");

    CumulusMessage { cumulus_meta, meta, payload: params.payload, extra }
}
