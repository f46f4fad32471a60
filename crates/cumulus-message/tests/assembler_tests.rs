use cumulus_message::{build_queue_message_from_template, CumulusMessage, JsonMap, QueueMessageParams, Workflow,
                      WorkflowMessageTemplate, ASYNC_OPERATION_ID_KEY, PARENT_EXECUTION_ARN_KEY};
use serde_json::{json, Value};

fn template() -> WorkflowMessageTemplate {
    WorkflowMessageTemplate::from_value(json!({
        "cumulus_meta": {
            "cumulus_version": "4.0.0",
            "queueUrl": "https://sqs/startSF",
            "message_source": "sfn"
        },
        "meta": {
            "stack": "dev",
            "provider": {"id": "prov-1", "host": "a.example"},
            "buckets": ["internal", "private"]
        },
        "exception": "None",
        "workflow_config": {"SyncGranule": {"buckets": "{$.meta.buckets}"}},
        "payload": {"template": "payload must not leak"}
    })).expect("valid template")
}

fn workflow() -> Workflow {
    Workflow { name: "IngestGranule".into(),
               arn: "arn:aws:states:us-east-1:12345:stateMachine:dev-IngestGranule".into() }
}

fn map(value: Value) -> JsonMap {
    value.as_object().cloned().expect("object")
}

#[test]
fn assembles_meta_identity_and_payload() {
    let template = template();
    let workflow = workflow();
    let custom_meta = map(json!({"provider": {"host": "b.example"}, "collection": {"name": "MOD09GQ", "version": "006"}}));

    let message = build_queue_message_from_template(QueueMessageParams { message_template: &template,
                                                                         workflow: &workflow,
                                                                         payload: json!({"granules": [{"granuleId": "g-1"}]}),
                                                                         parent_execution_arn: None,
                                                                         async_operation_id: None,
                                                                         custom_cumulus_meta: None,
                                                                         custom_meta: Some(&custom_meta),
                                                                         execution_name_prefix: Some("ingest") });

    assert_eq!(message.workflow_name(), Some("IngestGranule"));
    assert_eq!(message.meta["stack"], json!("dev"));
    assert_eq!(message.meta["provider"], json!({"id": "prov-1", "host": "b.example"}));
    assert_eq!(message.meta["buckets"], json!(["internal", "private"]));
    assert_eq!(message.collection().map(|c| c.collection_id()).as_deref(), Some("MOD09GQ___006"));

    assert!(message.cumulus_meta.execution_name.starts_with("ingest-"));
    assert_eq!(message.cumulus_meta.state_machine, workflow.arn);
    assert_eq!(message.cumulus_version(), Some("4.0.0"));
    assert_eq!(message.payload, json!({"granules": [{"granuleId": "g-1"}]}));
    assert_eq!(message.extra.get("exception"), Some(&json!("None")));
    assert!(message.extra.contains_key("workflow_config"));
    assert!(!message.extra.contains_key("payload"));

    let arn = message.execution_arn().expect("arn");
    assert!(arn.starts_with("arn:aws:states:us-east-1:12345:execution:dev-IngestGranule:ingest-"));
}

#[test]
fn absent_links_never_serialize_as_null() {
    let template = template();
    let workflow = workflow();
    let message = build_queue_message_from_template(QueueMessageParams { message_template: &template,
                                                                         workflow: &workflow,
                                                                         payload: Value::Null,
                                                                         parent_execution_arn: Some(""),
                                                                         async_operation_id: None,
                                                                         custom_cumulus_meta: None,
                                                                         custom_meta: None,
                                                                         execution_name_prefix: None });
    let out = serde_json::to_value(&message).expect("serialize");
    let cumulus_meta = out["cumulus_meta"].as_object().expect("object");
    assert!(!cumulus_meta.contains_key(PARENT_EXECUTION_ARN_KEY));
    assert!(!cumulus_meta.contains_key(ASYNC_OPERATION_ID_KEY));
}

#[test]
fn provided_links_are_carried() {
    let template = template();
    let workflow = workflow();
    let message = build_queue_message_from_template(QueueMessageParams { message_template: &template,
                                                                         workflow: &workflow,
                                                                         payload: json!({}),
                                                                         parent_execution_arn: Some("arn:parent"),
                                                                         async_operation_id: Some("op-1"),
                                                                         custom_cumulus_meta: None,
                                                                         custom_meta: None,
                                                                         execution_name_prefix: None });
    assert_eq!(message.parent_execution_arn(), Some("arn:parent"));
    assert_eq!(message.async_operation_id(), Some("op-1"));
    let out = serde_json::to_value(&message).expect("serialize");
    assert_eq!(out["cumulus_meta"][PARENT_EXECUTION_ARN_KEY], json!("arn:parent"));
    assert_eq!(out["cumulus_meta"][ASYNC_OPERATION_ID_KEY], json!("op-1"));
}

#[test]
fn built_identity_wins_over_custom_cumulus_meta() {
    let template = template();
    let workflow = workflow();
    let custom = map(json!({
        "execution_name": "caller-chosen",
        "state_machine": "arn:other",
        "parentExecutionArn": "arn:custom-parent",
        "queueUrl": "https://sqs/override",
        "priority": 5
    }));
    let message = build_queue_message_from_template(QueueMessageParams { message_template: &template,
                                                                         workflow: &workflow,
                                                                         payload: json!({}),
                                                                         parent_execution_arn: None,
                                                                         async_operation_id: None,
                                                                         custom_cumulus_meta: Some(&custom),
                                                                         custom_meta: None,
                                                                         execution_name_prefix: None });
    assert_ne!(message.cumulus_meta.execution_name, "caller-chosen");
    assert_eq!(message.cumulus_meta.state_machine, workflow.arn);
    // La identidad construida hereda queueUrl del template y gana al custom.
    assert_eq!(message.cumulus_meta.extra["queueUrl"], json!("https://sqs/startSF"));
    assert_eq!(message.cumulus_meta.extra["priority"], json!(5));
    assert_eq!(message.parent_execution_arn(), Some("arn:custom-parent"));
}

#[test]
fn custom_meta_cannot_override_workflow_name() {
    let template = template();
    let workflow = workflow();
    let custom_meta = map(json!({"workflow_name": "Hijack", "stack": "override"}));
    let message = build_queue_message_from_template(QueueMessageParams { message_template: &template,
                                                                         workflow: &workflow,
                                                                         payload: json!({}),
                                                                         parent_execution_arn: None,
                                                                         async_operation_id: None,
                                                                         custom_cumulus_meta: None,
                                                                         custom_meta: Some(&custom_meta),
                                                                         execution_name_prefix: None });
    assert_eq!(message.workflow_name(), Some("IngestGranule"));
    assert_eq!(message.meta["workflow_name"], json!("IngestGranule"));
    // El resto de campos del custom sí se fusiona.
    assert_eq!(message.meta["stack"], json!("override"));
}

#[test]
fn assembled_message_parses_back_as_event() {
    let template = template();
    let workflow = workflow();
    let message = build_queue_message_from_template(QueueMessageParams { message_template: &template,
                                                                         workflow: &workflow,
                                                                         payload: json!({"k": 1}),
                                                                         parent_execution_arn: Some("arn:p"),
                                                                         async_operation_id: None,
                                                                         custom_cumulus_meta: None,
                                                                         custom_meta: None,
                                                                         execution_name_prefix: Some("x") });
    let value = serde_json::to_value(&message).expect("serialize");
    let parsed = CumulusMessage::from_value(value).expect("parse");
    assert_eq!(parsed, message);
}

#[test]
fn malformed_template_is_rejected_at_boundary() {
    assert!(WorkflowMessageTemplate::from_value(json!("string")).is_err());
    assert!(WorkflowMessageTemplate::from_value(json!({"meta": [1]})).is_err());
    assert!(CumulusMessage::from_value(json!({"meta": {}})).is_err());
}
