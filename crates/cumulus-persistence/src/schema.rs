//! Esquema Diesel (escrito a mano a partir de `migrations/`). Reemplazable con `diesel print-schema`.

diesel::table! {
    collections (cumulus_id) {
        cumulus_id -> BigInt,
        name -> Text,
        version -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    async_operations (cumulus_id) {
        cumulus_id -> BigInt,
        id -> Uuid,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    granules (cumulus_id) {
        cumulus_id -> BigInt,
        granule_id -> Text,
        collection_cumulus_id -> BigInt,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    executions (cumulus_id) {
        cumulus_id -> BigInt,
        arn -> Text,
        name -> Text,
        status -> Text,
        workflow_name -> Nullable<Text>,
        cumulus_version -> Nullable<Text>,
        error -> Nullable<Jsonb>,
        original_payload -> Nullable<Jsonb>,
        final_payload -> Nullable<Jsonb>,
        duration -> Nullable<Double>,
        collection_cumulus_id -> Nullable<BigInt>,
        parent_cumulus_id -> Nullable<BigInt>,
        async_operation_cumulus_id -> Nullable<BigInt>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    granules_executions (execution_cumulus_id, granule_cumulus_id) {
        execution_cumulus_id -> BigInt,
        granule_cumulus_id -> BigInt,
        seq -> BigInt,
    }
}

diesel::joinable!(granules -> collections (collection_cumulus_id));
diesel::joinable!(granules_executions -> executions (execution_cumulus_id));
diesel::joinable!(granules_executions -> granules (granule_cumulus_id));

diesel::allow_tables_to_appear_in_same_query!(
    collections,
    async_operations,
    granules,
    executions,
    granules_executions,
);
