//! Derivación de ARNs de ejecución.

/// Construye el ARN de una ejecución a partir del ARN del state machine y del
/// nombre de ejecución (`...:stateMachine:X` -> `...:execution:X:<name>`).
///
/// Devuelve `None` si falta cualquiera de las dos partes.
pub fn build_execution_arn(state_machine_arn: &str, execution_name: &str) -> Option<String> {
    if state_machine_arn.is_empty() || execution_name.is_empty() {
        return None;
    }
    let base = state_machine_arn.replacen("stateMachine", "execution", 1);
    Some(format!("{base}:{execution_name}"))
}
