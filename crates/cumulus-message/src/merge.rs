//! Utilidades para fusionar JSON de forma determinista.
//!
//! Merge profundo: los objetos anidados se fusionan clave a clave y los
//! arreglos posición a posición; cualquier otro valor de `source` reemplaza al
//! de `target`. Es la semántica que esperan los templates de workflow cuando
//! se combinan con la metadata del llamador.

use serde_json::{Map, Value};

/// Merge profundo que devuelve un valor nuevo: `b` tiene precedencia sobre `a`.
pub fn merge_json(a: &Value, b: &Value) -> Value {
    let mut out = a.clone();
    merge_value_into(&mut out, b);
    out
}

/// Fusiona `source` dentro de `target` (in place).
pub fn deep_merge_into(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (k, v) in source {
        match target.get_mut(k) {
            Some(existing) => merge_value_into(existing, v),
            None => {
                target.insert(k.clone(), v.clone());
            }
        }
    }
}

fn merge_value_into(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(t), Value::Object(s)) => deep_merge_into(t, s),
        (Value::Array(t), Value::Array(s)) => {
            for (i, v) in s.iter().enumerate() {
                match t.get_mut(i) {
                    Some(existing) => merge_value_into(existing, v),
                    None => t.push(v.clone()),
                }
            }
        }
        (t, s) => *t = s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_are_merged_key_by_key() {
        let a = json!({"provider": {"id": "p1", "host": "a"}, "keep": 1});
        let b = json!({"provider": {"host": "b"}});
        assert_eq!(merge_json(&a, &b), json!({"provider": {"id": "p1", "host": "b"}, "keep": 1}));
    }

    #[test]
    fn arrays_merge_by_position() {
        let a = json!({"xs": [1, 2, 3]});
        let b = json!({"xs": [9]});
        assert_eq!(merge_json(&a, &b), json!({"xs": [9, 2, 3]}));
    }

    #[test]
    fn scalars_and_nulls_replace() {
        let a = json!({"x": {"deep": true}, "y": 1});
        let b = json!({"x": "flat", "y": null});
        assert_eq!(merge_json(&a, &b), json!({"x": "flat", "y": null}));
    }
}
