//! Conversion of concrete values to JSON

use serde_json::{Map, Number};

use super::value::Value;

/// A value that could not be exported because it is not concrete
#[derive(Debug, Clone, PartialEq)]
pub struct Unresolved {
    /// Dotted path to the offending field, relative to the exported value
    pub path: String,
    pub value: Value,
}

/// Convert a fully concrete value to JSON
///
/// Optional fields, definitions and hidden fields are skipped. Disjunctions
/// export their single default. Object keys come out sorted.
pub fn to_json(value: &Value) -> Result<serde_json::Value, Unresolved> {
    export(value, String::new())
}

fn export(value: &Value, path: String) -> Result<serde_json::Value, Unresolved> {
    match value.default_value() {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Int(n) => Ok(serde_json::Value::Number(Number::from(*n))),
        Value::Float(x) => match Number::from_f64(*x) {
            Some(n) => Ok(serde_json::Value::Number(n)),
            None => Err(Unresolved {
                path,
                value: Value::Float(*x),
            }),
        },
        Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Struct(s) => {
            let mut map = Map::new();
            for field in s.fields.iter().filter(|f| f.is_exported()) {
                let child = if path.is_empty() {
                    field.label.clone()
                } else {
                    format!("{}.{}", path, field.label)
                };
                map.insert(field.label.clone(), export(&field.value, child)?);
            }
            Ok(serde_json::Value::Object(map))
        }
        Value::List(l) => l
            .elements
            .iter()
            .enumerate()
            .map(|(i, element)| export(element, format!("{}[{}]", path, i)))
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
        other => Err(Unresolved {
            path,
            value: other.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::unify::struct_of;
    use crate::eval::value::{Arm, FieldValue, Kind, ListValue, StructValue};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_export_concrete_tree() {
        let value = struct_of([
            ("b".to_string(), Value::Int(1)),
            (
                "a".to_string(),
                Value::List(ListValue {
                    elements: vec![Value::String("x".into()), Value::Null],
                    open: false,
                }),
            ),
        ]);
        assert_eq!(to_json(&value), Ok(json!({"a": ["x", null], "b": 1})));
    }

    #[test]
    fn test_export_skips_hidden_definitions_and_optional() {
        let value = Value::Struct(StructValue {
            fields: vec![
                FieldValue::regular("kept", Value::Bool(true)),
                FieldValue::regular("_hidden", Value::Kind(Kind::Int)),
                FieldValue::regular("#Def", Value::Kind(Kind::Int)),
                FieldValue {
                    label: "maybe".into(),
                    value: Value::Kind(Kind::String),
                    optional: true,
                },
            ],
        });
        assert_eq!(to_json(&value), Ok(json!({"kept": true})));
    }

    #[test]
    fn test_export_uses_default() {
        let value = struct_of([(
            "replicas".to_string(),
            Value::Disjunction(vec![
                Arm {
                    value: Value::Int(1),
                    is_default: true,
                },
                Arm {
                    value: Value::Kind(Kind::Int),
                    is_default: false,
                },
            ]),
        )]);
        assert_eq!(to_json(&value), Ok(json!({"replicas": 1})));
    }

    #[test]
    fn test_export_reports_incomplete_path() {
        let value = struct_of([(
            "spec".to_string(),
            struct_of([(
                "ports".to_string(),
                Value::List(ListValue {
                    elements: vec![Value::Kind(Kind::Int)],
                    open: false,
                }),
            )]),
        )]);
        let err = to_json(&value).unwrap_err();
        assert_eq!(err.path, "spec.ports[0]");
        assert_eq!(err.value, Value::Kind(Kind::Int));
    }
}
