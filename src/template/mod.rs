//! Filling parameters into a template and extracting the result
//!
//! A compiled package exposes three slots by convention: `template` (the
//! output skeleton), `parameters` (where instance values are bound) and,
//! optionally, `instances`. [`fill`] binds a value at a slot path and
//! re-evaluates; [`extract_json`] reads a slot back out as JSON.
//!
//! # Example
//!
//! ```rust
//! use kue::eval::Evaluator;
//! use kue::template::{extract_json, fill, Parameters};
//!
//! let mut evaluator = Evaluator::new();
//! let root = evaluator
//!     .compile_str("t.cue", "parameters: {}\ntemplate: { a: parameters.x }")
//!     .unwrap();
//! let params = Parameters::from_json(r#"{"x": 5}"#).unwrap();
//! let resolved = fill(&root, "parameters", &params).unwrap();
//! assert_eq!(extract_json(&resolved, "template").unwrap(), br#"{"a":5}"#);
//! ```

mod bindable;

pub use bindable::{Bindable, Parameters};

use thiserror::Error;

use crate::eval::unify::struct_of;
use crate::eval::{to_json, Conflict, TemplateValue, Value};

/// Slot holding the output skeleton
pub const TEMPLATE_SLOT: &str = "template";
/// Slot instance parameters are bound to
pub const PARAMETERS_SLOT: &str = "parameters";

#[derive(Error, Debug)]
pub enum FillError {
    #[error("invalid parameters: {0}")]
    Bind(String),

    #[error("parameters conflict with the template at {path}: {conflict}")]
    Conflict { path: String, conflict: Conflict },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("slot \"{0}\" not found")]
    MissingSlot(String),

    #[error("{path} is not concrete: {value}")]
    NotConcrete { path: String, value: Value },

    #[error("failed to encode JSON: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Bind `value` at the dotted `path` of a copy of `root`
///
/// Missing intermediate structs are created. The result must be free of
/// conflicts; incomplete values are left for [`extract_json`] to report.
pub fn fill(
    root: &TemplateValue,
    path: &str,
    value: &impl Bindable,
) -> Result<TemplateValue, FillError> {
    let bound = value.bind_value()?;
    let nested = path
        .rsplit('.')
        .filter(|label| !label.is_empty())
        .fold(bound, |acc, label| struct_of([(label.to_string(), acc)]));

    let resolved = root.unify(nested);
    if let Some((path, conflict)) = resolved.first_conflict() {
        return Err(FillError::Conflict {
            path,
            conflict: conflict.clone(),
        });
    }
    Ok(resolved)
}

/// Read the slot at `path` as a JSON value
pub fn extract(resolved: &TemplateValue, path: &str) -> Result<serde_json::Value, ExtractError> {
    let slot = resolved
        .lookup(path)
        .ok_or_else(|| ExtractError::MissingSlot(path.to_string()))?;
    to_json(slot).map_err(|unresolved| ExtractError::NotConcrete {
        path: if unresolved.path.is_empty() {
            path.to_string()
        } else {
            format!("{}.{}", path, unresolved.path)
        },
        value: unresolved.value,
    })
}

/// Read the slot at `path` as compact JSON bytes with sorted keys
pub fn extract_json(resolved: &TemplateValue, path: &str) -> Result<Vec<u8>, ExtractError> {
    let json = extract(resolved, path)?;
    Ok(serde_json::to_vec(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Evaluator;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compile(source: &str) -> TemplateValue {
        Evaluator::new()
            .compile_str("test.cue", source)
            .expect("compile")
    }

    fn params(json: serde_json::Value) -> Parameters {
        match json {
            serde_json::Value::Object(map) => Parameters::Native(map),
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_round_trip() {
        let root = compile("parameters: {}\ntemplate: { a: parameters.x }");
        let resolved = fill(&root, PARAMETERS_SLOT, &params(json!({"x": 5}))).expect("fill");
        assert_eq!(
            extract_json(&resolved, TEMPLATE_SLOT).expect("extract"),
            br#"{"a":5}"#.to_vec()
        );
    }

    #[test]
    fn test_fill_is_pure() {
        let root = compile("parameters: {}\ntemplate: { a: parameters.x }");
        let first = fill(&root, PARAMETERS_SLOT, &params(json!({"x": 1}))).expect("fill");
        let second = fill(&root, PARAMETERS_SLOT, &params(json!({"x": 2}))).expect("fill");

        assert_eq!(extract(&first, TEMPLATE_SLOT).expect("extract"), json!({"a": 1}));
        assert_eq!(extract(&second, TEMPLATE_SLOT).expect("extract"), json!({"a": 2}));
        assert!(matches!(
            root.lookup("template.a"),
            Some(Value::Incomplete(_))
        ));
    }

    #[test]
    fn test_fill_conflict() {
        let root = compile("parameters: { replicas: int }\ntemplate: {}");
        let err = fill(&root, PARAMETERS_SLOT, &params(json!({"replicas": "three"}))).unwrap_err();
        match err {
            FillError::Conflict { path, .. } => assert_eq!(path, "parameters.replicas"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_fill_rejects_integer_beyond_i64() {
        let root = compile("parameters: { size: int }\ntemplate: { size: parameters.size }");
        let params = Parameters::from_json(r#"{"size": 18446744073709551615}"#).expect("params");
        match fill(&root, PARAMETERS_SLOT, &params).unwrap_err() {
            FillError::Conflict { path, conflict } => {
                assert_eq!(path, "parameters.size");
                assert!(conflict.message.contains("integer overflow"), "{}", conflict);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_fill_rejects_field_not_in_definition() {
        let root = compile("#Params: { name: string }\nparameters: #Params\ntemplate: {}");
        let err = fill(&root, PARAMETERS_SLOT, &params(json!({"name": "a", "typo": 1}))).unwrap_err();
        assert!(err.to_string().contains("not allowed"), "{}", err);
    }

    #[test]
    fn test_fill_object_where_scalar_expected() {
        let root = compile("parameters: string\ntemplate: {}");
        assert!(fill(&root, PARAMETERS_SLOT, &params(json!({"a": 1}))).is_err());
    }

    #[test]
    fn test_fill_nested_path() {
        let root = compile("config: {}\ntemplate: { port: config.server.port }");
        let resolved = fill(
            &root,
            "config.server",
            &Value::from(&json!({"port": 8080})),
        )
        .expect("fill");
        assert_eq!(
            extract(&resolved, TEMPLATE_SLOT).expect("extract"),
            json!({"port": 8080})
        );
    }

    #[test]
    fn test_extract_missing_required_field() {
        let root = compile("parameters: { name: string, image: string }\ntemplate: { name: parameters.name, image: parameters.image }");
        let resolved = fill(&root, PARAMETERS_SLOT, &params(json!({"name": "web"}))).expect("fill");
        let err = extract_json(&resolved, TEMPLATE_SLOT).unwrap_err();
        match err {
            ExtractError::NotConcrete { path, .. } => assert_eq!(path, "template.image"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_extract_missing_slot() {
        let root = compile("parameters: {}");
        let err = extract_json(&root, TEMPLATE_SLOT).unwrap_err();
        assert!(matches!(err, ExtractError::MissingSlot(_)));
    }

    #[test]
    fn test_extract_sorts_keys_and_applies_defaults() {
        let root = compile("parameters: {}\ntemplate: { z: *1 | int, a: \"x\", _tmp: 3, #T: int }");
        assert_eq!(
            extract_json(&root, TEMPLATE_SLOT).expect("extract"),
            br#"{"a":"x","z":1}"#.to_vec()
        );
    }
}
