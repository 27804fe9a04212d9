//! Values that can be bound into a template slot

use serde::Serialize;

use super::FillError;
use crate::eval::Value;

/// Anything that can be unified into a template
pub trait Bindable {
    fn bind_value(&self) -> Result<Value, FillError>;
}

/// Instance parameters, either decoded from JSON or taken from the template itself
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// A decoded JSON object
    Native(serde_json::Map<String, serde_json::Value>),
    /// A sub-value of an evaluated template
    Graph(Value),
}

impl Parameters {
    /// Parse a JSON object
    pub fn from_json(text: &str) -> Result<Self, FillError> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| FillError::Bind(e.to_string()))?;
        Self::from_object(json)
    }

    /// Serialize any value that maps to a JSON object
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, FillError> {
        let json = serde_json::to_value(value).map_err(|e| FillError::Bind(e.to_string()))?;
        Self::from_object(json)
    }

    fn from_object(json: serde_json::Value) -> Result<Self, FillError> {
        match json {
            serde_json::Value::Object(map) => Ok(Parameters::Native(map)),
            other => Err(FillError::Bind(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }
}

impl Bindable for Parameters {
    fn bind_value(&self) -> Result<Value, FillError> {
        match self {
            Parameters::Native(map) => Ok(Value::from(&serde_json::Value::Object(map.clone()))),
            Parameters::Graph(value) => Ok(value.clone()),
        }
    }
}

impl Bindable for Value {
    fn bind_value(&self) -> Result<Value, FillError> {
        Ok(self.clone())
    }
}

impl Bindable for serde_json::Value {
    fn bind_value(&self) -> Result<Value, FillError> {
        Ok(Value::from(self))
    }
}
