//! Evaluated values

use std::fmt;

use crate::error::Span;
use crate::parser::ast::{BoundOp, LabelKind};

/// Index of a loaded module file in the evaluator's source map
pub type FileId = usize;

/// A span inside a specific module file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub file: FileId,
    pub span: Span,
}

/// Why a value became bottom
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl Conflict {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Basic types usable as constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Number,
    String,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Number => "number",
            Kind::String => "string",
        }
    }

    /// Intersection of two kinds, `None` when disjoint
    pub fn intersect(self, other: Kind) -> Option<Kind> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Kind::Number, Kind::Int) | (Kind::Int, Kind::Number) => Some(Kind::Int),
            (Kind::Number, Kind::Float) | (Kind::Float, Kind::Number) => Some(Kind::Float),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Kind::Int | Kind::Float | Kind::Number)
    }

    /// Whether a concrete scalar belongs to this kind
    pub fn admits(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Kind::Null, Value::Null)
                | (Kind::Bool, Value::Bool(_))
                | (Kind::Int, Value::Int(_))
                | (Kind::Float, Value::Float(_))
                | (Kind::Number, Value::Int(_))
                | (Kind::Number, Value::Float(_))
                | (Kind::String, Value::String(_))
        )
    }
}

/// A bound constraint such as `>=0` or `!=""`
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub op: BoundOp,
    /// Concrete scalar the bound compares against
    pub limit: Box<Value>,
}

/// One alternative of a disjunction
#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    pub value: Value,
    pub is_default: bool,
}

/// A struct field after evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub label: String,
    pub value: Value,
    pub optional: bool,
}

impl FieldValue {
    pub fn regular(label: impl Into<String>, value: Value) -> Self {
        Self {
            label: label.into(),
            value,
            optional: false,
        }
    }

    /// Whether the field appears in exported output
    pub fn is_exported(&self) -> bool {
        !self.optional && LabelKind::of(&self.label) == LabelKind::Regular
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructValue {
    pub fields: Vec<FieldValue>,
}

impl StructValue {
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| &f.value)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListValue {
    pub elements: Vec<Value>,
    /// Open lists accept further elements
    pub open: bool,
}

/// Result of evaluating a module value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `_`: any value
    Top,
    /// A conflict; never becomes valid again
    Bottom(Conflict),
    /// A computation waiting for data that may still be filled in
    Incomplete(String),
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Kind(Kind),
    Bound(Bound),
    /// Conjunction of kinds and bounds that cannot be simplified further
    Constraints(Vec<Value>),
    Disjunction(Vec<Arm>),
    Struct(StructValue),
    List(ListValue),
}

impl Value {
    pub fn bottom(message: impl Into<String>) -> Self {
        Value::Bottom(Conflict::new(message))
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, Value::Bottom(_))
    }

    /// Concrete scalars: null, bool, numbers and strings
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// Type name used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Top => "_",
            Value::Bottom(_) => "_|_",
            Value::Incomplete(_) => "incomplete",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Kind(k) => k.name(),
            Value::Bound(b) => match b.limit.as_ref() {
                Value::String(_) => "string",
                _ => "number",
            },
            Value::Constraints(_) => "constraint",
            Value::Disjunction(_) => "disjunction",
            Value::Struct(_) => "struct",
            Value::List(_) => "list",
        }
    }

    /// Resolve disjunctions to their default, if there is exactly one candidate
    pub fn default_value(&self) -> &Value {
        match self {
            Value::Disjunction(arms) => {
                let mut defaults = arms.iter().filter(|a| a.is_default);
                match (defaults.next(), defaults.next()) {
                    (Some(arm), None) => arm.value.default_value(),
                    _ => self,
                }
            }
            other => other,
        }
    }

    /// Field of a struct value, looking through a default disjunction
    pub fn field(&self, label: &str) -> Option<&Value> {
        match self.default_value() {
            Value::Struct(s) => s.get(label),
            _ => None,
        }
    }

    /// Look up a dotted path such as `spec.replicas`
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.')
            .try_fold(self, |value, label| value.field(label))
    }

    /// Elements of a list value, looking through a default disjunction
    pub fn as_list(&self) -> Option<&[Value]> {
        match self.default_value() {
            Value::List(l) => Some(&l.elements),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.default_value() {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// First bottom value anywhere in the tree, with its path
    pub fn first_conflict(&self) -> Option<(String, &Conflict)> {
        self.find_conflict(String::new())
    }

    fn find_conflict(&self, path: String) -> Option<(String, &Conflict)> {
        match self {
            Value::Bottom(conflict) => Some((path, conflict)),
            Value::Struct(s) => s.fields.iter().find_map(|f| {
                let child = if path.is_empty() {
                    f.label.clone()
                } else {
                    format!("{}.{}", path, f.label)
                };
                f.value.find_conflict(child)
            }),
            Value::List(l) => l
                .elements
                .iter()
                .enumerate()
                .find_map(|(i, v)| v.find_conflict(format!("{}[{}]", path, i))),
            Value::Disjunction(arms) => arms
                .iter()
                .find_map(|a| a.value.find_conflict(path.clone())),
            _ => None,
        }
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    match serde_json::to_string(s) {
        Ok(quoted) => write!(f, "{}", quoted),
        Err(_) => write!(f, "{:?}", s),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Top => write!(f, "_"),
            Value::Bottom(c) => write!(f, "_|_ // {}", c.message),
            Value::Incomplete(reason) => write!(f, "_|_ // incomplete: {}", reason),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write_string(f, s),
            Value::Kind(k) => write!(f, "{}", k.name()),
            Value::Bound(b) => write!(f, "{}{}", b.op.symbol(), b.limit),
            Value::Constraints(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Disjunction(arms) => {
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    if arm.is_default {
                        write!(f, "*")?;
                    }
                    write!(f, "{}", arm.value)?;
                }
                Ok(())
            }
            Value::Struct(s) => {
                write!(f, "{{")?;
                for (i, field) in s.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    let optional = if field.optional { "?" } else { "" };
                    write!(f, "{}{}: {}", field.label, optional, field.value)?;
                }
                write!(f, "}}")
            }
            Value::List(l) => {
                write!(f, "[")?;
                for (i, element) in l.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                if l.open {
                    if !l.elements.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Convert decoded JSON into a value
impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None if n.is_u64() => Value::bottom(format!("integer overflow: {} exceeds {}", n, i64::MAX)),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(ListValue {
                elements: items.iter().map(Value::from).collect(),
                open: false,
            }),
            serde_json::Value::Object(map) => Value::Struct(StructValue {
                fields: map
                    .iter()
                    .map(|(k, v)| FieldValue::regular(k.clone(), Value::from(v)))
                    .collect(),
            }),
        }
    }
}
