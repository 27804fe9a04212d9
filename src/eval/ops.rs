//! Operators and builtins over evaluated values

use std::cmp::Ordering;

use super::unify::{bound, compare};
use super::value::{ListValue, Value};
use crate::parser::ast::{BinaryOp, UnaryOp};

/// A field or list position selected from a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    Field(String),
    Index(usize),
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feature::Field(label) => write!(f, "{}", label),
            Feature::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Pass errors and incomplete values through, or resolve to a concrete operand
fn concrete(value: Value, context: &str) -> Result<Value, Value> {
    match value.default_value() {
        Value::Bottom(_) | Value::Incomplete(_) => Err(value.default_value().clone()),
        v if v.is_scalar() || matches!(v, Value::Struct(_) | Value::List(_)) => Ok(v.clone()),
        v => Err(Value::Incomplete(format!(
            "non-concrete value {} in {}",
            v, context
        ))),
    }
}

pub fn unary(op: UnaryOp, operand: Value) -> Value {
    if let UnaryOp::Bound(bound_op) = op {
        return match concrete(operand, "bound") {
            Ok(v) => bound(bound_op, v),
            Err(e) => e,
        };
    }

    let operand = match concrete(operand, "unary operand") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match (op, operand) {
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .unwrap_or_else(|| Value::bottom("integer overflow")),
        (UnaryOp::Neg, Value::Float(x)) => Value::Float(-x),
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (op, v) => Value::bottom(format!(
            "invalid operand {} ('{}' requires {})",
            v,
            if op == UnaryOp::Neg { "-" } else { "!" },
            if op == UnaryOp::Neg { "a number" } else { "a bool" }
        )),
    }
}

/// Arithmetic, comparison and logical operators; `|` and `&` are handled by
/// the evaluator itself
pub fn binary(op: BinaryOp, left: Value, right: Value) -> Value {
    let context = format!("'{}' operation", op.symbol());
    let left = match concrete(left, &context) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let right = match concrete(right, &context) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match op {
        BinaryOp::Equal => Value::Bool(equal(&left, &right)),
        BinaryOp::NotEqual => Value::Bool(!equal(&left, &right)),
        BinaryOp::Less | BinaryOp::LessOrEqual | BinaryOp::Greater | BinaryOp::GreaterOrEqual => {
            match compare(&left, &right) {
                Some(ordering) => Value::Bool(match op {
                    BinaryOp::Less => ordering == Ordering::Less,
                    BinaryOp::LessOrEqual => ordering != Ordering::Greater,
                    BinaryOp::Greater => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }),
                None => invalid_operands(op, &left, &right),
            }
        }
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr => match (&left, &right) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(if op == BinaryOp::LogicalAnd {
                *a && *b
            } else {
                *a || *b
            }),
            _ => invalid_operands(op, &left, &right),
        },
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(op, left, right)
        }
        BinaryOp::Or | BinaryOp::And => invalid_operands(op, &left, &right),
    }
}

fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            compare(a, b) == Some(Ordering::Equal)
        }
        _ => a == b,
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Value {
    match (op, &left, &right) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Value::String(format!("{}{}", a, b)),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut elements = a.elements.clone();
            elements.extend(b.elements.iter().cloned());
            Value::List(ListValue {
                elements,
                open: false,
            })
        }
        (BinaryOp::Div, _, _) => match (as_f64(&left), as_f64(&right)) {
            (Some(_), Some(d)) if d == 0.0 => Value::bottom("division by zero"),
            (Some(n), Some(d)) => Value::Float(n / d),
            _ => invalid_operands(op, &left, &right),
        },
        (_, Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                _ => a.checked_mul(*b),
            };
            result
                .map(Value::Int)
                .unwrap_or_else(|| Value::bottom("integer overflow"))
        }
        _ => match (as_f64(&left), as_f64(&right)) {
            (Some(a), Some(b)) => Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                _ => a * b,
            }),
            _ => invalid_operands(op, &left, &right),
        },
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

fn invalid_operands(op: BinaryOp, left: &Value, right: &Value) -> Value {
    Value::bottom(format!(
        "invalid operands {} and {} to '{}' (type {} and {})",
        left,
        right,
        op.symbol(),
        left.kind_name(),
        right.kind_name()
    ))
}

/// Select a field or element out of an already evaluated value
pub fn select(value: &Value, feature: &Feature) -> Value {
    match (value.default_value(), feature) {
        (v @ (Value::Bottom(_) | Value::Incomplete(_)), _) => v.clone(),
        (Value::Struct(s), Feature::Field(label)) => match s.get(label) {
            Some(v) => v.clone(),
            None => Value::Incomplete(format!("undefined field: {}", label)),
        },
        (Value::List(l), Feature::Index(i)) => match l.elements.get(*i) {
            Some(v) => v.clone(),
            None if l.open => Value::Incomplete(format!("index {} not yet defined", i)),
            None => Value::bottom(format!(
                "index out of range [{}] with length {}",
                i,
                l.elements.len()
            )),
        },
        (Value::Top | Value::Disjunction(_), _) => {
            Value::Incomplete(format!("cannot select {} from non-concrete value", feature))
        }
        (v, Feature::Field(label)) => Value::bottom(format!(
            "invalid selector {}: {} is not a struct",
            label, v
        )),
        (v, Feature::Index(_)) => Value::bottom(format!("cannot index {} ({})", v, v.kind_name())),
    }
}

/// Turn an evaluated index expression into a feature
pub fn feature_of(index: Value) -> Result<Feature, Value> {
    match index.default_value() {
        Value::Int(n) if *n >= 0 => Ok(Feature::Index(*n as usize)),
        Value::Int(n) => Err(Value::bottom(format!("invalid index {} (index must be non-negative)", n))),
        Value::String(s) => Ok(Feature::Field(s.clone())),
        v @ (Value::Bottom(_) | Value::Incomplete(_)) => Err(v.clone()),
        v if v.is_scalar() => Err(Value::bottom(format!("invalid index {}", v))),
        v => Err(Value::Incomplete(format!("non-concrete index {}", v))),
    }
}

/// Builtin functions available to modules
pub fn call(name: &str, args: Vec<Value>) -> Value {
    match name {
        "len" => {
            if args.len() != 1 {
                return Value::bottom(format!(
                    "len takes 1 argument, {} given",
                    args.len()
                ));
            }
            let arg = args.into_iter().next().unwrap_or(Value::Top);
            match arg.default_value() {
                Value::String(s) => Value::Int(s.len() as i64),
                Value::List(l) if !l.open => Value::Int(l.elements.len() as i64),
                Value::Struct(s) => Value::Int(
                    s.fields.iter().filter(|f| f.is_exported()).count() as i64,
                ),
                v @ (Value::Bottom(_) | Value::Incomplete(_)) => v.clone(),
                v if v.is_scalar() => Value::bottom(format!("invalid argument {} to len", v)),
                v => Value::Incomplete(format!("non-concrete argument {} to len", v)),
            }
        }
        other => Value::bottom(format!("reference \"{}\" not found", other)),
    }
}

/// Render a concrete scalar for string interpolation
pub fn interpolate(value: &Value) -> Result<String, Value> {
    match value.default_value() {
        Value::String(s) => Ok(s.clone()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Float(x) => Ok(x.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        v @ (Value::Bottom(_) | Value::Incomplete(_)) => Err(v.clone()),
        v @ (Value::Null | Value::Struct(_) | Value::List(_)) => Err(Value::bottom(format!(
            "invalid interpolation: cannot use {} ({}) as string",
            v,
            v.kind_name()
        ))),
        v => Err(Value::Incomplete(format!(
            "non-concrete value {} in interpolation",
            v
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::unify::struct_of;
    use crate::eval::value::Kind;

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        assert_eq!(
            binary(BinaryOp::Add, Value::Int(2), Value::Int(3)),
            Value::Int(5)
        );
        assert_eq!(
            binary(BinaryOp::Mul, Value::Int(2), Value::Int(3)),
            Value::Int(6)
        );
    }

    #[test]
    fn test_division_yields_float() {
        assert_eq!(
            binary(BinaryOp::Div, Value::Int(7), Value::Int(2)),
            Value::Float(3.5)
        );
        assert!(binary(BinaryOp::Div, Value::Int(1), Value::Int(0)).is_bottom());
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            binary(
                BinaryOp::Add,
                Value::String("web".into()),
                Value::String("-svc".into())
            ),
            Value::String("web-svc".into())
        );
    }

    #[test]
    fn test_non_concrete_operand_is_incomplete() {
        let result = binary(BinaryOp::Add, Value::Kind(Kind::Int), Value::Int(1));
        assert!(matches!(result, Value::Incomplete(_)));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            binary(BinaryOp::Less, Value::Int(1), Value::Float(1.5)),
            Value::Bool(true)
        );
        assert_eq!(
            binary(BinaryOp::Equal, Value::String("a".into()), Value::String("a".into())),
            Value::Bool(true)
        );
        assert!(binary(BinaryOp::Less, Value::Int(1), Value::String("a".into())).is_bottom());
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnaryOp::Neg, Value::Int(4)), Value::Int(-4));
        assert_eq!(unary(UnaryOp::Not, Value::Bool(true)), Value::Bool(false));
        assert!(unary(UnaryOp::Not, Value::Int(1)).is_bottom());
    }

    #[test]
    fn test_select_missing_field_is_incomplete() {
        let s = struct_of([("a".to_string(), Value::Int(1))]);
        assert_eq!(select(&s, &Feature::Field("a".into())), Value::Int(1));
        assert!(matches!(
            select(&s, &Feature::Field("b".into())),
            Value::Incomplete(_)
        ));
    }

    #[test]
    fn test_select_out_of_range() {
        let l = Value::List(ListValue {
            elements: vec![Value::Int(1)],
            open: false,
        });
        assert!(select(&l, &Feature::Index(3)).is_bottom());
    }

    #[test]
    fn test_len() {
        assert_eq!(
            call("len", vec![Value::String("abc".into())]),
            Value::Int(3)
        );
        let l = Value::List(ListValue {
            elements: vec![Value::Int(1), Value::Int(2)],
            open: false,
        });
        assert_eq!(call("len", vec![l]), Value::Int(2));
        assert!(call("nope", vec![]).is_bottom());
    }

    #[test]
    fn test_interpolate_scalars() {
        assert_eq!(interpolate(&Value::Int(3)), Ok("3".to_string()));
        assert!(interpolate(&Value::Kind(Kind::String)).is_err());
    }
}
