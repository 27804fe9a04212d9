//! Unification of evaluated values

use std::cmp::Ordering;

use super::value::{Arm, Bound, FieldValue, Kind, ListValue, StructValue, Value};
use crate::parser::ast::BoundOp;

/// Unify two values (`a & b`)
pub fn meet(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Bottom(c), _) | (_, Value::Bottom(c)) => Value::Bottom(c),
        (Value::Top, other) | (other, Value::Top) => other,
        (Value::Incomplete(r), _) | (_, Value::Incomplete(r)) => Value::Incomplete(r),
        (Value::Disjunction(a), Value::Disjunction(b)) => meet_disjunctions(a, b),
        (Value::Disjunction(arms), other) | (other, Value::Disjunction(arms)) => {
            meet_disjunctions(
                arms,
                vec![Arm {
                    value: other,
                    is_default: false,
                }],
            )
        }
        (Value::Struct(a), Value::Struct(b)) => Value::Struct(meet_structs(a, b)),
        (Value::List(a), Value::List(b)) => meet_lists(a, b),
        (a @ (Value::Struct(_) | Value::List(_)), b) | (b, a @ (Value::Struct(_) | Value::List(_))) => {
            mismatch(&a, &b)
        }
        (a, b) => {
            let mut atoms = Vec::new();
            flatten_atoms(a, &mut atoms);
            flatten_atoms(b, &mut atoms);
            meet_atoms(atoms)
        }
    }
}

fn mismatch(a: &Value, b: &Value) -> Value {
    Value::bottom(format!(
        "conflicting values {} and {} (mismatched types {} and {})",
        a,
        b,
        a.kind_name(),
        b.kind_name()
    ))
}

fn flatten_atoms(value: Value, atoms: &mut Vec<Value>) {
    match value {
        Value::Constraints(items) => atoms.extend(items),
        other => atoms.push(other),
    }
}

/// Combine scalars, kinds and bounds into the simplest equivalent value
fn meet_atoms(atoms: Vec<Value>) -> Value {
    let mut concrete: Option<Value> = None;
    let mut kind: Option<Kind> = None;
    let mut bounds: Vec<Bound> = Vec::new();

    for atom in atoms {
        match atom {
            Value::Kind(k) => {
                kind = match kind {
                    None => Some(k),
                    Some(existing) => match existing.intersect(k) {
                        Some(both) => Some(both),
                        None => {
                            return Value::bottom(format!(
                                "conflicting values {} and {} (mismatched types {} and {})",
                                existing.name(),
                                k.name(),
                                existing.name(),
                                k.name()
                            ))
                        }
                    },
                };
            }
            Value::Bound(b) => {
                if !bounds.contains(&b) {
                    bounds.push(b);
                }
            }
            scalar => match &concrete {
                None => concrete = Some(scalar),
                Some(existing) => {
                    if existing != &scalar {
                        return conflicting_scalars(existing, &scalar);
                    }
                }
            },
        }
    }

    if let Some(value) = concrete {
        if let Some(k) = kind {
            if !k.admits(&value) {
                return Value::bottom(format!(
                    "conflicting values {} and {} (mismatched types {} and {})",
                    value,
                    k.name(),
                    value.kind_name(),
                    k.name()
                ));
            }
        }
        for bound in &bounds {
            if let Err(message) = check_bound(bound, &value) {
                return Value::bottom(message);
            }
        }
        return value;
    }

    if let Some(k) = kind {
        for bound in &bounds {
            let compatible = match (bound.op, bound.limit.as_ref()) {
                (BoundOp::NotEqual, limit) => k.admits(limit),
                (_, Value::String(_)) => k == Kind::String,
                (_, _) => k.is_numeric(),
            };
            if !compatible {
                return Value::bottom(format!(
                    "conflicting values {} and {}{} (mismatched types {} and {})",
                    k.name(),
                    bound.op.symbol(),
                    bound.limit,
                    k.name(),
                    bound.limit.kind_name()
                ));
            }
        }
    }

    let mut parts: Vec<Value> = kind.map(Value::Kind).into_iter().collect();
    parts.extend(bounds.into_iter().map(Value::Bound));
    match parts.len() {
        0 => Value::Top,
        1 => parts.remove(0),
        _ => Value::Constraints(parts),
    }
}

fn conflicting_scalars(a: &Value, b: &Value) -> Value {
    if a.kind_name() == b.kind_name() {
        Value::bottom(format!("conflicting values {} and {}", a, b))
    } else {
        mismatch(a, b)
    }
}

/// Compare two concrete scalars of the same type
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Check a concrete value against a bound
pub fn check_bound(bound: &Bound, value: &Value) -> Result<(), String> {
    let limit = bound.limit.as_ref();
    if bound.op == BoundOp::NotEqual {
        return if value == limit {
            Err(format!(
                "invalid value {} (out of bound {}{})",
                value,
                bound.op.symbol(),
                limit
            ))
        } else {
            Ok(())
        };
    }

    let ordering = compare(value, limit).ok_or_else(|| {
        format!(
            "conflicting values {} and {}{} (mismatched types {} and {})",
            value,
            bound.op.symbol(),
            limit,
            value.kind_name(),
            limit.kind_name()
        )
    })?;
    let holds = match bound.op {
        BoundOp::GreaterOrEqual => ordering != Ordering::Less,
        BoundOp::Greater => ordering == Ordering::Greater,
        BoundOp::LessOrEqual => ordering != Ordering::Greater,
        BoundOp::Less => ordering == Ordering::Less,
        BoundOp::NotEqual => true,
    };
    if holds {
        Ok(())
    } else {
        Err(format!(
            "invalid value {} (out of bound {}{})",
            value,
            bound.op.symbol(),
            limit
        ))
    }
}

fn meet_structs(a: StructValue, b: StructValue) -> StructValue {
    let mut fields = a.fields;
    for field in b.fields {
        match fields.iter_mut().find(|f| f.label == field.label) {
            Some(existing) => {
                let value = std::mem::replace(&mut existing.value, Value::Top);
                existing.value = meet(value, field.value);
                existing.optional = existing.optional && field.optional;
            }
            None => fields.push(field),
        }
    }
    StructValue { fields }
}

fn meet_lists(a: ListValue, b: ListValue) -> Value {
    let (a_len, b_len) = (a.elements.len(), b.elements.len());
    let too_long = |open_len: usize, closed_len: usize| open_len > closed_len;
    let (len, open) = match (a.open, b.open) {
        (false, false) if a_len != b_len => {
            return Value::bottom(format!(
                "incompatible list lengths ({} and {})",
                a_len, b_len
            ))
        }
        (false, false) => (a_len, false),
        (true, false) if too_long(a_len, b_len) => {
            return Value::bottom(format!(
                "incompatible list lengths ({} and {})",
                a_len, b_len
            ))
        }
        (false, true) if too_long(b_len, a_len) => {
            return Value::bottom(format!(
                "incompatible list lengths ({} and {})",
                a_len, b_len
            ))
        }
        (true, false) => (b_len, false),
        (false, true) => (a_len, false),
        (true, true) => (a_len.max(b_len), true),
    };

    let mut left = a.elements.into_iter();
    let mut right = b.elements.into_iter();
    let elements = (0..len)
        .map(|_| {
            meet(
                left.next().unwrap_or(Value::Top),
                right.next().unwrap_or(Value::Top),
            )
        })
        .collect();
    Value::List(ListValue { elements, open })
}

/// Unify two disjunctions arm by arm, keeping defaults where both sides agree
fn meet_disjunctions(a: Vec<Arm>, b: Vec<Arm>) -> Value {
    let a_has_default = a.iter().any(|arm| arm.is_default);
    let b_has_default = b.iter().any(|arm| arm.is_default);

    let mut arms = Vec::with_capacity(a.len() * b.len());
    for x in &a {
        for y in &b {
            let is_default = (x.is_default || !a_has_default)
                && (y.is_default || !b_has_default)
                && (a_has_default || b_has_default);
            arms.push(Arm {
                value: meet(x.value.clone(), y.value.clone()),
                is_default,
            });
        }
    }
    disjunction(arms)
}

/// Normalize a list of arms: drop failed arms, merge duplicates, collapse singletons
pub fn disjunction(arms: Vec<Arm>) -> Value {
    let mut first_error = None;
    let mut kept: Vec<Arm> = Vec::new();
    for arm in arms {
        if let Value::Bottom(conflict) = arm.value {
            first_error.get_or_insert(conflict);
            continue;
        }
        match kept.iter_mut().find(|k| k.value == arm.value) {
            Some(existing) => existing.is_default |= arm.is_default,
            None => kept.push(arm),
        }
    }

    match kept.len() {
        0 => match first_error {
            Some(mut conflict) => {
                conflict.message = format!("empty disjunction: {}", conflict.message);
                Value::Bottom(conflict)
            }
            None => Value::bottom("empty disjunction"),
        },
        1 => kept.remove(0).value,
        _ => Value::Disjunction(kept),
    }
}

/// Build a bound from a prefix operator and its operand
pub fn bound(op: BoundOp, operand: Value) -> Value {
    match operand {
        Value::Bottom(_) | Value::Incomplete(_) => operand,
        limit if limit.is_scalar() => {
            let ordered = matches!(limit, Value::Int(_) | Value::Float(_) | Value::String(_));
            if op != BoundOp::NotEqual && !ordered {
                return Value::bottom(format!(
                    "invalid operand {} for bound {} (must be a number or string)",
                    limit,
                    op.symbol()
                ));
            }
            Value::Bound(Bound {
                op,
                limit: Box::new(limit),
            })
        }
        other => Value::Incomplete(format!(
            "non-concrete operand {} for bound {}",
            other,
            op.symbol()
        )),
    }
}

/// Build a struct value from `(label, value)` pairs
pub fn struct_of(fields: impl IntoIterator<Item = (String, Value)>) -> Value {
    Value::Struct(StructValue {
        fields: fields
            .into_iter()
            .map(|(label, value)| FieldValue::regular(label, value))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_kind() -> Value {
        Value::Kind(Kind::Int)
    }

    fn ge(n: i64) -> Value {
        bound(BoundOp::GreaterOrEqual, Value::Int(n))
    }

    #[test]
    fn test_top_is_identity() {
        assert_eq!(meet(Value::Top, Value::Int(1)), Value::Int(1));
        assert_eq!(meet(Value::Int(1), Value::Top), Value::Int(1));
    }

    #[test]
    fn test_equal_scalars_unify() {
        assert_eq!(
            meet(Value::String("a".into()), Value::String("a".into())),
            Value::String("a".into())
        );
    }

    #[test]
    fn test_conflicting_scalars() {
        let result = meet(Value::Int(1), Value::Int(2));
        match result {
            Value::Bottom(c) => assert_eq!(c.message, "conflicting values 1 and 2"),
            other => panic!("expected bottom, got {}", other),
        }
    }

    #[test]
    fn test_mismatched_types_message() {
        let result = meet(Value::Int(1), Value::String("a".into()));
        match result {
            Value::Bottom(c) => assert!(c.message.contains("mismatched types int and string")),
            other => panic!("expected bottom, got {}", other),
        }
    }

    #[test]
    fn test_kind_admits_value() {
        assert_eq!(meet(int_kind(), Value::Int(3)), Value::Int(3));
        assert!(meet(int_kind(), Value::Float(3.5)).is_bottom());
        assert_eq!(
            meet(Value::Kind(Kind::Number), Value::Float(3.5)),
            Value::Float(3.5)
        );
    }

    #[test]
    fn test_int_and_float_literals_do_not_unify() {
        assert!(meet(Value::Int(1), Value::Float(1.0)).is_bottom());
    }

    #[test]
    fn test_bounds_accumulate_and_check() {
        let constraint = meet(int_kind(), ge(0));
        assert_eq!(constraint.to_string(), "int & >=0");
        assert_eq!(meet(constraint.clone(), Value::Int(5)), Value::Int(5));
        assert!(meet(constraint, Value::Int(-1)).is_bottom());
    }

    #[test]
    fn test_constraints_are_commutative() {
        let lt = bound(BoundOp::Less, Value::Int(10));
        let a = meet(meet(int_kind(), ge(0)), lt.clone());
        let b = meet(lt, meet(ge(0), int_kind()));
        assert_eq!(meet(a, Value::Int(3)), meet(b, Value::Int(3)));
    }

    #[test]
    fn test_string_bound() {
        let not_empty = bound(BoundOp::NotEqual, Value::String(String::new()));
        assert!(meet(not_empty.clone(), Value::String(String::new())).is_bottom());
        assert_eq!(
            meet(not_empty, Value::String("x".into())),
            Value::String("x".into())
        );
    }

    #[test]
    fn test_struct_fields_merge() {
        let a = struct_of([("x".to_string(), Value::Int(1))]);
        let b = struct_of([
            ("x".to_string(), int_kind()),
            ("y".to_string(), Value::Bool(true)),
        ]);
        assert_eq!(
            meet(a, b),
            struct_of([
                ("x".to_string(), Value::Int(1)),
                ("y".to_string(), Value::Bool(true)),
            ])
        );
    }

    #[test]
    fn test_struct_and_scalar_conflict() {
        let s = struct_of([("x".to_string(), Value::Int(1))]);
        assert!(meet(s, Value::String("s".into())).is_bottom());
    }

    #[test]
    fn test_closed_lists_need_same_length() {
        let a = Value::List(ListValue {
            elements: vec![Value::Int(1)],
            open: false,
        });
        let b = Value::List(ListValue {
            elements: vec![Value::Int(1), Value::Int(2)],
            open: false,
        });
        assert!(meet(a, b).is_bottom());
    }

    #[test]
    fn test_open_list_takes_closed_length() {
        let open = Value::List(ListValue {
            elements: vec![int_kind()],
            open: true,
        });
        let closed = Value::List(ListValue {
            elements: vec![Value::Int(1), Value::Int(2)],
            open: false,
        });
        assert_eq!(
            meet(open, closed),
            Value::List(ListValue {
                elements: vec![Value::Int(1), Value::Int(2)],
                open: false,
            })
        );
    }

    #[test]
    fn test_disjunction_drops_failing_arms() {
        let d = disjunction(vec![
            Arm {
                value: Value::String("a".into()),
                is_default: false,
            },
            Arm {
                value: Value::String("b".into()),
                is_default: false,
            },
        ]);
        assert_eq!(
            meet(d, Value::String("b".into())),
            Value::String("b".into())
        );
    }

    #[test]
    fn test_default_survives_meet_with_kind() {
        let d = disjunction(vec![
            Arm {
                value: Value::Int(1),
                is_default: true,
            },
            Arm {
                value: int_kind(),
                is_default: false,
            },
        ]);
        let result = meet(d, int_kind());
        assert_eq!(result.default_value(), &Value::Int(1));
    }

    #[test]
    fn test_empty_disjunction_is_bottom() {
        let d = disjunction(vec![
            Arm {
                value: Value::Int(1),
                is_default: false,
            },
            Arm {
                value: Value::Int(2),
                is_default: false,
            },
        ]);
        assert!(meet(d, Value::Int(3)).is_bottom());
    }

    #[test]
    fn test_incomplete_absorbs_concrete() {
        let result = meet(Value::Incomplete("later".into()), Value::Int(1));
        assert_eq!(result, Value::Incomplete("later".into()));
    }
}
