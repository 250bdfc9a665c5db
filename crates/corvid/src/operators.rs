//! Binary and unary operator evaluation over runtime `Value`s.
//!
//! Comparisons are applied directly: the opcode and operand order the IR
//! carries are exactly what the source wrote, with no inversion trick. This
//! is the one module where that design decision actually bears weight.

use crate::ast::BinOp;
use crate::error::{CorvidError, Result};
use crate::value::Value;

fn expect_numeric(v: &Value) -> Result<f64> {
    v.as_f64()
        .ok_or_else(|| CorvidError::MalformedOperand { operand: format!("{v} ({})", v.type_name()) })
}

fn both_int(left: &Value, right: &Value) -> Option<(i64, i64)> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some((*a, *b)),
        _ => None,
    }
}

pub fn apply_binary(op: BinOp, left: &Value, right: &Value) -> Result<Value> {
    if op.is_arithmetic() {
        return apply_arithmetic(op, left, right);
    }
    if op.is_comparison() {
        return apply_comparison(op, left, right);
    }
    apply_logical(op, left, right)
}

fn apply_arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value> {
    if op == BinOp::Add {
        if let (Value::Str(a), Value::Str(b)) = (left, right) {
            return Ok(Value::Str(format!("{a}{b}")));
        }
    }

    if let Some((a, b)) = both_int(left, right) {
        return match op {
            BinOp::Add => Ok(Value::Int(a + b)),
            BinOp::Sub => Ok(Value::Int(a - b)),
            BinOp::Mul => Ok(Value::Int(a * b)),
            BinOp::Div => {
                if b == 0 {
                    Err(CorvidError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.wrapping_div(b)))
                }
            }
            BinOp::Mod => {
                if b == 0 {
                    Err(CorvidError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.wrapping_rem(b)))
                }
            }
            _ => unreachable!("arithmetic-only branch"),
        };
    }

    let a = expect_numeric(left)?;
    let b = expect_numeric(right)?;
    match op {
        BinOp::Add => Ok(Value::Float(a + b)),
        BinOp::Sub => Ok(Value::Float(a - b)),
        BinOp::Mul => Ok(Value::Float(a * b)),
        BinOp::Div => {
            if b == 0.0 {
                Err(CorvidError::DivisionByZero)
            } else {
                Ok(Value::Float(a / b))
            }
        }
        BinOp::Mod => {
            if b == 0.0 {
                Err(CorvidError::DivisionByZero)
            } else {
                Ok(Value::Float(a % b))
            }
        }
        _ => unreachable!("arithmetic-only branch"),
    }
}

fn apply_comparison(op: BinOp, left: &Value, right: &Value) -> Result<Value> {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        _ => {
            let a = expect_numeric(left)?;
            let b = expect_numeric(right)?;
            a.partial_cmp(&b)
        }
    };
    let Some(ordering) = ordering else {
        return Err(CorvidError::MalformedOperand { operand: format!("{left} {} {right}", op.as_str()) });
    };
    use std::cmp::Ordering::*;
    let result = match op {
        BinOp::Eq => ordering == Equal,
        BinOp::NotEq => ordering != Equal,
        BinOp::Lt => ordering == Less,
        BinOp::Gt => ordering == Greater,
        BinOp::LtEq => ordering != Greater,
        BinOp::GtEq => ordering != Less,
        _ => unreachable!("comparison-only branch"),
    };
    Ok(Value::Bool(result))
}

fn apply_logical(op: BinOp, left: &Value, right: &Value) -> Result<Value> {
    let (Value::Bool(a), Value::Bool(b)) = (left, right) else {
        return Err(CorvidError::MalformedOperand { operand: format!("{left} {} {right}", op.as_str()) });
    };
    Ok(Value::Bool(match op {
        BinOp::And => *a && *b,
        BinOp::Or => *a || *b,
        _ => unreachable!("logical-only branch"),
    }))
}

pub fn apply_not(v: &Value) -> Result<Value> {
    match v {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        _ => Err(CorvidError::MalformedOperand { operand: format!("!{v}") }),
    }
}

pub fn apply_neg(v: &Value) -> Result<Value> {
    match v {
        Value::Int(i) => Ok(Value::Int(-i)),
        Value::Float(f) => Ok(Value::Float(-f)),
        _ => Err(CorvidError::MalformedOperand { operand: format!("-{v}") }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_truncates() {
        assert_eq!(apply_binary(BinOp::Div, &Value::Int(7), &Value::Int(2)).unwrap(), Value::Int(3));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(matches!(
            apply_binary(BinOp::Div, &Value::Int(1), &Value::Int(0)),
            Err(CorvidError::DivisionByZero)
        ));
    }

    #[test]
    fn comparisons_are_direct_not_inverted() {
        // 3 <= 5 must be true under ordinary semantics
        assert_eq!(
            apply_binary(BinOp::LtEq, &Value::Int(3), &Value::Int(5)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            apply_binary(BinOp::Gt, &Value::Int(3), &Value::Int(5)).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn mixed_int_float_arithmetic_promotes_to_float() {
        assert_eq!(
            apply_binary(BinOp::Add, &Value::Int(1), &Value::Float(0.5)).unwrap(),
            Value::Float(1.5)
        );
    }

    #[test]
    fn string_concatenation_via_add() {
        assert_eq!(
            apply_binary(BinOp::Add, &Value::Str("a".to_string()), &Value::Str("b".to_string())).unwrap(),
            Value::Str("ab".to_string())
        );
    }
}
