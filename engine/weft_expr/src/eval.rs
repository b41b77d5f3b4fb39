//! Tree-walking evaluation of parsed expressions.
//!
//! The one subtlety is how identifier/member/index chains reach the scope.
//! A *static* chain (`form.value`, `rows[0].name`) is read through
//! [`ScopeReader::read`] as a single dotted path, so the engine can match
//! it against binding scope paths by longest prefix. A chain with a dynamic
//! index reads its static prefix through the scope and navigates the rest
//! inside the returned value.

use weft_ir::{PathSeg, Value};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::{SandboxError, ScopeReader};

/// Evaluate `expr` against `scope`.
pub(crate) fn evaluate(expr: &Expr, scope: &dyn ScopeReader) -> Result<Value, SandboxError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Undefined => Ok(Value::Undefined),
        Expr::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(evaluate(item, scope)?);
            }
            Ok(Value::List(values))
        }
        Expr::Ident(_) | Expr::Member(..) | Expr::Index(..) => read_chain(expr, scope),
        Expr::Unary(op, operand) => {
            let value = evaluate(operand, scope)?;
            Ok(match op {
                UnaryOp::Neg => Value::Number(-to_number(&value)),
                UnaryOp::Not => Value::Bool(!value.is_truthy()),
            })
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, lhs, rhs, scope),
        Expr::Conditional(cond, then, otherwise) => {
            if evaluate(cond, scope)?.is_truthy() {
                evaluate(then, scope)
            } else {
                evaluate(otherwise, scope)
            }
        }
    }
}

/// Collect the chain as one dotted path if every segment is static.
fn static_path(expr: &Expr, out: &mut Vec<PathSeg>) -> bool {
    match expr {
        Expr::Ident(name) => {
            out.push(PathSeg::key(name.clone()));
            true
        }
        Expr::Member(base, name) => {
            if !static_path(base, out) {
                return false;
            }
            out.push(PathSeg::key(name.clone()));
            true
        }
        Expr::Index(base, index) => {
            if !static_path(base, out) {
                return false;
            }
            match index.as_ref() {
                Expr::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
                    out.push(PathSeg::Index(*n as usize));
                    true
                }
                Expr::Str(key) => {
                    out.push(PathSeg::key(key.clone()));
                    true
                }
                _ => false,
            }
        }
        _ => false,
    }
}

fn read_chain(expr: &Expr, scope: &dyn ScopeReader) -> Result<Value, SandboxError> {
    let mut path = Vec::new();
    if static_path(expr, &mut path) {
        return Ok(scope.read(&path)?);
    }
    // Dynamic tail: evaluate the base chain, then navigate locally.
    match expr {
        Expr::Member(base, name) => {
            let value = evaluate(base, scope)?;
            Ok(value.navigate_seg(&PathSeg::key(name.clone())))
        }
        Expr::Index(base, index) => {
            let value = evaluate(base, scope)?;
            let key = evaluate(index, scope)?;
            let seg = match key {
                Value::Number(n) if n.fract() == 0.0 && n >= 0.0 => PathSeg::Index(n as usize),
                other => PathSeg::key(other.to_string()),
            };
            Ok(value.navigate_seg(&seg))
        }
        // Unreachable: a bare identifier is always a static path.
        _ => Ok(Value::Undefined),
    }
}

/// Numeric coercion: `undefined` is NaN, `null` is 0, strings parse or NaN.
fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Bool(true) => 1.0,
        Value::Bool(false) | Value::Null => 0.0,
        Value::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Undefined | Value::List(_) | Value::Object(_) => f64::NAN,
    }
}

fn binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    scope: &dyn ScopeReader,
) -> Result<Value, SandboxError> {
    // Short-circuit forms first: the untaken operand is never evaluated,
    // so its reads never become dependency edges.
    match op {
        BinaryOp::And => {
            let left = evaluate(lhs, scope)?;
            return if left.is_truthy() {
                evaluate(rhs, scope)
            } else {
                Ok(left)
            };
        }
        BinaryOp::Or => {
            let left = evaluate(lhs, scope)?;
            return if left.is_truthy() {
                Ok(left)
            } else {
                evaluate(rhs, scope)
            };
        }
        _ => {}
    }

    let left = evaluate(lhs, scope)?;
    let right = evaluate(rhs, scope)?;
    Ok(match op {
        BinaryOp::Add => {
            if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                Value::str(format!("{left}{right}"))
            } else {
                Value::Number(to_number(&left) + to_number(&right))
            }
        }
        BinaryOp::Sub => Value::Number(to_number(&left) - to_number(&right)),
        BinaryOp::Mul => Value::Number(to_number(&left) * to_number(&right)),
        BinaryOp::Div => Value::Number(to_number(&left) / to_number(&right)),
        BinaryOp::Mod => Value::Number(to_number(&left) % to_number(&right)),
        BinaryOp::Lt => compare(&left, &right, |o| o == std::cmp::Ordering::Less),
        BinaryOp::LtEq => compare(&left, &right, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Gt => compare(&left, &right, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::GtEq => compare(&left, &right, |o| o != std::cmp::Ordering::Less),
        BinaryOp::Eq => Value::Bool(left == right),
        BinaryOp::NotEq => Value::Bool(left != right),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    })
}

/// Ordered comparison: string/string is lexicographic, everything else
/// coerces to numbers. Comparisons involving NaN are `false`.
fn compare(left: &Value, right: &Value, pick: fn(std::cmp::Ordering) -> bool) -> Value {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => to_number(left).partial_cmp(&to_number(right)),
    };
    Value::Bool(ordering.is_some_and(pick))
}
