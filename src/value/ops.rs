//! Coercion, arithmetic and comparison rules of the dynamic value model.
//!
//! All failures are returned without a location. The evaluator attaches the
//! span of the term that caused them.

use std::cmp::Ordering;

use crate::error::ErrorKind;
use crate::{Error, Result, Value};

/// A value converted to a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    fn to_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Integer(i) => Value::Integer(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

/// Converts a value to a number.
///
/// Strings containing a `.` are parsed as floats, other strings as integers.
pub(crate) fn to_number(value: &Value) -> Result<Number> {
    match value {
        Value::Integer(i) => Ok(Number::Integer(*i)),
        Value::Float(f) => Ok(Number::Float(*f)),
        Value::String(s) | Value::Safe(s) => {
            let parsed = if s.contains('.') {
                s.parse().ok().map(Number::Float)
            } else {
                s.parse().ok().map(Number::Integer)
            };
            parsed.ok_or_else(|| type_error(format!("cannot convert string {s:?} to a number")))
        }
        value => Err(type_error(format!(
            "expected number, found {}",
            value.human()
        ))),
    }
}

/// Converts a value to an integer, truncating floats.
pub(crate) fn to_integer(value: &Value) -> Result<i64> {
    match to_number(value)? {
        Number::Integer(i) => Ok(i),
        Number::Float(f) => Ok(f as i64),
    }
}

/// Applies an integer and a float operation to two values, promoting to
/// float when either operand is a float.
fn arithmetic<I, F>(lhs: &Value, rhs: &Value, int_op: I, float_op: F) -> Result<Value>
where
    I: FnOnce(i64, i64) -> Result<i64>,
    F: FnOnce(f64, f64) -> f64,
{
    let n = match (to_number(lhs)?, to_number(rhs)?) {
        (Number::Integer(a), Number::Integer(b)) => Number::Integer(int_op(a, b)?),
        (a, b) => Number::Float(float_op(a.to_f64(), b.to_f64())),
    };
    Ok(n.into())
}

pub(crate) fn add(lhs: &Value, rhs: &Value) -> Result<Value> {
    arithmetic(
        lhs,
        rhs,
        |a, b| a.checked_add(b).ok_or_else(|| overflow("addition")),
        |a, b| a + b,
    )
}

/// Subtraction is the addition of the negated right operand.
pub(crate) fn sub(lhs: &Value, rhs: &Value) -> Result<Value> {
    add(lhs, &negate(rhs)?)
}

pub(crate) fn mul(lhs: &Value, rhs: &Value) -> Result<Value> {
    arithmetic(
        lhs,
        rhs,
        |a, b| a.checked_mul(b).ok_or_else(|| overflow("multiplication")),
        |a, b| a * b,
    )
}

/// Integer division truncates toward zero.
pub(crate) fn div(lhs: &Value, rhs: &Value) -> Result<Value> {
    arithmetic(
        lhs,
        rhs,
        |a, b| match b {
            0 => Err(type_error("integer division by zero")),
            _ => a.checked_div(b).ok_or_else(|| overflow("division")),
        },
        |a, b| a / b,
    )
}

pub(crate) fn rem(lhs: &Value, rhs: &Value) -> Result<Value> {
    arithmetic(
        lhs,
        rhs,
        |a, b| match b {
            0 => Err(type_error("integer remainder by zero")),
            _ => a.checked_rem(b).ok_or_else(|| overflow("remainder")),
        },
        |a, b| a % b,
    )
}

/// Numeric unary minus, preserving the number type.
pub(crate) fn negate(value: &Value) -> Result<Value> {
    match to_number(value)? {
        Number::Integer(i) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| overflow("negation")),
        Number::Float(f) => Ok(Value::Float(-f)),
    }
}

/// Orders two values numerically.
pub(crate) fn compare(lhs: &Value, rhs: &Value) -> Result<Ordering> {
    let ord = match (to_number(lhs)?, to_number(rhs)?) {
        (Number::Integer(a), Number::Integer(b)) => a.cmp(&b),
        (a, b) => a.to_f64().total_cmp(&b.to_f64()),
    };
    Ok(ord)
}

/// Tests two values for equality.
///
/// Two numbers compare numerically, so `1 == 1.0`. A number never equals a
/// non-number. Everything else is compared structurally.
pub(crate) fn is_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.is_numeric(), rhs.is_numeric()) {
        (true, true) => matches!(compare(lhs, rhs), Ok(Ordering::Equal)),
        (true, false) | (false, true) => false,
        (false, false) => match (lhs, rhs) {
            (Value::String(a) | Value::Safe(a), Value::String(b) | Value::Safe(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| is_equal(a, b))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && is_equal(va, vb))
            }
            (a, b) => a == b,
        },
    }
}

/// Implements the `in` operator.
pub(crate) fn contains(haystack: &Value, needle: &Value) -> Result<bool> {
    match haystack {
        Value::String(s) | Value::Safe(s) => match needle.as_str() {
            Some(needle) => Ok(s.contains(needle)),
            None => Err(type_error(format!(
                "expected string on the left of `in`, found {}",
                needle.human()
            ))),
        },
        Value::List(list) => Ok(list.iter().any(|item| is_equal(item, needle))),
        Value::Map(map) => Ok(needle.as_str().map_or(false, |k| map.contains_key(k))),
        Value::None => Ok(false),
        value => Err(type_error(format!(
            "cannot test membership in {}",
            value.human()
        ))),
    }
}

/// Converts a value into the items a `for` loop visits.
///
/// None yields nothing and a map yields its keys.
pub(crate) fn iterate(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::None => Ok(Vec::new()),
        Value::List(list) => Ok(list),
        Value::Map(map) => Ok(map.into_keys().map(Value::String).collect()),
        value => Err(Error::new(
            ErrorKind::NotIterable,
            format!(
                "expected iterable, but expression evaluated to {}",
                value.human()
            ),
        )),
    }
}

/// Looks up a key in a map, or an integer index in a list or string.
///
/// Negative indices count from the end.
pub(crate) fn index(seq: &Value, key: &Value) -> Result<Value> {
    match seq {
        Value::Map(map) => {
            let k = match key {
                Value::String(k) | Value::Safe(k) => k.clone(),
                Value::Integer(i) => i.to_string(),
                key => {
                    return Err(type_error(format!(
                        "cannot index into map with {}",
                        key.human()
                    )))
                }
            };
            map.get(&k).cloned().ok_or_else(|| {
                Error::new(ErrorKind::KeyNotFound, format!("not found in map: `{k}`"))
            })
        }
        Value::List(list) => {
            let i = resolve_index(integer_key(seq, key)?, list.len())?;
            Ok(list[i].clone())
        }
        Value::String(s) | Value::Safe(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = resolve_index(integer_key(seq, key)?, chars.len())?;
            Ok(Value::String(chars[i].to_string()))
        }
        Value::None => Err(type_error("cannot index into none")),
        seq => Err(type_error(format!("cannot index into {}", seq.human()))),
    }
}

fn integer_key(seq: &Value, key: &Value) -> Result<i64> {
    match key {
        Value::Integer(i) => Ok(*i),
        key => Err(type_error(format!(
            "cannot index into {} with {}",
            seq.human(),
            key.human()
        ))),
    }
}

fn resolve_index(i: i64, len: usize) -> Result<usize> {
    let n = len as i64;
    let j = if i < 0 { i + n } else { i };
    if (0..n).contains(&j) {
        Ok(j as usize)
    } else {
        Err(Error::new(
            ErrorKind::IndexOutOfRange,
            format!("index out of bounds: the length is {len} but the index is {i}"),
        ))
    }
}

/// Slices a list or string with Python semantics.
///
/// Absent bounds default to the whole sequence in the direction of `step`,
/// and out of range bounds are clamped.
pub(crate) fn slice(
    seq: &Value,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Value> {
    match seq {
        Value::List(list) => {
            let indices = slice_indices(list.len(), start, stop, step)?;
            Ok(Value::List(
                indices.into_iter().map(|i| list[i].clone()).collect(),
            ))
        }
        Value::String(s) | Value::Safe(s) => {
            let chars: Vec<char> = s.chars().collect();
            let indices = slice_indices(chars.len(), start, stop, step)?;
            Ok(Value::String(indices.into_iter().map(|i| chars[i]).collect()))
        }
        seq => Err(type_error(format!("cannot slice {}", seq.human()))),
    }
}

fn slice_indices(
    len: usize,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>> {
    let len = len as i64;
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(type_error("slice step cannot be zero"));
    }

    let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
    let clamp = |bound: i64| {
        if bound < 0 {
            bound.saturating_add(len).max(lower)
        } else {
            bound.min(upper)
        }
    };
    let start = start.map_or(if step < 0 { upper } else { lower }, clamp);
    let stop = stop.map_or(if step < 0 { lower } else { upper }, clamp);

    let mut indices = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        indices.push(i as usize);
        i = match i.checked_add(step) {
            Some(i) => i,
            None => break,
        };
    }
    Ok(indices)
}

fn type_error(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::Type, msg)
}

fn overflow(op: &str) -> Error {
    type_error(format!("integer overflow in {op}"))
}
