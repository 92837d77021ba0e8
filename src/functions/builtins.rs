//! Builtin functions.

use std::cmp::Ordering;

use crate::functions::Args;
use crate::value::ops;
use crate::{Engine, Value};

type Result = std::result::Result<Value, String>;

/// Registers all builtin functions with the engine.
pub(crate) fn register(engine: &mut Engine) {
    engine.add_function("bool", bool);
    engine.add_function("int", int);
    engine.add_function("float", float);
    engine.add_function("str", str);
    engine.add_function("len", len);
    engine.add_function("min", min);
    engine.add_function("max", max);
    engine.add_function("range", range);
    engine.add_function("contains", contains);
    engine.add_function("lower", lower);
    engine.add_function("upper", upper);
    engine.add_function("capitalize", capitalize);
    engine.add_function("trim", trim);
    engine.add_function("replace", replace);
    engine.add_function("starts_with", starts_with);
    engine.add_function("ends_with", ends_with);
    engine.add_function("join", join);
    engine.add_function("split", split);
    engine.add_function("safe", safe);
    engine.add_function("defined", defined);
    engine.add_function("get", get);
    engine.add_function("locals", locals);
}

/// Returns whether the value is true in a condition.
fn bool(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    Ok(Value::Bool(args.get(0)?.is_true()))
}

/// Converts a number or numeric string to an integer, truncating floats.
fn int(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    match args.get(0)? {
        Value::Bool(b) => Ok(Value::Integer(*b as i64)),
        _ => args.integer(0).map(Value::Integer),
    }
}

fn float(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    match args.get(0)? {
        Value::Bool(b) => Ok(Value::Float(*b as i64 as f64)),
        _ => args.float(0).map(Value::Float),
    }
}

/// Returns the display form of the value.
fn str(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    Ok(Value::String(args.get(0)?.to_string()))
}

/// Returns the number of characters in a string, or elements in a list or
/// map.
fn len(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    let n = match args.get(0)? {
        Value::String(s) | Value::Safe(s) => s.chars().count(),
        Value::List(list) => list.len(),
        Value::Map(map) => map.len(),
        value => return Err(format!("cannot take the length of {}", value.human())),
    };
    Ok(Value::Integer(n as i64))
}

fn min(args: Args<'_>) -> Result {
    extremum(args, Ordering::Less)
}

fn max(args: Args<'_>) -> Result {
    extremum(args, Ordering::Greater)
}

/// Finds the smallest or largest of the arguments. A single list argument
/// is searched instead.
fn extremum(args: Args<'_>, want: Ordering) -> Result {
    let single_list = args.len() == 1 && matches!(args.get_opt(0), Some(Value::List(_)));
    let mut values = args.into_values();
    if single_list {
        if let Some(Value::List(list)) = values.pop() {
            values = list;
        }
    }
    let mut iter = values.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| String::from("expected at least one value"))?;
    for value in iter {
        let ord = ops::compare(&value, &best).map_err(|err| err.message().to_owned())?;
        if ord == want {
            best = value;
        }
    }
    Ok(best)
}

/// Returns a list of integers.
///
/// Takes `stop`, `start, stop` or `start, stop, step`. The stop bound is
/// exclusive.
fn range(args: Args<'_>) -> Result {
    let (start, stop, step) = match args.len() {
        1 => (0, args.integer(0)?, 1),
        2 => (args.integer(0)?, args.integer(1)?, 1),
        3 => (args.integer(0)?, args.integer(1)?, args.integer(2)?),
        n => return Err(format!("expected 1 to 3 arguments, found {n}")),
    };
    if step == 0 {
        return Err("range step cannot be zero".into());
    }
    let mut list = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        list.push(Value::Integer(i));
        i = match i.checked_add(step) {
            Some(i) => i,
            None => break,
        };
    }
    Ok(Value::List(list))
}

/// Returns whether a string, list or map contains the value.
fn contains(args: Args<'_>) -> Result {
    args.expect_len(2)?;
    ops::contains(args.get(0)?, args.get(1)?)
        .map(Value::Bool)
        .map_err(|err| err.message().to_owned())
}

fn lower(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    Ok(Value::String(args.string(0)?.to_lowercase()))
}

fn upper(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    Ok(Value::String(args.string(0)?.to_uppercase()))
}

/// Uppercases the first character of a string.
fn capitalize(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    let s = args.string(0)?;
    let mut chars = s.chars();
    let result = match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    Ok(Value::String(result))
}

fn trim(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    Ok(Value::String(args.string(0)?.trim().to_owned()))
}

/// Replaces all matches of a substring with another substring.
fn replace(args: Args<'_>) -> Result {
    args.expect_len(3)?;
    let s = args.string(0)?;
    Ok(Value::String(s.replace(args.string(1)?, args.string(2)?)))
}

fn starts_with(args: Args<'_>) -> Result {
    args.expect_len(2)?;
    Ok(Value::Bool(args.string(0)?.starts_with(args.string(1)?)))
}

fn ends_with(args: Args<'_>) -> Result {
    args.expect_len(2)?;
    Ok(Value::Bool(args.string(0)?.ends_with(args.string(1)?)))
}

/// Joins the display forms of the list items with an optional separator.
fn join(args: Args<'_>) -> Result {
    let sep = match args.len() {
        1 => "",
        2 => args.string(1)?,
        n => return Err(format!("expected 1 or 2 arguments, found {n}")),
    };
    let mut result = String::new();
    for (i, item) in args.list(0)?.iter().enumerate() {
        if i > 0 {
            result.push_str(sep);
        }
        result.push_str(&item.to_string());
    }
    Ok(Value::String(result))
}

/// Splits a string by a separator, or by whitespace if none is given.
fn split(args: Args<'_>) -> Result {
    let s = args.string(0)?;
    let parts: Vec<Value> = match args.len() {
        1 => s.split_whitespace().map(Value::from).collect(),
        2 => match args.string(1)? {
            "" => return Err("separator cannot be empty".into()),
            sep => s.split(sep).map(Value::from).collect(),
        },
        n => return Err(format!("expected 1 or 2 arguments, found {n}")),
    };
    Ok(Value::List(parts))
}

/// Marks the display form of the value as safe so that it is not escaped.
fn safe(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    Ok(Value::Safe(args.get(0)?.to_string()))
}

/// Returns whether a variable with the given name is in scope.
fn defined(args: Args<'_>) -> Result {
    args.expect_len(1)?;
    Ok(Value::Bool(args.scope().contains(args.string(0)?)))
}

/// Returns the value of a variable, or a default if it is not in scope.
fn get(args: Args<'_>) -> Result {
    let default = match args.len() {
        1 => Value::None,
        2 => args.get(1)?.clone(),
        n => return Err(format!("expected 1 or 2 arguments, found {n}")),
    };
    let name = args.string(0)?;
    Ok(args.scope().get(name).cloned().unwrap_or(default))
}

/// Returns a map of all variables in scope.
fn locals(args: Args<'_>) -> Result {
    args.expect_len(0)?;
    Ok(Value::Map(args.locals()))
}
