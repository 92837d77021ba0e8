//! Defines the [`Value`] enum, representing any data a template can evaluate
//! or render.

mod from;
pub(crate) mod ops;
mod ser;

pub use std::collections::BTreeMap as Map;
use std::fmt;
use std::fmt::Write;
use std::mem;
pub use std::vec::Vec as List;

pub use crate::value::ser::to_value;

use crate::fmt::{escape_html, write_float, write_quoted};

/// Data to be evaluated and rendered, represented as a recursive enum.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// A string that is emitted without HTML escaping.
    Safe(String),
    List(List<Value>),
    Map(Map<String, Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(s), Self::Bool(o)) => s == o,
            (Self::Integer(s), Self::Integer(o)) => s == o,
            (Self::Float(s), Self::Float(o)) => s == o,
            (Self::String(s), Self::String(o)) => s == o,
            (Self::Safe(s), Self::Safe(o)) => s == o,
            (Self::List(s), Self::List(o)) => s == o,
            (Self::Map(s), Self::Map(o)) => s == o,
            _ => mem::discriminant(self) == mem::discriminant(other),
        }
    }
}

impl Value {
    /// Returns a human readable name of the value's type.
    pub(crate) fn human(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Safe(_) => "safe string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Returns whether the value is considered true in a condition.
    ///
    /// None is false, numbers are true when nonzero, and strings, lists and
    /// maps are true when they are not empty.
    pub fn is_true(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) | Value::Safe(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    pub(crate) fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Returns the string slice if this is a string or safe string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Safe(s) => Some(s),
            _ => None,
        }
    }

    /// Writes the display form of the value, HTML-escaped unless the value is
    /// a [`Value::Safe`] string.
    pub(crate) fn write_escaped<W>(&self, f: &mut W) -> fmt::Result
    where
        W: fmt::Write + ?Sized,
    {
        match self {
            Value::None => Ok(()),
            Value::Safe(s) => f.write_str(s),
            Value::String(s) => escape_html(f, s),
            Value::Bool(_) | Value::Integer(_) | Value::Float(_) => write!(f, "{self}"),
            value => escape_html(f, &value.to_string()),
        }
    }
}

/// The display form used when a value is rendered.
///
/// None renders as an empty string. Strings nested in lists and maps are
/// quoted.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => write_float(f, *n),
            Value::String(s) | Value::Safe(s) => f.write_str(s),
            value => write_nested(f, value),
        }
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::None => f.write_str("null"),
        Value::String(s) | Value::Safe(s) => write_quoted(f, s),
        Value::List(list) => {
            f.write_char('[')?;
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_nested(f, item)?;
            }
            f.write_char(']')
        }
        Value::Map(map) => {
            f.write_char('{')?;
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: ")?;
                write_nested(f, value)?;
            }
            f.write_char('}')
        }
        value => write!(f, "{value}"),
    }
}
