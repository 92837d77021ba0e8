//! Types for template functions.
//!
//! Functions are called by name from expressions, e.g. `{{ upper(name) }}`.
//! All functions share one contract: they receive the evaluated arguments and
//! read-only access to the current scope through [`Args`], and return either a
//! [`Value`] or an error message.
//!
//! ```
//! use tessera::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine.add_function("repeat", |args| {
//!     let s = args.string(0)?;
//!     let n = args.integer(1)?;
//!     Ok(Value::from(s.repeat(n.max(0) as usize)))
//! });
//!
//! let result = engine
//!     .compile("{{ repeat('ab', 3) }}")?
//!     .render(&())?;
//! assert_eq!(result, "ababab");
//! # Ok::<(), tessera::Error>(())
//! ```
//!
//! Errors returned from a function abort the render. They are reported as
//! [`ErrorKind::Call`][crate::ErrorKind::Call] errors pointing at the call
//! expression.

#[cfg(feature = "builtins")]
pub(crate) mod builtins;

use std::slice;

use crate::render::Scope;
use crate::value::{ops, Map};
use crate::Value;

/// A function or closure callable from templates.
pub(crate) type FunctionFn =
    dyn Fn(Args<'_>) -> std::result::Result<Value, String> + Send + Sync + 'static;

/// The arguments of a function call.
///
/// Typed accessors return an error message if the argument is missing or
/// has the wrong type, so they can be used with `?` inside a function.
pub struct Args<'a> {
    values: Vec<Value>,
    scope: &'a Scope,
}

impl<'a> Args<'a> {
    pub(crate) fn new(values: Vec<Value>, scope: &'a Scope) -> Self {
        Self { values, scope }
    }

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fails unless exactly `n` arguments were passed.
    pub fn expect_len(&self, n: usize) -> Result<(), String> {
        match self.values.len() == n {
            true => Ok(()),
            false => Err(format!(
                "expected {n} argument{}, found {}",
                if n == 1 { "" } else { "s" },
                self.values.len()
            )),
        }
    }

    /// Returns the argument at `i`.
    pub fn get(&self, i: usize) -> Result<&Value, String> {
        self.values
            .get(i)
            .ok_or_else(|| format!("missing argument {}", i + 1))
    }

    /// Returns the argument at `i` or `None` if it was not passed.
    pub fn get_opt(&self, i: usize) -> Option<&Value> {
        self.values.get(i)
    }

    /// Returns the argument at `i` as a string slice.
    pub fn string(&self, i: usize) -> Result<&str, String> {
        let value = self.get(i)?;
        value.as_str().ok_or_else(|| mismatch(i, "string", value))
    }

    /// Returns the argument at `i` as an integer.
    ///
    /// Floats are truncated and numeric strings are parsed.
    pub fn integer(&self, i: usize) -> Result<i64, String> {
        ops::to_integer(self.get(i)?).map_err(|err| err.message().to_owned())
    }

    /// Returns the argument at `i` as a float.
    pub fn float(&self, i: usize) -> Result<f64, String> {
        match ops::to_number(self.get(i)?).map_err(|err| err.message().to_owned())? {
            ops::Number::Integer(n) => Ok(n as f64),
            ops::Number::Float(n) => Ok(n),
        }
    }

    /// Returns the argument at `i` as a boolean.
    pub fn bool(&self, i: usize) -> Result<bool, String> {
        match self.get(i)? {
            Value::Bool(b) => Ok(*b),
            value => Err(mismatch(i, "bool", value)),
        }
    }

    /// Returns the argument at `i` as a list.
    pub fn list(&self, i: usize) -> Result<&[Value], String> {
        match self.get(i)? {
            Value::List(list) => Ok(list),
            value => Err(mismatch(i, "list", value)),
        }
    }

    /// Returns an iterator over the arguments.
    pub fn iter(&self) -> slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Consumes the arguments, returning the values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Returns the scope of the call site.
    pub fn scope(&self) -> &'a Scope {
        self.scope
    }

    /// Returns all variables visible at the call site, inner bindings
    /// overriding outer ones.
    pub fn locals(&self) -> Map<String, Value> {
        self.scope.collect()
    }
}

fn mismatch(i: usize, exp: &str, got: &Value) -> String {
    format!(
        "expected {exp} for argument {}, found {}",
        i + 1,
        got.human()
    )
}
