//! Evaluates expression terms against a scope.

use crate::error::ErrorKind;
use crate::functions::Args;
use crate::render::Scope;
use crate::types::ast::{Binary, BinaryOp, Call, Slice, Term, UnaryOp};
use crate::value::ops;
use crate::{Engine, Error, Result, Value};

/// Everything a term needs to be evaluated.
pub(crate) struct Env<'a> {
    pub engine: &'a Engine,
    pub source: &'a str,
    pub scope: &'a Scope,
}

impl Term {
    /// Evaluates the term.
    ///
    /// Failures carry the span of the innermost term that caused them.
    pub(crate) fn evaluate(&self, env: &Env<'_>) -> Result<Value> {
        self.evaluate_inner(env)
            .map_err(|err| err.enrich(env.source, self.span()))
    }

    fn evaluate_inner(&self, env: &Env<'_>) -> Result<Value> {
        match self {
            Term::Literal(lit) => Ok(lit.value.clone()),

            Term::Var(ident) => env.scope.lookup(&ident.name).cloned(),

            Term::Unary(unary) => {
                let value = unary.operand.evaluate(env)?;
                match unary.op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_true())),
                    UnaryOp::Neg => ops::negate(&value),
                }
            }

            Term::Binary(binary) => {
                let left = binary.left.evaluate(env)?;
                apply(binary, left, || binary.right.evaluate(env))
            }

            Term::Call(call) => call_function(call, env),

            Term::Index(index) => {
                let seq = index.seq.evaluate(env)?;
                let key = index.key.evaluate(env)?;
                ops::index(&seq, &key)
            }

            Term::Slice(slice) => evaluate_slice(slice, env),

            Term::List(list) => list
                .items
                .iter()
                .map(|item| item.evaluate(env))
                .collect::<Result<_>>()
                .map(Value::List),
        }
    }
}

/// Applies a binary operator.
///
/// The right operand is only computed when the operator needs it, so
/// `and` and `or` short circuit and return the operand that decided the
/// result.
fn apply<F>(binary: &Binary, left: Value, right: F) -> Result<Value>
where
    F: FnOnce() -> Result<Value>,
{
    let value = match binary.op {
        BinaryOp::Or => match left.is_true() {
            true => left,
            false => right()?,
        },
        BinaryOp::And => match left.is_true() {
            true => right()?,
            false => left,
        },
        BinaryOp::Eq => Value::Bool(ops::is_equal(&left, &right()?)),
        BinaryOp::Ne => Value::Bool(!ops::is_equal(&left, &right()?)),
        BinaryOp::Lt => Value::Bool(ops::compare(&left, &right()?)?.is_lt()),
        BinaryOp::Gt => Value::Bool(ops::compare(&left, &right()?)?.is_gt()),
        BinaryOp::Le => Value::Bool(ops::compare(&left, &right()?)?.is_le()),
        BinaryOp::Ge => Value::Bool(ops::compare(&left, &right()?)?.is_ge()),
        BinaryOp::In => Value::Bool(ops::contains(&right()?, &left)?),
        BinaryOp::Add => ops::add(&left, &right()?)?,
        BinaryOp::Sub => ops::sub(&left, &right()?)?,
        BinaryOp::Mul => ops::mul(&left, &right()?)?,
        BinaryOp::Div => ops::div(&left, &right()?)?,
        BinaryOp::Rem => ops::rem(&left, &right()?)?,
    };
    Ok(value)
}

fn call_function(call: &Call, env: &Env<'_>) -> Result<Value> {
    let name = &call.name.name;
    let values = call
        .args
        .iter()
        .map(|arg| arg.evaluate(env))
        .collect::<Result<Vec<_>>>()?;
    let Some(f) = env.engine.functions.get(name) else {
        return Err(Error::at(
            ErrorKind::Call,
            format!("unknown function `{name}`"),
            env.source,
            call.name.span,
        ));
    };
    log::trace!("calling `{name}` with {} arguments", values.len());
    f(Args::new(values, env.scope)).map_err(|msg| {
        Error::at(
            ErrorKind::Call,
            format!("call to `{name}` failed: {msg}"),
            env.source,
            call.span,
        )
    })
}

fn evaluate_slice(slice: &Slice, env: &Env<'_>) -> Result<Value> {
    let seq = slice.seq.evaluate(env)?;
    let start = evaluate_bound(slice.start.as_deref(), env)?;
    let stop = evaluate_bound(slice.stop.as_deref(), env)?;
    let step = evaluate_bound(slice.step.as_deref(), env)?;
    ops::slice(&seq, start, stop, step)
}

/// Evaluates an optional slice bound. A bound that evaluates to none is
/// treated as absent.
fn evaluate_bound(term: Option<&Term>, env: &Env<'_>) -> Result<Option<i64>> {
    let Some(term) = term else {
        return Ok(None);
    };
    match term.evaluate(env)? {
        Value::None => Ok(None),
        value => ops::to_integer(&value)
            .map(Some)
            .map_err(|err| err.enrich(env.source, term.span())),
    }
}
