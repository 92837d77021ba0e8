//! The node and term trees of a compiled template.
//!
//! A [`Document`] is a list of [`Node`]s. Expressions embedded in the
//! document, both in `{{ }}` and in tag parameters, are [`Term`] trees. Both
//! trees are immutable once parsed and are evaluated directly by the renderer.

use std::fmt;

use crate::fmt::{write_float, write_quoted};
use crate::types::span::Span;
use crate::Value;

/// A compiled template.
#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Document {
    /// The normalized name of the template, if it was added to an engine.
    pub name: Option<String>,
    pub source: String,
    pub nodes: Vec<Node>,
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub enum Node {
    /// Raw template text.
    Text(Span),
    /// An expression to evaluate and emit, e.g. `{{ user.name }}`.
    Echo(Echo),
    /// A tag, possibly the head of a tag chain.
    Tag(Tag),
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Echo {
    pub term: Term,
    pub span: Span,
}

/// A `{% ... %}` tag.
///
/// Chained tags like `if`/`elif`/`else`/`endif` form a singly linked list
/// through `next`. Only the head of the chain is stored in the parent body.
#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Tag {
    pub kind: TagKind,
    pub span: Span,
    pub body: Vec<Node>,
    pub next: Option<Box<Tag>>,
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub enum TagKind {
    If(Term),
    Elif(Term),
    Else,
    EndIf,
    For(LoopVars, Term),
    EndFor,
    Set(Ident, Term),
    Let(Ident, Term),
    Include(Include),
    Text(Str),
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub enum LoopVars {
    Item(Ident),
    Unpack(Vec<Ident>, Span),
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Include {
    pub path: Str,
    pub with: Vec<(Ident, Term)>,
}

/// A string literal in tag parameters, e.g. an include path.
#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Str {
    pub value: String,
    pub span: Span,
}

#[derive(Clone)]
#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// An expression.
#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub enum Term {
    Literal(Literal),
    Var(Ident),
    Unary(Unary),
    Binary(Binary),
    Call(Call),
    Index(Index),
    Slice(Slice),
    List(List),
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Literal {
    pub value: Value,
    pub span: Span,
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Box<Term>,
    pub span: Span,
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Box<Term>,
    pub right: Box<Term>,
    pub span: Span,
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Call {
    pub name: Ident,
    pub args: Vec<Term>,
    pub span: Span,
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Index {
    pub seq: Box<Term>,
    pub key: Box<Term>,
    pub span: Span,
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct Slice {
    pub seq: Box<Term>,
    pub start: Option<Box<Term>>,
    pub stop: Option<Box<Term>>,
    pub step: Option<Box<Term>>,
    pub span: Span,
}

#[cfg_attr(any(test, internal_debug), derive(Debug))]
pub struct List {
    pub items: Vec<Term>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Term {
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(lit) => lit.span,
            Self::Var(var) => var.span,
            Self::Unary(unary) => unary.span,
            Self::Binary(binary) => binary.span,
            Self::Call(call) => call.span,
            Self::Index(index) => index.span,
            Self::Slice(slice) => slice.span,
            Self::List(list) => list.span,
        }
    }

    /// Whether this term must be parenthesized when it is the receiver of a
    /// postfix operation.
    fn is_prefixed(&self) -> bool {
        match self {
            Self::Unary(_) => true,
            Self::Literal(lit) => match lit.value {
                Value::Integer(i) => i < 0,
                Value::Float(f) => f.is_sign_negative(),
                _ => false,
            },
            _ => false,
        }
    }
}

impl BinaryOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::In => "in",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

impl UnaryOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}

/// Prints a fully parenthesized form of the term that parses back to an
/// equivalent term.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write_literal(f, &lit.value),
            Self::Var(var) => f.write_str(&var.name),
            Self::Unary(Unary { op, operand, .. }) => write!(f, "{}{}", op.symbol(), operand),
            Self::Binary(Binary {
                op, left, right, ..
            }) => write!(f, "({} {} {})", left, op.symbol(), right),
            Self::Call(Call { name, args, .. }) => {
                write!(f, "{}(", name.name)?;
                write_seq(f, args)?;
                f.write_str(")")
            }
            Self::Index(Index { seq, key, .. }) => {
                write_receiver(f, seq)?;
                write!(f, "[{key}]")
            }
            Self::Slice(Slice {
                seq,
                start,
                stop,
                step,
                ..
            }) => {
                write_receiver(f, seq)?;
                f.write_str("[")?;
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                f.write_str(":")?;
                if let Some(stop) = stop {
                    write!(f, "{stop}")?;
                }
                if let Some(step) = step {
                    write!(f, ":{step}")?;
                }
                f.write_str("]")
            }
            Self::List(List { items, .. }) => {
                f.write_str("[")?;
                write_seq(f, items)?;
                f.write_str("]")
            }
        }
    }
}

fn write_receiver(f: &mut fmt::Formatter<'_>, seq: &Term) -> fmt::Result {
    if seq.is_prefixed() {
        write!(f, "({seq})")
    } else {
        write!(f, "{seq}")
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, terms: &[Term]) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{term}")?;
    }
    Ok(())
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::None => f.write_str("null"),
        Value::Float(n) => write_float(f, *n),
        Value::String(s) | Value::Safe(s) => write_quoted(f, s),
        value => write!(f, "{value}"),
    }
}
