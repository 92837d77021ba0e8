//! Precedence climbing for the expression language.
//!
//! From lowest to highest precedence:
//!
//! | level          | operators                  |
//! |----------------|----------------------------|
//! | iteration      | `,`                        |
//! | or             | `or` `\|\|`                |
//! | and            | `and` `&&`                 |
//! | equality       | `==` `!=`                  |
//! | relational     | `<` `>` `<=` `>=` `in`     |
//! | additive       | `+` `-`                    |
//! | multiplicative | `*` `/` `%`                |
//! | unary          | `!` `not` `-`              |
//! | postfix        | call, index, slice, member |
//!
//! Iteration is only available at the top level of an echo or a tag
//! parameter, inside parentheses a `,` is a syntax error.

use crate::compile::lex::Token;
use crate::compile::parse::Parser;
use crate::types::ast::{
    self, Binary, BinaryOp, Call, Ident, Literal, Slice, Term, Unary, UnaryOp,
};
use crate::types::span::Span;
use crate::{Error, Result, Value};

/// A binary precedence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Or,
    And,
    Equality,
    Relational,
    Additive,
    Multiplicative,
}

impl Level {
    /// The level that binds tighter, or `None` if unary operators come next.
    fn next(self) -> Option<Self> {
        match self {
            Self::Or => Some(Self::And),
            Self::And => Some(Self::Equality),
            Self::Equality => Some(Self::Relational),
            Self::Relational => Some(Self::Additive),
            Self::Additive => Some(Self::Multiplicative),
            Self::Multiplicative => None,
        }
    }

    /// Maps a token to an operator of this level.
    fn operator(self, tk: Token, text: &str) -> Option<BinaryOp> {
        let op = match (self, tk, text) {
            (Self::Or, Token::OrOr, _) | (Self::Or, Token::Keyword, "or") => BinaryOp::Or,
            (Self::And, Token::AndAnd, _) | (Self::And, Token::Keyword, "and") => BinaryOp::And,
            (Self::Equality, Token::Eq, _) => BinaryOp::Eq,
            (Self::Equality, Token::NotEq, _) => BinaryOp::Ne,
            (Self::Relational, Token::Lt, _) => BinaryOp::Lt,
            (Self::Relational, Token::Gt, _) => BinaryOp::Gt,
            (Self::Relational, Token::Le, _) => BinaryOp::Le,
            (Self::Relational, Token::Ge, _) => BinaryOp::Ge,
            (Self::Relational, Token::Keyword, "in") => BinaryOp::In,
            (Self::Additive, Token::Plus, _) => BinaryOp::Add,
            (Self::Additive, Token::Minus, _) => BinaryOp::Sub,
            (Self::Multiplicative, Token::Star, _) => BinaryOp::Mul,
            (Self::Multiplicative, Token::Slash, _) => BinaryOp::Div,
            (Self::Multiplicative, Token::Percent, _) => BinaryOp::Rem,
            _ => return None,
        };
        Some(op)
    }
}

impl<'source> Parser<'source> {
    /// Parses an expression optionally followed by more comma separated
    /// expressions.
    ///
    /// `a, b` builds a two element list and a trailing comma `a,` wraps a
    /// single expression in a list.
    ///
    ///   user.name
    ///
    ///   1, 2, 3
    ///
    ///   item,
    ///
    pub(super) fn parse_expr_list(&mut self) -> Result<Term> {
        let first = self.parse_expr()?;
        if !self.is_next(Token::Comma)? {
            return Ok(first);
        }

        let mut span = first.span();
        let mut items = vec![first];
        while self.is_next(Token::Comma)? {
            span = span.combine(self.expect(Token::Comma)?);
            if self.is_at_list_end()? {
                break;
            }
            let item = self.parse_expr()?;
            span = span.combine(item.span());
            items.push(item);
        }
        Ok(Term::List(ast::List { items, span }))
    }

    /// Parses a single expression.
    pub(super) fn parse_expr(&mut self) -> Result<Term> {
        self.parse_binary(Level::Or)
    }

    /// Parses a left associative chain of operators of the given level.
    fn parse_binary(&mut self, level: Level) -> Result<Term> {
        let mut left = self.parse_operand(level)?;
        while let Some(op) = self.peek_operator(level)? {
            self.parse()?;
            let right = self.parse_operand(level)?;
            let span = left.span().combine(right.span());
            left = Term::Binary(Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            });
        }
        Ok(left)
    }

    fn parse_operand(&mut self, level: Level) -> Result<Term> {
        match level.next() {
            Some(next) => self.parse_binary(next),
            None => self.parse_unary(),
        }
    }

    fn peek_operator(&mut self, level: Level) -> Result<Option<BinaryOp>> {
        Ok(self
            .peek()?
            .and_then(|(tk, sp)| level.operator(tk, &self.source()[sp])))
    }

    /// Parses a prefix operator applied to an operand.
    ///
    ///   !user.enabled
    ///
    ///   not not x
    ///
    ///   -count
    ///
    fn parse_unary(&mut self) -> Result<Term> {
        let op = match self.peek()? {
            Some((Token::Bang, _)) => UnaryOp::Not,
            Some((Token::Minus, _)) => UnaryOp::Neg,
            Some((Token::Keyword, _)) if self.is_next_keyword("not")? => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let (_, begin) = self.parse()?;
        let operand = self.parse_unary()?;
        let span = begin.combine(operand.span());
        Ok(Term::Unary(Unary {
            op,
            operand: Box::new(operand),
            span,
        }))
    }

    /// Parses a primary expression followed by any number of calls, indexes,
    /// slices and member accesses.
    ///
    ///   users[0].name
    ///
    ///   items[1:-1]
    ///
    ///   lower(name)
    ///
    fn parse_postfix(&mut self) -> Result<Term> {
        let (mut term, mut parenthesized) = self.parse_primary()?;
        loop {
            match self.peek()? {
                Some((Token::Dot, _)) => {
                    self.parse()?;
                    let key = self.parse_member()?;
                    let span = term.span().combine(key.span);
                    term = Term::Index(ast::Index {
                        seq: Box::new(term),
                        key: Box::new(Term::Literal(key)),
                        span,
                    });
                }
                Some((Token::LBracket, _)) => {
                    self.parse()?;
                    term = self.parse_subscript(term)?;
                }
                Some((Token::LParen, paren)) => {
                    let (Term::Var(name), false) = (term, parenthesized) else {
                        return Err(Error::syntax(
                            "only named functions can be called",
                            self.source(),
                            paren,
                        ));
                    };
                    self.parse()?;
                    let (args, end) = self.parse_items(Token::RParen)?;
                    let span = name.span.combine(end);
                    term = Term::Call(Call { name, args, span });
                }
                _ => break,
            }
            parenthesized = false;
        }
        Ok(term)
    }

    /// Parses the segment after a `.` into a literal key.
    fn parse_member(&mut self) -> Result<Literal> {
        match self.parse()? {
            (Token::Ident | Token::Keyword, span) => {
                let value = Value::String(self.source()[span].to_owned());
                Ok(Literal { value, span })
            }
            (Token::Number, span) => {
                let value = self.parse_integer(span)?;
                Ok(Literal { value, span })
            }
            (tk, span) => Err(self.err_unexpected_token("identifier or index", tk, span)),
        }
    }

    /// Parses an index or a slice after the opening `[`.
    ///
    ///   0]
    ///
    ///   1:]
    ///
    ///   ::-1]
    ///
    fn parse_subscript(&mut self, seq: Term) -> Result<Term> {
        let start = match self.is_next(Token::Colon)? {
            true => None,
            false => Some(self.parse_expr()?),
        };

        match (start, self.is_next(Token::Colon)?) {
            (Some(key), false) => {
                let end = self.expect(Token::RBracket)?;
                let span = seq.span().combine(end);
                Ok(Term::Index(ast::Index {
                    seq: Box::new(seq),
                    key: Box::new(key),
                    span,
                }))
            }
            (start, _) => {
                self.expect(Token::Colon)?;
                let stop = self.parse_slice_bound()?;
                let step = match self.is_next(Token::Colon)? {
                    true => {
                        self.expect(Token::Colon)?;
                        self.parse_slice_bound()?
                    }
                    false => None,
                };
                let end = self.expect(Token::RBracket)?;
                let span = seq.span().combine(end);
                Ok(Term::Slice(Slice {
                    seq: Box::new(seq),
                    start: start.map(Box::new),
                    stop,
                    step,
                    span,
                }))
            }
        }
    }

    fn parse_slice_bound(&mut self) -> Result<Option<Box<Term>>> {
        if self.is_next(Token::Colon)? || self.is_next(Token::RBracket)? {
            return Ok(None);
        }
        Ok(Some(Box::new(self.parse_expr()?)))
    }

    /// Parses a literal, a variable, a parenthesized expression or a list.
    ///
    /// Also returns whether the term was wrapped in parentheses.
    fn parse_primary(&mut self) -> Result<(Term, bool)> {
        let term = match self.parse()? {
            (Token::Number, span) => {
                let value = self.parse_number(span)?;
                Term::Literal(Literal { value, span })
            }

            (Token::String, span) => {
                let value = Value::String(self.parse_string(span)?);
                Term::Literal(Literal { value, span })
            }

            (Token::Keyword, span) => {
                let value = match &self.source()[span] {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::None,
                    kw => {
                        return Err(Error::syntax(
                            format!("unexpected keyword `{kw}`"),
                            self.source(),
                            span,
                        ));
                    }
                };
                Term::Literal(Literal { value, span })
            }

            (Token::Ident, span) => {
                let name = self.source()[span].to_owned();
                Term::Var(Ident { name, span })
            }

            (Token::LParen, _) => {
                let term = self.parse_expr()?;
                self.expect(Token::RParen)?;
                return Ok((term, true));
            }

            (Token::LBracket, begin) => {
                let (items, end) = self.parse_items(Token::RBracket)?;
                let span = begin.combine(end);
                Term::List(ast::List { items, span })
            }

            (tk, span) => {
                return Err(self.err_unexpected_token("expression", tk, span));
            }
        };
        Ok((term, false))
    }

    /// Parses comma separated expressions up to and including `close`.
    ///
    /// A trailing comma is allowed.
    fn parse_items(&mut self, close: Token) -> Result<(Vec<Term>, Span)> {
        let mut items = Vec::new();
        while !self.is_next(close)? {
            items.push(self.parse_expr()?);
            if !self.is_next(Token::Comma)? {
                break;
            }
            self.expect(Token::Comma)?;
        }
        let end = self.expect(close)?;
        Ok((items, end))
    }

    /// Whether the next token ends an iteration list after a trailing comma.
    fn is_at_list_end(&mut self) -> Result<bool> {
        Ok(matches!(
            self.peek()?,
            None | Some((Token::EndExpr | Token::EndBlock, _))
        ))
    }

    /// Parses an integer or a decimal literal.
    fn parse_number(&self, span: Span) -> Result<Value> {
        let raw = &self.source()[span];
        if !raw.contains(['.', 'e', 'E']) {
            return self.parse_integer(span);
        }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(Error::syntax(
                "float literal out of range",
                self.source(),
                span,
            )),
        }
    }

    fn parse_integer(&self, span: Span) -> Result<Value> {
        self.source()[span]
            .parse()
            .map(Value::Integer)
            .map_err(|_| {
                Error::syntax(
                    "integer literal out of range for 64-bit integer",
                    self.source(),
                    span,
                )
            })
    }
}
