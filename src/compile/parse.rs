use std::fmt::Display;

use crate::compile::lex::{Lexer, Token};
use crate::types::ast::{self, Node, Tag, TagKind};
use crate::types::span::Span;
use crate::{Error, Result};

/// A parser that constructs a node tree from a token stream.
///
/// Template structure is parsed without recursion using a stack of open tag
/// chains. Expressions are parsed by recursive descent, see the `expr`
/// module. The parser sometimes needs to peek at the next token to know how
/// to proceed and uses the `peeked` buffer to do this.
pub struct Parser<'source> {
    /// A lexer that tokenizes the template source.
    tokens: Lexer<'source>,

    /// Remember a peeked value, even if it was `None`
    peeked: Option<Option<(Token, Span)>>,
}

/// An open tag chain, e.g. an `if` whose `endif` has not been seen yet.
struct Frame {
    family: Family,
    state: ChainState,
    /// The tags of the chain so far. Nodes are collected into the body of
    /// the last one.
    tags: Vec<Tag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    If,
    For,
}

/// Which body of a chain is being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainState {
    /// The body of the opening tag or of an `elif`.
    Primary,
    /// The body after an `else`.
    Alternate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Elif,
    Else,
}

/// How a tag takes part in a chain.
enum Role {
    Open(Family),
    Link(Link),
    End(Family),
    Single,
}

impl<'source> Parser<'source> {
    /// Construct a new parser.
    pub fn new(source: &'source str) -> Self {
        Self {
            tokens: Lexer::new(source),
            peeked: None,
        }
    }

    /// Parses a template into a list of nodes.
    ///
    /// Opening tags push a frame to the frame stack and nodes are collected
    /// into the body of the innermost frame's current tag. Linking tags like
    /// `else` start a new body in the same frame and end tags pop the frame,
    /// linking its tags into a chain.
    pub fn parse_document(mut self) -> Result<Vec<Node>> {
        let mut root = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();

        while let Some(next) = self.next()? {
            let node = match next {
                // Simply raw template, emit a single node for it.
                (Token::Raw, span) => {
                    if span.m == span.n {
                        continue;
                    }
                    Node::Text(span)
                }

                // The start of a comment, e.g. `{# ... #}`
                (Token::BeginComment, _) => {
                    if self.is_next(Token::Raw)? {
                        self.expect(Token::Raw)?;
                    }
                    self.expect(Token::EndComment)?;
                    continue;
                }

                // The start of an expression, e.g. `{{ user.name }}`
                (Token::BeginExpr, begin) => {
                    let term = self.parse_expr_list()?;
                    let end = self.expect(Token::EndExpr)?;
                    let span = begin.combine(end);
                    Node::Echo(ast::Echo { term, span })
                }

                // The start of a block, e.g. `{% if cond %}`
                (Token::BeginBlock, begin) => {
                    let kind = self.parse_block()?;
                    let end = self.expect(Token::EndBlock)?;
                    let span = begin.combine(end);
                    let tag = Tag {
                        kind,
                        span,
                        body: Vec::new(),
                        next: None,
                    };

                    match tag.kind.role() {
                        Role::Single => Node::Tag(tag),

                        // The start of a chain, e.g. `{% if cond %}`. The
                        // following nodes belong to its body.
                        Role::Open(family) => {
                            frames.push(Frame {
                                family,
                                state: ChainState::Primary,
                                tags: vec![tag],
                            });
                            continue;
                        }

                        // A tag continuing the chain, e.g. `{% else %}`. The
                        // chain must allow it in its current state.
                        Role::Link(link) => {
                            let name = tag.kind.name();
                            let err = || {
                                Error::syntax(format!("unexpected `{name}` block"), self.source(), span)
                            };
                            let frame = frames.last_mut().ok_or_else(err)?;
                            frame.state = frame.state.advance(frame.family, link).ok_or_else(err)?;
                            frame.tags.push(tag);
                            continue;
                        }

                        // The end of a chain, e.g. `{% endif %}`. The chain is
                        // linked together and becomes a node of the parent.
                        Role::End(family) => {
                            let name = tag.kind.name();
                            let err = || {
                                Error::syntax(format!("unexpected `{name}` block"), self.source(), span)
                            };
                            let mut frame = frames.pop().ok_or_else(err)?;
                            if frame.family != family {
                                return Err(err());
                            }
                            frame.tags.push(tag);
                            match link_chain(frame.tags) {
                                Some(head) => Node::Tag(head),
                                None => return Err(err()),
                            }
                        }
                    }
                }

                (tk, span) => {
                    return Err(self.err_unexpected_token("template", tk, span));
                }
            };

            match frames.last_mut().and_then(|f| f.tags.last_mut()) {
                Some(tag) => tag.body.push(node),
                None => root.push(node),
            }
        }

        if let Some(frame) = frames.last() {
            if let Some(tag) = frame.tags.first() {
                let name = tag.kind.name();
                return Err(Error::syntax(
                    format!("unclosed `{name}` block"),
                    self.source(),
                    tag.span,
                ));
            }
        }

        Ok(root)
    }

    /// Parses the contents of a block. All of the following are valid.
    ///
    ///   if user.is_enabled
    ///
    ///   elif user.is_admin
    ///
    ///   for key, value in items(group.users)
    ///
    ///   set count = count + 1
    ///
    ///   include "partials/header" with title = page.title, depth = 1
    ///
    ///   text "LICENSE"
    ///
    fn parse_block(&mut self) -> Result<TagKind> {
        let name = self.parse_ident()?;
        let kind = match name.name.as_str() {
            "if" => TagKind::If(self.parse_expr_list()?),
            "elif" => TagKind::Elif(self.parse_expr_list()?),
            "else" => TagKind::Else,
            "endif" => TagKind::EndIf,
            "for" => {
                let vars = self.parse_loop_vars()?;
                self.expect_keyword("in")?;
                let iterable = self.parse_expr_list()?;
                TagKind::For(vars, iterable)
            }
            "endfor" => TagKind::EndFor,
            "set" => {
                let (name, term) = self.parse_assignment(true)?;
                TagKind::Set(name, term)
            }
            "let" => {
                let (name, term) = self.parse_assignment(true)?;
                TagKind::Let(name, term)
            }
            "include" => {
                let path = self.parse_str()?;
                let mut with = Vec::new();
                if self.is_next_ident("with")? {
                    self.parse()?;
                    loop {
                        with.push(self.parse_assignment(false)?);
                        if !self.is_next(Token::Comma)? {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                TagKind::Include(ast::Include { path, with })
            }
            "text" => TagKind::Text(self.parse_str()?),
            other => {
                return Err(Error::syntax(
                    format!("unknown tag `{other}`"),
                    self.source(),
                    name.span,
                ));
            }
        };
        Ok(kind)
    }

    /// Parses loop variable(s).
    ///
    /// This is either a single identifier or comma separated identifiers that
    /// each item is unpacked into.
    ///
    ///   item
    ///
    ///   key, value
    ///
    fn parse_loop_vars(&mut self) -> Result<ast::LoopVars> {
        let first = self.parse_ident()?;
        if !self.is_next(Token::Comma)? {
            return Ok(ast::LoopVars::Item(first));
        }
        let mut span = first.span;
        let mut vars = vec![first];
        while self.is_next(Token::Comma)? {
            self.expect(Token::Comma)?;
            let var = self.parse_ident()?;
            span = span.combine(var.span);
            vars.push(var);
        }
        Ok(ast::LoopVars::Unpack(vars, span))
    }

    /// Parses `name = expr`.
    ///
    /// When `list` is set the value may be a comma separated list.
    fn parse_assignment(&mut self, list: bool) -> Result<(ast::Ident, ast::Term)> {
        let name = self.parse_ident()?;
        self.expect(Token::Assign)?;
        let term = match list {
            true => self.parse_expr_list()?,
            false => self.parse_expr()?,
        };
        Ok((name, term))
    }

    /// Parses a string literal tag parameter.
    fn parse_str(&mut self) -> Result<ast::Str> {
        let span = self.expect(Token::String)?;
        let value = self.parse_string(span)?;
        Ok(ast::Str { value, span })
    }

    /// Parses a string and handles escape characters.
    pub(super) fn parse_string(&self, span: Span) -> Result<String> {
        let raw = &self.source()[span];
        // The lexer guarantees the string is delimited by ASCII quotes.
        let inner = &raw[1..raw.len() - 1];
        if !inner.contains('\\') {
            return Ok(inner.to_owned());
        }

        let mut string = String::with_capacity(inner.len());
        let mut iter = inner.char_indices().map(|(i, c)| (span.m + 1 + i, c));
        while let Some((i, c)) = iter.next() {
            if c != '\\' {
                string.push(c);
                continue;
            }
            let c = match iter.next() {
                Some((_, 'n')) => '\n',
                Some((_, 'r')) => '\r',
                Some((_, 't')) => '\t',
                Some((_, '\\')) => '\\',
                Some((_, '"')) => '"',
                Some((_, '\'')) => '\'',
                Some((j, esc)) => {
                    return Err(Error::syntax(
                        "unknown escape character",
                        self.source(),
                        i..j + esc.len_utf8(),
                    ));
                }
                None => {
                    return Err(Error::syntax(
                        "unknown escape character",
                        self.source(),
                        i..i + 1,
                    ));
                }
            };
            string.push(c);
        }
        Ok(string)
    }

    /// Expects the given keyword.
    pub(super) fn expect_keyword(&mut self, exp: &str) -> Result<Span> {
        let span = self.expect(Token::Keyword)?;
        let kw = &self.source()[span];
        if kw != exp {
            return Err(Error::syntax(
                format!("expected keyword `{exp}`, found keyword `{kw}`"),
                self.source(),
                span,
            ));
        }
        Ok(span)
    }

    /// Parses an identifier.
    pub(super) fn parse_ident(&mut self) -> Result<ast::Ident> {
        let span = self.expect(Token::Ident)?;
        let name = self.source()[span].to_owned();
        Ok(ast::Ident { name, span })
    }

    /// Parses any token.
    pub(super) fn parse(&mut self) -> Result<(Token, Span)> {
        match self.next()? {
            Some((tk, sp)) => Ok((tk, sp)),
            None => Err(self.err_unexpected_eof("token")),
        }
    }

    /// Parses the specified token and returns its span.
    pub(super) fn expect(&mut self, exp: Token) -> Result<Span> {
        match self.next()? {
            Some((tk, span)) if tk == exp => Ok(span),
            Some((tk, span)) => Err(self.err_unexpected_token(exp.human(), tk, span)),
            None => Err(self.err_unexpected_eof(exp.human())),
        }
    }

    /// Returns `true` if the next token is the keyword `kw`.
    pub(super) fn is_next_keyword(&mut self, kw: &str) -> Result<bool> {
        Ok(self
            .peek()?
            .map(|(tk, sp)| tk == Token::Keyword && &self.source()[sp] == kw)
            .unwrap_or(false))
    }

    /// Returns `true` if the next token is the identifier `name`.
    fn is_next_ident(&mut self, name: &str) -> Result<bool> {
        Ok(self
            .peek()?
            .map(|(tk, sp)| tk == Token::Ident && &self.source()[sp] == name)
            .unwrap_or(false))
    }

    /// Returns `true` if the next token is equal to the provided one.
    pub(super) fn is_next(&mut self, token: Token) -> Result<bool> {
        Ok(self.peek()?.map(|(tk, _)| tk == token).unwrap_or(false))
    }

    /// Returns a copy of the next token without affecting the result of the
    /// following `.next()` call.
    pub(super) fn peek(&mut self) -> Result<Option<(Token, Span)>> {
        match self.peeked {
            Some(peeked) => Ok(peeked),
            None => {
                let peeked = self.tokens.next()?;
                self.peeked = Some(peeked);
                Ok(peeked)
            }
        }
    }

    /// Returns the next token and span in the stream.
    pub(super) fn next(&mut self) -> Result<Option<(Token, Span)>> {
        match self.peeked.take() {
            Some(v) => Ok(v),
            None => self.tokens.next(),
        }
    }

    pub(super) fn source(&self) -> &'source str {
        self.tokens.source
    }

    pub(super) fn err_unexpected_eof(&self, exp: impl Display) -> Error {
        let n = self.source().len();
        Error::syntax(format!("expected {exp}, found EOF"), self.source(), n..n)
    }

    pub(super) fn err_unexpected_token(&self, exp: impl Display, got: Token, span: Span) -> Error {
        let got = got.human();
        Error::syntax(format!("expected {exp}, found {got}"), self.source(), span)
    }
}

impl ChainState {
    /// Returns the state after a linking tag, if the chain allows it.
    fn advance(self, family: Family, link: Link) -> Option<Self> {
        match (family, self, link) {
            (Family::If, Self::Primary, Link::Elif) => Some(Self::Primary),
            (_, Self::Primary, Link::Else) => Some(Self::Alternate),
            _ => None,
        }
    }
}

impl TagKind {
    fn role(&self) -> Role {
        match self {
            Self::If(_) => Role::Open(Family::If),
            Self::For(..) => Role::Open(Family::For),
            Self::Elif(_) => Role::Link(Link::Elif),
            Self::Else => Role::Link(Link::Else),
            Self::EndIf => Role::End(Family::If),
            Self::EndFor => Role::End(Family::For),
            Self::Set(..) | Self::Let(..) | Self::Include(_) | Self::Text(_) => Role::Single,
        }
    }

    /// The name of the tag as written in a template.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::If(_) => "if",
            Self::Elif(_) => "elif",
            Self::Else => "else",
            Self::EndIf => "endif",
            Self::For(..) => "for",
            Self::EndFor => "endfor",
            Self::Set(..) => "set",
            Self::Let(..) => "let",
            Self::Include(_) => "include",
            Self::Text(_) => "text",
        }
    }
}

/// Links the tags of a chain through their `next` field and returns the head.
fn link_chain(tags: Vec<Tag>) -> Option<Tag> {
    tags.into_iter().rev().reduce(|next, mut tag| {
        tag.next = Some(Box::new(next));
        tag
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;

    fn parse(source: &str) -> Result<Vec<Node>> {
        Parser::new(source).parse_document()
    }

    /// Summarizes the chain starting at `tag` as a list of tag names and
    /// body lengths.
    fn chain(tag: &Tag) -> Vec<(&'static str, usize)> {
        let mut out = vec![(tag.kind.name(), tag.body.len())];
        let mut next = &tag.next;
        while let Some(tag) = next {
            out.push((tag.kind.name(), tag.body.len()));
            next = &tag.next;
        }
        out
    }

    fn head(nodes: &[Node]) -> &Tag {
        match nodes.iter().find(|n| matches!(n, Node::Tag(_))) {
            Some(Node::Tag(tag)) => tag,
            _ => panic!("no tag found"),
        }
    }

    #[test]
    fn parse_text_and_echo() {
        let nodes = parse("lorem {{ ipsum }} dolor").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[1], Node::Echo(_)));
    }

    #[test]
    fn parse_comment_is_dropped() {
        let nodes = parse("a{# comment #}b{##}").unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn parse_if_chain() {
        let nodes = parse("{% if a %}1{% elif b %}2{% elif c %}3{% else %}4{% endif %}").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            chain(head(&nodes)),
            [
                ("if", 1),
                ("elif", 1),
                ("elif", 1),
                ("else", 1),
                ("endif", 0)
            ]
        );
    }

    #[test]
    fn parse_nested_chains() {
        let nodes =
            parse("{% for x in xs %}{% if x %}a{% endif %}{% else %}b{% endfor %}").unwrap();
        let tag = head(&nodes);
        assert_eq!(chain(tag), [("for", 1), ("else", 1), ("endfor", 0)]);
        assert_eq!(chain(head(&tag.body)), [("if", 1), ("endif", 0)]);
    }

    #[test]
    fn parse_for_unpack() {
        let nodes = parse("{% for k, v in m %}{% endfor %}").unwrap();
        match &head(&nodes).kind {
            TagKind::For(ast::LoopVars::Unpack(vars, _), _) => {
                let names: Vec<_> = vars.iter().map(|v| v.name.as_str()).collect();
                assert_eq!(names, ["k", "v"]);
            }
            _ => panic!("expected unpacking for loop"),
        }
    }

    #[test]
    fn parse_include_with() {
        let nodes = parse(r#"{% include "../a" with x = 1, y = z + 1 %}"#).unwrap();
        match &head(&nodes).kind {
            TagKind::Include(include) => {
                assert_eq!(include.path.value, "../a");
                let names: Vec<_> = include.with.iter().map(|(n, _)| n.name.as_str()).collect();
                assert_eq!(names, ["x", "y"]);
            }
            _ => panic!("expected include"),
        }
    }

    #[test]
    fn parse_string_escapes() {
        let nodes = parse(r#"{% text "a\tb\\c\"d\'e" %}"#).unwrap();
        match &head(&nodes).kind {
            TagKind::Text(s) => assert_eq!(s.value, "a\tb\\c\"d'e"),
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn parse_err_unknown_escape() {
        let err = parse(r#"{{ "a\qb" }}"#).unwrap_err();
        assert_eq!(err.message(), "unknown escape character");
        assert_eq!(err.line_col(), Some((1, 6)));
    }

    #[test]
    fn parse_err_elif_after_else() {
        let err = parse("{% if a %}{% else %}{% elif b %}{% endif %}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.message(), "unexpected `elif` block");
    }

    #[test]
    fn parse_err_else_twice() {
        let err = parse("{% for a in b %}{% else %}{% else %}{% endfor %}").unwrap_err();
        assert_eq!(err.message(), "unexpected `else` block");
    }

    #[test]
    fn parse_err_elif_in_for() {
        let err = parse("{% for a in b %}{% elif c %}{% endfor %}").unwrap_err();
        assert_eq!(err.message(), "unexpected `elif` block");
    }

    #[test]
    fn parse_err_mismatched_end() {
        let err = parse("{% if a %}{% endfor %}").unwrap_err();
        assert_eq!(err.message(), "unexpected `endfor` block");
    }

    #[test]
    fn parse_err_end_without_open() {
        let err = parse("lorem {% endif %}").unwrap_err();
        assert_eq!(err.message(), "unexpected `endif` block");
        assert_eq!(err.line_col(), Some((1, 7)));
    }

    #[test]
    fn parse_err_unclosed() {
        let err = parse("{% if a %}{% for x in y %}{% endfor %}").unwrap_err();
        assert_eq!(err.message(), "unclosed `if` block");
        assert_eq!(err.line_col(), Some((1, 1)));
    }

    #[test]
    fn parse_err_unknown_tag() {
        let err = parse("{% frobnicate %}").unwrap_err();
        assert_eq!(err.message(), "unknown tag `frobnicate`");
    }

    #[test]
    fn parse_err_empty_expr() {
        let err = parse("{{ }}").unwrap_err();
        assert_eq!(err.message(), "expected expression, found end expression");
    }
}
