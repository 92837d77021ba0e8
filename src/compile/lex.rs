use crate::types::span::Span;
use crate::{Error, Result};

/// A lexer that tokenizes the template source into distinct chunks so that the
/// parser doesn't have to operate on raw text.
///
/// The lexer is implemented as a fallible iterator. The parser should
/// repeatedly call the [`.next()?`][Lexer::next] method to return the next
/// non-whitespace token until [`None`] is returned.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Lexer<'source> {
    /// The original template source.
    pub source: &'source str,

    /// A cursor over the template source.
    cursor: usize,

    /// The current state of the lexer.
    state: State,

    /// Whether to left trim the next raw token.
    left_trim: bool,

    /// A buffer to store the next token.
    next: Option<(Token, Span)>,
}

/// The state of the lexer.
///
/// The lexer requires state because the tokenization is different when
/// tokenizing text between expression and block syntax, e.g. `{{ expr }}`,
/// `{% if cond %}`.
#[derive(Clone, Copy)]
#[cfg_attr(internal_debug, derive(Debug))]
enum State {
    /// Within raw template.
    Template,

    /// Between expression or block tags.
    Block {
        /// The span of the begin tag.
        begin: Span,
        /// The end token we are expecting.
        end: Token,
    },

    /// Between expression or block tags, directly after a `.`.
    ///
    /// Digits lex as an integer only so that `a.0.1` is two member accesses.
    Member { begin: Span, end: Token },

    /// Between comment tags.
    Comment { begin: Span, end: Token },
}

/// The unit yielded by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Raw template
    Raw,
    /// Begin expression tag, e.g. `{{`
    BeginExpr,
    /// End expression tag, e.g. `}}`
    EndExpr,
    /// Begin block tag, e.g. `{%`
    BeginBlock,
    /// End block tag, e.g. `%}`
    EndBlock,
    /// Begin comment tag, e.g. `{#`
    BeginComment,
    /// End comment tag, e.g. `#}`
    EndComment,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `:`
    Colon,
    /// `=`
    Assign,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// Sequence of spaces, tabs and newlines
    Whitespace,
    /// A keyword like `in` or `true`
    Keyword,
    /// A variable, function or tag name
    Ident,
    /// An integer or decimal literal, e.g. `19`, `0.5` or `1e-3`
    Number,
    /// A string literal, e.g. `"Hello World!\n"` or `'single'`
    String,
}

/// Keywords of the expression language.
///
/// Tag names like `if` and `for` are identifiers so that they remain usable as
/// variable names.
pub(crate) const KEYWORDS: &[&str] = &["in", "and", "or", "not", "true", "false", "null"];

impl<'source> Lexer<'source> {
    /// Construct a new lexer.
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            cursor: 0,
            state: State::Template,
            left_trim: false,
            next: None,
        }
    }

    /// Returns the next non-whitespace token and its span.
    pub fn next(&mut self) -> Result<Option<(Token, Span)>> {
        loop {
            match self.lex()? {
                Some((tk, sp)) if !tk.is_whitespace() => return Ok(Some((tk, sp))),
                None => return Ok(None),
                _ => continue,
            }
        }
    }

    /// Returns the next token and span.
    fn lex(&mut self) -> Result<Option<(Token, Span)>> {
        if let Some(next) = self.next.take() {
            return Ok(Some(next));
        }

        let i = self.cursor;

        if self.source[i..].is_empty() {
            return match self.state {
                State::Template => Ok(None),
                State::Block { begin, end }
                | State::Member { begin, end }
                | State::Comment { begin, end } => Err(self.err_unclosed(begin, end)),
            };
        }

        match self.state {
            State::Template => self.lex_template(i),
            State::Block { begin, end } => self.lex_block(false, begin, end, i),
            State::Member { begin, end } => self.lex_block(true, begin, end, i),
            State::Comment { begin, end } => self.lex_comment(begin, end, i),
        }
    }

    fn lex_template(&mut self, i: usize) -> Result<Option<(Token, Span)>> {
        // We are within raw template, that means all we have to do is
        // find the next begin tag from `i` and and any relevant cursor
        // indexes. The following diagram helps describe the variable
        // naming.
        //
        // xxxxxxx{{xxxxxxxxx
        //    ^   ^ ^
        //    i   j k

        let mut trim_raw_token = |mut i, mut j, right_trim| {
            if right_trim {
                j = self.source[..j].trim_end().len().max(i);
            }
            if self.left_trim {
                self.left_trim = false;
                let s = &self.source[i..j];
                i += s.len() - s.trim_start().len();
            }
            Ok(Some((Token::Raw, Span::from(i..j))))
        };

        match find_begin_tag(self.source, i) {
            Some((tk, trim, j, k)) => {
                let begin = Span::from(j..k);
                let end = tk.pair();
                self.cursor = k;
                self.state = if tk == Token::BeginComment {
                    State::Comment { begin, end }
                } else {
                    State::Block { begin, end }
                };

                if i == j {
                    // The current cursor is exactly at the token.
                    Ok(Some((tk, begin)))
                } else {
                    // We must first emit the raw token, so we store the
                    // begin tag token in the `next` buffer.
                    self.next = Some((tk, begin));
                    trim_raw_token(i, j, trim)
                }
            }
            None => {
                let j = self.source.len();
                self.cursor = j;
                trim_raw_token(i, j, false)
            }
        }
    }

    fn lex_block(
        &mut self,
        member: bool,
        begin: Span,
        end: Token,
        i: usize,
    ) -> Result<Option<(Token, Span)>> {
        // We are between two tags {{ ... }} or {% ... %} that means we
        // must parse template syntax relevant tokens and also lookout
        // for the corresponding end tag `end`.

        if let Some((tk, trim, j)) = tag_at(self.source, i) {
            if tk.is_begin_tag() {
                return Err(self.err_unclosed(begin, end));
            }
            if tk != end {
                return Err(self.err_unexpected_token(tk, i..j));
            }

            // A matching end tag! Update the state and return the token.
            self.state = State::Template;
            self.left_trim = trim;
            self.cursor = j;
            return Ok(Some((tk, Span::from(i..j))));
        }

        // The map call here fixes the index to be relative to the actual
        // template source.
        let mut iter = self.source[i..].char_indices().map(|(d, c)| (i + d, c));
        let Some((_, c)) = iter.next() else {
            return Ok(None);
        };
        let next = self.source[i + c.len_utf8()..].chars().next();

        let (tk, j) = match (c, next) {
            // Two character operators.
            ('=', Some('=')) => (Token::Eq, i + 2),
            ('!', Some('=')) => (Token::NotEq, i + 2),
            ('<', Some('=')) => (Token::Le, i + 2),
            ('>', Some('=')) => (Token::Ge, i + 2),
            ('&', Some('&')) => (Token::AndAnd, i + 2),
            ('|', Some('|')) => (Token::OrOr, i + 2),

            // Single character to token mappings.
            ('(', _) => (Token::LParen, i + 1),
            (')', _) => (Token::RParen, i + 1),
            ('[', _) => (Token::LBracket, i + 1),
            (']', _) => (Token::RBracket, i + 1),
            (',', _) => (Token::Comma, i + 1),
            ('.', _) => (Token::Dot, i + 1),
            (':', _) => (Token::Colon, i + 1),
            ('=', _) => (Token::Assign, i + 1),
            ('!', _) => (Token::Bang, i + 1),
            ('<', _) => (Token::Lt, i + 1),
            ('>', _) => (Token::Gt, i + 1),
            ('+', _) => (Token::Plus, i + 1),
            ('-', _) => (Token::Minus, i + 1),
            ('*', _) => (Token::Star, i + 1),
            ('/', _) => (Token::Slash, i + 1),
            ('%', _) => (Token::Percent, i + 1),

            // Multi-character tokens with a distinct start character.
            ('"' | '\'', _) => self.lex_string(iter, c, i)?,
            (c, _) if c.is_ascii_digit() => match member {
                true => (Token::Number, self.lex_while(iter, |c| c.is_ascii_digit())),
                false => self.lex_number(i)?,
            },
            (c, _) if is_whitespace(c) => (Token::Whitespace, self.lex_while(iter, is_whitespace)),
            (c, _) if is_ident_start(c) => self.lex_ident_or_keyword(iter, i),

            // Any other character...
            _ => {
                return Err(self.err_unexpected_character(i..(i + c.len_utf8())));
            }
        };

        self.state = match (tk, member) {
            (Token::Dot, _) => State::Member { begin, end },
            (Token::Whitespace, true) => State::Member { begin, end },
            _ => State::Block { begin, end },
        };

        // Finally, we need to update the cursor.
        self.cursor = j;

        Ok(Some((tk, Span::from(i..j))))
    }

    fn lex_comment(&mut self, begin: Span, end: Token, i: usize) -> Result<Option<(Token, Span)>> {
        // We are between two comment tags {# ... #}, that means all we
        // have to do is find the corresponding end tag. The following
        // diagram helps describe the variable naming.
        //
        // x{#cccccc#}xxxxxx
        //    ^     ^ ^
        //    i     j k

        let Some(p) = self.source[i..].find("#}").map(|p| i + p) else {
            return Err(self.err_unclosed(begin, end));
        };
        let trim = p > i && self.source[..p].ends_with('-');
        let (j, k) = (if trim { p - 1 } else { p }, p + 2);

        self.cursor = k;
        self.state = State::Template;
        self.left_trim = trim;
        let end = (Token::EndComment, Span::from(j..k));

        if i == j {
            // The current cursor is exactly at the token.
            Ok(Some(end))
        } else {
            // We must first emit the raw token, so we store the end tag
            // token in the `next` buffer.
            self.next = Some(end);
            Ok(Some((Token::Raw, Span::from(i..j))))
        }
    }

    fn lex_string<I>(&mut self, mut iter: I, quote: char, i: usize) -> Result<(Token, usize)>
    where
        I: Iterator<Item = (usize, char)> + Clone,
    {
        let mut escaped = false;
        loop {
            match iter.next() {
                None => {
                    return Err(self.err_undelimited_string(i..self.source.len()));
                }
                Some((j, '\r' | '\n')) => {
                    return Err(self.err_undelimited_string(i..j));
                }
                Some((j, c)) if c == quote && !escaped => {
                    return Ok((Token::String, j + 1));
                }
                Some((_, c)) => {
                    escaped = c == '\\' && !escaped;
                }
            }
        }
    }

    /// Lexes an integer or a decimal literal with an optional exponent.
    fn lex_number(&mut self, i: usize) -> Result<(Token, usize)> {
        let bytes = self.source.as_bytes();
        let digits = |mut j: usize| {
            while bytes.get(j).map_or(false, u8::is_ascii_digit) {
                j += 1;
            }
            j
        };

        let mut j = digits(i);
        if bytes.get(j) == Some(&b'.') && bytes.get(j + 1).map_or(false, u8::is_ascii_digit) {
            j = digits(j + 1);
        }
        if matches!(bytes.get(j), Some(b'e' | b'E')) {
            let mut k = j + 1;
            if matches!(bytes.get(k), Some(b'+' | b'-')) {
                k += 1;
            }
            let n = digits(k);
            if n == k {
                return Err(Error::lex("malformed number literal", self.source, i..k));
            }
            j = n;
        }
        Ok((Token::Number, j))
    }

    fn lex_ident_or_keyword<I>(&mut self, iter: I, i: usize) -> (Token, usize)
    where
        I: Iterator<Item = (usize, char)> + Clone,
    {
        let j = self.lex_while(iter, is_ident);
        let tk = match KEYWORDS.contains(&&self.source[i..j]) {
            true => Token::Keyword,
            false => Token::Ident,
        };
        (tk, j)
    }

    fn lex_while<I, P>(&mut self, mut iter: I, pred: P) -> usize
    where
        I: Iterator<Item = (usize, char)> + Clone,
        P: Fn(char) -> bool,
    {
        loop {
            match iter.clone().next() {
                Some((_, c)) if pred(c) => {
                    iter.next();
                }
                Some((j, _)) => return j,
                None => return self.source.len(),
            }
        }
    }

    fn err_unclosed(&self, begin: Span, end: Token) -> Error {
        let end = end.pair().human();
        Error::syntax(format!("unclosed {end}"), self.source, begin)
    }

    fn err_unexpected_token(&self, tk: Token, span: impl Into<Span>) -> Error {
        let tk = tk.human();
        Error::syntax(format!("unexpected {tk}"), self.source, span)
    }

    fn err_unexpected_character(&self, span: impl Into<Span>) -> Error {
        Error::lex("unexpected character", self.source, span)
    }

    fn err_undelimited_string(&self, span: impl Into<Span>) -> Error {
        Error::lex("undelimited string", self.source, span)
    }
}

impl Token {
    pub fn human(&self) -> &'static str {
        match self {
            Self::Raw => "raw template",
            Self::BeginExpr => "begin expression",
            Self::EndExpr => "end expression",
            Self::BeginBlock => "begin block",
            Self::EndBlock => "end block",
            Self::BeginComment => "begin comment",
            Self::EndComment => "end comment",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::LBracket => "`[`",
            Self::RBracket => "`]`",
            Self::Comma => "comma",
            Self::Dot => "member access operator",
            Self::Colon => "colon",
            Self::Assign => "`=`",
            Self::Eq => "`==`",
            Self::NotEq => "`!=`",
            Self::Lt => "`<`",
            Self::Gt => "`>`",
            Self::Le => "`<=`",
            Self::Ge => "`>=`",
            Self::AndAnd => "`&&`",
            Self::OrOr => "`||`",
            Self::Bang => "`!`",
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Star => "`*`",
            Self::Slash => "`/`",
            Self::Percent => "`%`",
            Self::Whitespace => "whitespace",
            Self::Keyword => "keyword",
            Self::Ident => "identifier",
            Self::Number => "number",
            Self::String => "string",
        }
    }

    /// Returns the corresponding tag if this token is a tag.
    fn pair(&self) -> Self {
        match self {
            Self::BeginExpr => Self::EndExpr,
            Self::EndExpr => Self::BeginExpr,
            Self::BeginBlock => Self::EndBlock,
            Self::EndBlock => Self::BeginBlock,
            Self::BeginComment => Self::EndComment,
            Self::EndComment => Self::BeginComment,
            tk => *tk,
        }
    }

    fn is_begin_tag(&self) -> bool {
        matches!(
            self,
            Self::BeginExpr | Self::BeginBlock | Self::BeginComment
        )
    }

    fn is_whitespace(&self) -> bool {
        matches!(self, Self::Whitespace)
    }
}

/// Finds the next begin tag at or after `i`.
///
/// Returns the token, whether it trims the preceding raw text and its span.
fn find_begin_tag(source: &str, mut i: usize) -> Option<(Token, bool, usize, usize)> {
    while let Some(d) = source[i..].find('{') {
        let j = i + d;
        match tag_at(source, j) {
            Some((tk, trim, k)) if tk.is_begin_tag() => return Some((tk, trim, j, k)),
            _ => i = j + 1,
        }
    }
    None
}

/// Returns the tag that starts exactly at `i`, if any.
fn tag_at(source: &str, i: usize) -> Option<(Token, bool, usize)> {
    const TAGS: &[(&str, Token, bool)] = &[
        ("{{-", Token::BeginExpr, true),
        ("{{", Token::BeginExpr, false),
        ("{%-", Token::BeginBlock, true),
        ("{%", Token::BeginBlock, false),
        ("{#-", Token::BeginComment, true),
        ("{#", Token::BeginComment, false),
        ("-}}", Token::EndExpr, true),
        ("}}", Token::EndExpr, false),
        ("-%}", Token::EndBlock, true),
        ("%}", Token::EndBlock, false),
        ("-#}", Token::EndComment, true),
        ("#}", Token::EndComment, false),
    ];
    let rest = &source[i..];
    TAGS.iter()
        .find(|(tag, ..)| rest.starts_with(tag))
        .map(|(tag, tk, trim)| (*tk, *trim, i + tag.len()))
}

fn is_whitespace(c: char) -> bool {
    matches!(c, '\t' | ' ' | '\r' | '\n')
}

#[cfg(feature = "unicode")]
fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

#[cfg(feature = "unicode")]
fn is_ident(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

#[cfg(not(feature = "unicode"))]
fn is_ident_start(c: char) -> bool {
    matches!(c, 'A'..='Z' | 'a'..='z' | '_')
}

#[cfg(not(feature = "unicode"))]
fn is_ident(c: char) -> bool {
    matches!(c, '0'..='9' | 'A'..='Z' | 'a'..='z' | '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;

    #[test]
    fn lex_empty() {
        let tokens = lex("").unwrap();
        assert_eq!(tokens, []);
    }

    #[test]
    fn lex_raw() {
        let tokens = lex("lorem ipsum").unwrap();
        assert_eq!(tokens, [(Token::Raw, "lorem ipsum")]);
    }

    #[test]
    fn lex_raw_with_braces() {
        let tokens = lex("function() { return {}; }}").unwrap();
        assert_eq!(tokens, [(Token::Raw, "function() { return {}; }}")]);
    }

    #[test]
    fn lex_begin_expr_trim() {
        let tokens = lex("lorem ipsum \t\n{{- x }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "lorem ipsum"),
                (Token::BeginExpr, "{{-"),
                (Token::Whitespace, " "),
                (Token::Ident, "x"),
                (Token::Whitespace, " "),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_begin_expr_eof() {
        let err = lex("lorem ipsum {{ dolor").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.message(), "unclosed begin expression");
        assert_eq!(err.line_col(), Some((1, 13)));
    }

    #[test]
    fn lex_end_expr_trim() {
        let tokens = lex("lorem ipsum {{ -}} \t\ndolor sit amet").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "lorem ipsum "),
                (Token::BeginExpr, "{{"),
                (Token::Whitespace, " "),
                (Token::EndExpr, "-}}"),
                (Token::Raw, "dolor sit amet")
            ]
        );
    }

    #[test]
    fn lex_expr_double_trim() {
        let tokens = lex("lorem {{ -}}  {{- }} dolor").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "lorem "),
                (Token::BeginExpr, "{{"),
                (Token::Whitespace, " "),
                (Token::EndExpr, "-}}"),
                (Token::Raw, ""),
                (Token::BeginExpr, "{{-"),
                (Token::Whitespace, " "),
                (Token::EndExpr, "}}"),
                (Token::Raw, " dolor")
            ]
        );
    }

    #[cfg(feature = "unicode")]
    #[test]
    fn lex_expr_operators() {
        let tokens = lex("{{ (a.b)[0] == !c && d <= 1.5e3 || 'x' != привіт % 2 }}").unwrap();
        let kinds: Vec<_> = tokens
            .into_iter()
            .filter(|(tk, _)| *tk != Token::Whitespace)
            .collect();
        assert_eq!(
            kinds,
            [
                (Token::BeginExpr, "{{"),
                (Token::LParen, "("),
                (Token::Ident, "a"),
                (Token::Dot, "."),
                (Token::Ident, "b"),
                (Token::RParen, ")"),
                (Token::LBracket, "["),
                (Token::Number, "0"),
                (Token::RBracket, "]"),
                (Token::Eq, "=="),
                (Token::Bang, "!"),
                (Token::Ident, "c"),
                (Token::AndAnd, "&&"),
                (Token::Ident, "d"),
                (Token::Le, "<="),
                (Token::Number, "1.5e3"),
                (Token::OrOr, "||"),
                (Token::String, "'x'"),
                (Token::NotEq, "!="),
                (Token::Ident, "привіт"),
                (Token::Percent, "%"),
                (Token::Number, "2"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_expr_member_index() {
        let tokens = lex("{{ a.0.1 + 0.1 }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginExpr, "{{"),
                (Token::Whitespace, " "),
                (Token::Ident, "a"),
                (Token::Dot, "."),
                (Token::Number, "0"),
                (Token::Dot, "."),
                (Token::Number, "1"),
                (Token::Whitespace, " "),
                (Token::Plus, "+"),
                (Token::Whitespace, " "),
                (Token::Number, "0.1"),
                (Token::Whitespace, " "),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_keywords() {
        let tokens = lex("{% if x in y and not z or true %}").unwrap();
        let kinds: Vec<_> = tokens
            .into_iter()
            .filter(|(tk, _)| *tk != Token::Whitespace)
            .collect();
        assert_eq!(
            kinds,
            [
                (Token::BeginBlock, "{%"),
                (Token::Ident, "if"),
                (Token::Ident, "x"),
                (Token::Keyword, "in"),
                (Token::Ident, "y"),
                (Token::Keyword, "and"),
                (Token::Keyword, "not"),
                (Token::Ident, "z"),
                (Token::Keyword, "or"),
                (Token::Keyword, "true"),
                (Token::EndBlock, "%}"),
            ]
        );
    }

    #[test]
    fn lex_string_escapes() {
        let tokens = lex(r#"{{ "a \" b" 'c \' d' }}"#).unwrap();
        assert_eq!(tokens[2], (Token::String, r#""a \" b""#));
        assert_eq!(tokens[4], (Token::String, r#"'c \' d'"#));
    }

    #[test]
    fn lex_err_undelimited_string() {
        let err = lex("{{ \"abc\n\" }}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lex);
        assert_eq!(err.message(), "undelimited string");
    }

    #[test]
    fn lex_err_malformed_number() {
        let err = lex("{{ 1e+ }}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lex);
        assert_eq!(err.message(), "malformed number literal");
    }

    #[test]
    fn lex_err_unexpected_character() {
        let err = lex("{{ a & b }}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lex);
        assert_eq!(err.line_col(), Some((1, 6)));
    }

    #[test]
    fn lex_err_unexpected_end_tag() {
        let err = lex("{{ a %}").unwrap_err();
        assert_eq!(err.message(), "unexpected end block");
    }

    #[test]
    fn lex_err_nested_begin_tag() {
        let err = lex("{% if a {{ b }}").unwrap_err();
        assert_eq!(err.message(), "unclosed begin block");
    }

    #[test]
    fn lex_block_and_expr() {
        let tokens =
            lex("{% if cond %} lorem ipsum {{ path.segment }} dolor sit amet {% endif %}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginBlock, "{%"),
                (Token::Whitespace, " "),
                (Token::Ident, "if"),
                (Token::Whitespace, " "),
                (Token::Ident, "cond"),
                (Token::Whitespace, " "),
                (Token::EndBlock, "%}"),
                (Token::Raw, " lorem ipsum "),
                (Token::BeginExpr, "{{"),
                (Token::Whitespace, " "),
                (Token::Ident, "path"),
                (Token::Dot, "."),
                (Token::Ident, "segment"),
                (Token::Whitespace, " "),
                (Token::EndExpr, "}}"),
                (Token::Raw, " dolor sit amet "),
                (Token::BeginBlock, "{%"),
                (Token::Whitespace, " "),
                (Token::Ident, "endif"),
                (Token::Whitespace, " "),
                (Token::EndBlock, "%}"),
            ]
        );
    }

    #[test]
    fn lex_begin_comment_trim() {
        let tokens = lex("lorem ipsum \t\n{#- x #}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "lorem ipsum"),
                (Token::BeginComment, "{#-"),
                (Token::Raw, " x "),
                (Token::EndComment, "#}"),
            ]
        );
    }

    #[test]
    fn lex_begin_comment_eof() {
        let err = lex("lorem ipsum {# dolor").unwrap_err();
        assert_eq!(err.message(), "unclosed begin comment");
    }

    #[test]
    fn lex_end_comment_trim() {
        let tokens = lex("lorem ipsum {# -#} \t\ndolor sit amet").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "lorem ipsum "),
                (Token::BeginComment, "{#"),
                (Token::Raw, " "),
                (Token::EndComment, "-#}"),
                (Token::Raw, "dolor sit amet"),
            ]
        );
    }

    #[test]
    fn lex_empty_comment() {
        let tokens = lex("lorem ipsum {##}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "lorem ipsum "),
                (Token::BeginComment, "{#"),
                (Token::EndComment, "#}"),
            ]
        );
    }

    #[test]
    fn lex_comment() {
        let tokens = lex("lorem ipsum {# anything goes e.g. - # { {{ #}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "lorem ipsum "),
                (Token::BeginComment, "{#"),
                (Token::Raw, " anything goes e.g. - # { {{ "),
                (Token::EndComment, "#}"),
            ]
        );
    }

    #[track_caller]
    fn lex(source: &str) -> Result<Vec<(Token, &str)>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some((tk, sp)) = lexer.lex()? {
            tokens.push((tk, &source[sp]));
        }
        for _ in 0..3 {
            assert!(lexer.lex().unwrap().is_none());
        }
        Ok(tokens)
    }
}
