use std::cmp::max;
use std::fmt;
use std::io;

use crate::types::span::Span;

/// A convenient type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur during template compilation or rendering.
///
/// The first error encountered aborts the whole operation. Use
/// [`.kind()`][Error::kind] and [`.line_col()`][Error::line_col] to inspect
/// it programmatically. The alternate display form (`{:#}`) renders the
/// offending source line with an underline.
#[derive(Clone)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
    pretty: Option<(String, Span)>,
    name: Option<String>,
}

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Invalid character, string or number literal in a tag.
    Lex,
    /// Invalid template or expression syntax.
    Syntax,
    /// A variable was not bound in any scope frame.
    UndefinedName,
    /// An operation was applied to a value of the wrong type.
    Type,
    /// A `for` loop was given a value that cannot be iterated.
    NotIterable,
    /// A map was indexed with a key it does not contain.
    KeyNotFound,
    /// A list or string was indexed outside of its bounds.
    IndexOutOfRange,
    /// A function was unknown or returned an error.
    Call,
    /// A missing template or text, or the include depth was exceeded.
    Render,
    /// The writer failed.
    Io,
    /// The render context could not be converted to a value.
    Serialize,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            pretty: None,
            name: None,
        }
    }

    pub(crate) fn at(
        kind: ErrorKind,
        msg: impl Into<String>,
        source: &str,
        span: impl Into<Span>,
    ) -> Self {
        Self::new(kind, msg).enrich(source, span)
    }

    pub(crate) fn syntax(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::at(ErrorKind::Syntax, msg, source, span)
    }

    pub(crate) fn lex(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::at(ErrorKind::Lex, msg, source, span)
    }

    pub(crate) fn max_include_depth(max: usize) -> Self {
        Self::new(
            ErrorKind::Render,
            format!("reached maximum include depth ({max})"),
        )
    }

    /// Attaches the source location unless the error already has one.
    ///
    /// Errors bubble up through nested terms so the innermost, most specific
    /// location wins.
    pub(crate) fn enrich(mut self, source: &str, span: impl Into<Span>) -> Self {
        if self.pretty.is_none() {
            self.pretty = Some((source.to_owned(), span.into()));
        }
        self
    }

    /// Attaches the template name unless the error already has one.
    pub(crate) fn with_template_name(mut self, name: Option<&str>) -> Self {
        if self.name.is_none() {
            self.name = name.map(ToOwned::to_owned);
        }
        self
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message without any location information.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the name of the template the error occurred in, if known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the 1-based line and column (in characters) of the error, if
    /// the error has a location.
    pub fn line_col(&self) -> Option<(usize, usize)> {
        let (source, span) = self.pretty.as_ref()?;
        let before = source.get(..span.m).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        Some((line, col))
    }
}

impl std::error::Error for Error {}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pretty {
            Some((source, span)) => {
                fmt_pretty(&self.msg, self.name.as_deref(), source, *span, f)
            }
            None => write!(f, "{:?}: {}", self.kind, self.msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.pretty, self.line_col()) {
            (Some((source, span)), _) if f.alternate() => {
                fmt_pretty(&self.msg, self.name.as_deref(), source, *span, f)
            }
            (_, Some((line, col))) => match &self.name {
                Some(name) => write!(f, "{} at {name}:{line}:{col}", self.msg),
                None => write!(f, "{} at {line}:{col}", self.msg),
            },
            (_, None) => match &self.name {
                Some(name) => write!(f, "{} in {name}", self.msg),
                None => write!(f, "{}", self.msg),
            },
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::new(ErrorKind::Io, format!("io error: {err}"))
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::new(ErrorKind::Serialize, msg.to_string())
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Self::new(ErrorKind::Render, "format error")
    }
}

fn fmt_pretty(
    msg: &str,
    name: Option<&str>,
    source: &str,
    span: Span,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let lines: Vec<_> = source.split_terminator('\n').collect();
    let (line, col) = to_line_col(&lines, span.m);
    let width = max(1, str_width(source.get(span.m..span.n).unwrap_or("")));
    let code = lines.get(line).or_else(|| lines.last()).copied().unwrap_or("");

    let num = (line + 1).to_string();
    let pad = str_width(&num);
    let pipe = "|";
    let underline = "^".repeat(width);

    if let Some(name) = name {
        write!(f, "\n{0:pad$}--> {name}:{1}:{2}", "", line + 1, col + 1)?;
    }

    write!(
        f,
        "\n \
        {0:pad$} {pipe}\n \
        {num:>} {pipe} {code}\n \
        {0:pad$} {pipe} {underline:>width$} {msg}\n",
        "",
        pad = pad,
        pipe = pipe,
        num = num,
        code = code,
        underline = underline,
        width = col + width,
        msg = msg
    )
}

/// Returns the 0-based line index and display column of a byte offset.
fn to_line_col(lines: &[&str], offset: usize) -> (usize, usize) {
    let mut n = 0;
    for (i, line) in lines.iter().enumerate() {
        let len = line.len() + 1;
        if n + len > offset {
            let col = line.get(..offset - n).map_or(0, str_width);
            return (i, col);
        }
        n += len;
    }
    (
        lines.len().saturating_sub(1),
        lines.last().map_or(0, |l| str_width(l)),
    )
}

#[cfg(feature = "unicode")]
fn str_width(s: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(s)
}

#[cfg(not(feature = "unicode"))]
fn str_width(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_line_col() {
        let err = Error::syntax("oops", "lorem\nipsum {{ x", 12..14);
        assert_eq!(err.line_col(), Some((2, 7)));
        assert_eq!(err.to_string(), "oops at 2:7");
    }

    #[test]
    fn error_without_location() {
        let err = Error::new(ErrorKind::Render, "unknown template `a`");
        assert_eq!(err.line_col(), None);
        assert_eq!(err.to_string(), "unknown template `a`");
    }

    #[test]
    fn error_with_template_name() {
        let err = Error::syntax("oops", "{{ x", 0..2).with_template_name(Some("a/b"));
        assert_eq!(err.name(), Some("a/b"));
        assert_eq!(err.to_string(), "oops at a/b:1:1");
        let err = err.with_template_name(Some("c"));
        assert_eq!(err.name(), Some("a/b"));
    }

    #[test]
    fn error_enrich_keeps_innermost() {
        let err = Error::at(ErrorKind::Type, "bad", "{{ a + b }}", 7..8).enrich("{{ a + b }}", 3..8);
        assert_eq!(err.line_col(), Some((1, 8)));
    }

    #[test]
    fn error_pretty() {
        let err = Error::syntax("unexpected character", "lorem {{ @ }}", 9..10);
        assert_eq!(
            format!("{err:#}"),
            "
   |
 1 | lorem {{ @ }}
   |          ^ unexpected character
"
        );
    }

    #[test]
    fn error_pretty_empty_source() {
        let err = Error::syntax("expected expression, found EOF", "", 0..0);
        assert_eq!(
            format!("{err:#}"),
            "
   |
 1 | \n   | ^ expected expression, found EOF
"
        );
    }
}
