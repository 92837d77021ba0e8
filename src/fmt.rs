//! Output adapters and the textual forms of values.

use std::fmt;
use std::io;

/// Adapts an [`io::Write`] so that the renderer can treat every output as a
/// [`fmt::Write`].
///
/// The formatting machinery can only report [`fmt::Error`], so the original
/// I/O error is stashed and must be retrieved with
/// [`.take_err()`][Writer::take_err] after a failed write.
pub(crate) struct Writer<W> {
    writer: W,
    err: Option<io::Error>,
}

impl<W> Writer<W>
where
    W: io::Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer, err: None }
    }

    pub fn take_err(&mut self) -> Option<io::Error> {
        self.err.take()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl<W> fmt::Write for Writer<W>
where
    W: io::Write,
{
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.writer.write_all(s.as_bytes()).map_err(|e| {
            self.err = Some(e);
            fmt::Error
        })
    }
}

/// Writes `s` replacing `&`, `<` and `>` with HTML entities.
pub(crate) fn escape_html<W>(f: &mut W, s: &str) -> fmt::Result
where
    W: fmt::Write + ?Sized,
{
    let mut last = 0;
    for (i, c) in s.char_indices() {
        let entity = match c {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            _ => continue,
        };
        f.write_str(&s[last..i])?;
        f.write_str(entity)?;
        last = i + 1;
    }
    f.write_str(&s[last..])
}

/// Writes a float so that integral values keep a fractional digit, e.g.
/// `3.0` rather than `3`.
pub(crate) fn write_float<W>(f: &mut W, n: f64) -> fmt::Result
where
    W: fmt::Write + ?Sized,
{
    if n.is_finite() && n.fract() == 0.0 {
        write!(f, "{n:.1}")
    } else {
        write!(f, "{n}")
    }
}

/// Writes `s` as a double quoted string literal.
pub(crate) fn write_quoted<W>(f: &mut W, s: &str) -> fmt::Result
where
    W: fmt::Write + ?Sized,
{
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
