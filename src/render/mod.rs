mod core;
mod eval;
mod scope;

use std::io;

use crate::error::ErrorKind;
use crate::fmt::Writer;
use crate::render::core::RendererImpl;
pub(crate) use crate::render::core::normalize_path;
pub use crate::render::scope::{Frame, Scope};
use crate::types::ast::Document;
use crate::{Engine, Error, Result, Value};

/// Renders a document to a string.
pub(crate) fn to_string(engine: &Engine, doc: &Document, globals: Value) -> Result<String> {
    let mut s = String::with_capacity(doc.source.len());
    renderer(engine, globals)?.render(&mut s, doc)?;
    Ok(s)
}

/// Renders a document to an [`io::Write`].
///
/// Output written before a failure is not rolled back.
pub(crate) fn to_writer<W>(engine: &Engine, doc: &Document, writer: W, globals: Value) -> Result<()>
where
    W: io::Write,
{
    let mut w = Writer::new(writer);
    renderer(engine, globals)?
        .render(&mut w, doc)
        .map_err(|err| w.take_err().map(Error::from).unwrap_or(err))?;
    w.flush()?;
    Ok(())
}

fn renderer(engine: &Engine, globals: Value) -> Result<RendererImpl<'_>> {
    let frame = match globals {
        Value::Map(map) => map,
        Value::None => Frame::new(),
        value => {
            return Err(Error::new(
                ErrorKind::Render,
                format!(
                    "expected map for render context, found {}",
                    value.human()
                ),
            ))
        }
    };
    log::trace!("rendering with {} globals", frame.len());
    Ok(RendererImpl {
        engine,
        scope: Scope::new(frame),
        depth: 0,
    })
}
