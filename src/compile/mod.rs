//! Compile a template source into a document that can be rendered.
//!
//! This process has two stages:
//! - The lexer chunks the template source into tokens.
//! - The parser constructs the node tree, linking tag chains and parsing the
//!   embedded expressions into terms.

mod expr;
mod lex;
mod parse;

use crate::types::ast::Document;
use crate::Result;

/// Compile a template source into a document.
pub fn document(name: Option<String>, source: String) -> Result<Document> {
    let nodes = match parse::Parser::new(&source).parse_document() {
        Ok(nodes) => nodes,
        Err(err) => return Err(err.with_template_name(name.as_deref())),
    };
    log::trace!(
        "parsed {} top level nodes from {}",
        nodes.len(),
        name.as_deref().unwrap_or("<anonymous>")
    );
    Ok(Document {
        name,
        source,
        nodes,
    })
}
