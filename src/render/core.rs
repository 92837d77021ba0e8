use std::fmt;

use crate::error::ErrorKind;
use crate::render::eval::Env;
use crate::render::scope::Frame;
use crate::render::Scope;
use crate::types::ast::{Document, Include, LoopVars, Node, Str, Tag, TagKind, Term};
use crate::value::{ops, Map};
use crate::{Engine, Error, Result, Value};

/// Walks the node tree of a document writing the output.
#[cfg_attr(internal_debug, derive(Debug))]
pub(crate) struct RendererImpl<'render> {
    pub engine: &'render Engine,
    pub scope: Scope,
    pub depth: usize,
}

impl<'render> RendererImpl<'render> {
    pub(crate) fn render(&mut self, f: &mut dyn fmt::Write, doc: &Document) -> Result<()> {
        self.render_nodes(f, doc, &doc.nodes)
            .map_err(|err| err.with_template_name(doc.name.as_deref()))
    }

    fn render_nodes(&mut self, f: &mut dyn fmt::Write, doc: &Document, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(span) => f.write_str(&doc.source.as_str()[*span])?,
                Node::Echo(echo) => {
                    let value = self.eval(doc, &echo.term)?;
                    match self.engine.auto_escape {
                        true => value.write_escaped(f)?,
                        false => write!(f, "{value}")?,
                    }
                }
                Node::Tag(tag) => self.render_tag(f, doc, tag)?,
            }
        }
        Ok(())
    }

    fn render_tag(&mut self, f: &mut dyn fmt::Write, doc: &Document, tag: &Tag) -> Result<()> {
        match &tag.kind {
            TagKind::If(_) => self.render_if(f, doc, tag),
            TagKind::For(vars, iterable) => self.render_for(f, doc, tag, vars, iterable),
            TagKind::Set(name, term) => {
                let value = self.eval(doc, term)?;
                self.scope.assign(&name.name, value);
                Ok(())
            }
            TagKind::Let(name, term) => {
                let value = self.eval(doc, term)?;
                self.scope.assign_local(&name.name, value);
                Ok(())
            }
            TagKind::Include(include) => self.render_include(f, doc, include),
            TagKind::Text(path) => self.render_text(f, doc, path),
            // the parser only places chain heads in a body
            TagKind::Elif(_) | TagKind::Else | TagKind::EndIf | TagKind::EndFor => Ok(()),
        }
    }

    /// Renders the first branch of an `if` chain whose condition is true.
    fn render_if(&mut self, f: &mut dyn fmt::Write, doc: &Document, head: &Tag) -> Result<()> {
        let mut link = Some(head);
        while let Some(tag) = link {
            match &tag.kind {
                TagKind::If(cond) | TagKind::Elif(cond) => {
                    if self.eval(doc, cond)?.is_true() {
                        return self.render_branch(f, doc, &tag.body);
                    }
                }
                TagKind::Else => return self.render_branch(f, doc, &tag.body),
                _ => break,
            }
            link = tag.next.as_deref();
        }
        Ok(())
    }

    /// Renders the body of a taken branch in its own frame.
    fn render_branch(&mut self, f: &mut dyn fmt::Write, doc: &Document, body: &[Node]) -> Result<()> {
        self.scope.push_frame(Frame::new());
        let result = self.render_nodes(f, doc, body);
        self.scope.pop_frame();
        result
    }

    fn render_for(
        &mut self,
        f: &mut dyn fmt::Write,
        doc: &Document,
        head: &Tag,
        vars: &LoopVars,
        iterable: &Term,
    ) -> Result<()> {
        let value = self.eval(doc, iterable)?;
        let items =
            ops::iterate(value).map_err(|err| err.enrich(&doc.source, iterable.span()))?;

        if items.is_empty() {
            if let Some(alt) = head.next.as_deref() {
                if let TagKind::Else = alt.kind {
                    return self.render_branch(f, doc, &alt.body);
                }
            }
            return Ok(());
        }

        let length = items.len();
        for (i, item) in items.into_iter().enumerate() {
            let mut frame = Frame::new();
            bind_loop_vars(&mut frame, doc, vars, item)?;
            frame.insert("loop".into(), loop_info(i, length));
            self.scope.push_frame(frame);
            let result = self.render_nodes(f, doc, &head.body);
            self.scope.pop_frame();
            result?;
        }
        Ok(())
    }

    fn render_include(
        &mut self,
        f: &mut dyn fmt::Write,
        doc: &Document,
        include: &Include,
    ) -> Result<()> {
        let engine = self.engine;
        let path = resolve_path(doc.name.as_deref(), &include.path.value);
        let Some(target) = engine.templates.get(&path) else {
            return Err(Error::at(
                ErrorKind::Render,
                format!("unknown template `{path}`"),
                &doc.source,
                include.path.span,
            ));
        };

        let max = engine.max_include_depth;
        if self.depth >= max {
            return Err(Error::max_include_depth(max).enrich(&doc.source, include.path.span));
        }

        let mut frame = Frame::new();
        for (name, term) in &include.with {
            let value = self.eval(doc, term)?;
            frame.insert(name.name.clone(), value);
        }

        log::debug!(
            "including `{path}` from `{}`",
            doc.name.as_deref().unwrap_or("<anonymous>")
        );

        self.scope.push_frame(frame);
        self.depth += 1;
        let result = self.render(f, target);
        self.depth -= 1;
        self.scope.pop_frame();
        result
    }

    fn render_text(&mut self, f: &mut dyn fmt::Write, doc: &Document, path: &Str) -> Result<()> {
        let resolved = resolve_path(doc.name.as_deref(), &path.value);
        let text = match self.engine.texts.get(&resolved) {
            Some(text) => text.as_str(),
            None => match self.engine.templates.get(&resolved) {
                Some(template) => template.source.as_str(),
                None => {
                    return Err(Error::at(
                        ErrorKind::Render,
                        format!("unknown text `{resolved}`"),
                        &doc.source,
                        path.span,
                    ))
                }
            },
        };
        log::trace!("writing text `{resolved}`");
        f.write_str(text)?;
        Ok(())
    }

    fn eval(&self, doc: &Document, term: &Term) -> Result<Value> {
        let env = Env {
            engine: self.engine,
            source: &doc.source,
            scope: &self.scope,
        };
        term.evaluate(&env)
    }
}

fn bind_loop_vars(frame: &mut Frame, doc: &Document, vars: &LoopVars, item: Value) -> Result<()> {
    match vars {
        LoopVars::Item(name) => {
            frame.insert(name.name.clone(), item);
        }
        LoopVars::Unpack(names, span) => {
            let values = match item {
                Value::List(values) if values.len() == names.len() => values,
                Value::List(values) => {
                    return Err(Error::at(
                        ErrorKind::Type,
                        format!(
                            "cannot unpack list of length {} into {} variables",
                            values.len(),
                            names.len()
                        ),
                        &doc.source,
                        *span,
                    ))
                }
                item => {
                    return Err(Error::at(
                        ErrorKind::Type,
                        format!("cannot unpack {}, expected list", item.human()),
                        &doc.source,
                        *span,
                    ))
                }
            };
            for (name, value) in names.iter().zip(values) {
                frame.insert(name.name.clone(), value);
            }
        }
    }
    Ok(())
}

fn loop_info(index: usize, length: usize) -> Value {
    let mut map = Map::new();
    map.insert("index".into(), Value::from(index));
    map.insert("first".into(), Value::Bool(index == 0));
    map.insert("last".into(), Value::Bool(index + 1 == length));
    map.insert("length".into(), Value::from(length));
    Value::Map(map)
}

/// Resolves a template path relative to the directory of the current
/// template.
///
/// Paths starting with `/` are relative to the root of the store.
pub(crate) fn resolve_path(current: Option<&str>, path: &str) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        return normalize_path(absolute);
    }
    match current.and_then(|c| c.rfind('/').map(|i| &c[..i])) {
        Some(dir) => normalize_path(&format!("{dir}/{path}")),
        None => normalize_path(path),
    }
}

/// Removes empty and `.` segments and applies `..` segments.
pub(crate) fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
