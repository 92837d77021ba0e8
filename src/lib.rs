//! A template engine with a small expression language.
//!
//! # Features
//!
//! ### Syntax
//!
//! - Expressions: `{{ user.name }}`, `{{ price * 1.2 }}`, `{{ items[1:-1] }}`
//! - Conditionals: `{% if a %} ... {% elif b %} ... {% else %} ... {% endif %}`
//! - Loops: `{% for k, v in pairs %} ... {% else %} ... {% endfor %}`
//! - Assignments: `{% set total = total + 1 %}`, `{% let name = "x" %}`
//! - File-relative includes: `{% include "../nav.html" with active = "home" %}`
//! - Raw text: `{% text "license.txt" %}`
//! - Comments and whitespace trimming: `{#- ignored -#}`
//!
//! ### Engine
//!
//! - Dynamically typed values with integer and float arithmetic
//! - Short circuiting `and` and `or` that return the deciding operand
//! - Named functions: `{{ upper(user.name) }}`
//! - HTML escaping of output unless a value is marked safe
//! - Render to a [`String`] or any [`std::io::Write`] implementor
//! - Render using any [`serde`] serializable values
//! - Errors that point at the offending source
//!
//! # Getting started
//!
//! Your entry point is the [`Engine`] struct. The engine stores the
//! functions, compiled templates and raw texts. Generally, you only need to
//! construct one engine during the lifetime of a program.
//!
//! ```
//! let engine = tessera::Engine::new();
//! ```
//!
//! Next, [`.add_template`][Engine::add_template] is used to compile and store a
//! template in the engine.
//!
//! ```
//! # let mut engine = tessera::Engine::new();
//! engine.add_template("hello.html", "Hello {{ user.name }}!")?;
//! # Ok::<(), tessera::Error>(())
//! ```
//!
//! Finally, the template is rendered by fetching it using
//! [`.get_template`][Engine::get_template] and calling
//! [`.render`][TemplateRef::render].
//!
//! ```
//! # use serde_json::json;
//! # let mut engine = tessera::Engine::new();
//! # engine.add_template("hello.html", "Hello {{ user.name }}!")?;
//! let template = engine.get_template("hello.html").unwrap();
//! let result = template.render(json!({ "user": { "name": "John Smith" } }))?;
//! assert_eq!(result, "Hello John Smith!");
//! # Ok::<(), tessera::Error>(())
//! ```
//!
//! If you don't need to store the compiled template then you can also use the
//! [`.compile`][Engine::compile] function to return the template directly.
//!
//! ```
//! # use serde_json::json;
//! # let engine = tessera::Engine::new();
//! let template = engine.compile("{{ a }} + {{ b }} = {{ a + b }}")?;
//! let result = template.render(json!({ "a": 1, "b": 2.5 }))?;
//! assert_eq!(result, "1 + 2.5 = 3.5");
//! # Ok::<(), tessera::Error>(())
//! ```
//!
//! # Examples
//!
//! ### Render using structured data
//!
//! ```
//! #[derive(serde::Serialize)]
//! struct Context { users: Vec<User> }
//!
//! #[derive(serde::Serialize)]
//! struct User { name: String }
//!
//! let ctx = Context {
//!     users: vec![User { name: "Ann".into() }, User { name: "Bob".into() }],
//! };
//!
//! let result = tessera::Engine::new()
//!     .compile("{% for u in users %}{{ u.name }}{% if not loop.last %}, {% endif %}{% endfor %}")?
//!     .render(&ctx)?;
//!
//! assert_eq!(result, "Ann, Bob");
//! # Ok::<(), tessera::Error>(())
//! ```
//!
//! ### Include templates relative to each other
//!
//! Paths in `include` and `text` tags are resolved against the directory of
//! the template that contains them. A leading `/` resolves from the root.
//!
//! ```
//! let mut engine = tessera::Engine::new();
//! engine.add_template("pages/index.html", "{% include \"nav.html\" with page = \"home\" %}")?;
//! engine.add_template("pages/nav.html", "<nav>{{ page }}</nav>")?;
//!
//! let result = engine.get_template("pages/index.html").unwrap().render(())?;
//! assert_eq!(result, "<nav>home</nav>");
//! # Ok::<(), tessera::Error>(())
//! ```
//!
//! ### Render a template to an `impl io::Write`
//!
//! ```
//! use std::io;
//!
//! let stdout = io::BufWriter::new(io::stdout());
//!
//! tessera::Engine::new()
//!     .compile("Hello {{ name }}")?
//!     .render_to_writer(stdout, serde_json::json!({ "name": "John Smith" }))?;
//! # Ok::<(), tessera::Error>(())
//! ```

mod compile;
mod error;
mod fmt;
pub mod functions;
mod render;
mod types;
mod value;

use std::collections::BTreeMap;
use std::fmt as std_fmt;
use std::io;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::functions::Args;
pub use crate::render::{Frame, Scope};
pub use crate::value::{to_value, List, Map, Value};

use crate::functions::FunctionFn;
use crate::types::ast::Document;

/// The compilation and rendering engine.
///
/// An engine is `Send + Sync` and can be shared between threads once all
/// templates have been added. Each render owns its own scope chain.
pub struct Engine {
    pub(crate) functions: BTreeMap<String, Box<FunctionFn>>,
    pub(crate) templates: BTreeMap<String, Document>,
    pub(crate) texts: BTreeMap<String, String>,
    pub(crate) max_include_depth: usize,
    pub(crate) auto_escape: bool,
}

/// A compiled template.
pub struct Template<'engine> {
    engine: &'engine Engine,
    doc: Document,
}

/// A reference to a compiled template in an [`Engine`].
#[derive(Clone, Copy)]
pub struct TemplateRef<'engine> {
    engine: &'engine Engine,
    doc: &'engine Document,
}

impl Default for Engine {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Construct a new engine.
    ///
    /// With the `builtins` feature enabled the builtin functions are
    /// registered.
    #[inline]
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut engine = Self::empty();
        #[cfg(feature = "builtins")]
        functions::builtins::register(&mut engine);
        engine
    }

    /// Construct a new engine without any functions.
    #[inline]
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
            templates: BTreeMap::new(),
            texts: BTreeMap::new(),
            max_include_depth: 64,
            auto_escape: true,
        }
    }

    /// Set the maximum number of nested includes.
    ///
    /// Rendering fails once the depth is exceeded, which stops templates
    /// that include themselves. Defaults to 64.
    #[inline]
    pub fn set_max_include_depth(&mut self, depth: usize) {
        self.max_include_depth = depth;
    }

    /// Set whether echoed values are HTML escaped. Defaults to `true`.
    ///
    /// [`Value::Safe`] strings are never escaped.
    #[inline]
    pub fn set_auto_escape(&mut self, yes: bool) {
        self.auto_escape = yes;
    }

    /// Add a new function to the engine, replacing any function with the
    /// same name.
    ///
    /// See the [`functions`] module for more information.
    #[inline]
    pub fn add_function<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Args<'_>) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Box::new(f));
    }

    /// Remove a function from the engine.
    #[inline]
    pub fn remove_function(&mut self, name: &str) {
        self.functions.remove(name);
    }

    /// Add a template to the engine.
    ///
    /// The template will be compiled and stored under the given path-like
    /// name. `include` and `text` tags inside it are resolved relative to
    /// the directory of this name.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<()> {
        let name = render::normalize_path(&name.into());
        let doc = compile::document(Some(name.clone()), source.into())?;
        log::debug!("added template `{name}`");
        self.templates.insert(name, doc);
        Ok(())
    }

    /// Add raw text to the engine that can be written using a `text` tag.
    pub fn add_text(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = render::normalize_path(&name.into());
        log::debug!("added text `{name}`");
        self.texts.insert(name, text.into());
    }

    /// Remove a template from the engine.
    #[inline]
    pub fn remove_template(&mut self, name: &str) {
        self.templates.remove(&render::normalize_path(name));
    }

    /// Lookup a template by name.
    #[inline]
    pub fn get_template(&self, name: &str) -> Option<TemplateRef<'_>> {
        self.templates
            .get(&render::normalize_path(name))
            .map(|doc| TemplateRef { engine: self, doc })
    }

    /// Compile a template.
    ///
    /// The template will not be stored in the engine. Includes are resolved
    /// from the root of the template store.
    #[inline]
    pub fn compile(&self, source: &str) -> Result<Template<'_>> {
        let doc = compile::document(None, source.to_owned())?;
        Ok(Template { engine: self, doc })
    }
}

impl std_fmt::Debug for Engine {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        f.debug_struct("Engine")
            .field("functions", &self.functions.keys())
            .field("templates", &self.templates.keys())
            .field("texts", &self.texts.keys())
            .field("max_include_depth", &self.max_include_depth)
            .field("auto_escape", &self.auto_escape)
            .finish()
    }
}

impl<'engine> Template<'engine> {
    /// Render the template to a string using the provided value.
    ///
    /// The value must serialize to a map or to nothing.
    #[inline]
    pub fn render<S>(&self, ctx: S) -> Result<String>
    where
        S: serde::Serialize,
    {
        render::to_string(self.engine, &self.doc, to_value(ctx)?)
    }

    /// Render the template to a string using a [`Value`].
    #[inline]
    pub fn render_from(&self, ctx: &Value) -> Result<String> {
        render::to_string(self.engine, &self.doc, ctx.clone())
    }

    /// Render the template to a writer using the provided value.
    #[inline]
    pub fn render_to_writer<W, S>(&self, writer: W, ctx: S) -> Result<()>
    where
        W: io::Write,
        S: serde::Serialize,
    {
        render::to_writer(self.engine, &self.doc, writer, to_value(ctx)?)
    }

    /// Returns the original template source.
    #[inline]
    pub fn source(&self) -> &str {
        &self.doc.source
    }
}

impl std_fmt::Debug for Template<'_> {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        f.debug_struct("Template")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl<'engine> TemplateRef<'engine> {
    /// Render the template to a string using the provided value.
    ///
    /// The value must serialize to a map or to nothing.
    #[inline]
    pub fn render<S>(&self, ctx: S) -> Result<String>
    where
        S: serde::Serialize,
    {
        render::to_string(self.engine, self.doc, to_value(ctx)?)
    }

    /// Render the template to a string using a [`Value`].
    #[inline]
    pub fn render_from(&self, ctx: &Value) -> Result<String> {
        render::to_string(self.engine, self.doc, ctx.clone())
    }

    /// Render the template to a writer using the provided value.
    #[inline]
    pub fn render_to_writer<W, S>(&self, writer: W, ctx: S) -> Result<()>
    where
        W: io::Write,
        S: serde::Serialize,
    {
        render::to_writer(self.engine, self.doc, writer, to_value(ctx)?)
    }

    /// Returns the original template source.
    #[inline]
    pub fn source(&self) -> &'engine str {
        &self.doc.source
    }

    /// Returns the name the template was stored under.
    #[inline]
    pub fn name(&self) -> &'engine str {
        self.doc.name.as_deref().unwrap_or_default()
    }
}

impl std_fmt::Debug for TemplateRef<'_> {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        f.debug_struct("TemplateRef")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
