use crate::error::ErrorKind;
use crate::value::Map;
use crate::{Error, Result, Value};

/// A single set of name to value bindings.
pub type Frame = Map<String, Value>;

/// A chain of variable frames.
///
/// The root frame holds the render globals. Control constructs like `for`
/// loops and includes push a frame when they start and pop it when they
/// finish. Lookups start at the innermost frame and delegate outward.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Scope {
    frames: Vec<Frame>,
}

impl Scope {
    pub fn new(globals: Frame) -> Self {
        Self {
            frames: vec![globals],
        }
    }

    /// Returns the value bound to `name` in the nearest frame.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Like [`get`][Scope::get] but fails when the name is not bound.
    pub fn lookup(&self, name: &str) -> Result<&Value> {
        self.get(name).ok_or_else(|| {
            Error::new(ErrorKind::UndefinedName, format!("undefined name `{name}`"))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Rebinds `name` in the nearest frame that owns it, or binds it in the
    /// innermost frame if no frame does.
    pub fn assign(&mut self, name: &str, value: Value) {
        let frame = match self.frames.iter().rposition(|f| f.contains_key(name)) {
            Some(i) => &mut self.frames[i],
            None => self.innermost(),
        };
        frame.insert(name.to_owned(), value);
    }

    /// Binds `name` in the innermost frame, shadowing any outer binding.
    pub fn assign_local(&mut self, name: &str, value: Value) {
        self.innermost().insert(name.to_owned(), value);
    }

    /// Flattens all frames into a single map, inner bindings overriding
    /// outer ones.
    pub fn collect(&self) -> Frame {
        let mut locals = Frame::new();
        for frame in &self.frames {
            locals.extend(frame.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        locals
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pops the innermost frame. The root frame is never popped.
    pub fn pop_frame(&mut self) -> Option<Frame> {
        match self.frames.len() {
            0 | 1 => None,
            _ => self.frames.pop(),
        }
    }

    fn innermost(&mut self) -> &mut Frame {
        if self.frames.is_empty() {
            self.frames.push(Frame::new());
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        let mut globals = Frame::new();
        globals.insert("a".into(), Value::Integer(1));
        globals.insert("b".into(), Value::Integer(2));
        Scope::new(globals)
    }

    #[test]
    fn scope_delegates_outward() {
        let mut scope = scope();
        scope.push_frame(Frame::new());
        assert_eq!(scope.get("a"), Some(&Value::Integer(1)));
        assert_eq!(scope.get("c"), None);
    }

    #[test]
    fn scope_lookup_undefined() {
        let scope = scope();
        let err = scope.lookup("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedName);
        assert_eq!(err.to_string(), "undefined name `nope`");
    }

    #[test]
    fn scope_local_shadows_and_pops() {
        let mut scope = scope();
        scope.push_frame(Frame::new());
        scope.assign_local("a", Value::from("inner"));
        assert_eq!(scope.get("a"), Some(&Value::from("inner")));
        scope.pop_frame();
        assert_eq!(scope.get("a"), Some(&Value::Integer(1)));
    }

    #[test]
    fn scope_assign_rebinds_owner() {
        let mut scope = scope();
        scope.push_frame(Frame::new());
        scope.assign("a", Value::Integer(10));
        scope.assign("c", Value::Integer(3));
        scope.pop_frame();
        assert_eq!(scope.get("a"), Some(&Value::Integer(10)));
        assert_eq!(scope.get("c"), None);
    }

    #[test]
    fn scope_collect_inner_overrides() {
        let mut scope = scope();
        let mut frame = Frame::new();
        frame.insert("b".into(), Value::from("x"));
        scope.push_frame(frame);
        let locals = scope.collect();
        assert_eq!(locals.len(), 2);
        assert_eq!(locals["a"], Value::Integer(1));
        assert_eq!(locals["b"], Value::from("x"));
    }

    #[test]
    fn scope_root_is_never_popped() {
        let mut scope = scope();
        assert!(scope.pop_frame().is_none());
        assert!(scope.contains("a"));
    }
}
