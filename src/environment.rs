use crate::value::Object;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope. Closures hold one of these, so a scope lives as
/// long as any function that captured it.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Rc<Object>>,
    outer: Option<Env>,
}

impl Environment {
    pub fn new() -> Env {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn new_enclosed(outer: Env) -> Env {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            outer: Some(outer),
        }))
    }

    pub fn get(&self, name: &str) -> Option<Rc<Object>> {
        if let Some(value) = self.values.get(name) {
            Some(Rc::clone(value))
        } else if let Some(ref outer) = self.outer {
            outer.borrow().get(name)
        } else {
            None
        }
    }

    /// Binds in this scope only; an outer binding of the same name is
    /// shadowed, never overwritten.
    pub fn set(&mut self, name: impl Into<String>, value: Rc<Object>) {
        self.values.insert(name.into(), value);
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}
