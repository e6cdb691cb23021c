use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

use crate::value::Value;

/// One scope level: its bindings plus a link to the enclosing scope.
#[derive(Debug)]
struct Scope {
    values: RefCell<IndexMap<String, Value>>,
    parent: Option<Environment>,
}

/// A handle to a scope in the environment chain. Cloning the handle shares
/// the scope, which is how closures keep captured variables alive and
/// mutable after the defining block has exited.
#[derive(Debug, Clone)]
pub struct Environment {
    scope: Rc<Scope>,
}

impl Environment {
    /// The root scope. There is exactly one of these per interpreter.
    pub fn global() -> Self {
        Self {
            scope: Rc::new(Scope {
                values: RefCell::new(IndexMap::new()),
                parent: None,
            }),
        }
    }

    /// A fresh scope chained under `self`.
    pub fn child(&self) -> Self {
        Self {
            scope: Rc::new(Scope {
                values: RefCell::new(IndexMap::new()),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Creates or overwrites a binding in this scope.
    pub fn define(&self, name: String, value: Value) {
        self.scope.values.borrow_mut().insert(name, value);
    }

    /// Dynamic lookup: walks the chain from this scope outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.scope.values.borrow().get(name) {
            return Some(value.clone());
        }
        self.scope.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Resolved lookup: jumps `distance` scopes up, then searches from there.
    pub fn get_at(&self, distance: usize, name: &str) -> Option<Value> {
        self.ancestor(distance).get(name)
    }

    /// Dynamic write: updates the nearest scope that already binds `name`,
    /// or defines it in this scope when no enclosing scope does.
    pub fn assign(&self, name: &str, value: Value) {
        if !self.strict_assign(name, value.clone()) {
            self.define(name.to_string(), value);
        }
    }

    pub fn assign_at(&self, distance: usize, name: &str, value: Value) {
        self.ancestor(distance).define(name.to_string(), value);
    }

    /// Strict write: only updates an existing binding somewhere on the
    /// chain. Returns false when the name is bound nowhere.
    pub fn strict_assign(&self, name: &str, value: Value) -> bool {
        {
            let mut values = self.scope.values.borrow_mut();
            if let Some(slot) = values.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        match &self.scope.parent {
            Some(parent) => parent.strict_assign(name, value),
            None => false,
        }
    }

    pub fn strict_assign_at(&self, distance: usize, name: &str, value: Value) -> bool {
        self.ancestor(distance).strict_assign(name, value)
    }

    fn ancestor(&self, distance: usize) -> Environment {
        let mut current = self.clone();
        for _ in 0..distance {
            let parent = current
                .scope
                .parent
                .as_ref()
                .cloned()
                // A missing ancestor means the resolver recorded a bad
                // distance; continuing would read the wrong variable.
                .unwrap_or_else(|| panic!("scope distance {} exceeds environment depth", distance));
            current = parent;
        }
        current
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::global()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_get() {
        let env = Environment::global();
        env.define("x".to_string(), Value::Number(42.0));
        assert_eq!(env.get("x"), Some(Value::Number(42.0)));
    }

    #[test]
    fn get_walks_the_chain() {
        let global = Environment::global();
        global.define("x".to_string(), Value::Number(1.0));
        let inner = global.child().child();
        assert_eq!(inner.get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn shadowing_in_child_scope() {
        let global = Environment::global();
        global.define("x".to_string(), Value::Number(1.0));
        let inner = global.child();
        inner.define("x".to_string(), Value::Number(2.0));
        assert_eq!(inner.get("x"), Some(Value::Number(2.0)));
        assert_eq!(global.get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn strict_assign_updates_outer_binding() {
        let global = Environment::global();
        global.define("x".to_string(), Value::Number(1.0));
        let inner = global.child();
        assert!(inner.strict_assign("x", Value::Number(2.0)));
        assert_eq!(global.get("x"), Some(Value::Number(2.0)));
    }

    #[test]
    fn strict_assign_fails_for_unbound_name() {
        let env = Environment::global();
        assert!(!env.strict_assign("missing", Value::Nil));
    }

    #[test]
    fn resolved_lookup_skips_shadowing_scopes() {
        let global = Environment::global();
        global.define("x".to_string(), Value::Number(1.0));
        let inner = global.child();
        inner.define("x".to_string(), Value::Number(2.0));
        assert_eq!(inner.get_at(0, "x"), Some(Value::Number(2.0)));
        assert_eq!(inner.get_at(1, "x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn shared_scope_survives_clone() {
        let global = Environment::global();
        let captured = global.child();
        captured.define("count".to_string(), Value::Number(0.0));
        let alias = captured.clone();
        alias.define("count".to_string(), Value::Number(5.0));
        assert_eq!(captured.get("count"), Some(Value::Number(5.0)));
    }
}
