//! Lexically chained scopes.
//!
//! Each scope's storage is a [`Map`] value so the environment can be
//! introspected (`baseenv()` hands scripts a copy of the outermost store).
//! Name lookup walks outward; `let` always writes the innermost scope, and
//! assignment rebinds in the scope that owns the name.

use std::{cell::RefCell, rc::Rc};

use crate::value::{Map, Slot, Str, Value};

#[derive(Debug)]
struct EnvData {
    store: RefCell<Map>,
    outer: Option<Env>,
}

/// A handle to one scope in the chain. Cloning shares the scope; closures
/// keep their defining environment alive through this handle.
#[derive(Debug, Clone)]
pub struct Env(Rc<EnvData>);

impl Env {
    /// A root scope with no parent.
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(EnvData {
            store: RefCell::new(Map::new()),
            outer: None,
        }))
    }

    /// A child scope chained to `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self(Rc::new(EnvData {
            store: RefCell::new(Map::new()),
            outer: Some(self.clone()),
        }))
    }

    /// Binds `name` in this scope, shadowing any outer binding.
    pub fn declare(&self, name: Str, value: Value) {
        self.0
            .store
            .borrow_mut()
            .insert(Value::string(name), value)
            .expect("environment store is a plain map");
    }

    /// Looks `name` up through the chain, cloning the bound value.
    #[must_use]
    pub fn get(&self, name: &Str) -> Option<Value> {
        self.get_slot(name).map(|slot| slot.get())
    }

    /// Looks `name` up through the chain, returning the binding's slot so a
    /// reference can alias it.
    #[must_use]
    pub fn get_slot(&self, name: &Str) -> Option<Slot> {
        let key = Value::string(name.clone());
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(slot) = env.0.store.borrow().get_slot(&key) {
                return Some(slot);
            }
            scope = env.0.outer.as_ref();
        }
        None
    }

    /// Rebinds `name` in the scope that owns it. Returns false when the name
    /// is not bound anywhere in the chain. Rebinding installs a fresh slot;
    /// references taken earlier keep aliasing the old cell.
    #[must_use]
    pub fn assign(&self, name: &Str, value: Value) -> bool {
        let key = Value::string(name.clone());
        let mut scope = Some(self);
        while let Some(env) = scope {
            let owns = env.0.store.borrow().contains(&key);
            if owns {
                env.0
                    .store
                    .borrow_mut()
                    .insert(key, value)
                    .expect("environment store is a plain map");
                return true;
            }
            scope = env.0.outer.as_ref();
        }
        false
    }

    /// The scope's backing store.
    #[must_use]
    pub fn store(&self) -> Map {
        self.0.store.borrow().clone()
    }

    /// Stable identity for hashing closures by their captured environment.
    #[must_use]
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_and_lookup_through_chain() {
        let root = Env::new();
        root.declare(Str::from("x"), Value::number(1.0));
        let inner = root.child();
        assert_eq!(inner.get(&Str::from("x")), Some(Value::number(1.0)));
        assert_eq!(inner.get(&Str::from("y")), None);
    }

    #[test]
    fn let_shadows_assignment_rebinds() {
        let root = Env::new();
        root.declare(Str::from("x"), Value::number(1.0));
        let inner = root.child();
        inner.declare(Str::from("x"), Value::number(2.0));
        assert_eq!(inner.get(&Str::from("x")), Some(Value::number(2.0)));
        assert_eq!(root.get(&Str::from("x")), Some(Value::number(1.0)));

        // assignment writes through to the owning scope
        let deeper = root.child();
        assert!(deeper.assign(&Str::from("x"), Value::number(3.0)));
        assert_eq!(root.get(&Str::from("x")), Some(Value::number(3.0)));
        assert!(!deeper.assign(&Str::from("missing"), Value::null()));
    }

    #[test]
    fn rebinding_installs_a_fresh_slot() {
        let root = Env::new();
        root.declare(Str::from("x"), Value::number(1.0));
        let slot = root.get_slot(&Str::from("x")).unwrap();
        assert!(root.assign(&Str::from("x"), Value::number(2.0)));
        // the old cell still holds the old value for existing references
        assert_eq!(slot.get(), Value::number(1.0));
        assert_eq!(root.get(&Str::from("x")), Some(Value::number(2.0)));
    }
}
