//! Runtime scope frames.
//!
//! A frame is a slot vector plus the lexically enclosing frame. Slots are
//! appended in declaration order, so the `(depth, index)` pairs computed by
//! the resolver address them directly. Globals live elsewhere (a name table
//! on the interpreter) and are never stored in a frame.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// Shared handle to a frame; closures keep their defining frame alive.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    slots: Vec<Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A child frame of `enclosing`, pre‑sized for `capacity` slots.
    pub fn with_enclosing(enclosing: EnvRef, capacity: usize) -> Self {
        Environment {
            slots: Vec::with_capacity(capacity),
            enclosing: Some(enclosing),
        }
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Append `value` as the next slot and return its index.
    pub fn define(&mut self, value: Value) -> usize {
        self.slots.push(value);
        self.slots.len() - 1
    }

    /// Frame `depth` parent links above `env`.
    pub fn ancestor(env: &EnvRef, depth: usize) -> Option<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..depth {
            let parent: EnvRef = current.borrow().enclosing.clone()?;
            current = parent;
        }

        Some(current)
    }

    /// `None` only if resolver and runtime layouts disagree.
    pub fn get_at(env: &EnvRef, depth: usize, index: usize) -> Option<Value> {
        let frame: EnvRef = Self::ancestor(env, depth)?;
        let value = frame.borrow().slots.get(index).cloned();
        value
    }

    /// Overwrite an existing slot. Returns `false` if it does not exist.
    pub fn assign_at(env: &EnvRef, depth: usize, index: usize, value: Value) -> bool {
        let Some(frame) = Self::ancestor(env, depth) else {
            return false;
        };

        let mut frame = frame.borrow_mut();
        match frame.slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

// Frames can reach themselves through closures stored in their own slots.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("slots", &self.slots.len())
            .field("enclosed", &self.enclosing.is_some())
            .finish()
    }
}
