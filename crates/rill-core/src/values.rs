//! Per-scenario values shared between components.
//!
//! A producer publishes into a [`SharedValues`] during its hooks and any
//! number of consumers holding a clone read from it during theirs. Wiring
//! the producer as a parent of its consumers guarantees the write happens
//! first within a phase.

use std::cell::RefCell;
use std::rc::Rc;

/// A shared, single-threaded buffer holding one `f64` per scenario.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct SharedValues {
    inner: Rc<RefCell<Vec<f64>>>,
}

impl SharedValues {
    /// A buffer of `len` zeros.
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![0.0; len])
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(values)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Value for `scenario`, or `None` if out of range.
    pub fn get(&self, scenario: usize) -> Option<f64> {
        self.inner.borrow().get(scenario).copied()
    }

    /// Set the value for `scenario`. Returns false if out of range.
    pub fn set(&self, scenario: usize, value: f64) -> bool {
        match self.inner.borrow_mut().get_mut(scenario) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Overwrite every scenario with `value`.
    pub fn fill(&self, value: f64) {
        self.inner.borrow_mut().fill(value);
    }

    /// Replace the contents, resizing if needed.
    pub fn replace(&self, values: Vec<f64>) {
        *self.inner.borrow_mut() = values;
    }

    /// Copy of the current values.
    pub fn snapshot(&self) -> Vec<f64> {
        self.inner.borrow().clone()
    }

    /// Returns true if both handles share storage.
    pub fn ptr_eq(&self, other: &SharedValues) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
