//! Per-student value storage for one graph walk.
//!
//! Every node occupies one dense slot. A slot starts `Pending` and moves to
//! `Resolved(v)` or `Unresolved` exactly once, in topological order; the
//! walk never revisits a slot.

use thiserror::Error;

/// The outcome of one node for one student.
///
/// `Unresolved` is a first-class "no usable value" state. It is never the
/// same thing as `Resolved(0.0)` and nothing in the engine coerces between
/// the two.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Resolved(f64),
    Unresolved,
}

impl Value {
    pub fn resolved(self) -> Option<f64> {
        match self {
            Value::Resolved(v) => Some(v),
            Value::Unresolved => None,
        }
    }

    pub fn is_unresolved(self) -> bool {
        matches!(self, Value::Unresolved)
    }
}

/// An internal inconsistency hit while walking one student.
///
/// These are conditions validation should have excluded. They degrade that
/// one student to `Unresolved` with an `InternalError` flag and never cross
/// the student boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalFault {
    #[error("parent '{parent}' of node '{node}' was still pending")]
    PendingParent { node: String, parent: String },

    #[error("node '{node}' ({kind}) received {actual} inputs at runtime")]
    InputCount {
        node: String,
        kind: &'static str,
        actual: usize,
    },

    #[error("node '{node}' produced a non-finite value")]
    NonFinite { node: String },
}

/// Dense slot storage, index = `NodeIx`. `None` is the `Pending` state.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    slots: Vec<Option<Value>>,
}

impl Ledger {
    pub fn with_capacity(node_count: usize) -> Self {
        Self {
            slots: vec![None; node_count],
        }
    }

    /// `None` means the node is still pending.
    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.slots.get(index).copied().flatten()
    }

    #[inline(always)]
    pub fn insert(&mut self, index: usize, value: Value) {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(value);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
