//! Ordered record of applied preprocessing operations

use serde::{Deserialize, Serialize};

use crate::preprocessing::ops::PreprocessOp;

/// Append-only record of the preprocessing operations applied to one data
/// branch, in application order. The ledger is the single source of truth
/// for replay: rewinding a view and re-running the ledger reproduces the
/// preprocessed state exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallLedger {
    entries: Vec<PreprocessOp>,
}

impl CallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, op: PreprocessOp) {
        self.entries.push(op);
    }

    pub fn entries(&self) -> &[PreprocessOp] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The scaling entry, if one is recorded. At most one can exist at a
    /// time; [`remove_scaling`](Self::remove_scaling) enforces that before a
    /// new one is recorded.
    pub fn scaling_op(&self) -> Option<&PreprocessOp> {
        self.entries.iter().find(|op| op.is_scaling())
    }

    /// The stateless entries in recorded order.
    pub fn stateless_ops(&self) -> impl Iterator<Item = &PreprocessOp> {
        self.entries.iter().filter(|op| !op.is_scaling())
    }

    /// Remove the scaling entry if present. Returns the removed operation.
    pub fn remove_scaling(&mut self) -> Option<PreprocessOp> {
        let pos = self.entries.iter().position(|op| op.is_scaling())?;
        Some(self.entries.remove(pos))
    }

    /// Stable-sort the ledger so scaling operations come last, preserving
    /// the relative order within each category. Returns whether the order
    /// changed, in which case the caller must rewind and replay.
    pub fn sort_scaling_last(&mut self) -> bool {
        let before = self.entries.clone();
        self.entries.sort_by_key(|op| op.category());
        self.entries != before
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}
