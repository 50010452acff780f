//! Shared current-detection label
//!
//! Process-wide holder of the latest best label, written once per completed
//! pipeline cycle and read by unrelated pollers (e.g. the text-to-speech
//! endpoint). Replaces the original system's module-global variable with an
//! injected handle.

use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable handle to the label of the most recent completed cycle.
///
/// Writes replace the previous value unconditionally; readers never observe
/// a torn value. The critical section covers only the string swap.
#[derive(Debug, Clone, Default)]
pub struct DetectionState {
    label: Arc<RwLock<String>>,
}

impl DetectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored label.
    pub fn set(&self, label: impl Into<String>) {
        *self.label.write() = label.into();
    }

    /// Current label; empty when the last cycle detected nothing.
    pub fn get(&self) -> String {
        self.label.read().clone()
    }

    /// Reset to "nothing detected".
    pub fn clear(&self) {
        self.label.write().clear();
    }
}
