//! Trigger decisions.

use crate::hit::Section;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-event result of one configured trigger instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDecision {
    /// Name of the trigger instance, e.g. `cosmicMuonTrigger`.
    pub name: String,
    /// Whether the event passed.
    pub fired: bool,
    /// First section (in section order) that passed, if any.
    pub section: Option<Section>,
    /// Diagnostic values computed by the algorithm, keyed by name.
    #[serde(default)]
    pub variables: BTreeMap<String, f64>,
}

impl TriggerDecision {
    /// A decision that did not fire.
    pub fn rejected(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fired: false,
            section: None,
            variables: BTreeMap::new(),
        }
    }

    /// Marks the decision as fired by `section`.
    ///
    /// Only the first firing section is kept.
    pub fn fire(&mut self, section: Section) {
        if !self.fired {
            self.fired = true;
            self.section = Some(section);
        }
    }

    /// Records a diagnostic value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: f64) {
        self.variables.insert(name.into(), value);
    }

    /// Looks up a diagnostic value.
    pub fn variable(&self, name: &str) -> Option<f64> {
        self.variables.get(name).copied()
    }
}
