//! Object and class lifeline indices.

use jetledger_types::RecordId;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectState {
    /// Object has been activated and has no amendments yet.
    #[default]
    Activated,
    /// Object state has been amended at least once.
    Amended,
    /// Object is deactivated. No further state records are accepted.
    Deactivated,
}

/// Index entry pointing at an object's latest records.
///
/// Stored under the lifeline scope keyed by the object's own record id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectLifeline {
    /// Latest state record of the object.
    pub latest_state: Option<RecordId>,
    /// Latest child record registered under the object.
    pub latest_child: Option<RecordId>,
    /// Current lifecycle state.
    pub state: ObjectState,
}

impl ObjectLifeline {
    /// Lifeline of a freshly activated object.
    pub fn activated(state: RecordId) -> Self {
        Self { latest_state: Some(state), latest_child: None, state: ObjectState::Activated }
    }

    /// Records a new state of the object.
    pub fn amend(&mut self, state: RecordId) {
        self.latest_state = Some(state);
        self.state = ObjectState::Amended;
    }

    /// Marks the object deactivated with its final state record.
    pub fn deactivate(&mut self, state: RecordId) {
        self.latest_state = Some(state);
        self.state = ObjectState::Deactivated;
    }

    /// Whether the object has been deactivated.
    pub fn is_deactivated(&self) -> bool {
        self.state == ObjectState::Deactivated
    }
}

/// Index entry tracking a class's state history.
///
/// Stored under the lifeline scope keyed by the class's own record id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLifeline {
    /// Latest state record of the class.
    pub latest_state: RecordId,
    /// Every amendment applied after activation, oldest first.
    pub amend_refs: Vec<RecordId>,
}

impl ClassLifeline {
    /// Lifeline of a freshly activated class.
    pub fn activated(state: RecordId) -> Self {
        Self { latest_state: state, amend_refs: Vec::new() }
    }

    /// Records a new state of the class.
    pub fn amend(&mut self, state: RecordId) {
        self.amend_refs.push(state);
        self.latest_state = state;
    }
}
