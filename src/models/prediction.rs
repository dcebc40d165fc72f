use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Role;

/// A single predicted role with the model's justification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Predicted role for the channel
    pub role: Role,
    /// Short model-supplied justification, kept for review
    pub rationale: String,
}

/// Per-transcript role predictions keyed by channel tag.
///
/// Produced once by the role recognizer, consumed once by the combiner,
/// not persisted independently. A channel missing from `assignments` is
/// a valid partial outcome and resolves to UNKNOWN at combination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolePrediction {
    pub assignments: HashMap<String, RoleAssignment>,
}

impl RolePrediction {
    /// Predicted role for a channel, if any
    pub fn role_for(&self, channel_tag: &str) -> Option<Role> {
        self.assignments.get(channel_tag).map(|a| a.role)
    }

    /// Insert an assignment
    pub fn assign(&mut self, channel_tag: impl Into<String>, role: Role, rationale: impl Into<String>) {
        self.assignments.insert(
            channel_tag.into(),
            RoleAssignment {
                role,
                rationale: rationale.into(),
            },
        );
    }
}
