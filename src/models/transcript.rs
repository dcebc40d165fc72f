use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic participant category for a channel. Distinct from the
/// channel tag, which is a vendor-assigned identifier and carries no
/// meaning by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Agent,
    Customer,
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Agent => "AGENT",
            Role::Customer => "CUSTOMER",
            Role::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// A single recognized word with timing and confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// The recognized text
    pub text: String,
    /// Start timestamp in milliseconds
    pub start_ms: u64,
    /// End timestamp in milliseconds
    pub end_ms: u64,
    /// Recognition confidence (0-1), absent for vendors that omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// One contiguous span of speech attributed to a single channel tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique identifier for this turn within the transcript
    pub turn_id: String,
    /// Vendor-assigned channel/speaker identifier
    pub channel_tag: String,
    /// The spoken text
    pub text: String,
    /// Start timestamp in milliseconds
    pub start_ms: u64,
    /// End timestamp in milliseconds
    pub end_ms: u64,
    /// Turn-level confidence (0-1), if the vendor supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Word-level detail, if the vendor supplied it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
    /// Resolved role; None until the combiner (or a trusted vendor
    /// hint) assigns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Turn {
    /// Duration of this turn in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Whether this turn already carries a role
    pub fn is_resolved(&self) -> bool {
        self.role.is_some()
    }
}

/// Canonical conversation transcript: ordered turns plus the stable
/// channel list.
///
/// Invariants (enforced by the builder, relied on downstream):
/// - turns are ordered by `start_ms`, non-decreasing
/// - no two turns on the same channel overlap beyond the build tolerance
/// - `channels` holds every distinct channel tag in first-seen order;
///   the position of a tag is its presentation ordinal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Unique conversation identifier
    pub transcript_id: String,
    /// Absolute wall-clock time of the start of the recording, when
    /// known. Vendor offsets stay relative; this anchors them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Distinct channel tags in first-seen order
    pub channels: Vec<String>,
    /// All turns, sorted by start time
    pub turns: Vec<Turn>,
}

impl Transcript {
    /// Presentation ordinal of a channel tag (position in first-seen
    /// order). Used for display and deterministic tie-breaks only,
    /// never for identity.
    pub fn channel_ordinal(&self, channel_tag: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == channel_tag)
    }

    /// Total speaking time attributed to a channel, in milliseconds
    pub fn speaking_time_ms(&self, channel_tag: &str) -> u64 {
        self.turns
            .iter()
            .filter(|t| t.channel_tag == channel_tag)
            .map(|t| t.duration_ms())
            .sum()
    }

    /// Channels with at least one turn whose role is still unresolved
    pub fn unresolved_channels(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|c| {
                self.turns
                    .iter()
                    .any(|t| &t.channel_tag == *c && !t.is_resolved())
            })
            .map(String::as_str)
            .collect()
    }

    /// Whether every turn carries a role
    pub fn is_fully_resolved(&self) -> bool {
        self.turns.iter().all(Turn::is_resolved)
    }

    /// Total duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.turns
            .last()
            .map(|t| t.end_ms)
            .unwrap_or(0)
            .saturating_sub(self.turns.first().map(|t| t.start_ms).unwrap_or(0))
    }
}
