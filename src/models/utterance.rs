use super::{Role, Word};

/// Intermediate utterance produced by a vendor parser and consumed by
/// the canonical transcript builder. Short-lived: built by one `parse`
/// call, folded into a `Transcript`, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Channel/speaker identifier as the vendor encodes it
    pub channel_tag: String,
    /// The spoken text
    pub text: String,
    /// Start timestamp in milliseconds
    pub start_ms: u64,
    /// End timestamp in milliseconds
    pub end_ms: u64,
    /// Utterance-level confidence (0-1), if available
    pub confidence: Option<f64>,
    /// Word-level detail, if available
    pub words: Option<Vec<Word>>,
    /// Trusted vendor role hint (Genesys participant purpose). When
    /// present the turn bypasses role recognition downstream.
    pub role_hint: Option<Role>,
}

impl Utterance {
    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}
