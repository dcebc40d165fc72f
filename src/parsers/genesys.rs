use serde::{Deserialize, Serialize};

use super::ensure_non_empty;
use crate::error::PipelineError;
use crate::models::{Role, Utterance};

/// Genesys Cloud conversation-analytics export
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenesysPayload {
    pub transcripts: Vec<GenesysTranscript>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenesysTranscript {
    pub phrases: Vec<GenesysPhrase>,
}

/// A single phrase with the participant purpose Genesys attaches to it
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesysPhrase {
    pub text: String,
    /// Participant purpose, e.g. "internal"/"agent" or "external"/"customer"
    pub participant_purpose: String,
    /// Phrase start in milliseconds
    pub start_time_ms: u64,
    /// Phrase end in milliseconds, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_ms: Option<u64>,
    /// Phrase duration in milliseconds, used when endTimeMs is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl GenesysPhrase {
    fn end_ms(&self) -> u64 {
        self.end_time_ms
            .or(self.duration_ms.map(|d| self.start_time_ms + d))
            .unwrap_or(self.start_time_ms)
    }
}

/// Parse a Genesys Cloud export into utterances.
///
/// The participant purpose doubles as the channel tag, and because
/// Genesys states it explicitly it is trusted as a role hint: "external"
/// and "customer" purposes map to CUSTOMER, everything else to AGENT.
/// Hinted turns bypass role recognition downstream.
pub fn parse_genesys(payload: &GenesysPayload) -> Result<Vec<Utterance>, PipelineError> {
    // Genesys exports one transcript per media session; the first one
    // carries the conversation.
    let phrases = payload
        .transcripts
        .first()
        .map(|t| t.phrases.as_slice())
        .unwrap_or(&[]);

    let utterances = phrases
        .iter()
        .map(|phrase| {
            let role_hint = match phrase.participant_purpose.as_str() {
                "external" | "customer" => Role::Customer,
                _ => Role::Agent,
            };
            Utterance {
                channel_tag: phrase.participant_purpose.clone(),
                text: phrase.text.clone(),
                start_ms: phrase.start_time_ms,
                end_ms: phrase.end_ms(),
                confidence: phrase.confidence,
                words: None,
                role_hint: Some(role_hint),
            }
        })
        .collect();

    ensure_non_empty(utterances)
}
