use thiserror::Error;

use crate::models::Role;
use crate::parsers::Vendor;

/// Errors produced by the conversion-and-enrichment pipeline.
///
/// Each variant maps to a distinct failure kind so batch callers can
/// separate "skip this conversation" (EmptyTranscript) from "alert a
/// human" (Overlap, AmbiguousRole) without string matching.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The vendor payload is missing a required field or carries an
    /// unexpected shape. Fatal, never retried.
    #[error("malformed {vendor} payload: {detail}")]
    Format { vendor: Vendor, detail: String },

    /// The payload was well-formed but contained no speech. Callers
    /// typically skip the conversation rather than alert.
    #[error("payload contained no utterances")]
    EmptyTranscript,

    /// Two turns on the same channel overlap in time beyond the
    /// configured tolerance. Indicates an upstream parser bug.
    #[error(
        "overlapping turns on channel {channel}: turn ending at {first_end_ms}ms \
         overlaps turn starting at {second_start_ms}ms"
    )]
    Overlap {
        channel: String,
        first_end_ms: u64,
        second_start_ms: u64,
    },

    /// The model labeled both channels of a two-channel conversation
    /// with the same role. Surfaced for manual review, never guessed
    /// around.
    #[error("model assigned {role} to both channels {channels:?}")]
    AmbiguousRole { role: Role, channels: [String; 2] },

    /// The model response could not be parsed even after one retry
    /// with a stricter reformatting instruction.
    #[error("unparseable model response: {0}")]
    ModelResponse(String),

    /// The model call kept failing transiently until the retry bound
    /// was exhausted, or failed fatally.
    #[error("model call failed after {attempts} attempt(s): {detail}")]
    ModelCall { attempts: u32, detail: String },
}

impl PipelineError {
    /// Short stable identifier for batch outcome reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Format { .. } => "format",
            PipelineError::EmptyTranscript => "empty_transcript",
            PipelineError::Overlap { .. } => "overlap",
            PipelineError::AmbiguousRole { .. } => "ambiguous_role",
            PipelineError::ModelResponse(_) => "model_response",
            PipelineError::ModelCall { .. } => "model_call",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let errors = [
            PipelineError::Format {
                vendor: Vendor::Genesys,
                detail: "missing field".to_string(),
            },
            PipelineError::EmptyTranscript,
            PipelineError::Overlap {
                channel: "spk_0".to_string(),
                first_end_ms: 1000,
                second_start_ms: 900,
            },
            PipelineError::AmbiguousRole {
                role: Role::Agent,
                channels: ["spk_0".to_string(), "spk_1".to_string()],
            },
            PipelineError::ModelResponse("not json".to_string()),
            PipelineError::ModelCall {
                attempts: 3,
                detail: "rate limited".to_string(),
            },
        ];

        let kinds: std::collections::HashSet<&str> =
            errors.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_ambiguous_role_display() {
        let err = PipelineError::AmbiguousRole {
            role: Role::Agent,
            channels: ["spk_0".to_string(), "spk_1".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("AGENT"));
        assert!(msg.contains("spk_0"));
        assert!(msg.contains("spk_1"));
    }
}
