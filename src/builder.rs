use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::PipelineError;
use crate::models::{Transcript, Turn, Utterance};

/// Configuration for the canonical transcript builder
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Same-channel overlap tolerated before the build is rejected,
    /// in milliseconds
    pub overlap_tolerance_ms: u64,
    /// Absolute start time of the recording, stamped onto the
    /// transcript when known
    pub recorded_at: Option<DateTime<Utc>>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            overlap_tolerance_ms: 0,
            recorded_at: None,
        }
    }
}

/// Build a canonical transcript from parser output.
///
/// Utterances are stably sorted by start time (input order breaks
/// ties), channels get a presentation ordinal in first-seen order, and
/// trusted vendor role hints are copied onto the turns so those
/// channels skip role recognition. Two turns on the same channel
/// overlapping beyond the tolerance reject the build: that is an
/// upstream parser bug, not data to be merged silently.
pub fn build(
    utterances: Vec<Utterance>,
    config: &BuilderConfig,
) -> Result<Transcript, PipelineError> {
    if utterances.is_empty() {
        return Err(PipelineError::EmptyTranscript);
    }

    let mut ordered = utterances;
    ordered.sort_by_key(|u| u.start_ms);

    let mut channels: Vec<String> = Vec::new();
    let mut last_end_ms: HashMap<String, u64> = HashMap::new();
    let mut turns = Vec::with_capacity(ordered.len());

    for (index, utterance) in ordered.into_iter().enumerate() {
        if !channels.contains(&utterance.channel_tag) {
            channels.push(utterance.channel_tag.clone());
        }

        if let Some(&prev_end) = last_end_ms.get(&utterance.channel_tag) {
            if utterance.start_ms + config.overlap_tolerance_ms < prev_end {
                return Err(PipelineError::Overlap {
                    channel: utterance.channel_tag,
                    first_end_ms: prev_end,
                    second_start_ms: utterance.start_ms,
                });
            }
        }
        last_end_ms.insert(utterance.channel_tag.clone(), utterance.end_ms);

        turns.push(Turn {
            turn_id: format!("turn_{index}"),
            channel_tag: utterance.channel_tag,
            text: utterance.text,
            start_ms: utterance.start_ms,
            end_ms: utterance.end_ms,
            confidence: utterance.confidence,
            words: utterance.words,
            role: utterance.role_hint,
        });
    }

    let transcript = Transcript {
        transcript_id: uuid::Uuid::new_v4().to_string(),
        recorded_at: config.recorded_at,
        channels,
        turns,
    };

    debug!(
        transcript_id = %transcript.transcript_id,
        turns = transcript.turns.len(),
        channels = transcript.channels.len(),
        "built canonical transcript"
    );

    Ok(transcript)
}
