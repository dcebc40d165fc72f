use serde::{Deserialize, Serialize};

use super::{ensure_non_empty, group_tagged_words, parse_proto_duration, Vendor};
use crate::error::PipelineError;
use crate::models::{Utterance, Word};

/// Google Speech-to-Text v2 recognizer output
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SttV2Payload {
    #[serde(default)]
    pub results: Vec<SttV2Result>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SttV2Result {
    #[serde(default)]
    pub alternatives: Vec<SttV2Alternative>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SttV2Alternative {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub words: Vec<SttV2Word>,
}

/// Word with v2 offset fields and a string speaker label
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SttV2Word {
    pub word: String,
    /// Offset from the start of the audio, e.g. "1.4s"
    pub start_offset: String,
    pub end_offset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Recognizer speaker label, e.g. "1" or "speaker_1"
    #[serde(default)]
    pub speaker_label: String,
}

/// Parse an STT v2 response into utterances.
///
/// Unlike v1, v2 spreads tagged words across results, so words are
/// flattened across every result's first alternative in order before
/// grouping consecutive same-label runs.
pub fn parse_stt_v2(payload: &SttV2Payload) -> Result<Vec<Utterance>, PipelineError> {
    let mut tagged = Vec::new();
    for result in &payload.results {
        let Some(alternative) = result.alternatives.first() else {
            continue;
        };
        for w in &alternative.words {
            tagged.push((
                w.speaker_label.clone(),
                Word {
                    text: w.word.clone(),
                    start_ms: parse_proto_duration(&w.start_offset, Vendor::SttV2, "startOffset")?,
                    end_ms: parse_proto_duration(&w.end_offset, Vendor::SttV2, "endOffset")?,
                    confidence: w.confidence,
                },
            ));
        }
    }

    ensure_non_empty(group_tagged_words(tagged))
}
