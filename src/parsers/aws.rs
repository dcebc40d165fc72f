use serde::{Deserialize, Serialize};

use super::ensure_non_empty;
use crate::error::PipelineError;
use crate::models::Utterance;

/// AWS Transcribe/Connect Contact Lens transcript
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsPayload {
    #[serde(rename = "Transcript")]
    pub transcript: Vec<AwsSegment>,
}

/// One speaker segment with millisecond offsets from the start of the call
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AwsSegment {
    /// Speaker-segment label, e.g. "spk_0", "spk_1"
    pub participant_id: String,
    pub content: String,
    pub begin_offset_millis: u64,
    pub end_offset_millis: u64,
}

/// Parse an AWS transcript into utterances.
///
/// The "spk_N" labels carry no role information, so no role hint is
/// attached and every channel goes through role recognition. Labels are
/// kept verbatim to preserve the numeric channel ordering.
pub fn parse_aws(payload: &AwsPayload) -> Result<Vec<Utterance>, PipelineError> {
    let utterances = payload
        .transcript
        .iter()
        .map(|segment| Utterance {
            channel_tag: segment.participant_id.clone(),
            text: segment.content.clone(),
            start_ms: segment.begin_offset_millis,
            end_ms: segment.end_offset_millis,
            confidence: None,
            words: None,
            role_hint: None,
        })
        .collect();

    ensure_non_empty(utterances)
}
