use serde::{Deserialize, Serialize};

use super::{ensure_non_empty, group_tagged_words, parse_proto_duration, Vendor};
use crate::error::PipelineError;
use crate::models::{Utterance, Word};

/// Google Speech-to-Text v1 `RecognizeResponse` JSON
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SttV1Payload {
    #[serde(default)]
    pub results: Vec<SttV1Result>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SttV1Result {
    #[serde(default)]
    pub alternatives: Vec<SttV1Alternative>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SttV1Alternative {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub words: Vec<SttV1Word>,
}

/// Word with protobuf duration timestamps and a diarization speaker tag
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SttV1Word {
    pub word: String,
    /// Offset from the start of the audio, e.g. "1.400s"
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Diarization speaker tag; 0 when diarization was off (proto3 default)
    #[serde(default)]
    pub speaker_tag: u32,
}

/// Parse a diarized STT v1 response into utterances.
///
/// With diarization enabled v1 repeats every word of the conversation in
/// the final result with `speakerTag` populated, so only the last result
/// carrying words is read. Consecutive words sharing a tag become one
/// utterance.
pub fn parse_stt_v1(payload: &SttV1Payload) -> Result<Vec<Utterance>, PipelineError> {
    let words = payload
        .results
        .iter()
        .rev()
        .find_map(|r| {
            r.alternatives
                .first()
                .filter(|a| !a.words.is_empty())
                .map(|a| a.words.as_slice())
        })
        .unwrap_or(&[]);

    let mut tagged = Vec::with_capacity(words.len());
    for w in words {
        tagged.push((
            w.speaker_tag.to_string(),
            Word {
                text: w.word.clone(),
                start_ms: parse_proto_duration(&w.start_time, Vendor::SttV1, "startTime")?,
                end_ms: parse_proto_duration(&w.end_time, Vendor::SttV1, "endTime")?,
                confidence: w.confidence,
            },
        ));
    }

    ensure_non_empty(group_tagged_words(tagged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::VendorPayload;

    const SAMPLE: &str = r#"{
        "results": [
            {"alternatives": [{"transcript": "good morning how can I help", "confidence": 0.93}]},
            {"alternatives": [{"words": [
                {"word": "good", "startTime": "0s", "endTime": "0.300s", "confidence": 0.95, "speakerTag": 1},
                {"word": "morning", "startTime": "0.300s", "endTime": "0.800s", "confidence": 0.91, "speakerTag": 1},
                {"word": "hi", "startTime": "1.200s", "endTime": "1.400s", "confidence": 0.88, "speakerTag": 2},
                {"word": "how", "startTime": "2.000s", "endTime": "2.200s", "confidence": 0.90, "speakerTag": 1}
            ]}]}
        ]
    }"#;

    #[test]
    fn test_parse_stt_v1_groups_by_speaker_tag() {
        let payload = VendorPayload::from_json(Vendor::SttV1, SAMPLE).unwrap();
        let utterances = payload.parse().unwrap();

        assert_eq!(utterances.len(), 3);
        assert_eq!(utterances[0].channel_tag, "1");
        assert_eq!(utterances[0].text, "good morning");
        assert_eq!(utterances[0].start_ms, 0);
        assert_eq!(utterances[0].end_ms, 800);
        assert!((utterances[0].confidence.unwrap() - 0.93).abs() < 1e-9);
        assert_eq!(utterances[1].channel_tag, "2");
        assert_eq!(utterances[2].channel_tag, "1");
        assert_eq!(utterances[0].words.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_bad_duration_is_format_error() {
        let json = r#"{"results": [{"alternatives": [{"words": [
            {"word": "hi", "startTime": "1.2", "endTime": "1.4s", "speakerTag": 1}
        ]}]}]}"#;
        let payload = VendorPayload::from_json(Vendor::SttV1, json).unwrap();
        let err = payload.parse().unwrap_err();
        match err {
            PipelineError::Format { vendor, detail } => {
                assert_eq!(vendor, Vendor::SttV1);
                assert!(detail.contains("startTime"));
            }
            other => panic!("expected Format error, got {other:?}"),
        }
    }

    #[test]
    fn test_no_words_anywhere_is_empty_transcript() {
        let json = r#"{"results": [{"alternatives": [{"transcript": "x"}]}]}"#;
        let payload = VendorPayload::from_json(Vendor::SttV1, json).unwrap();
        assert!(matches!(
            payload.parse().unwrap_err(),
            PipelineError::EmptyTranscript
        ));
    }
}
