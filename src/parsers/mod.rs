pub mod aws;
pub mod genesys;
pub mod stt_v1;
pub mod stt_v2;

pub use aws::{parse_aws, AwsPayload};
pub use genesys::{parse_genesys, GenesysPayload};
pub use stt_v1::{parse_stt_v1, SttV1Payload};
pub use stt_v2::{parse_stt_v2, SttV2Payload};

use std::fmt;

use serde::de::DeserializeOwned;

use crate::error::PipelineError;
use crate::models::{Utterance, Word};

/// Source format of a vendor payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    /// Genesys Cloud conversation-analytics export
    Genesys,
    /// AWS Transcribe/Connect Contact Lens
    Aws,
    /// Google Speech-to-Text v1 (diarized RecognizeResponse)
    SttV1,
    /// Google Speech-to-Text v2 (recognizer output)
    SttV2,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Vendor::Genesys => "genesys",
            Vendor::Aws => "aws",
            Vendor::SttV1 => "stt-v1",
            Vendor::SttV2 => "stt-v2",
        };
        f.write_str(s)
    }
}

/// A vendor payload tagged with its source format.
///
/// Each variant is a distinct typed schema with its own parser; there is
/// deliberately no generic parser branching on ad-hoc keys.
#[derive(Debug, Clone)]
pub enum VendorPayload {
    Genesys(GenesysPayload),
    Aws(AwsPayload),
    SttV1(SttV1Payload),
    SttV2(SttV2Payload),
}

impl VendorPayload {
    /// Deserialize raw JSON into the schema for `vendor`
    pub fn from_json(vendor: Vendor, json: &str) -> Result<Self, PipelineError> {
        match vendor {
            Vendor::Genesys => deserialize(vendor, json).map(VendorPayload::Genesys),
            Vendor::Aws => deserialize(vendor, json).map(VendorPayload::Aws),
            Vendor::SttV1 => deserialize(vendor, json).map(VendorPayload::SttV1),
            Vendor::SttV2 => deserialize(vendor, json).map(VendorPayload::SttV2),
        }
    }

    /// Which vendor this payload came from
    pub fn vendor(&self) -> Vendor {
        match self {
            VendorPayload::Genesys(_) => Vendor::Genesys,
            VendorPayload::Aws(_) => Vendor::Aws,
            VendorPayload::SttV1(_) => Vendor::SttV1,
            VendorPayload::SttV2(_) => Vendor::SttV2,
        }
    }

    /// Run the matching vendor parser
    pub fn parse(&self) -> Result<Vec<Utterance>, PipelineError> {
        match self {
            VendorPayload::Genesys(p) => parse_genesys(p),
            VendorPayload::Aws(p) => parse_aws(p),
            VendorPayload::SttV1(p) => parse_stt_v1(p),
            VendorPayload::SttV2(p) => parse_stt_v2(p),
        }
    }
}

fn deserialize<T: DeserializeOwned>(vendor: Vendor, json: &str) -> Result<T, PipelineError> {
    serde_json::from_str(json).map_err(|e| PipelineError::Format {
        vendor,
        detail: e.to_string(),
    })
}

/// Parse a protobuf JSON duration ("1.400s") into milliseconds
pub(crate) fn parse_proto_duration(
    value: &str,
    vendor: Vendor,
    field: &str,
) -> Result<u64, PipelineError> {
    let malformed = || PipelineError::Format {
        vendor,
        detail: format!("{field}: expected a duration like \"1.400s\", got {value:?}"),
    };

    let seconds: f64 = value
        .strip_suffix('s')
        .ok_or_else(malformed)?
        .parse()
        .map_err(|_| malformed())?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(malformed());
    }
    Ok((seconds * 1000.0).round() as u64)
}

/// Group consecutive words sharing a speaker tag into utterances.
///
/// Text is joined with single spaces; start/end are the min/max of the
/// contained word boundaries; confidence is the unweighted mean over
/// words that carry one.
pub(crate) fn group_tagged_words(words: Vec<(String, Word)>) -> Vec<Utterance> {
    let mut utterances: Vec<Utterance> = Vec::new();
    let mut group: Vec<Word> = Vec::new();
    let mut group_tag: Option<String> = None;

    let mut flush = |tag: &mut Option<String>, group: &mut Vec<Word>, out: &mut Vec<Utterance>| {
        let Some(tag) = tag.take() else { return };
        if group.is_empty() {
            return;
        }
        let words = std::mem::take(group);
        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let start_ms = words.iter().map(|w| w.start_ms).min().unwrap_or(0);
        let end_ms = words.iter().map(|w| w.end_ms).max().unwrap_or(start_ms);
        let scored: Vec<f64> = words.iter().filter_map(|w| w.confidence).collect();
        let confidence = if scored.is_empty() {
            None
        } else {
            Some(scored.iter().sum::<f64>() / scored.len() as f64)
        };
        out.push(Utterance {
            channel_tag: tag,
            text,
            start_ms,
            end_ms,
            confidence,
            words: Some(words),
            role_hint: None,
        });
    };

    for (tag, word) in words {
        if group_tag.as_deref() != Some(tag.as_str()) {
            flush(&mut group_tag, &mut group, &mut utterances);
            group_tag = Some(tag);
        }
        group.push(word);
    }
    flush(&mut group_tag, &mut group, &mut utterances);

    utterances
}

/// Reject zero-utterance results with the dedicated error kind so
/// callers can tell "no speech" apart from "malformed payload"
pub(crate) fn ensure_non_empty(
    utterances: Vec<Utterance>,
) -> Result<Vec<Utterance>, PipelineError> {
    if utterances.is_empty() {
        Err(PipelineError::EmptyTranscript)
    } else {
        Ok(utterances)
    }
}
