use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Role, Transcript, Turn, Word};

/// The payload shape handed to the ingestion collaborator: ordered
/// role-tagged entries plus the conversation identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPayload {
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    pub entries: Vec<ConversationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub channel_tag: String,
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

impl ConversationPayload {
    /// Build the ingestion payload from a role-tagged transcript.
    /// Unresolved turns serialize as UNKNOWN.
    pub fn from_transcript(transcript: &Transcript) -> Self {
        let entries = transcript
            .turns
            .iter()
            .map(|t| ConversationEntry {
                channel_tag: t.channel_tag.clone(),
                text: t.text.clone(),
                start_ms: t.start_ms,
                end_ms: t.end_ms,
                role: t.role.unwrap_or(Role::Unknown),
                confidence: t.confidence,
                words: t.words.clone(),
            })
            .collect();

        Self {
            conversation_id: transcript.transcript_id.clone(),
            recorded_at: transcript.recorded_at,
            entries,
        }
    }

    /// Reconstruct the canonical transcript from a previously written
    /// payload. Round-trips exactly: turns, timing, and roles survive.
    pub fn into_transcript(self) -> Transcript {
        let mut channels: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !channels.contains(&entry.channel_tag) {
                channels.push(entry.channel_tag.clone());
            }
        }

        let turns = self
            .entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Turn {
                turn_id: format!("turn_{index}"),
                channel_tag: entry.channel_tag,
                text: entry.text,
                start_ms: entry.start_ms,
                end_ms: entry.end_ms,
                confidence: entry.confidence,
                words: entry.words,
                role: Some(entry.role),
            })
            .collect();

        Transcript {
            transcript_id: self.conversation_id,
            recorded_at: self.recorded_at,
            channels,
            turns,
        }
    }

    /// Write the payload as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {path:?}"))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }

    /// Read a payload back from a JSON file
    pub fn read_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {path:?}"))?;
        serde_json::from_str(&content).context("Failed to parse conversation payload")
    }
}

/// Render a role-tagged transcript as human-readable text:
/// `[MM:SS.mmm] ROLE (channel): wrapped text`
pub fn render_human(transcript: &Transcript) -> String {
    let mut output = String::new();

    for turn in &transcript.turns {
        let role = turn.role.unwrap_or(Role::Unknown);
        output.push_str(&format!(
            "[{}] {} ({}):\n",
            format_timestamp(turn.start_ms),
            role,
            turn.channel_tag
        ));

        let mut line_len = 0;
        for word in turn.text.split_whitespace() {
            if line_len + word.len() + 1 > 88 && line_len > 0 {
                output.push('\n');
                line_len = 0;
            }
            if line_len > 0 {
                output.push(' ');
                line_len += 1;
            }
            output.push_str(word);
            line_len += word.len();
        }
        output.push_str("\n\n");
    }

    output
}

/// Write the human-readable rendering to a file
pub fn write_human(transcript: &Transcript, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {path:?}"))?;
    write!(file, "{}", render_human(transcript))?;
    Ok(())
}

fn format_timestamp(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{:02}:{:02}.{:03}", seconds / 60, seconds % 60, ms % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged_transcript() -> Transcript {
        Transcript {
            transcript_id: "conv-1".to_string(),
            recorded_at: Some("2025-03-04T10:15:00Z".parse().unwrap()),
            channels: vec!["spk_0".to_string(), "spk_1".to_string()],
            turns: vec![
                Turn {
                    turn_id: "turn_0".to_string(),
                    channel_tag: "spk_0".to_string(),
                    text: "Thanks for calling.".to_string(),
                    start_ms: 0,
                    end_ms: 1500,
                    confidence: Some(0.94),
                    words: Some(vec![Word {
                        text: "Thanks".to_string(),
                        start_ms: 0,
                        end_ms: 400,
                        confidence: Some(0.94),
                    }]),
                    role: Some(Role::Agent),
                },
                Turn {
                    turn_id: "turn_1".to_string(),
                    channel_tag: "spk_1".to_string(),
                    text: "Hi, I have a question.".to_string(),
                    start_ms: 1800,
                    end_ms: 3200,
                    confidence: None,
                    words: None,
                    role: Some(Role::Customer),
                },
            ],
        }
    }

    #[test]
    fn test_round_trip_is_exact() {
        let transcript = tagged_transcript();

        let payload = ConversationPayload::from_transcript(&transcript);
        let json = serde_json::to_string(&payload).unwrap();
        let reread: ConversationPayload = serde_json::from_str(&json).unwrap();
        let restored = reread.into_transcript();

        assert_eq!(restored, transcript);
    }

    #[test]
    fn test_write_and_read_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let payload = ConversationPayload::from_transcript(&tagged_transcript());

        payload.write_json(&path).unwrap();
        let reread = ConversationPayload::read_json(&path).unwrap();

        assert_eq!(reread.conversation_id, "conv-1");
        assert_eq!(reread.entries.len(), 2);
        assert_eq!(reread.entries[0].role, Role::Agent);
    }

    #[test]
    fn test_render_human() {
        let text = render_human(&tagged_transcript());

        assert!(text.contains("[00:00.000] AGENT (spk_0):"));
        assert!(text.contains("Thanks for calling."));
        assert!(text.contains("[00:01.800] CUSTOMER (spk_1):"));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "00:00.000");
        assert_eq!(format_timestamp(1500), "00:01.500");
        assert_eq!(format_timestamp(65_000), "01:05.000");
    }
}
