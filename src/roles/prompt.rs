use crate::models::Transcript;

/// System prompt for role recognition (non-negotiable output contract)
pub const SYSTEM_PROMPT: &str = r#"You are a multilingual expert in identifying roles within a call-center conversation transcript.

Task:
Label each listed channel as AGENT or CUSTOMER based on the conversation excerpt.

Guidelines:
- Analyze the entire excerpt to understand the context before labeling.
- Greetings and closings carry the strongest role cues ("Thank you for calling...", "Is there anything else I can help with?").
- In conversations between two agents, designate the one primarily providing information or support as AGENT and the one primarily receiving it as CUSTOMER, so the two channels always get different roles.
- Never label both channels of a two-party conversation with the same role.

Output:
Respond with JSON only, matching exactly:
{"assignments": [{"channel_tag": "<tag from the channel list>", "role": "AGENT" or "CUSTOMER", "rationale": "<one short sentence>"}]}

Include one assignment per listed channel and no channels that were not listed.

Example:
Channels to label: spk_0, spk_1
Conversation:
spk_0: Hello, how can I help you today?
spk_1: Hi, I'm having trouble logging in.
spk_0: Have you tried resetting your password?
Response:
{"assignments": [{"channel_tag": "spk_0", "role": "AGENT", "rationale": "Opens the call offering help and drives troubleshooting."}, {"channel_tag": "spk_1", "role": "CUSTOMER", "rationale": "Reports a problem and receives assistance."}]}"#;

/// Stricter instruction appended when the first response failed to parse
pub const REFORMAT_INSTRUCTION: &str = "\n\nIMPORTANT: your previous reply was not valid. \
Respond with a single raw JSON object and nothing else: no prose, no code fences, \
no channels beyond the listed ones, roles strictly \"AGENT\" or \"CUSTOMER\".";

/// Bounds on the conversation excerpt sent to the model
#[derive(Debug, Clone)]
pub struct ExcerptConfig {
    /// Maximum number of turns included
    pub max_turns: usize,
    /// Maximum total characters of turn text included
    pub max_chars: usize,
}

impl Default for ExcerptConfig {
    fn default() -> Self {
        Self {
            max_turns: 60,
            max_chars: 12_000,
        }
    }
}

/// Build the user prompt: the channels to label plus a bounded excerpt.
///
/// Long conversations are truncated by dropping turns from the middle,
/// keeping the opening and closing exchanges where role cues are
/// strongest.
pub fn build_role_prompt(
    transcript: &Transcript,
    candidates: &[String],
    config: &ExcerptConfig,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("Channels to label: ");
    prompt.push_str(&candidates.join(", "));
    prompt.push_str("\n\nConversation:\n");
    prompt.push_str(&build_excerpt(transcript, config));

    prompt
}

fn build_excerpt(transcript: &Transcript, config: &ExcerptConfig) -> String {
    let lines: Vec<String> = transcript
        .turns
        .iter()
        .map(|t| format!("{}: {}", t.channel_tag, t.text))
        .collect();

    let mut keep = lines.len().min(config.max_turns.max(2));

    // Shrink symmetrically until the character budget holds
    loop {
        let head = keep.div_ceil(2);
        let tail = keep - head;
        let chars: usize = lines[..head]
            .iter()
            .chain(lines[lines.len() - tail..].iter())
            .map(|l| l.len() + 1)
            .sum();
        if chars <= config.max_chars || keep <= 2 {
            break;
        }
        keep -= 2;
    }

    let head = keep.div_ceil(2);
    let tail = keep - head;
    let omitted = lines.len() - keep;

    let mut excerpt = String::new();
    for line in &lines[..head] {
        excerpt.push_str(line);
        excerpt.push('\n');
    }
    if omitted > 0 {
        excerpt.push_str(&format!("[... {omitted} turns omitted ...]\n"));
    }
    for line in &lines[lines.len() - tail..] {
        excerpt.push_str(line);
        excerpt.push('\n');
    }

    excerpt
}
