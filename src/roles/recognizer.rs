use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::prompt::{build_role_prompt, ExcerptConfig, REFORMAT_INSTRUCTION, SYSTEM_PROMPT};
use crate::error::PipelineError;
use crate::llm::GenerativeModel;
use crate::models::{Role, RolePrediction, Transcript};

/// Configuration for the role recognizer
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// Excerpt bounds for the prompt
    pub excerpt: ExcerptConfig,
    /// Maximum model-call attempts for transient failures
    pub max_attempts: u32,
    /// Backoff base delay; attempt n waits base * 2^n
    pub base_delay: Duration,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            excerpt: ExcerptConfig::default(),
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Shape of the model's structured response
#[derive(Debug, Deserialize)]
struct RoleResponse {
    assignments: Vec<RoleResponseEntry>,
}

#[derive(Debug, Deserialize)]
struct RoleResponseEntry {
    channel_tag: String,
    role: Role,
    #[serde(default)]
    rationale: String,
}

/// Predict a role for every unresolved channel of the transcript.
///
/// Conversations with more than two unresolved channels (conference
/// legs, IVR) only send the two with the greatest total speaking time
/// to the model; the rest map to UNKNOWN. Equal speaking time breaks
/// toward the lower channel ordinal, which is arbitrary but
/// deterministic.
pub async fn predict_roles<M: GenerativeModel>(
    model: &M,
    transcript: &Transcript,
    config: &RecognizerConfig,
) -> Result<RolePrediction, PipelineError> {
    let unresolved: Vec<String> = transcript
        .unresolved_channels()
        .into_iter()
        .map(str::to_string)
        .collect();

    if unresolved.is_empty() {
        debug!("no unresolved channels, nothing to predict");
        return Ok(RolePrediction::default());
    }

    let mut prediction = RolePrediction::default();
    let candidates = select_candidates(transcript, unresolved, &mut prediction);

    let base_prompt = build_role_prompt(transcript, &candidates, &config.excerpt);
    let response = request_labels(model, &base_prompt, &candidates, config).await?;

    for entry in response.assignments {
        prediction.assign(entry.channel_tag, entry.role, entry.rationale);
    }

    check_two_channel_contradiction(&candidates, &prediction)?;

    info!(
        channels = candidates.len(),
        "role prediction complete: {}",
        candidates
            .iter()
            .map(|c| {
                let role = prediction
                    .role_for(c)
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "-".to_string());
                format!("{c}={role}")
            })
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(prediction)
}

/// Pick the channels actually sent to the model; sideline the rest as
/// UNKNOWN when there are more than two.
fn select_candidates(
    transcript: &Transcript,
    mut unresolved: Vec<String>,
    prediction: &mut RolePrediction,
) -> Vec<String> {
    if unresolved.len() <= 2 {
        return unresolved;
    }

    unresolved.sort_by(|a, b| {
        transcript
            .speaking_time_ms(b)
            .cmp(&transcript.speaking_time_ms(a))
            .then_with(|| {
                transcript
                    .channel_ordinal(a)
                    .cmp(&transcript.channel_ordinal(b))
            })
    });

    let sidelined = unresolved.split_off(2);
    for channel in sidelined {
        debug!(channel = %channel, "channel not among two most active, marked UNKNOWN");
        prediction.assign(
            channel,
            Role::Unknown,
            "not among the two most active channels",
        );
    }
    unresolved
}

/// Call the model with bounded retries.
///
/// Transient failures back off exponentially up to `max_attempts`; an
/// unparseable response is retried exactly once with a stricter
/// reformatting instruction before failing.
async fn request_labels<M: GenerativeModel>(
    model: &M,
    base_prompt: &str,
    candidates: &[String],
    config: &RecognizerConfig,
) -> Result<RoleResponse, PipelineError> {
    let mut attempt: u32 = 0;
    let mut reformatted = false;
    let mut prompt = base_prompt.to_string();

    loop {
        match model.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => match parse_response(&text, candidates) {
                Ok(response) => return Ok(response),
                Err(detail) if !reformatted => {
                    warn!("model response unparseable, retrying with stricter format: {detail}");
                    reformatted = true;
                    prompt = format!("{base_prompt}{REFORMAT_INSTRUCTION}");
                }
                Err(detail) => return Err(PipelineError::ModelResponse(detail)),
            },
            Err(e) if e.is_transient() && attempt + 1 < config.max_attempts => {
                let delay = config.base_delay * 2u32.pow(attempt);
                warn!(
                    "transient model failure (attempt {} of {}), retrying in {:?}: {e}",
                    attempt + 1,
                    config.max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(PipelineError::ModelCall {
                    attempts: attempt + 1,
                    detail: e.to_string(),
                });
            }
        }
    }
}

fn parse_response(text: &str, candidates: &[String]) -> Result<RoleResponse, String> {
    let cleaned = strip_code_fences(text);
    let response: RoleResponse =
        serde_json::from_str(cleaned).map_err(|e| format!("not valid assignment JSON: {e}"))?;

    for entry in &response.assignments {
        if !candidates.contains(&entry.channel_tag) {
            return Err(format!(
                "response names channel {:?} which was not listed",
                entry.channel_tag
            ));
        }
        if entry.role == Role::Unknown {
            return Err(format!(
                "response assigned {} to channel {:?}, expected AGENT or CUSTOMER",
                entry.role, entry.channel_tag
            ));
        }
    }

    Ok(response)
}

/// Models sometimes wrap JSON-mode output in Markdown fences anyway
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// A two-channel conversation where both channels got the same role is
/// contradictory and must surface, not be guessed around.
fn check_two_channel_contradiction(
    candidates: &[String],
    prediction: &RolePrediction,
) -> Result<(), PipelineError> {
    if candidates.len() != 2 {
        return Ok(());
    }
    let (first, second) = (
        prediction.role_for(&candidates[0]),
        prediction.role_for(&candidates[1]),
    );
    if let (Some(a), Some(b)) = (first, second) {
        if a == b {
            return Err(PipelineError::AmbiguousRole {
                role: a,
                channels: [candidates[0].clone(), candidates[1].clone()],
            });
        }
    }
    Ok(())
}
