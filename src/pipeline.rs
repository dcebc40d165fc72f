use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::builder::{build, BuilderConfig};
use crate::error::PipelineError;
use crate::llm::GenerativeModel;
use crate::models::Transcript;
use crate::parsers::VendorPayload;
use crate::roles::{combine, predict_roles, RecognizerConfig};

/// All pipeline knobs, passed in at construction. There is no
/// process-wide mutable configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub builder: BuilderConfig,
    pub recognizer: RecognizerConfig,
}

/// Outcome of one conversation within a batch
#[derive(Debug)]
pub enum ConversationOutcome {
    /// Pipeline completed; role-tagged transcript ready for ingestion
    Completed(Transcript),
    /// Pipeline aborted for this conversation only
    Failed(PipelineError),
    /// Never started because the batch was cancelled
    Skipped,
}

impl ConversationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ConversationOutcome::Completed(_))
    }
}

/// Per-conversation conversion-and-enrichment pipeline:
/// vendor payload -> parse -> build -> predict roles -> combine.
pub struct Pipeline<M> {
    model: M,
    config: PipelineConfig,
}

impl<M: GenerativeModel> Pipeline<M> {
    pub fn new(model: M, config: PipelineConfig) -> Self {
        Self { model, config }
    }

    /// Run one conversation end to end.
    ///
    /// When every channel is already resolved by trusted vendor hints
    /// (the Genesys case) the model is never invoked.
    pub async fn run(&self, payload: &VendorPayload) -> Result<Transcript, PipelineError> {
        let utterances = payload.parse()?;
        let transcript = build(utterances, &self.config.builder)?;

        if transcript.unresolved_channels().is_empty() {
            info!(
                transcript_id = %transcript.transcript_id,
                "all channels resolved by vendor hints, skipping role recognition"
            );
            return Ok(transcript);
        }

        let prediction = predict_roles(&self.model, &transcript, &self.config.recognizer).await?;
        Ok(combine(&transcript, &prediction))
    }
}

impl<M: GenerativeModel + 'static> Pipeline<M> {
    /// Run a batch of conversations with bounded parallelism.
    ///
    /// Conversations are independent: each failure is collected into
    /// its slot rather than failing the batch. Each slot is written
    /// exactly once. Setting `cancel` stops conversations that have
    /// not started yet (cooperative checkpoint); in-flight ones run to
    /// completion.
    pub async fn run_batch(
        self: &Arc<Self>,
        payloads: Vec<VendorPayload>,
        concurrency: usize,
        cancel: Arc<AtomicBool>,
    ) -> Vec<ConversationOutcome> {
        let total = payloads.len();
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, payload) in payloads.into_iter().enumerate() {
            let pipeline = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let cancel = Arc::clone(&cancel);

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, ConversationOutcome::Skipped),
                };
                if cancel.load(Ordering::SeqCst) {
                    return (index, ConversationOutcome::Skipped);
                }
                let outcome = match pipeline.run(&payload).await {
                    Ok(transcript) => ConversationOutcome::Completed(transcript),
                    Err(e) => {
                        warn!("conversation {index} failed ({}): {e}", e.kind());
                        ConversationOutcome::Failed(e)
                    }
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<ConversationOutcome>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!("batch task panicked: {e}"),
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(ConversationOutcome::Skipped))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::llm::ModelError;
    use crate::models::Role;
    use crate::parsers::Vendor;

    /// Mock model returning one fixed response and counting calls
    struct CountingModel {
        response: String,
        calls: AtomicUsize,
    }

    impl CountingModel {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GenerativeModel for CountingModel {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    const AWS_TWO_SPEAKERS: &str = r#"{
        "Transcript": [
            {"ParticipantId": "spk_0", "Content": "Thanks for calling, how can I help?", "BeginOffsetMillis": 0, "EndOffsetMillis": 2000},
            {"ParticipantId": "spk_1", "Content": "My order never arrived.", "BeginOffsetMillis": 2500, "EndOffsetMillis": 4200},
            {"ParticipantId": "spk_0", "Content": "Let me look into that for you.", "BeginOffsetMillis": 4600, "EndOffsetMillis": 6300}
        ]
    }"#;

    const GENESYS_HINTED: &str = r#"{
        "transcripts": [{
            "phrases": [
                {"text": "Welcome to support.", "participantPurpose": "internal", "startTimeMs": 0, "endTimeMs": 1500},
                {"text": "Hello, I have a billing question.", "participantPurpose": "external", "startTimeMs": 1800, "endTimeMs": 3600}
            ]
        }]
    }"#;

    const LABELS_SPK0_AGENT: &str = r#"{"assignments": [
        {"channel_tag": "spk_0", "role": "AGENT", "rationale": "offers help"},
        {"channel_tag": "spk_1", "role": "CUSTOMER", "rationale": "reports an issue"}
    ]}"#;

    fn pipeline(model: CountingModel) -> Pipeline<CountingModel> {
        Pipeline::new(model, PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_aws_pipeline_assigns_predicted_roles() {
        let pipe = pipeline(CountingModel::new(LABELS_SPK0_AGENT));
        let payload = VendorPayload::from_json(Vendor::Aws, AWS_TWO_SPEAKERS).unwrap();

        let transcript = pipe.run(&payload).await.unwrap();

        assert!(transcript.is_fully_resolved());
        for turn in &transcript.turns {
            let expected = if turn.channel_tag == "spk_0" {
                Role::Agent
            } else {
                Role::Customer
            };
            assert_eq!(turn.role, Some(expected), "turn {}", turn.turn_id);
        }
    }

    #[tokio::test]
    async fn test_genesys_hints_bypass_the_model() {
        let model = CountingModel::new(LABELS_SPK0_AGENT);
        let pipe = pipeline(model);
        let payload = VendorPayload::from_json(Vendor::Genesys, GENESYS_HINTED).unwrap();

        let transcript = pipe.run(&payload).await.unwrap();

        assert!(transcript.is_fully_resolved());
        assert_eq!(transcript.turns[0].role, Some(Role::Agent));
        assert_eq!(transcript.turns[1].role, Some(Role::Customer));
        // The trusted hints short-circuit prediction entirely
        assert_eq!(pipe.model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_contradictory_labels_produce_no_transcript() {
        let both_agent = r#"{"assignments": [
            {"channel_tag": "spk_0", "role": "AGENT", "rationale": "helps"},
            {"channel_tag": "spk_1", "role": "AGENT", "rationale": "helps too"}
        ]}"#;
        let pipe = pipeline(CountingModel::new(both_agent));
        let payload = VendorPayload::from_json(Vendor::Aws, AWS_TWO_SPEAKERS).unwrap();

        let err = pipe.run(&payload).await.unwrap_err();
        assert!(matches!(err, PipelineError::AmbiguousRole { .. }));
    }

    #[tokio::test]
    async fn test_batch_collects_per_conversation_outcomes() {
        let pipe = Arc::new(pipeline(CountingModel::new(LABELS_SPK0_AGENT)));
        let good = VendorPayload::from_json(Vendor::Aws, AWS_TWO_SPEAKERS).unwrap();
        let empty = VendorPayload::from_json(Vendor::Aws, r#"{"Transcript": []}"#).unwrap();

        let outcomes = pipe
            .run_batch(
                vec![good.clone(), empty, good],
                2,
                Arc::new(AtomicBool::new(false)),
            )
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_completed());
        assert!(matches!(
            outcomes[1],
            ConversationOutcome::Failed(PipelineError::EmptyTranscript)
        ));
        assert!(outcomes[2].is_completed());
    }

    #[tokio::test]
    async fn test_cancelled_batch_skips_everything() {
        let pipe = Arc::new(pipeline(CountingModel::new(LABELS_SPK0_AGENT)));
        let payload = VendorPayload::from_json(Vendor::Aws, AWS_TWO_SPEAKERS).unwrap();

        let outcomes = pipe
            .run_batch(
                vec![payload.clone(), payload],
                1,
                Arc::new(AtomicBool::new(true)),
            )
            .await;

        assert!(outcomes
            .iter()
            .all(|o| matches!(o, ConversationOutcome::Skipped)));
        assert_eq!(pipe.model.call_count(), 0);
    }
}
