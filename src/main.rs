use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use rolecall::{
    build, combine, read_vendor_file, write_human, BuilderConfig,
    ConversationOutcome, ConversationPayload, ExcerptConfig, GeminiClient, GeminiConfig, Pipeline,
    PipelineConfig, PipelineError, RecognizerConfig, RolePrediction, Transcript, Vendor,
    VendorPayload,
};

#[derive(Parser)]
#[command(name = "rolecall")]
#[command(author, version, about = "Call-center transcript normalization and role recognition", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VendorArg {
    Genesys,
    Aws,
    SttV1,
    SttV2,
}

impl From<VendorArg> for Vendor {
    fn from(arg: VendorArg) -> Self {
        match arg {
            VendorArg::Genesys => Vendor::Genesys,
            VendorArg::Aws => Vendor::Aws,
            VendorArg::SttV1 => Vendor::SttV1,
            VendorArg::SttV2 => Vendor::SttV2,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize one transcript and tag speaker roles
    Process {
        /// Source vendor format
        #[arg(short = 'f', long, value_enum)]
        vendor: VendorArg,

        /// Input transcript file (vendor JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the ingestion payload (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Output file for a human-readable transcript (text)
        #[arg(long)]
        human_readable: Option<PathBuf>,

        /// Skip the model call; unhinted channels resolve to UNKNOWN
        #[arg(long)]
        skip_roles: bool,

        /// Gemini model name (default from GEMINI_API_KEY config)
        #[arg(long)]
        model: Option<String>,

        /// Absolute start time of the recording (RFC 3339)
        #[arg(long)]
        recorded_at: Option<String>,

        /// Same-channel overlap tolerance in milliseconds
        #[arg(long, default_value = "0")]
        overlap_tolerance_ms: u64,

        /// Maximum conversation turns sent to the model
        #[arg(long, default_value = "60")]
        max_excerpt_turns: usize,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Process many transcripts concurrently
    Batch {
        /// Source vendor format (shared by all inputs)
        #[arg(short = 'f', long, value_enum)]
        vendor: VendorArg,

        /// Input transcript files
        #[arg(short, long, required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Directory for the per-conversation output payloads
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Maximum conversations processed at once
        #[arg(short, long, default_value = "4")]
        concurrency: usize,

        /// Gemini model name
        #[arg(long)]
        model: Option<String>,

        /// Same-channel overlap tolerance in milliseconds
        #[arg(long, default_value = "0")]
        overlap_tolerance_ms: u64,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse and build a transcript, then print channel statistics
    Inspect {
        /// Source vendor format
        #[arg(short = 'f', long, value_enum)]
        vendor: VendorArg,

        /// Input transcript file (vendor JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            vendor,
            input,
            output,
            human_readable,
            skip_roles,
            model,
            recorded_at,
            overlap_tolerance_ms,
            max_excerpt_turns,
            verbose,
        } => {
            setup_logging(verbose);
            process_transcript(
                vendor.into(),
                input,
                output,
                human_readable,
                skip_roles,
                model,
                recorded_at,
                overlap_tolerance_ms,
                max_excerpt_turns,
            )
            .await
        }
        Commands::Batch {
            vendor,
            inputs,
            output_dir,
            concurrency,
            model,
            overlap_tolerance_ms,
            verbose,
        } => {
            setup_logging(verbose);
            batch_transcripts(
                vendor.into(),
                inputs,
                output_dir,
                concurrency,
                model,
                overlap_tolerance_ms,
            )
            .await
        }
        Commands::Inspect {
            vendor,
            input,
            verbose,
        } => {
            setup_logging(verbose);
            inspect_transcript(vendor.into(), input)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn parse_recorded_at(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("Invalid --recorded-at value: {v:?}"))
        })
        .transpose()
}

fn pipeline_config(
    overlap_tolerance_ms: u64,
    max_excerpt_turns: usize,
    recorded_at: Option<DateTime<Utc>>,
) -> PipelineConfig {
    PipelineConfig {
        builder: BuilderConfig {
            overlap_tolerance_ms,
            recorded_at,
        },
        recognizer: RecognizerConfig {
            excerpt: ExcerptConfig {
                max_turns: max_excerpt_turns,
                ..Default::default()
            },
            ..Default::default()
        },
    }
}

fn gemini_client(model: Option<String>) -> Result<GeminiClient> {
    let mut config = GeminiConfig::from_env()?;
    if let Some(model) = model {
        config.model = model;
    }
    Ok(GeminiClient::new(config))
}

async fn process_transcript(
    vendor: Vendor,
    input: PathBuf,
    output: PathBuf,
    human_readable: Option<PathBuf>,
    skip_roles: bool,
    model: Option<String>,
    recorded_at: Option<String>,
    overlap_tolerance_ms: u64,
    max_excerpt_turns: usize,
) -> Result<()> {
    info!("Loading {vendor} transcript from {input:?}");
    let payload = read_vendor_file(&input, vendor)?;
    let recorded_at = parse_recorded_at(recorded_at.as_deref())?;
    let config = pipeline_config(overlap_tolerance_ms, max_excerpt_turns, recorded_at);

    let transcript = if skip_roles {
        info!("Skipping role recognition (--skip-roles)");
        let utterances = payload.parse()?;
        let built = build(utterances, &config.builder)?;
        combine(&built, &RolePrediction::default())
    } else {
        let pipeline = Pipeline::new(gemini_client(model)?, config);
        pipeline
            .run(&payload)
            .await
            .context("Pipeline failed for this conversation")?
    };

    report_roles(&transcript);

    ConversationPayload::from_transcript(&transcript).write_json(&output)?;
    info!("Output written to {output:?}");

    if let Some(human_path) = human_readable {
        write_human(&transcript, &human_path)?;
        info!("Human-readable output written to {human_path:?}");
    }

    Ok(())
}

fn report_roles(transcript: &Transcript) {
    for channel in &transcript.channels {
        let role = transcript
            .turns
            .iter()
            .find(|t| &t.channel_tag == channel)
            .and_then(|t| t.role);
        info!(
            "Channel {}: {} turns, {:.1}s speaking time, role {}",
            channel,
            transcript
                .turns
                .iter()
                .filter(|t| &t.channel_tag == channel)
                .count(),
            transcript.speaking_time_ms(channel) as f64 / 1000.0,
            role.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
        );
    }
}

async fn batch_transcripts(
    vendor: Vendor,
    inputs: Vec<PathBuf>,
    output_dir: PathBuf,
    concurrency: usize,
    model: Option<String>,
    overlap_tolerance_ms: u64,
) -> Result<()> {
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {output_dir:?}"))?;

    let (mut slots, payloads, payload_slots) = read_batch_inputs(&inputs, vendor);

    let config = pipeline_config(overlap_tolerance_ms, 60, None);
    let pipeline = Arc::new(Pipeline::new(gemini_client(model)?, config));

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Cancellation requested, finishing in-flight conversations");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    info!(
        "Processing {} conversations with concurrency {}",
        payloads.len(),
        concurrency
    );
    let outcomes = pipeline.run_batch(payloads, concurrency, cancel).await;
    for (slot, outcome) in payload_slots.into_iter().zip(outcomes) {
        slots[slot] = Some(outcome);
    }

    let mut completed = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;

    for (input, outcome) in inputs.iter().zip(slots) {
        match outcome {
            Some(ConversationOutcome::Completed(transcript)) => {
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| transcript.transcript_id.clone());
                let path = output_dir.join(format!("{stem}.roles.json"));
                ConversationPayload::from_transcript(&transcript).write_json(&path)?;
                info!("{input:?} -> {path:?}");
                completed += 1;
            }
            Some(ConversationOutcome::Failed(e)) => {
                warn!("{input:?} failed ({}): {e}", e.kind());
                failed += 1;
            }
            Some(ConversationOutcome::Skipped) | None => {
                info!("{input:?} skipped (cancelled)");
                skipped += 1;
            }
        }
    }

    info!("Batch complete: {completed} completed, {failed} failed, {skipped} skipped");
    Ok(())
}

/// Read every input up front. An unreadable or malformed file becomes a
/// failed outcome for that conversation rather than aborting the batch.
fn read_batch_inputs(
    inputs: &[PathBuf],
    vendor: Vendor,
) -> (
    Vec<Option<ConversationOutcome>>,
    Vec<VendorPayload>,
    Vec<usize>,
) {
    let mut slots: Vec<Option<ConversationOutcome>> = inputs.iter().map(|_| None).collect();
    let mut payloads = Vec::new();
    let mut payload_slots = Vec::new();

    for (index, input) in inputs.iter().enumerate() {
        match read_vendor_file(input, vendor) {
            Ok(payload) => {
                payload_slots.push(index);
                payloads.push(payload);
            }
            Err(e) => {
                slots[index] = Some(ConversationOutcome::Failed(PipelineError::Format {
                    vendor,
                    detail: format!("{e:#}"),
                }));
            }
        }
    }

    (slots, payloads, payload_slots)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_unreadable_batch_input_becomes_failed_outcome() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        write!(
            good,
            r#"{{"Transcript": [{{"ParticipantId": "spk_0", "Content": "hi", "BeginOffsetMillis": 0, "EndOffsetMillis": 500}}]}}"#
        )
        .unwrap();
        let mut malformed = tempfile::NamedTempFile::new().unwrap();
        write!(malformed, "not json").unwrap();

        let inputs = vec![
            good.path().to_path_buf(),
            malformed.path().to_path_buf(),
            PathBuf::from("/nonexistent/t.json"),
        ];

        let (slots, payloads, payload_slots) = read_batch_inputs(&inputs, Vendor::Aws);

        assert_eq!(payloads.len(), 1);
        assert_eq!(payload_slots, vec![0]);
        assert!(slots[0].is_none());
        assert!(matches!(
            slots[1],
            Some(ConversationOutcome::Failed(PipelineError::Format { .. }))
        ));
        assert!(matches!(
            slots[2],
            Some(ConversationOutcome::Failed(PipelineError::Format { .. }))
        ));
    }
}

fn inspect_transcript(vendor: Vendor, input: PathBuf) -> Result<()> {
    info!("Analyzing {vendor} transcript from {input:?}");
    let payload = read_vendor_file(&input, vendor)?;
    let utterances = payload.parse()?;
    let transcript = build(utterances, &BuilderConfig::default())?;

    println!("Transcript Analysis");
    println!("===================");
    println!("Vendor: {vendor}");
    println!("Turns: {}", transcript.turns.len());
    println!("Channels: {}", transcript.channels.len());
    println!("Duration: {:.1}s", transcript.duration_ms() as f64 / 1000.0);
    println!();

    println!("Channel Statistics");
    println!("------------------");
    for (ordinal, channel) in transcript.channels.iter().enumerate() {
        let turns: Vec<_> = transcript
            .turns
            .iter()
            .filter(|t| &t.channel_tag == channel)
            .collect();
        let words: usize = turns
            .iter()
            .map(|t| {
                t.words
                    .as_ref()
                    .map(|w| w.len())
                    .unwrap_or_else(|| t.text.split_whitespace().count())
            })
            .sum();
        let scored: Vec<f64> = turns.iter().filter_map(|t| t.confidence).collect();
        let avg_confidence = if scored.is_empty() {
            "-".to_string()
        } else {
            format!("{:.2}", scored.iter().sum::<f64>() / scored.len() as f64)
        };
        let hint = turns
            .first()
            .and_then(|t| t.role)
            .map(|r| r.to_string())
            .unwrap_or_else(|| "none".to_string());

        println!(
            "#{} {}: {} turns, {} words, {:.1}s speaking time, avg conf {}, role hint {}",
            ordinal,
            channel,
            turns.len(),
            words,
            transcript.speaking_time_ms(channel) as f64 / 1000.0,
            avg_confidence,
            hint
        );
    }

    let unresolved = transcript.unresolved_channels();
    println!();
    if unresolved.is_empty() {
        println!("All channels carry trusted role hints; role recognition not needed.");
    } else {
        println!("Channels needing role recognition: {}", unresolved.join(", "));
    }

    Ok(())
}
