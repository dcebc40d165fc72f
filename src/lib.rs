pub mod builder;
pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod roles;

pub use builder::{build, BuilderConfig};
pub use error::PipelineError;
pub use io::{read_vendor_file, render_human, write_human, ConversationPayload};
pub use llm::{GeminiClient, GeminiConfig, GenerativeModel, ModelError};
pub use models::{Role, RoleAssignment, RolePrediction, Transcript, Turn, Utterance, Word};
pub use parsers::{Vendor, VendorPayload};
pub use pipeline::{ConversationOutcome, Pipeline, PipelineConfig};
pub use roles::{combine, predict_roles, ExcerptConfig, RecognizerConfig};
