pub mod prediction;
pub mod transcript;
pub mod utterance;

pub use prediction::*;
pub use transcript::*;
pub use utterance::*;
