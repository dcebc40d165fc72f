pub mod combiner;
pub mod prompt;
pub mod recognizer;

pub use combiner::*;
pub use prompt::*;
pub use recognizer::*;
