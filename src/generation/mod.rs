//! Grounded answer and narrative generation

pub mod prompt;

pub use prompt::PromptBuilder;
