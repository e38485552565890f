//! Prompts sent to the model for each kind of run.

pub mod generate;
pub mod smoke;
pub mod utils;
pub mod validate;

pub use generate::generation_prompt;
pub use smoke::smoke_prompt;
pub use validate::{validation_prompt, PriorOutput};
