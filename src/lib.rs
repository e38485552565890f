//! # medqa-snomed
//!
//! Asks a hosted language model to answer multiple-choice medical questions
//! with reasoning grounded in SNOMED CT, then asks it again to validate and
//! enhance those answers.
//!
//! A run reads its input, sends one prompt per question through a
//! [`model::ModelClient`], normalizes the reply into an [`results::Entry`] and
//! rewrites the whole output array after every question.

pub mod config;
pub mod dataset;
pub mod model;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod results;
mod utils;

pub use config::{ModelConfig, Provider, RunConfig};
pub use dataset::{AnswerLabel, Options, QuestionRecord};
pub use model::{build_client, ModelClient, TransportError};
pub use pipeline::{Driver, GenerationStage, RunSummary, ValidationStage};
pub use results::{Entry, ReasoningResult, ValidationResult};

/// Library errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Dataset(#[from] dataset::Error),
    #[error(transparent)]
    Prompt(#[from] prompt::utils::Error),
    #[error(transparent)]
    Model(#[from] model::TransportError),
    #[error(transparent)]
    Output(#[from] output::Error),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// A run aborted; per-record failures never reach this.
    #[error(transparent)]
    Pipeline(#[from] pipeline::Error),
}

/// Result with the library [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
