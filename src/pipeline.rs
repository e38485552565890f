//! The sequential driver loop and the two batch stages it runs.

use std::time::Duration;

use serde::Serialize;

use crate::dataset::{AnswerLabel, Options, QuestionRecord};
use crate::model::{ModelClient, TransportError};
use crate::normalize::{reasoning_entry, validation_entry};
use crate::output::{self, ResultWriter};
use crate::prompt::{self, generation_prompt, smoke_prompt, validation_prompt, PriorOutput};
use crate::results::{Entry, ErrorRecord, ReasoningResult, ValidationResult};
use crate::utils::pretty_json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Prompt(#[from] prompt::utils::Error),
    #[error(transparent)]
    Model(#[from] TransportError),
    #[error("no reasoning to validate: {0}")]
    NoPriorReasoning(String),
    #[error(transparent)]
    Output(#[from] output::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

/// One kind of per-record model call.
pub trait Stage {
    type Input;
    type Output: Serialize;

    fn record_id(&self, input: &Self::Input) -> u64;

    fn prompt(&self, input: &Self::Input) -> Result<String>;

    /// Build the entry for a response. Never fails.
    fn normalize(&self, input: &Self::Input, text: &str) -> Entry<Self::Output>;

    /// Build the entry for a record that could not be processed.
    fn failed(&self, input: &Self::Input, error: &Error) -> ErrorRecord;
}

/// Structured SNOMED CT reasoning for dataset questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationStage;

impl Stage for GenerationStage {
    type Input = QuestionRecord;
    type Output = ReasoningResult;

    fn record_id(&self, input: &QuestionRecord) -> u64 {
        input.id
    }

    fn prompt(&self, input: &QuestionRecord) -> Result<String> {
        Ok(generation_prompt(input)?)
    }

    fn normalize(&self, input: &QuestionRecord, text: &str) -> Entry<ReasoningResult> {
        reasoning_entry(input, text)
    }

    fn failed(&self, input: &QuestionRecord, error: &Error) -> ErrorRecord {
        ErrorRecord {
            id: input.id,
            question: Some(input.question.clone()),
            options: Some(input.options.clone()),
            error: error.to_string(),
        }
    }
}

/// Second opinion on the output of a [`GenerationStage`] run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationStage;

impl ValidationStage {
    fn question(input: &Entry<ReasoningResult>) -> Option<(&str, &Options, Option<AnswerLabel>)> {
        match input {
            Entry::Ok(result) => Some((result.question.as_str(), &result.options, result.model_answer)),
            Entry::Fallback(fallback) => Some((fallback.question.as_str(), &fallback.options, None)),
            Entry::Error(_) => None,
        }
    }
}

impl Stage for ValidationStage {
    type Input = Entry<ReasoningResult>;
    type Output = ValidationResult;

    fn record_id(&self, input: &Entry<ReasoningResult>) -> u64 {
        match input {
            Entry::Ok(result) => result.id,
            Entry::Fallback(fallback) => fallback.id,
            Entry::Error(error) => error.id,
        }
    }

    fn prompt(&self, input: &Entry<ReasoningResult>) -> Result<String> {
        let justification;
        let (question, options, model_answer, reasoning) = match input {
            Entry::Ok(result) => {
                justification =
                    pretty_json(&result.justification).map_err(prompt::utils::Error::from)?;
                (
                    result.question.as_str(),
                    &result.options,
                    result.model_answer,
                    justification.as_str(),
                )
            }
            Entry::Fallback(fallback) => (
                fallback.question.as_str(),
                &fallback.options,
                None,
                fallback.raw.as_str(),
            ),
            Entry::Error(error) => return Err(Error::NoPriorReasoning(error.error.clone())),
        };
        Ok(validation_prompt(&PriorOutput {
            question,
            options,
            model_answer,
            reasoning,
        })?)
    }

    fn normalize(&self, input: &Entry<ReasoningResult>, text: &str) -> Entry<ValidationResult> {
        let id = self.record_id(input);
        match Self::question(input) {
            Some((question, options, model_answer)) => {
                validation_entry(id, question, options, model_answer, text)
            }
            None => Entry::Error(self.failed(
                input,
                &Error::NoPriorReasoning("generation stage recorded an error".to_owned()),
            )),
        }
    }

    fn failed(&self, input: &Entry<ReasoningResult>, error: &Error) -> ErrorRecord {
        let (question, options) = match input {
            Entry::Ok(result) => (Some(result.question.clone()), Some(result.options.clone())),
            Entry::Fallback(fallback) => (Some(fallback.question.clone()), Some(fallback.options.clone())),
            Entry::Error(record) => (record.question.clone(), record.options.clone()),
        };
        ErrorRecord {
            id: self.record_id(input),
            question,
            options,
            error: error.to_string(),
        }
    }
}

/// Counts of each entry status in a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub ok: usize,
    pub fallback: usize,
    pub errors: usize,
}

impl RunSummary {
    pub fn tally<T>(entries: &[Entry<T>]) -> Self {
        entries.iter().fold(Self::default(), |mut summary, entry| {
            summary.processed += 1;
            match entry {
                Entry::Ok(_) => summary.ok += 1,
                Entry::Fallback(_) => summary.fallback += 1,
                Entry::Error(_) => summary.errors += 1,
            }
            summary
        })
    }
}

/// Number of parsed answers that agree with the dataset's ground truth.
pub fn count_correct(records: &[QuestionRecord], entries: &[Entry<ReasoningResult>]) -> usize {
    records
        .iter()
        .zip(entries)
        .filter(|(record, entry)| {
            let answer = entry.ok().and_then(|result| result.model_answer);
            answer.is_some() && answer == record.ground_truth()
        })
        .count()
}

/// Runs a [`Stage`] over its inputs one at a time.
pub struct Driver<'a> {
    client: &'a dyn ModelClient,
    writer: ResultWriter,
    delay: Duration,
}

impl<'a> Driver<'a> {
    pub fn new(client: &'a dyn ModelClient, writer: ResultWriter, delay: Duration) -> Self {
        Self {
            client,
            writer,
            delay,
        }
    }

    /// Process every input in order, rewriting the output file after each.
    ///
    /// A failing record becomes an error entry and the loop moves on. The
    /// only fatal error is an output file that cannot be written even after
    /// the failing record's entry was replaced by an error entry.
    pub async fn run<S: Stage>(&self, stage: &S, inputs: &[S::Input]) -> Result<Vec<Entry<S::Output>>> {
        let total = inputs.len();
        let mut entries: Vec<Entry<S::Output>> = Vec::with_capacity(total);
        for (idx, input) in inputs.iter().enumerate() {
            if idx > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let id = stage.record_id(input);
            tracing::info!(id, position = idx + 1, total, "processing record");

            let entry = match self.process(stage, input).await {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(id, error = %err, "record failed");
                    Entry::Error(stage.failed(input, &err))
                }
            };
            tracing::info!(id, status = entry.status(), "record processed");
            entries.push(entry);

            if let Err(err) = self.writer.write_all(&entries) {
                let err = Error::Output(err);
                tracing::error!(id, error = %err, "failed to write results");
                entries.pop();
                entries.push(Entry::Error(stage.failed(input, &err)));
                self.writer.write_all(&entries)?;
            }
        }
        Ok(entries)
    }

    async fn process<S: Stage>(&self, stage: &S, input: &S::Input) -> Result<Entry<S::Output>> {
        let prompt = stage.prompt(input)?;
        let text = self.client.send(&prompt).await?;
        Ok(stage.normalize(input, &text))
    }
}

/// Free-form reasoning for one record, returned as the model wrote it.
pub async fn smoke(client: &dyn ModelClient, record: &QuestionRecord) -> Result<String> {
    let prompt = smoke_prompt(record)?;
    Ok(client.send(&prompt).await?)
}
