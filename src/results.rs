//! Records written to the output collections, and the JSON shapes the model
//! is asked to return.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::{deserialize_lenient_label, AnswerLabel, Options};

/// Marker stored in fallback records.
pub const INVALID_JSON: &str = "Invalid JSON returned";

/// One element of an output collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Entry<T> {
    /// The model returned parseable structured output.
    Ok(T),
    /// The model answered but its output could not be parsed.
    Fallback(FallbackRecord),
    /// The record could not be processed.
    Error(ErrorRecord),
}

impl<T> Entry<T> {
    pub fn status(&self) -> &'static str {
        match self {
            Entry::Ok(_) => "ok",
            Entry::Fallback(_) => "fallback",
            Entry::Error(_) => "error",
        }
    }

    pub fn ok(&self) -> Option<&T> {
        match self {
            Entry::Ok(result) => Some(result),
            _ => None,
        }
    }
}

/// Structured reasoning for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResult {
    pub id: u64,
    pub question: String,
    pub options: Options,
    #[serde(
        default,
        alias = "gemini_answer",
        deserialize_with = "deserialize_lenient_label"
    )]
    pub model_answer: Option<AnswerLabel>,
    #[serde(default)]
    pub justification: Value,
}

/// A second opinion on a [`ReasoningResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub id: u64,
    pub question: String,
    pub options: Options,
    #[serde(
        default,
        alias = "gemini_answer",
        deserialize_with = "deserialize_lenient_label"
    )]
    pub model_answer: Option<AnswerLabel>,
    #[serde(default, deserialize_with = "deserialize_lenient_label")]
    pub validator_answer: Option<AnswerLabel>,
    #[serde(default)]
    pub is_consistent_with_reasoning: Option<bool>,
    #[serde(default)]
    pub enhanced_snomed_reasoning: Value,
}

/// Model output kept verbatim because it was not valid JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRecord {
    pub id: u64,
    pub question: String,
    pub options: Options,
    pub error: String,
    pub raw: String,
}

impl FallbackRecord {
    pub fn new(id: u64, question: &str, options: &Options, raw: &str) -> Self {
        Self {
            id,
            question: question.to_owned(),
            options: options.clone(),
            error: INVALID_JSON.to_owned(),
            raw: raw.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
    pub error: String,
}

#[derive(Debug, Clone, Default, JsonSchema, Serialize, Deserialize)]
pub struct ConceptRef {
    #[schemars(description = "Preferred term of the SNOMED CT concept.")]
    pub name: String,
    #[schemars(description = "SNOMED CT concept identifier (SCTID).")]
    pub snomed_id: String,
    #[schemars(
        description = "https://browser.ihtsdotools.org/?perspective=full&conceptId1=<SCTID>"
    )]
    pub link: String,
}

#[derive(Debug, Clone, Default, JsonSchema, Serialize, Deserialize)]
pub struct OptionAnalysis {
    #[schemars(description = "Option label, A to D.")]
    pub option: String,
    #[schemars(description = "SNOMED CT concepts relevant to this option.")]
    pub concepts: Vec<ConceptRef>,
    #[schemars(description = "How these concepts relate to the question. 50 words or less.")]
    pub analysis: String,
}

#[derive(Debug, Clone, Default, JsonSchema, Serialize, Deserialize)]
pub struct Justification {
    #[schemars(description = "Step-by-step reasoning that leads to the answer.")]
    pub reasoning_summary: String,
    #[schemars(description = "Concept mapping for each option.")]
    pub option_analysis: Vec<OptionAnalysis>,
    #[schemars(
        description = "SNOMED CT relationships used, e.g. 'X is-a Y', 'X associated finding Y'."
    )]
    pub relationships: Vec<String>,
    #[schemars(description = "Every SNOMED CT concept referenced in the reasoning.")]
    pub concepts: Vec<ConceptRef>,
}

/// Shape requested from the model by the generation prompt.
#[derive(Debug, Clone, JsonSchema, Serialize, Deserialize)]
pub struct ModelReasoning {
    #[schemars(description = "Label of the most likely correct option.")]
    pub answer: AnswerLabel,
    pub justification: Justification,
}

#[derive(Debug, Clone, Default, JsonSchema, Serialize, Deserialize)]
pub struct EnhancedReasoning {
    #[schemars(description = "Corrected and enhanced reasoning.")]
    pub summary: String,
    #[schemars(description = "Validated, corrected and added SNOMED CT concepts.")]
    pub concepts: Vec<ConceptRef>,
}

/// Shape requested from the model by the validation prompt.
#[derive(Debug, Clone, JsonSchema, Serialize, Deserialize)]
pub struct ValidatorVerdict {
    #[schemars(description = "The option you judge clinically correct.")]
    pub validator_answer: AnswerLabel,
    #[schemars(description = "Whether the prior answer follows from its own reasoning.")]
    pub is_consistent_with_reasoning: bool,
    pub enhanced_snomed_reasoning: EnhancedReasoning,
}
