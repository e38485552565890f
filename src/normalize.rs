//! Turning raw model text into result entries.

use serde_json::Value;

use crate::dataset::{AnswerLabel, Options, QuestionRecord};
use crate::results::{Entry, FallbackRecord, ReasoningResult, ValidationResult};

/// Remove the code fence the model tends to wrap its JSON in.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_owned()
}

/// Strip fences and parse. On failure returns the cleaned text.
pub fn parse_structured(text: &str) -> Result<Value, String> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|_| cleaned)
}

/// First of `keys` present in `value` whose text names an option.
fn label_field(value: &Value, keys: &[&str]) -> Option<AnswerLabel> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .filter_map(Value::as_str)
        .find_map(AnswerLabel::extract)
}

/// Normalize the response to a generation prompt.
pub fn reasoning_entry(record: &QuestionRecord, text: &str) -> Entry<ReasoningResult> {
    let value = match parse_structured(text) {
        Ok(value) => value,
        Err(raw) => {
            return Entry::Fallback(FallbackRecord::new(
                record.id,
                &record.question,
                &record.options,
                &raw,
            ))
        }
    };
    let model_answer = label_field(&value, &["answer", "model_answer", "gemini_answer"])
        .or_else(|| {
            value
                .get("justification")
                .and_then(|x| label_field(x, &["answer", "final_answer"]))
        });
    let justification = match value {
        Value::Object(mut fields) => fields
            .remove("justification")
            .unwrap_or(Value::Object(fields)),
        other => other,
    };
    Entry::Ok(ReasoningResult {
        id: record.id,
        question: record.question.clone(),
        options: record.options.clone(),
        model_answer,
        justification,
    })
}

/// Normalize the response to a validation prompt about question `id`.
pub fn validation_entry(
    id: u64,
    question: &str,
    options: &Options,
    model_answer: Option<AnswerLabel>,
    text: &str,
) -> Entry<ValidationResult> {
    let value = match parse_structured(text) {
        Ok(value) => value,
        Err(raw) => return Entry::Fallback(FallbackRecord::new(id, question, options, &raw)),
    };
    let validator_answer = label_field(&value, &["validator_answer", "answer"]);
    let is_consistent_with_reasoning = value
        .get("is_consistent_with_reasoning")
        .and_then(Value::as_bool);
    let enhanced_snomed_reasoning = value
        .get("enhanced_snomed_reasoning")
        .cloned()
        .unwrap_or(value);
    Entry::Ok(ValidationResult {
        id,
        question: question.to_owned(),
        options: options.clone(),
        model_answer,
        validator_answer,
        is_consistent_with_reasoning,
        enhanced_snomed_reasoning,
    })
}
