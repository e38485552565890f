use serde::Serialize;

use super::utils::{format_options, response_schema, Result, SNOMED_BROWSER_LINK};
use crate::dataset::{AnswerLabel, Options};
use crate::results::ValidatorVerdict;
use crate::utils::render_template;

const MESSAGE_INSTRUCTIONS: &str = "\
You are a medical expert with full SNOMED CT ontology awareness.

Your tasks:
1. Check whether the prior answer is clinically correct. Do NOT rely on dataset labels.
2. Validate and fix the SNOMED CT concepts provided.
3. Add missing, highly relevant SNOMED CT concepts.
4. Correct any incorrect concept IDs or relationships.
5. For each concept, add the official SNOMED CT browser link:
   {browser_link}
6. Return ONLY valid JSON conforming to the JSON schema below.
7. Do NOT reveal dataset answers.

JSON schema:

{schema}

Question:
{question}

Options:
{options}

Prior answer: {model_answer}

Prior reasoning:
{reasoning}\
";

/// What the generation run produced for one question.
#[derive(Debug, Clone)]
pub struct PriorOutput<'a> {
    pub question: &'a str,
    pub options: &'a Options,
    pub model_answer: Option<AnswerLabel>,
    /// Structured reasoning as pretty JSON, or the raw text when the model's
    /// output could not be parsed.
    pub reasoning: &'a str,
}

#[derive(Serialize)]
struct MessageInstructions<'a> {
    browser_link: &'static str,
    schema: String,
    question: &'a str,
    options: String,
    model_answer: &'static str,
    reasoning: &'a str,
}

impl<'a> MessageInstructions<'a> {
    fn new(prior: &PriorOutput<'a>) -> Result<Self> {
        Ok(Self {
            browser_link: SNOMED_BROWSER_LINK,
            schema: response_schema::<ValidatorVerdict>()?,
            question: prior.question,
            options: format_options(prior.options),
            model_answer: prior.model_answer.map_or("none given", |x| x.as_str()),
            reasoning: prior.reasoning,
        })
    }

    fn render(&self) -> Result<String> {
        Ok(render_template(MESSAGE_INSTRUCTIONS, &self)?)
    }
}

/// Prompt asking the model to critique and enhance a prior answer.
///
/// Only the prior output is shown; the dataset's ground truth never is.
pub fn validation_prompt(prior: &PriorOutput<'_>) -> Result<String> {
    MessageInstructions::new(prior)?.render()
}
