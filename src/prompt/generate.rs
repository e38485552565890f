use serde::Serialize;

use super::utils::{format_options, response_schema, Result, SNOMED_BROWSER_LINK, SYSTEM_IDENTITY};
use crate::dataset::QuestionRecord;
use crate::results::ModelReasoning;
use crate::utils::render_template;

const MESSAGE_INSTRUCTIONS: &str = "\
{system_identity}
Analyze the following medical question using SNOMED CT concepts and relationships \
(such as 'is-a', 'associated finding', 'causative agent', 'morphologic abnormality') \
to arrive at the most accurate answer.

Question: {question}

Options:
{options}

For each option:
1. Identify the relevant SNOMED CT concepts.
2. Describe their hierarchical relationships and clinical meaning.
3. Explain how these concepts relate to the question.

Then conclude with the letter of the most likely correct answer \
and reasoning grounded in SNOMED CT structure.

For every concept give its SNOMED CT identifier and the official browser link:
{browser_link}

Return ONLY valid JSON conforming to this JSON schema:

{schema}\
";

#[derive(Serialize)]
struct MessageInstructions<'a> {
    system_identity: &'static str,
    question: &'a str,
    options: String,
    browser_link: &'static str,
    schema: String,
}

impl<'a> MessageInstructions<'a> {
    fn new(record: &'a QuestionRecord) -> Result<Self> {
        Ok(Self {
            system_identity: SYSTEM_IDENTITY,
            question: &record.question,
            options: format_options(&record.options),
            browser_link: SNOMED_BROWSER_LINK,
            schema: response_schema::<ModelReasoning>()?,
        })
    }

    fn render(&self) -> Result<String> {
        Ok(render_template(MESSAGE_INSTRUCTIONS, &self)?)
    }
}

/// Prompt asking for a structured, SNOMED CT grounded answer to `record`.
pub fn generation_prompt(record: &QuestionRecord) -> Result<String> {
    MessageInstructions::new(record)?.render()
}
