use serde::Serialize;

use super::utils::{format_options, Result, SYSTEM_IDENTITY};
use crate::dataset::QuestionRecord;
use crate::utils::render_template;

const MESSAGE_INSTRUCTIONS: &str = "\
{system_identity}
Analyze the following medical question using SNOMED CT concepts and relationships \
(such as 'is-a', 'associated finding', 'causative agent', 'morphologic abnormality', etc.) \
to arrive at the most accurate answer.

Question: {question}

Options:
{options}

For each option:
1. Identify the relevant SNOMED CT concepts.
2. Describe their hierarchical relationships and clinical meaning.
3. Explain how these concepts relate to the question.
4. Conclude with the most likely correct answer and provide reasoning \
grounded in SNOMED CT structure.

Format the output as:
- Concept mapping (for each option)
- SNOMED relationships used
- Step-by-step reasoning
- Final answer\
";

#[derive(Serialize)]
struct MessageInstructions<'a> {
    system_identity: &'static str,
    question: &'a str,
    options: String,
}

/// Free-form reasoning prompt for a single sample.
pub fn smoke_prompt(record: &QuestionRecord) -> Result<String> {
    let instructions = MessageInstructions {
        system_identity: SYSTEM_IDENTITY,
        question: &record.question,
        options: format_options(&record.options),
    };
    Ok(render_template(MESSAGE_INSTRUCTIONS, &instructions)?)
}
