use itertools::Itertools;
use schemars::{schema_for, JsonSchema};

use crate::dataset::Options;
use crate::utils::pretty_json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    TemplateError(#[from] crate::utils::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

pub const SYSTEM_IDENTITY: &str = "\
You are a clinical reasoning expert specializing in SNOMED CT ontology.\
";

/// Official SNOMED CT browser link, with `<ID>` standing for the concept id.
pub const SNOMED_BROWSER_LINK: &str =
    "https://browser.ihtsdotools.org/?perspective=full&conceptId1=<ID>";

/// One option per line, `A. text`.
pub fn format_options(options: &Options) -> String {
    options
        .iter()
        .map(|(label, text)| format!("{}. {}", label, text))
        .join("\n")
}

/// JSON schema of `T`, pretty printed for embedding in a prompt.
pub fn response_schema<T: JsonSchema>() -> Result<String> {
    Ok(pretty_json(&schema_for!(T))?)
}
