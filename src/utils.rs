use serde::Serialize;
use tinytemplate::{format_unescaped, TinyTemplate};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("template error: {0}")]
    TemplateError(#[from] tinytemplate::error::Error),
    #[error("could not serialize template value: {0}")]
    ValueError(#[from] serde_json::Error),
}

type Result<T> = core::result::Result<T, Error>;

/// Render `template` with the fields of `context`.
///
/// Values are inserted verbatim: prompts carry clinical text that must reach
/// the model exactly as it appears in the dataset.
pub fn render_template(template: &str, context: &impl Serialize) -> Result<String> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("prompt", template)?;
    Ok(tt.render("prompt", context)?)
}

/// Two-space indented JSON, the layout used inside prompts and output files.
pub fn pretty_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
