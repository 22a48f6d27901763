//! Prompt builder for rendering templates and injecting context.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use lexcase_core::{AppError, AppResult};
use serde_json::{json, Value};

/// Build the chat prompt for a user message and the retrieved passages.
///
/// Passages are joined with newlines into `{{context}}`; with no passages the
/// context block is left out entirely.
///
/// # Example
/// ```
/// use lexcase_prompt::{build_rag_prompt, builtin_prompt, LEGAL_CHAT_PROMPT_ID};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(LEGAL_CHAT_PROMPT_ID).unwrap();
/// let context = vec!["BNS 303: Theft.".to_string()];
/// let built = build_rag_prompt(&def, "Is this theft?", &context)?;
/// assert!(built.user.contains("Relevant Legal Context:"));
/// # Ok(())
/// # }
/// ```
pub fn build_rag_prompt(
    definition: &PromptDefinition,
    message: &str,
    context: &[String],
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        "Building prompt {} with {} context passages",
        definition.id,
        context.len()
    );

    let variables = json!({
        "system": definition.system.clone().unwrap_or_default(),
        "context": context.join("\n"),
        "message": message,
    });

    let rendered = render_template(&definition.template, &variables)?;
    Ok(BuiltPrompt::new(rendered, definition.id.clone(), context.len()))
}

/// Build the case-analysis prompt for a case description or FIR text.
pub fn build_case_analysis_prompt(definition: &PromptDefinition, text: &str) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt {} for {} chars", definition.id, text.chars().count());

    let variables = json!({
        "system": definition.system.clone().unwrap_or_default(),
        "text": text,
    });

    let rendered = render_template(&definition.template, &variables)?;
    Ok(BuiltPrompt::new(rendered, definition.id.clone(), 0))
}

/// Render a Handlebars template with variables.
pub fn render_template(template: &str, variables: &Value) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
