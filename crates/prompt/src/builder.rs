//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use docroute_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Every name listed in `definition.variables` must be present. Extra
/// variables are allowed and act as flags for `{{#if}}` blocks; an empty
/// string is falsy.
///
/// # Example
/// ```no_run
/// use docroute_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What were Q3 sales?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    if let Some(missing) = definition
        .variables
        .iter()
        .find(|name| !variables.contains_key(name.as_str()))
    {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' requires variable '{}'",
            definition.id, missing
        )));
    }

    let user = render_template(&definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?
        .map(|s| s.trim_end().to_string())
        .filter(|s| !s.is_empty());

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{builtin_prompt, GROUNDED_PROMPT_ID, ROUTER_PROMPT_ID};
    use crate::types::PromptOutputSpec;

    fn create_test_definition() -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            variables: vec!["question".to_string()],
            system: Some("Be brief.".to_string()),
            template: "Question: {{question}}".to_string(),
            output: PromptOutputSpec {
                format: "text".to_string(),
            },
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Question: {{q}}", &vars(&[("q", "Hello, <world>!")]));
        assert_eq!(result.unwrap(), "Question: Hello, <world>!");
    }

    #[test]
    fn test_build_prompt() {
        let def = create_test_definition();
        let built = build_prompt(&def, vars(&[("question", "Test question")])).unwrap();

        assert_eq!(built.user, "Question: Test question");
        assert_eq!(built.system.as_deref(), Some("Be brief."));
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_missing_variable_is_error() {
        let def = create_test_definition();
        let err = build_prompt(&def, HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("question"));
    }

    #[test]
    fn test_router_prompt_renders_destinations() {
        let def = builtin_prompt(ROUTER_PROMPT_ID).unwrap().unwrap();
        let built = build_prompt(
            &def,
            vars(&[
                ("destinations", "tabular: Sales figures"),
                ("input", "What were Q3 sales?"),
            ]),
        )
        .unwrap();

        assert!(built.user.contains("tabular: Sales figures"));
        assert!(built.user.contains("What were Q3 sales?"));
    }

    #[test]
    fn test_grounded_prompt_caution_only_when_flagged() {
        let def = builtin_prompt(GROUNDED_PROMPT_ID).unwrap().unwrap();

        let confident = build_prompt(
            &def,
            vars(&[("context", "Q3 revenue was 12M"), ("question", "Q3?")]),
        )
        .unwrap();
        let cautious = build_prompt(
            &def,
            vars(&[
                ("context", "Q3 revenue was 12M"),
                ("question", "Q3?"),
                ("lowConfidence", "true"),
            ]),
        )
        .unwrap();

        assert!(confident.user.contains("Q3 revenue was 12M"));
        let confident_system = confident.system.unwrap();
        let cautious_system = cautious.system.unwrap();
        assert!(cautious_system.len() > confident_system.len());
    }
}
