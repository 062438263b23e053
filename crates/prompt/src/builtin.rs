//! Prompts shipped with the binary.
//!
//! Workspaces may override any of them by placing a file with the same id
//! under `.docroute/prompts/`.

use crate::types::PromptDefinition;
use docroute_core::{AppError, AppResult};

/// Chooses a document collection for a question.
pub const ROUTER_PROMPT_ID: &str = "router.default";

/// Answers from retrieved evidence.
pub const GROUNDED_PROMPT_ID: &str = "answer.grounded";

/// Answers from general knowledge when no collection fits.
pub const GENERAL_PROMPT_ID: &str = "answer.general";

const BUILTIN: [(&str, &str); 3] = [
    (
        ROUTER_PROMPT_ID,
        include_str!("../prompts/router.default.yml"),
    ),
    (
        GROUNDED_PROMPT_ID,
        include_str!("../prompts/answer.grounded.yml"),
    ),
    (
        GENERAL_PROMPT_ID,
        include_str!("../prompts/answer.general.yml"),
    ),
];

/// Ids of every built-in prompt.
pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(id, _)| *id)
}

/// Parse a built-in prompt, or `None` if no built-in has this id.
pub fn builtin_prompt(id: &str) -> Option<AppResult<PromptDefinition>> {
    BUILTIN
        .iter()
        .find(|(builtin_id, _)| *builtin_id == id)
        .map(|(_, yaml)| {
            serde_yaml::from_str(yaml).map_err(|e| {
                AppError::Prompt(format!("Built-in prompt '{}' is invalid: {}", id, e))
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtins_parse() {
        for id in builtin_ids() {
            let def = builtin_prompt(id).unwrap().unwrap();
            assert_eq!(def.id, id);
            assert!(!def.template.is_empty());
        }
    }

    #[test]
    fn test_router_prompt_mentions_default() {
        let def = builtin_prompt(ROUTER_PROMPT_ID).unwrap().unwrap();
        assert!(def.template.contains("DEFAULT"));
        assert!(def.variables.contains(&"destinations".to_string()));
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin_prompt("nope").is_none());
    }
}
