//! Query router: picks one registered source, or the default route.
//!
//! The completion service sees each source's name and description and
//! replies with a fenced JSON object naming a destination. Any reply that
//! does not name a registered source falls back to [`RouteTarget::Default`];
//! only a failure to reach the service is an error.

use crate::registry::{SourceDescriptor, DEFAULT_ROUTE_NAME};
use crate::types::{RouteTarget, RouterDecision};
use docroute_core::{AppError, AppResult};
use docroute_llm::{complete_with_timeout, LlmClient, LlmRequest};
use docroute_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Maximum tokens the router may generate.
const ROUTER_MAX_TOKENS: u32 = 256;

pub struct Router {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: f32,
}

impl Router {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            llm,
            prompt,
            model: model.into(),
            temperature,
        }
    }

    /// Route `query` to one of `sources` or to the default route.
    ///
    /// The returned target is always a name from `sources` or
    /// [`RouteTarget::Default`].
    ///
    /// # Errors
    /// * [`AppError::InvalidQuery`] for a blank query
    /// * [`AppError::Timeout`] when the completion call exceeds `timeout`
    /// * [`AppError::RouterUnavailable`] when the service cannot be reached
    ///   or the router prompt cannot be rendered
    #[tracing::instrument(skip(self, query, sources), fields(sources = sources.len()))]
    pub async fn route(
        &self,
        query: &str,
        sources: &[SourceDescriptor],
        timeout: Duration,
    ) -> AppResult<RouterDecision> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidQuery("Question cannot be empty".to_string()));
        }

        if sources.is_empty() {
            tracing::debug!("No sources registered, using default route");
            return Ok(RouterDecision::default_route("no sources registered"));
        }

        let destinations = sources
            .iter()
            .map(|s| format!("{}: {}", s.name, s.description))
            .collect::<Vec<_>>()
            .join("\n");

        let mut variables = HashMap::new();
        variables.insert("destinations".to_string(), destinations);
        variables.insert("input".to_string(), query.to_string());
        let built = build_prompt(&self.prompt, variables)
            .map_err(|e| AppError::RouterUnavailable(e.to_string()))?;

        let mut request = LlmRequest::new(built.user, self.model.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(ROUTER_MAX_TOKENS);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = complete_with_timeout(self.llm.as_ref(), request, timeout)
            .await
            .map_err(|e| match e {
                AppError::Timeout(_) => e,
                AppError::Llm(msg) => AppError::RouterUnavailable(msg),
                other => AppError::RouterUnavailable(other.to_string()),
            })?;

        tracing::debug!(
            "Router reply from {}: {} prompt + {} completion tokens",
            response.model,
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );

        let decision = parse_decision(&response.content, sources);
        tracing::info!("Routed to '{}'", decision.target);

        Ok(decision)
    }
}

/// Parse a router reply into a decision over `sources`.
///
/// Accepts a fenced or bare JSON object with `destination` and optional
/// `next_inputs`, or a reply consisting of just a source name.
pub fn parse_decision(reply: &str, sources: &[SourceDescriptor]) -> RouterDecision {
    let rationale = reply.trim().to_string();

    let (destination, next_input) = match extract_json(reply) {
        Some(value) => (
            value
                .get("destination")
                .and_then(|d| d.as_str())
                .map(str::to_string),
            value.get("next_inputs").and_then(next_input_text),
        ),
        None => (Some(rationale.clone()), None),
    };

    let target = destination
        .as_deref()
        .map(clean_name)
        .and_then(|name| resolve_target(name, sources))
        .unwrap_or_else(|| {
            tracing::warn!(
                "Router reply did not name a known source, using default: {:?}",
                truncate(&rationale, 120)
            );
            RouteTarget::Default
        });

    RouterDecision {
        target,
        rationale,
        next_input,
    }
}

fn resolve_target(name: &str, sources: &[SourceDescriptor]) -> Option<RouteTarget> {
    if name.eq_ignore_ascii_case(DEFAULT_ROUTE_NAME) {
        return Some(RouteTarget::Default);
    }
    sources
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .map(|s| RouteTarget::Source(s.name.clone()))
}

fn clean_name(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
        .trim()
}

/// The JSON object inside a reply: a ``` fence first, then the outermost braces.
fn extract_json(reply: &str) -> Option<serde_json::Value> {
    let candidate = fenced_block(reply).unwrap_or(reply);
    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end < start {
        return None;
    }

    serde_json::from_str::<serde_json::Value>(&candidate[start..=end])
        .ok()
        .filter(|v| v.is_object())
}

fn fenced_block(reply: &str) -> Option<&str> {
    let open = reply.find("```")?;
    let after_fence = &reply[open + 3..];
    // skip the language tag line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```").unwrap_or(body.len());
    Some(&body[..close])
}

fn next_input_text(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => Some(s.as_str()),
        // {"query": "..."} or {"input": "..."}
        serde_json::Value::Object(map) => map.values().find_map(|v| v.as_str()),
        _ => None,
    }?;

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
