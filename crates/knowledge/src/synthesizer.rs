//! Answer synthesis from a routing decision.

use crate::registry::SourceRegistry;
use crate::types::{Answer, Evidence, RouteTarget, RouterDecision, CONFIDENCE_THRESHOLD};
use docroute_core::{AppError, AppResult};
use docroute_llm::{complete_with_timeout, LlmClient, LlmRequest};
use docroute_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const ANSWER_MAX_TOKENS: u32 = 1000;

/// Produces answers, grounded in retrieved evidence when the route allows.
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    grounded_prompt: PromptDefinition,
    general_prompt: PromptDefinition,
    model: String,
    temperature: f32,
}

impl Synthesizer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        grounded_prompt: PromptDefinition,
        general_prompt: PromptDefinition,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            llm,
            grounded_prompt,
            general_prompt,
            model: model.into(),
            temperature,
        }
    }

    /// Answer `query` along the route in `decision`.
    ///
    /// A source route retrieves evidence (using the router's revised
    /// question when it gave one) and answers from it. When the source
    /// returns nothing, or the route is default, the answer comes from
    /// general knowledge and `used_source` is default.
    ///
    /// `timeout` bounds each external call separately.
    ///
    /// # Errors
    /// * [`AppError::Timeout`] when retrieval or completion exceeds `timeout`
    /// * [`AppError::Synthesis`] for any other failure, including an empty reply
    pub async fn synthesize(
        &self,
        query: &str,
        decision: &RouterDecision,
        registry: &SourceRegistry,
        timeout: Duration,
    ) -> AppResult<Answer> {
        match &decision.target {
            RouteTarget::Source(name) => {
                let source = registry.get(name).ok_or_else(|| {
                    AppError::Synthesis(format!("Source '{}' is not registered", name))
                })?;

                let search_query = decision.next_input.as_deref().unwrap_or(query);
                let evidence = source
                    .adapter
                    .search(search_query, timeout)
                    .await
                    .map_err(into_synthesis_error)?;

                if evidence.is_empty() {
                    tracing::info!(
                        "Source '{}' returned no evidence, answering from general knowledge",
                        name
                    );
                    return self.general_answer(query, timeout).await;
                }

                self.grounded_answer(query, name, evidence, timeout).await
            }
            RouteTarget::Default => self.general_answer(query, timeout).await,
        }
    }

    async fn grounded_answer(
        &self,
        query: &str,
        source_name: &str,
        evidence: Vec<Evidence>,
        timeout: Duration,
    ) -> AppResult<Answer> {
        let max_score = evidence.first().map(|e| e.score).unwrap_or(0.0);
        let low_confidence = max_score < CONFIDENCE_THRESHOLD;

        tracing::info!(
            "Answering from '{}' with {} records (max score: {:.3}, low_confidence: {})",
            source_name,
            evidence.len(),
            max_score,
            low_confidence
        );

        let mut variables = HashMap::new();
        variables.insert("context".to_string(), build_context(&evidence));
        variables.insert("question".to_string(), query.to_string());
        if low_confidence {
            variables.insert("lowConfidence".to_string(), "true".to_string());
        }

        let text = self
            .complete(&self.grounded_prompt, variables, timeout)
            .await?;

        Ok(Answer {
            text,
            used_source: RouteTarget::Source(source_name.to_string()),
            evidence,
            low_confidence,
        })
    }

    async fn general_answer(&self, query: &str, timeout: Duration) -> AppResult<Answer> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), query.to_string());

        let text = self
            .complete(&self.general_prompt, variables, timeout)
            .await?;

        Ok(Answer {
            text,
            used_source: RouteTarget::Default,
            evidence: Vec::new(),
            low_confidence: false,
        })
    }

    async fn complete(
        &self,
        prompt: &PromptDefinition,
        variables: HashMap<String, String>,
        timeout: Duration,
    ) -> AppResult<String> {
        let built = build_prompt(prompt, variables).map_err(into_synthesis_error)?;
        tracing::debug!(
            "Built prompt '{}' ({} variables)",
            built.metadata.source_prompt_id,
            built.metadata.resolved_variables.len()
        );

        let mut request = LlmRequest::new(built.user, self.model.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(ANSWER_MAX_TOKENS);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = complete_with_timeout(self.llm.as_ref(), request, timeout)
            .await
            .map_err(into_synthesis_error)?;

        tracing::debug!(
            "Answer from {}: {} prompt + {} completion tokens",
            response.model,
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );

        let text = response.content.trim();
        if text.is_empty() {
            return Err(AppError::Synthesis(
                "The model returned an empty answer".to_string(),
            ));
        }

        Ok(text.to_string())
    }
}

fn into_synthesis_error(err: AppError) -> AppError {
    match err {
        AppError::Timeout(_) | AppError::Synthesis(_) => err,
        other => AppError::Synthesis(other.to_string()),
    }
}

/// Join evidence into the context block of the grounded prompt.
fn build_context(evidence: &[Evidence]) -> String {
    evidence
        .iter()
        .map(|e| e.record.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingProvider, TrigramProvider};
    use crate::retrieval::RetrievalAdapter;
    use crate::types::{DocumentRecord, SourceType};
    use docroute_llm::MockLlmClient;
    use docroute_prompt::builtin::builtin_prompt;
    use crate::vector_index::VectorIndex;
    use docroute_prompt::{GENERAL_PROMPT_ID, GROUNDED_PROMPT_ID};

    /// Index that never finds anything.
    struct NoHitsIndex;

    impl VectorIndex for NoHitsIndex {
        fn insert(&mut self, _embedding: Vec<f32>) -> AppResult<usize> {
            Ok(0)
        }

        fn search(&self, _query_embedding: &[f32], _top_k: usize) -> AppResult<Vec<(usize, f32)>> {
            Ok(Vec::new())
        }

        fn len(&self) -> usize {
            0
        }
    }

    fn synthesizer(llm: MockLlmClient) -> (Synthesizer, Arc<MockLlmClient>) {
        let llm = Arc::new(llm);
        let synth = Synthesizer::new(
            llm.clone(),
            builtin_prompt(GROUNDED_PROMPT_ID).unwrap().unwrap(),
            builtin_prompt(GENERAL_PROMPT_ID).unwrap().unwrap(),
            "test-model",
            0.0,
        );
        (synth, llm)
    }

    async fn registry() -> SourceRegistry {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(256));
        let records = vec![
            DocumentRecord::new("quarter: Q3\nsales: 1200", SourceType::Tabular, "sales.csv#row=0"),
            DocumentRecord::new("quarter: Q4\nsales: 900", SourceType::Tabular, "sales.csv#row=1"),
        ];
        let adapter = RetrievalAdapter::build(SourceType::Tabular, records, 10, embedder)
            .await
            .unwrap();

        let mut registry = SourceRegistry::new();
        registry
            .register("tabular", "about sales numbers", Arc::new(adapter))
            .unwrap();
        registry
    }

    fn route_to(name: &str) -> RouterDecision {
        RouterDecision {
            target: RouteTarget::Source(name.to_string()),
            rationale: String::new(),
            next_input: None,
        }
    }

    #[tokio::test]
    async fn test_grounded_answer_carries_evidence() {
        let (synth, llm) = synthesizer(MockLlmClient::replying("Q3 sales were 1200."));
        let answer = synth
            .synthesize("Q3 sales", &route_to("tabular"), &registry().await, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(answer.text, "Q3 sales were 1200.");
        assert_eq!(answer.used_source, RouteTarget::Source("tabular".to_string()));
        assert_eq!(answer.evidence.len(), 2);
        assert!(answer.evidence[0].record.content.contains("Q3"));

        let request = &llm.requests()[0];
        assert!(request.prompt.contains("sales: 1200"));
        assert!(request.prompt.contains("Question: Q3 sales"));
        assert!(request.system.as_deref().unwrap().contains("don't know"));
    }

    #[tokio::test]
    async fn test_revised_question_drives_retrieval() {
        let (synth, llm) = synthesizer(MockLlmClient::replying("ok"));
        let decision = RouterDecision {
            next_input: Some("Q4 sales".to_string()),
            ..route_to("tabular")
        };

        let answer = synth
            .synthesize("how about later?", &decision, &registry().await, Duration::from_secs(1))
            .await
            .unwrap();

        assert!(answer.evidence[0].record.content.contains("Q4"));
        // the user's own wording still goes to the model
        assert!(llm.requests()[0].prompt.contains("Question: how about later?"));
    }

    #[tokio::test]
    async fn test_low_confidence_flagged() {
        let (synth, llm) = synthesizer(MockLlmClient::replying("Not sure."));
        let answer = synth
            .synthesize(
                "zebra migration patterns",
                &route_to("tabular"),
                &registry().await,
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert!(answer.low_confidence);
        assert!(answer.max_score() < CONFIDENCE_THRESHOLD);
        assert!(llm.requests()[0]
            .system
            .as_deref()
            .unwrap()
            .contains("may not directly answer"));
    }

    #[tokio::test]
    async fn test_default_route_uses_general_knowledge() {
        let (synth, llm) = synthesizer(MockLlmClient::replying("Paris."));
        let answer = synth
            .synthesize(
                "What's the capital of France?",
                &RouterDecision::default_route("none"),
                &registry().await,
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(answer.text, "Paris.");
        assert!(answer.used_source.is_default());
        assert!(answer.evidence.is_empty());
        assert_eq!(llm.requests()[0].prompt, "What's the capital of France?");
    }

    #[tokio::test]
    async fn test_empty_evidence_falls_back_to_general_answer() {
        let (synth, llm) = synthesizer(MockLlmClient::replying("Paris."));
        let adapter = RetrievalAdapter::with_index(
            SourceType::Pdf,
            vec![DocumentRecord::new("iPhone 17 launch", SourceType::Pdf, "iphone.pdf#page=1")],
            Box::new(NoHitsIndex),
            Arc::new(TrigramProvider::new(64)),
            5,
        );
        let mut registry = SourceRegistry::new();
        registry
            .register("pdf", "about phone launches", Arc::new(adapter))
            .unwrap();

        let answer = synth
            .synthesize(
                "What's the capital of France?",
                &route_to("pdf"),
                &registry,
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(answer.text, "Paris.");
        assert_eq!(answer.used_source, RouteTarget::Default);
        assert!(answer.evidence.is_empty());
        assert!(!answer.low_confidence);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "What's the capital of France?");
        assert!(requests[0]
            .system
            .as_deref()
            .unwrap()
            .contains("general knowledge"));
    }

    #[tokio::test]
    async fn test_unknown_source_is_synthesis_error() {
        let (synth, _) = synthesizer(MockLlmClient::replying("x"));
        let err = synth
            .synthesize("q", &route_to("pdf"), &registry().await, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Synthesis(_)));
    }

    #[tokio::test]
    async fn test_empty_reply_is_error() {
        let (synth, _) = synthesizer(MockLlmClient::replying("   "));
        let err = synth
            .synthesize(
                "q",
                &RouterDecision::default_route("none"),
                &registry().await,
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Synthesis(_)));
    }

    #[tokio::test]
    async fn test_service_failure_wrapped() {
        let (synth, _) = synthesizer(MockLlmClient::failing("503"));
        let err = synth
            .synthesize("q", &route_to("tabular"), &registry().await, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Synthesis(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_unrenderable_prompt_is_synthesis_error() {
        let llm = Arc::new(MockLlmClient::replying("x"));
        let mut general = builtin_prompt(GENERAL_PROMPT_ID).unwrap().unwrap();
        general.variables.push("history".to_string());
        let synth = Synthesizer::new(
            llm.clone(),
            builtin_prompt(GROUNDED_PROMPT_ID).unwrap().unwrap(),
            general,
            "test-model",
            0.0,
        );

        let err = synth
            .synthesize(
                "q",
                &RouterDecision::default_route("none"),
                &registry().await,
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Synthesis(msg) if msg.contains("history")));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_passes_through() {
        let (synth, _) =
            synthesizer(MockLlmClient::replying("late").with_delay(Duration::from_millis(200)));
        let err = synth
            .synthesize(
                "q",
                &RouterDecision::default_route("none"),
                &registry().await,
                Duration::from_millis(20),
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
