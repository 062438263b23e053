//! Ask command handler.
//!
//! Initializes the engine over the document directory and answers one
//! question.

use clap::Args;
use docroute_core::{config::AppConfig, AppError, AppResult};
use docroute_knowledge::{Answer, SearchEngine};
use std::path::PathBuf;
use std::time::Duration;

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Per-call deadline in seconds (overrides configuration)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.question()?;
        let engine = SearchEngine::from_config(config).await?;
        tracing::info!("{}", engine.load_summary());

        let timeout = self
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| engine.timeout());
        let answer = engine.query_with_timeout(&question, timeout).await?;

        if self.json {
            println!("{}", answer_json(&answer)?);
        } else {
            print_answer(&answer);
        }

        Ok(())
    }

    fn question(&self) -> AppResult<String> {
        if let Some(ref path) = self.file {
            return Ok(std::fs::read_to_string(path)?);
        }

        self.question
            .clone()
            .ok_or_else(|| AppError::InvalidQuery("No question provided".to_string()))
    }
}

/// Print an answer followed by the evidence it was grounded in.
pub(crate) fn print_answer(answer: &Answer) {
    println!("{}", answer.text);

    if answer.used_source.is_default() {
        println!("\n(source: general knowledge)");
        return;
    }

    if answer.low_confidence {
        println!(
            "\n(source: {}, low confidence, best match {:.2})",
            answer.used_source,
            answer.max_score()
        );
    } else {
        println!("\n(source: {})", answer.used_source);
    }

    for (i, evidence) in answer.evidence.iter().enumerate() {
        println!(
            "  [{}] {} ({:.3}): {}",
            i + 1,
            evidence.record.origin,
            evidence.score,
            evidence.record.snippet()
        );
    }
}

/// Render an answer as pretty-printed JSON.
pub(crate) fn answer_json(answer: &Answer) -> AppResult<String> {
    let evidence: Vec<serde_json::Value> = answer
        .evidence
        .iter()
        .map(|e| {
            serde_json::json!({
                "origin": e.record.origin,
                "sourceType": e.record.source_type,
                "score": e.score,
                "snippet": e.record.snippet(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "answer": answer.text,
        "usedSource": answer.used_source.as_str(),
        "lowConfidence": answer.low_confidence,
        "evidence": evidence,
    });

    Ok(serde_json::to_string_pretty(&output)?)
}
