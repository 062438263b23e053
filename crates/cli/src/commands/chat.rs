//! Interactive question loop.

use clap::Args;
use docroute_core::{config::AppConfig, AppResult};
use docroute_knowledge::SearchEngine;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::ask::{answer_json, print_answer};

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

/// Answer questions read line by line from stdin
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Per-call deadline in seconds (overrides configuration)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print each answer as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChatCommand {
    /// Execute the chat loop until EOF or an exit word.
    ///
    /// A failed question is reported and the loop continues.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let engine = SearchEngine::from_config(config).await?;
        tracing::info!("{}", engine.load_summary());

        let timeout = self
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| engine.timeout());

        let sources: Vec<String> = engine.sources().into_iter().map(|s| s.name).collect();
        if sources.is_empty() {
            eprintln!("No documents loaded; answers come from general knowledge.");
        } else {
            eprintln!("Sources: {}", sources.join(", "));
        }
        eprintln!("Type a question, or 'exit' to quit.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            eprint!("> ");
            std::io::stderr().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();

            if question.is_empty() {
                continue;
            }
            if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
                break;
            }

            match engine.query_with_timeout(question, timeout).await {
                Ok(answer) if self.json => println!("{}", answer_json(&answer)?),
                Ok(answer) => {
                    print_answer(&answer);
                    println!();
                }
                Err(e) => {
                    tracing::warn!("Question failed: {}", e);
                    eprintln!("Error: {}", e);
                }
            }
        }

        Ok(())
    }
}
