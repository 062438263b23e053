//! Sources command handler.

use clap::Args;
use docroute_core::{config::AppConfig, AppResult};
use docroute_knowledge::SearchEngine;

/// List the sources built from the document directory
#[derive(Args, Debug)]
pub struct SourcesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SourcesCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing sources command");

        let engine = SearchEngine::from_config(config).await?;
        let sources = engine.sources();
        let summary = engine.load_summary();

        if self.json {
            let items: Vec<serde_json::Value> = sources
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "description": s.description,
                        "k": s.k,
                        "records": s.records,
                    })
                })
                .collect();

            let output = serde_json::json!({
                "documents": config.documents,
                "filesLoaded": summary.files_loaded,
                "filesSkipped": summary.files_skipped,
                "sources": items,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("{}", summary);

        if sources.is_empty() {
            println!("No sources registered in {}", config.documents.display());
            return Ok(());
        }

        println!("\nSources ({}):", sources.len());
        for source in &sources {
            println!("  {} ({} records, k = {})", source.name, source.records, source.k);
            println!("    {}", source.description);
        }

        Ok(())
    }
}
