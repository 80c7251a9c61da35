use anyhow::bail;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod metadata;
mod semantic;
mod summary;
#[cfg(test)]
mod tests;

use app::{resolve_channel, AnalyzeOpts, AppFactory};

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    setup_logging();

    let paths = AppFactory::get_paths()?;
    let config = AppFactory::create_config(&paths)?;

    match args.command {
        cli::Command::Analyze {
            query,
            top_k,
            max_items,
            no_summary,
        } => {
            let analyzer = AppFactory::create_analyzer(&config)?;
            let opts = AnalyzeOpts {
                top_k,
                max_items,
                summarize: !no_summary,
            };

            let analysis = analyzer.analyze(&query, &opts)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }

        cli::Command::Resolve { query } => {
            let source = AppFactory::create_metadata_source(&config)?;
            let channel = resolve_channel(source.as_ref(), &query)?;
            println!("{}", serde_json::to_string_pretty(&channel)?);
        }

        cli::Command::CheckLlm {} => {
            let client = AppFactory::create_llm_client(&config)?;
            log::info!("checking LLM model={}", client.model());

            if !client.test_connection()? {
                bail!("LLM responded, but not with the expected answer");
            }
            let status = serde_json::json!({ "ok": true, "model": client.model() });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
