//! `chatrag`: ingest chat messages, search them, ask grounded questions.
//!
//! ```bash
//! chatrag ingest messages.jsonl
//! chatrag search "привет" -k 5 --author 42 --since 2024-01-01T00:00:00Z
//! chatrag ask "когда встреча?"
//! chatrag maintain
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatrag_core::config::{Config, Settings};
use chatrag_core::filter::SearchFilter;
use chatrag_core::types::Record;
use chatrag_hybrid::{open_engine, LanceEngine, MistralClient, SearchOptions};

#[derive(Parser)]
#[command(name = "chatrag", version, about = "Hybrid retrieval over chat history")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index records from a JSON Lines file, one record per line
    Ingest {
        file: PathBuf,
        #[arg(long, default_value_t = 256)]
        batch_size: usize,
    },
    /// Hybrid search; prints rank, id, fused score and text
    Search {
        query: String,
        #[command(flatten)]
        opts: QueryArgs,
    },
    /// Answer a question from retrieved messages
    Ask {
        question: String,
        #[command(flatten)]
        opts: QueryArgs,
    },
    /// Rebuild the lexical corpus from the sparse store once
    Reload,
    /// Run the periodic lexical reload until Ctrl-C
    Maintain,
}

#[derive(Args)]
struct QueryArgs {
    /// Number of fused results
    #[arg(short, long)]
    k: Option<usize>,
    /// Candidates taken from each ranker
    #[arg(short, long)]
    m: Option<usize>,
    #[arg(long)]
    author: Option<i64>,
    #[arg(long)]
    chat: Option<i64>,
    /// RFC 3339 date-time or unix seconds
    #[arg(long, value_parser = parse_timestamp)]
    since: Option<f64>,
    /// RFC 3339 date-time or unix seconds
    #[arg(long, value_parser = parse_timestamp)]
    until: Option<f64>,
}

impl QueryArgs {
    fn options(&self, settings: &Settings) -> SearchOptions {
        let defaults = SearchOptions::from(&settings.retrieval);
        let filter = SearchFilter {
            author_id: self.author,
            chat_id: self.chat,
            since: self.since,
            until: self.until,
        };
        SearchOptions::new(self.k.unwrap_or(defaults.k), self.m.unwrap_or(defaults.m))
            .with_filter(filter)
    }
}

fn parse_timestamp(s: &str) -> Result<f64, String> {
    if let Ok(secs) = s.parse::<f64>() {
        return Ok(secs);
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis() as f64 / 1000.0)
        .map_err(|e| format!("expected RFC 3339 or unix seconds: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let settings = Config::load().and_then(|c| c.settings()).context("loading configuration")?;
    let engine = open_engine(&settings).await.context("opening indexes")?;

    match cli.command {
        Command::Ingest { file, batch_size } => ingest(&engine, &file, batch_size).await?,
        Command::Search { query, opts } => {
            let options = opts.options(&settings);
            let hits = engine.search(&query, &options).await?;
            let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
            let texts = engine.get_texts(&ids).await?;
            if hits.is_empty() {
                println!("No results.");
            }
            for (rank, hit) in hits.iter().enumerate() {
                let text =
                    texts.iter().find(|(id, _)| *id == hit.id).map_or("", |(_, t)| t.as_str());
                println!("{:>3}. [{}] {:.5}  {}", rank + 1, hit.id, hit.score, text);
            }
        }
        Command::Ask { question, opts } => {
            let llm = MistralClient::from_settings(&settings.completion)?;
            let answer = engine.answer(&llm, &question, &opts.options(&settings)).await?;
            println!("{}", answer.text);
            println!("\ncontext: {:?}", answer.base_ids);
        }
        Command::Reload => {
            let n = engine.reload_lexical().await?;
            println!("Lexical corpus reloaded: {n} documents");
        }
        Command::Maintain => {
            let interval = Duration::from_secs(settings.maintainer.interval_secs);
            let handle = engine.maintainer(interval).spawn();
            info!(every_secs = interval.as_secs(), "index maintainer running; Ctrl-C to stop");
            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            handle.shutdown().await;
        }
    }
    Ok(())
}

async fn ingest(engine: &LanceEngine, file: &Path, batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        bail!("--batch-size must be positive");
    }
    let handle = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(handle);
    let mut records = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(&line) {
            Ok(r) => records.push(r),
            Err(e) => warn!(line = n + 1, error = %e, "skipping malformed record"),
        }
    }

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records \
                 ({percent}%)",
            )
            .context("progress template")?
            .progress_chars("#>-"),
    );
    for chunk in records.chunks(batch_size) {
        engine.ingest_batch(chunk).await?;
        pb.inc(chunk.len() as u64);
    }
    pb.finish_with_message("done");
    println!("Indexed {} records from {}", records.len(), file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_accept_seconds_and_rfc3339() {
        assert_eq!(parse_timestamp("1700000000").unwrap(), 1_700_000_000.0);
        assert_eq!(parse_timestamp("1970-01-01T00:01:00Z").unwrap(), 60.0);
        assert_eq!(parse_timestamp("1970-01-01T03:00:00+03:00").unwrap(), 0.0);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn query_args_fall_back_to_settings() {
        let cli = Cli::parse_from(["chatrag", "search", "q", "--author", "5"]);
        let Command::Search { opts, .. } = cli.command else { panic!("expected search") };
        let options = opts.options(&Settings::default());
        assert_eq!((options.k, options.m), (10, 50));
        assert_eq!(options.filter, SearchFilter::author(5));
    }
}
