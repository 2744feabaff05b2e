//! Case search and summarization from the terminal.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use casebrief_cli::{Args, corpus, render};
use casebrief_ort::{OrtEmbedding, OrtSummarizer};
use casebrief_rag::{CorpusStore, KnowledgeBase, Pipeline};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

type CasePipeline = Pipeline<OrtEmbedding, OrtSummarizer>;

const EMPTY_QUERY: &str = "Please enter a query to search.";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if let Err(err) = args.validate() {
        err.exit();
    }
    let config = args.pipeline_config();
    let top_k = config.default_top_k;

    let loaded = corpus::load(&args.corpus, args.limit, &args.text_field).await?;
    tracing::info!(
        documents = loaded.texts.len(),
        path = %args.corpus.display(),
        "loaded corpus"
    );

    let embedder = OrtEmbedding::from_directory(&args.embedding_model).with_context(|| {
        format!(
            "failed to load embedding model from {}",
            args.embedding_model.display()
        )
    })?;
    let summarizer = OrtSummarizer::from_directory(&args.summarizer_model).with_context(|| {
        format!(
            "failed to load summarization model from {}",
            args.summarizer_model.display()
        )
    })?;

    let knowledge = KnowledgeBase::build(&embedder, CorpusStore::new(loaded.texts), &config)
        .await
        .context("failed to build the knowledge base")?;
    let pipeline = Pipeline::new(
        Arc::new(embedder),
        Arc::new(summarizer),
        Arc::new(knowledge),
        config,
    );

    if let Some(query) = &args.query {
        return run_once(&pipeline, query, top_k, args.json).await;
    }
    run_repl(&pipeline, top_k, args.json).await
}

async fn run_once(pipeline: &CasePipeline, query: &str, top_k: usize, json: bool) -> Result<()> {
    if query.trim().is_empty() {
        bail!(EMPTY_QUERY);
    }
    let results = pipeline.run(query, top_k).await?;
    print_results(&results, json)
}

async fn run_repl(pipeline: &CasePipeline, top_k: usize, json: bool) -> Result<()> {
    eprintln!("Ready. Type a query, or /quit to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("query> ");
        io::stderr().flush().ok();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => eprintln!("{EMPTY_QUERY}"),
            "/quit" | "/exit" | "/q" => break,
            query => match pipeline.run(query, top_k).await {
                Ok(results) => print_results(&results, json)?,
                Err(err) => eprintln!("An error occurred: {err}"),
            },
        }
    }
    Ok(())
}

fn print_results(results: &[casebrief_rag::SummaryResult], json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        writeln!(stdout, "{}", render::json(results)?)?;
    } else {
        write!(stdout, "{}", render::text(results))?;
    }
    stdout.flush()?;
    Ok(())
}
