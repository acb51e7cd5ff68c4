//! # Awful Topic News
//!
//! Topic news digests built from search feeds and summarized by an LLM,
//! with question answering over the stored summaries.
//!
//! ## Usage
//!
//! ```sh
//! awful_topic_news digest "climate change" -n 5
//! awful_topic_news ask "climate change" "What did negotiators agree on?"
//! awful_topic_news resummarize "climate change" https://example.com/story
//! awful_topic_news show "climate change"
//! ```
//!
//! ## Architecture
//!
//! 1. **Feeds**: Bing News search RSS, falling back to Yahoo News for the shortfall
//! 2. **Resolution**: tracking links unwrapped and redirects followed to the canonical URL
//! 3. **Dedup**: identical URLs and near-identical headlines collapse to the first seen
//! 4. **Extraction**: structured markup first, paragraph density as fallback
//! 5. **Filtering**: blocked domains, short bodies and off-topic pages are dropped
//! 6. **Chunking**: bodies split at paragraph and sentence boundaries
//! 7. **Summarization**: per-chunk LLM summaries, compressed when long, stored per topic
//! 8. **Q&A**: stored summaries ranked by embedding similarity, each top match asked in turn

use clap::Parser;
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod chunker;
mod cli;
mod config;
mod dedup;
mod embed;
mod error;
mod extract;
mod feeds;
mod models;
mod outputs;
mod pipeline;
mod qa;
mod relevance;
mod resolver;
mod store;
mod summarize;
mod utils;

use api::{RetryAsk, TemplateAsk, load_llm_config, load_template};
use cli::{Cli, Command};
use config::PipelineConfig;
use embed::HashingEmbedder;
use outputs::markdown::{answers_to_markdown, digest_to_markdown};
use outputs::write_markdown;
use pipeline::{Pipeline, summarize_prepared};
use store::{JsonStore, last_updated};
use summarize::{CachedSummarizer, LlmSummarizer, digest_article};
use utils::topic_slug;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("awful_topic_news starting up");

    let args = Cli::parse();
    debug!(?args.store_dir, ?args.markdown_output_dir, command = ?args.command, "Parsed CLI arguments");

    let config = PipelineConfig::load(args.config.as_deref()).await?;
    let store = JsonStore::new(&args.store_dir);

    let (markdown, suffix) = match &args.command {
        Command::Digest {
            topic,
            max_articles,
            refresh,
        } => {
            let n = max_articles.unwrap_or(config.feeds.max_articles);
            (run_digest(&args, &config, &store, topic, n, *refresh).await?, "digest")
        }
        Command::Ask { topic, question } => (run_ask(&args, &config, &store, topic, question).await?, "answers"),
        Command::Resummarize { topic, url } => {
            (run_resummarize(&args, &config, &store, topic, url).await?, "digest")
        }
        Command::Show { topic, full_text } => {
            let records = store.load(topic).await?;
            (digest_to_markdown(topic, &records, last_updated(&records), *full_text), "digest")
        }
    };

    println!("{markdown}");
    if let Some(dir) = &args.markdown_output_dir {
        let file_name = format!("{}_{suffix}.md", topic_slug(args.command.topic()));
        write_markdown(dir, &file_name, &markdown).await?;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip(args, config, store))]
async fn run_digest(
    args: &Cli,
    config: &PipelineConfig,
    store: &JsonStore,
    topic: &str,
    n: usize,
    refresh: bool,
) -> Result<String, Box<dyn Error>> {
    let known = if refresh {
        Default::default()
    } else {
        store.known_urls(topic).await?
    };

    let pipeline = Pipeline::from_config(config)?;
    let prepared = pipeline.prepare(topic, n, &known).await;

    let records = if prepared.is_empty() {
        warn!(topic, "No new articles passed the pipeline");
        store.load(topic).await?
    } else {
        let llm_config = load_llm_config(args.llm_config.as_deref())?;
        let template = load_template(&config.summarizer.template).await?;
        let asker = RetryAsk::new(
            TemplateAsk {
                config: &llm_config,
                template: &template,
            },
            config.summarizer.max_retries,
            config.summarizer.base_delay(),
        );
        let summarizer = CachedSummarizer::new(LlmSummarizer::new(asker));
        let fresh = summarize_prepared(&summarizer, topic, &prepared, &config.summarizer).await;
        info!(
            new = fresh.len(),
            cached_summaries = summarizer.cached_entries(),
            "Merging new summaries into store"
        );
        store.merge_and_save(topic, fresh).await?
    };

    Ok(digest_to_markdown(topic, &records, last_updated(&records), false))
}

#[instrument(level = "info", skip(args, config, store))]
async fn run_ask(
    args: &Cli,
    config: &PipelineConfig,
    store: &JsonStore,
    topic: &str,
    question: &str,
) -> Result<String, Box<dyn Error>> {
    let records = store.load(topic).await?;
    let embedder = HashingEmbedder::new(config.qa.embedding_dims);
    let matches = qa::semantic_filter(&embedder, question, &records, config.qa.top_n, config.qa.min_score);
    if matches.is_empty() {
        return Ok(answers_to_markdown(question, &[]));
    }

    let llm_config = load_llm_config(args.llm_config.as_deref())?;
    let template = load_template(&config.qa.template).await?;
    let asker = RetryAsk::new(
        TemplateAsk {
            config: &llm_config,
            template: &template,
        },
        config.summarizer.max_retries,
        config.summarizer.base_delay(),
    );
    let answers = qa::answer_question(&asker, question, &matches, &config.qa).await;
    Ok(answers_to_markdown(question, &answers))
}

#[instrument(level = "info", skip(args, config, store))]
async fn run_resummarize(
    args: &Cli,
    config: &PipelineConfig,
    store: &JsonStore,
    topic: &str,
    url: &str,
) -> Result<String, Box<dyn Error>> {
    let Some(mut record) = store.find(topic, url).await? else {
        return Err(format!("no stored article for {url} under topic {topic:?}").into());
    };

    let prepared = Pipeline::from_config(config)?.rechunk(&record);
    if prepared.chunks.is_empty() {
        return Err(format!("stored article {url} has no text to summarize").into());
    }

    let llm_config = load_llm_config(args.llm_config.as_deref())?;
    let template = load_template(&config.summarizer.template).await?;
    let asker = RetryAsk::new(
        TemplateAsk {
            config: &llm_config,
            template: &template,
        },
        config.summarizer.max_retries,
        config.summarizer.base_delay(),
    );
    let summarizer = LlmSummarizer::new(asker);

    record.summary = digest_article(&summarizer, &prepared, &config.summarizer).await?;
    record.chunk_count = prepared.chunks.len();
    record.summarized_at = chrono::Utc::now();
    store.upsert(topic, record.clone()).await?;
    info!(url, "Updated stored summary");

    Ok(digest_to_markdown(topic, std::slice::from_ref(&record), Some(record.summarized_at), false))
}
