//! Command-line interface definitions for Awful Topic News.
//!
//! Global options can be given as flags or environment variables and
//! precede the subcommand.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Topic news digests and question answering over stored summaries.
///
/// # Examples
///
/// ```sh
/// # Fetch, summarize and store five technology articles
/// awful_topic_news digest technology
///
/// # Ask across the stored technology summaries
/// awful_topic_news ask technology "What did regulators decide?"
///
/// # Keep a Markdown copy of every document
/// awful_topic_news -m ./markdown show technology
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional pipeline configuration YAML
    #[arg(short, long, env = "TOPIC_NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the per-topic summary stores
    #[arg(short, long, env = "TOPIC_NEWS_STORE_DIR", default_value = ".")]
    pub store_dir: PathBuf,

    /// Also write rendered Markdown into this directory
    #[arg(short, long, env = "TOPIC_NEWS_MARKDOWN_DIR")]
    pub markdown_output_dir: Option<PathBuf>,

    /// awful_aj config.yaml for the LLM endpoint (defaults to awful_aj's config dir)
    #[arg(long, env = "TOPIC_NEWS_LLM_CONFIG")]
    pub llm_config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Fetch, summarize and store articles for a topic
    Digest {
        topic: String,

        /// Number of articles to fetch (defaults to the configured value)
        #[arg(short = 'n', long)]
        max_articles: Option<usize>,

        /// Re-process articles that are already stored
        #[arg(long)]
        refresh: bool,
    },

    /// Answer a question from a topic's stored summaries
    Ask { topic: String, question: String },

    /// Re-summarize one stored article from its full text
    Resummarize { topic: String, url: String },

    /// Print a topic's stored summaries
    Show {
        topic: String,

        /// Include each article's full text
        #[arg(long)]
        full_text: bool,
    },
}

impl Command {
    pub fn topic(&self) -> &str {
        match self {
            Command::Digest { topic, .. }
            | Command::Ask { topic, .. }
            | Command::Resummarize { topic, .. }
            | Command::Show { topic, .. } => topic,
        }
    }
}
