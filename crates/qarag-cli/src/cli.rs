use clap::{Parser, Subcommand};
use qarag_core::config::CliConfigOverrides;
use std::path::PathBuf;

/// QARAG - QA-aware retrieval-augmented generation engine
#[derive(Parser, Debug)]
#[command(name = "qarag")]
#[command(about = "QA-aware retrieval and ranking engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./qarag.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Embedding model served by Ollama
    #[arg(long, global = true)]
    pub embedder_model: Option<String>,

    /// Ollama base URL
    #[arg(long, global = true)]
    pub embedder_url: Option<String>,

    /// Target chunk size in characters
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Score at or above which a single chunk answers directly
    #[arg(long, global = true)]
    pub high_threshold: Option<f32>,

    /// Score below which only minimal context is returned
    #[arg(long, global = true)]
    pub fallback_threshold: Option<f32>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration overrides carried by global flags and the subcommand
    pub fn overrides(&self) -> CliConfigOverrides {
        let (default_k, disable_reranking) = match &self.command {
            Commands::Query(args) => (args.top_k, args.no_rerank),
            _ => (None, false),
        };

        CliConfigOverrides {
            embedder_model: self.embedder_model.clone(),
            embedder_url: self.embedder_url.clone(),
            chunk_size: self.chunk_size,
            default_k,
            high_threshold: self.high_threshold,
            fallback_threshold: self.fallback_threshold,
            disable_reranking,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk a text file and report the resulting chunks
    Chunk(ChunkArgs),

    /// Index documents in memory and run an adaptive query
    Query(QueryArgs),

    /// Show the resolved configuration and where each value came from
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct ChunkArgs {
    /// Path to a UTF-8 text file
    pub path: PathBuf,

    /// Document id (defaults to the file stem)
    #[arg(long)]
    pub doc_id: Option<String>,

    /// Document keywords stored on every chunk
    #[arg(long, value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// Number of chunk previews to print
    #[arg(long, default_value = "10")]
    pub show: usize,
}

#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// The question to answer
    pub query: String,

    /// Text files to index before querying
    #[arg(long, required = true, num_args = 1..)]
    pub docs: Vec<PathBuf>,

    /// Number of chunks to retrieve
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// Disable cross-encoder re-ranking
    #[arg(long)]
    pub no_rerank: bool,

    /// Merge keyword matches with semantic results
    #[arg(long)]
    pub hybrid: bool,

    /// Keyword filter (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// Print retrieval metrics after the query
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print the full resolved configuration as TOML
    #[arg(long)]
    pub full: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_flags_become_overrides() {
        let cli = Cli::parse_from([
            "qarag",
            "--high-threshold",
            "0.9",
            "query",
            "What is BMI?",
            "--docs",
            "a.txt",
            "b.txt",
            "-k",
            "3",
            "--no-rerank",
        ]);

        let overrides = cli.overrides();
        assert_eq!(overrides.default_k, Some(3));
        assert_eq!(overrides.high_threshold, Some(0.9));
        assert!(overrides.disable_reranking);

        match cli.command {
            Commands::Query(args) => assert_eq!(args.docs.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_keywords_are_comma_separated() {
        let cli = Cli::parse_from(["qarag", "chunk", "faq.txt", "--keywords", "imc,santé"]);
        match cli.command {
            Commands::Chunk(args) => assert_eq!(args.keywords, vec!["imc", "santé"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_query_requires_docs() {
        assert!(Cli::try_parse_from(["qarag", "query", "question"]).is_err());
    }
}
