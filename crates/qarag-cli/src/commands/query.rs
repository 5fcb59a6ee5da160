use crate::cli::QueryArgs;
use crate::commands::chunk::document_id_for;
use crate::output::{preview, OutputWriter};
use crate::output_types::{QueryOutput, QueryResultItem};
use crate::progress::{create_spinner, finish_error, finish_success};
use anyhow::{Context, Result};
use qarag_core::models::{DocumentMetadata, SearchMode};
use qarag_core::{QaChunker, RagConfig};
use qarag_llm::{BlockingScorer, EmbeddingGateway, OllamaEmbedder};
use qarag_retrieval::{DocumentIndexer, MetricsRecorder, Reranker, Retriever, VectorSearch};
use qarag_store::MemoryVectorIndex;
use std::fs;
use std::sync::Arc;
use tabled::Tabled;

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Document")]
    document: String,
    #[tabled(rename = "Type")]
    chunk_type: String,
    #[tabled(rename = "Similarity")]
    similarity: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Content")]
    content: String,
}

pub async fn execute(args: QueryArgs, config: &RagConfig, output: &OutputWriter) -> Result<()> {
    let index = Arc::new(MemoryVectorIndex::new());
    let provider = Arc::new(OllamaEmbedder::from_config(&config.embedding));
    let gateway = EmbeddingGateway::new(provider, config.embedding.clone());

    let indexer = DocumentIndexer::new(
        QaChunker::new(config.chunker.clone())?,
        gateway.clone(),
        index.clone(),
    );

    let mut indexed_chunks = 0;
    for path in &args.docs {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let metadata = DocumentMetadata::new(document_id_for(path))
            .with_source_name(path.display().to_string());

        let spinner = create_spinner(&format!("Indexing {}", path.display()), output.is_json());
        match indexer.index_document(&text, &metadata).await {
            Ok(report) => {
                finish_success(
                    &spinner,
                    &format!("{}: {} chunks", report.document_id, report.chunk_count),
                );
                indexed_chunks += report.chunk_count;
            }
            Err(e) => {
                finish_error(&spinner, &format!("{}: {}", path.display(), e));
                return Err(e.into());
            }
        }
    }

    let metrics = Arc::new(MetricsRecorder::new(config.metrics.clone()));
    let search = VectorSearch::new(index, config.ranking.clone());
    let retriever = Retriever::new(gateway, search, config.retrieval.clone())
        .with_reranker(Reranker::new(
            Arc::new(BlockingScorer::term_overlap()),
            config.rerank.clone(),
        ))
        .with_metrics(metrics.clone());

    let mut query = retriever.query(&args.query);
    if !args.keywords.is_empty() {
        query = query.with_keywords(args.keywords.iter().cloned());
    }
    if args.hybrid {
        query = query.with_mode(SearchMode::Hybrid);
    }

    let spinner = create_spinner("Retrieving", output.is_json());
    let outcome = match retriever.retrieve_adaptive(&query).await {
        Ok(outcome) => {
            finish_success(&spinner, &format!("Strategy: {}", outcome.strategy));
            outcome
        }
        Err(e) => {
            finish_error(&spinner, &e.to_string());
            return Err(e.into());
        }
    };

    let export = args.metrics.then(|| metrics.export(metrics.default_window()));

    if output.is_json() {
        return output.result(QueryOutput {
            query: args.query,
            strategy: outcome.strategy,
            top_score: outcome.top_score,
            reranked: outcome.reranked,
            indexed_chunks,
            results: outcome.chunks.iter().map(QueryResultItem::from).collect(),
            metrics: export,
        });
    }

    output.section("Query");
    output.kv("Query", &args.query);
    output.kv("Mode", if args.hybrid { "hybrid" } else { "semantic" });
    output.kv("Indexed chunks", indexed_chunks);
    output.kv("Strategy", outcome.strategy);
    output.kv(
        "Top score",
        outcome.top_score.map(|s| format!("{:.3}", s)).unwrap_or_else(|| "-".to_string()),
    );
    output.kv("Re-ranked", outcome.reranked);

    output.section("Results");
    let rows: Vec<ResultRow> = outcome
        .chunks
        .iter()
        .enumerate()
        .map(|(i, r)| ResultRow {
            rank: i + 1,
            document: r.chunk.metadata.document_id.clone(),
            chunk_type: r.chunk.metadata.chunk_type.to_string(),
            similarity: format!("{:.3}", r.similarity_score),
            score: format!("{:.3}", r.combined_score),
            content: preview(r.content(), 70),
        })
        .collect();
    output.table(rows);

    if let Some(export) = export {
        output.section("Metrics");
        output.kv("Requests", export.performance.total_requests);
        output.kv("Average latency", format!("{:.1} ms", export.performance.avg_latency_ms));
        output.kv("Success rate", format!("{:.0}%", export.performance.success_rate * 100.0));
        output.kv("Average top score", format!("{:.3}", export.quality.avg_top_score));
        output.kv("No-answer rate", format!("{:.0}%", export.quality.no_answer_rate * 100.0));
        for recommendation in &export.recommendations {
            output.warning(recommendation);
        }
    }

    Ok(())
}
