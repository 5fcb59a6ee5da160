//! Chunk command implementation

use crate::cli::ChunkArgs;
use crate::output::{preview, OutputWriter};
use crate::output_types::{ChunkItem, ChunkOutput};
use anyhow::{Context, Result};
use qarag_core::models::DocumentMetadata;
use qarag_core::{summarize_chunks, QaChunker, RagConfig};
use std::fs;
use std::path::Path;
use tabled::Tabled;

#[derive(Tabled)]
struct ChunkRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Type")]
    chunk_type: String,
    #[tabled(rename = "Chars")]
    length: usize,
    #[tabled(rename = "Words")]
    word_count: usize,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Preview")]
    preview: String,
}

/// Document id derived from a file path
pub fn document_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn execute(args: ChunkArgs, config: &RagConfig, output: &OutputWriter) -> Result<()> {
    let text = fs::read_to_string(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;

    let document_id = args.doc_id.clone().unwrap_or_else(|| document_id_for(&args.path));
    let metadata = DocumentMetadata::new(&document_id)
        .with_source_name(args.path.display().to_string())
        .with_keywords(args.keywords.iter().cloned());

    let chunker = QaChunker::new(config.chunker.clone())?;
    let chunks = chunker.chunk_document(&text, &metadata)?;
    let summary = summarize_chunks(&chunks);

    if output.is_json() {
        return output.result(ChunkOutput {
            document_id,
            summary,
            chunks: chunks.iter().map(ChunkItem::from).collect(),
        });
    }

    output.success(format!("Chunked {} into {} chunks", args.path.display(), summary.total_chunks));
    output.section(format!("Chunks for {}", document_id));
    output.kv("Q&A format", chunker.is_qa_format(&text));
    output.kv("Total chunks", summary.total_chunks);
    output.kv("Q&A pairs", summary.qa_pairs);
    output.kv("Regular", summary.regular_chunks);
    output.kv("Headers", summary.header_chunks);
    output.kv("List items", summary.list_items);
    output.kv("Average length", format!("{:.2}", summary.average_length));
    output.kv("Q&A coverage", format!("{:.2}%", summary.qa_coverage));

    let rows: Vec<ChunkRow> = chunks
        .iter()
        .take(args.show)
        .map(|c| ChunkRow {
            index: c.metadata.chunk_index,
            chunk_type: c.metadata.chunk_type.to_string(),
            length: c.metadata.length,
            word_count: c.metadata.word_count,
            confidence: format!("{:.2}", c.metadata.confidence_score),
            preview: preview(&c.content, 60),
        })
        .collect();

    output.section("Preview");
    output.table(rows);

    if chunks.len() > args.show {
        output.info(format!("{} more chunks not shown", chunks.len() - args.show));
    }

    Ok(())
}
