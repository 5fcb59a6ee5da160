//! Rolling retrieval metrics and advisory recommendations.
//!
//! The recorder is an explicitly constructed component: hosts own one and
//! share it (usually behind an `Arc`) with every retriever that should
//! report into it.

use std::collections::{BTreeMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use qarag_core::config::{ConfidenceBands, MetricsConfig, RecommendationThresholds};
use qarag_core::models::{RetrievalStrategy, ScoredChunk};
use qarag_core::processing::text;
use serde::{Deserialize, Serialize};

/// One retrieval call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetricsRecord {
    /// Query text, truncated
    pub query: String,
    pub strategy: RetrievalStrategy,
    pub chunk_count: usize,
    pub top_score: f32,
    pub avg_score: f32,
    pub latency_ms: f64,
    pub reranking_enabled: bool,
    pub timestamp: DateTime<Utc>,
}

/// Latency and outcome aggregates over a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub avg_latency_ms: f64,
    pub total_requests: usize,
    /// Share of calls that returned at least one chunk
    pub success_rate: f64,
    pub strategy_distribution: BTreeMap<RetrievalStrategy, usize>,
}

/// Confidence aggregates over a window, bucketed on the top score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub avg_top_score: f64,
    pub high_confidence_rate: f64,
    pub medium_confidence_rate: f64,
    pub low_confidence_rate: f64,
    pub no_answer_rate: f64,
    pub avg_chunks_used: f64,
}

/// Serialisable snapshot for offline analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsExport {
    pub exported_at: DateTime<Utc>,
    pub window_hours: i64,
    pub performance: PerformanceMetrics,
    pub quality: QualityMetrics,
    pub recommendations: Vec<String>,
    pub records: Vec<RetrievalMetricsRecord>,
}

/// Fixed-capacity, oldest-evicted history of retrieval calls
#[derive(Debug)]
pub struct MetricsRecorder {
    config: MetricsConfig,
    history: RwLock<VecDeque<RetrievalMetricsRecord>>,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

impl MetricsRecorder {
    pub fn new(config: MetricsConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self { config, history: RwLock::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Append a record, evicting the oldest when full
    pub fn record(&self, mut record: RetrievalMetricsRecord) {
        record.query = text::head(&record.query, self.config.query_max_chars).to_string();
        let capacity = self.config.capacity.max(1);

        let mut history = self.history.write().unwrap_or_else(|p| p.into_inner());
        while history.len() >= capacity {
            history.pop_front();
        }
        history.push_back(record);
    }

    /// Build and append a record from a retrieval outcome
    pub fn record_retrieval(
        &self,
        query: &str,
        strategy: RetrievalStrategy,
        chunks: &[ScoredChunk],
        latency_ms: f64,
        reranking_enabled: bool,
    ) {
        let top_score = chunks.iter().map(|c| c.combined_score).fold(0.0_f32, f32::max);
        let avg_score = if chunks.is_empty() {
            0.0
        } else {
            chunks.iter().map(|c| c.combined_score).sum::<f32>() / chunks.len() as f32
        };

        tracing::debug!(
            strategy = %strategy,
            chunk_count = chunks.len(),
            top_score,
            latency_ms,
            "Recorded retrieval metrics"
        );

        self.record(RetrievalMetricsRecord {
            query: query.to_string(),
            strategy,
            chunk_count: chunks.len(),
            top_score,
            avg_score,
            latency_ms,
            reranking_enabled,
            timestamp: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.history.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records newer than `now - window`, oldest first
    pub fn snapshot(&self, window: Duration) -> Vec<RetrievalMetricsRecord> {
        let cutoff = Utc::now() - window;
        self.history
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    pub fn get_performance_metrics(&self, window: Duration) -> PerformanceMetrics {
        performance_of(&self.snapshot(window))
    }

    pub fn get_quality_metrics(&self, window: Duration) -> QualityMetrics {
        quality_of(&self.snapshot(window), &self.config.bands)
    }

    /// Advisory recommendations over the default window
    pub fn get_recommendations(&self) -> Vec<String> {
        let records = self.snapshot(self.default_window());
        recommend(
            &performance_of(&records),
            &quality_of(&records, &self.config.bands),
            &self.config.recommendations,
        )
    }

    pub fn export(&self, window: Duration) -> MetricsExport {
        let records = self.snapshot(window);
        let performance = performance_of(&records);
        let quality = quality_of(&records, &self.config.bands);
        let recommendations = recommend(&performance, &quality, &self.config.recommendations);
        let skip = records.len().saturating_sub(self.config.export_records);

        MetricsExport {
            exported_at: Utc::now(),
            window_hours: window.num_hours(),
            performance,
            quality,
            recommendations,
            records: records.into_iter().skip(skip).collect(),
        }
    }

    pub fn default_window(&self) -> Duration {
        Duration::hours(self.config.default_window_hours)
    }
}

fn performance_of(records: &[RetrievalMetricsRecord]) -> PerformanceMetrics {
    if records.is_empty() {
        return PerformanceMetrics::default();
    }
    let total = records.len() as f64;

    let mut strategy_distribution = BTreeMap::new();
    for record in records {
        *strategy_distribution.entry(record.strategy).or_insert(0) += 1;
    }

    PerformanceMetrics {
        avg_latency_ms: records.iter().map(|r| r.latency_ms).sum::<f64>() / total,
        total_requests: records.len(),
        success_rate: records.iter().filter(|r| r.chunk_count > 0).count() as f64 / total,
        strategy_distribution,
    }
}

fn quality_of(records: &[RetrievalMetricsRecord], bands: &ConfidenceBands) -> QualityMetrics {
    if records.is_empty() {
        return QualityMetrics::default();
    }
    let total = records.len() as f64;
    let rate = |pred: &dyn Fn(f32) -> bool| {
        records.iter().filter(|r| pred(r.top_score)).count() as f64 / total
    };

    QualityMetrics {
        avg_top_score: records.iter().map(|r| f64::from(r.top_score)).sum::<f64>() / total,
        high_confidence_rate: rate(&|s| s >= bands.high),
        medium_confidence_rate: rate(&|s| s >= bands.medium && s < bands.high),
        low_confidence_rate: rate(&|s| s >= bands.low && s < bands.medium),
        no_answer_rate: rate(&|s| s < bands.low),
        avg_chunks_used: records.iter().map(|r| r.chunk_count as f64).sum::<f64>() / total,
    }
}

/// Advisory text derived from aggregates; never mutates configuration.
///
/// Returns nothing when the window holds no requests.
pub fn recommend(
    performance: &PerformanceMetrics,
    quality: &QualityMetrics,
    thresholds: &RecommendationThresholds,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if performance.total_requests == 0 {
        return recommendations;
    }

    if performance.avg_latency_ms > thresholds.max_avg_latency_ms {
        recommendations
            .push("Consider reducing chunk size or retrieval count for faster responses".to_string());
    }
    if performance.success_rate < thresholds.min_success_rate {
        recommendations
            .push("Low success rate detected, consider improving document coverage".to_string());
    }
    if quality.no_answer_rate > thresholds.max_no_answer_rate {
        recommendations.push("High no-answer rate, consider lowering confidence thresholds".to_string());
    }
    if quality.avg_chunks_used < thresholds.min_avg_sources {
        recommendations.push("Consider increasing retrieval count for better context".to_string());
    }
    if quality.high_confidence_rate < thresholds.min_high_confidence_rate {
        recommendations.push(
            "Low confidence scores, consider improving document quality or chunking strategy"
                .to_string(),
        );
    }

    let count = |s: RetrievalStrategy| performance.strategy_distribution.get(&s).copied().unwrap_or(0);
    if count(RetrievalStrategy::Fallback) > count(RetrievalStrategy::Direct) {
        recommendations.push(
            "High fallback usage, consider improving embedding quality or document coverage"
                .to_string(),
        );
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(strategy: RetrievalStrategy, chunk_count: usize, top_score: f32) -> RetrievalMetricsRecord {
        RetrievalMetricsRecord {
            query: "q".to_string(),
            strategy,
            chunk_count,
            top_score,
            avg_score: top_score,
            latency_ms: 100.0,
            reranking_enabled: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let recorder = MetricsRecorder::new(MetricsConfig { capacity: 3, ..Default::default() });
        for i in 0..5 {
            let mut r = record(RetrievalStrategy::Rag, 1, 0.5);
            r.query = format!("query {}", i);
            recorder.record(r);
        }

        let records = recorder.snapshot(Duration::hours(1));
        assert_eq!(recorder.len(), 3);
        let queries: Vec<_> = records.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["query 2", "query 3", "query 4"]);
    }

    #[test]
    fn test_query_is_truncated() {
        let recorder = MetricsRecorder::new(MetricsConfig { query_max_chars: 5, ..Default::default() });
        let mut r = record(RetrievalStrategy::Rag, 1, 0.5);
        r.query = "éèàùç and more".to_string();
        recorder.record(r);
        assert_eq!(recorder.snapshot(Duration::hours(1))[0].query, "éèàùç");
    }

    #[test]
    fn test_window_excludes_old_records() {
        let recorder = MetricsRecorder::default();
        let mut old = record(RetrievalStrategy::Direct, 1, 0.9);
        old.timestamp = Utc::now() - Duration::hours(48);
        recorder.record(old);
        recorder.record(record(RetrievalStrategy::Rag, 2, 0.6));

        let performance = recorder.get_performance_metrics(Duration::hours(24));
        assert_eq!(performance.total_requests, 1);
        assert_eq!(performance.strategy_distribution.get(&RetrievalStrategy::Rag), Some(&1));
    }

    #[test]
    fn test_quality_bands() {
        let recorder = MetricsRecorder::default();
        for score in [0.9, 0.85, 0.6, 0.4, 0.1] {
            recorder.record(record(RetrievalStrategy::Rag, 2, score));
        }

        let quality = recorder.get_quality_metrics(Duration::hours(1));
        assert!((quality.high_confidence_rate - 0.4).abs() < 1e-9);
        assert!((quality.medium_confidence_rate - 0.2).abs() < 1e-9);
        assert!((quality.low_confidence_rate - 0.2).abs() < 1e-9);
        assert!((quality.no_answer_rate - 0.2).abs() < 1e-9);
        assert!((quality.avg_chunks_used - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_bands_are_configurable() {
        let bands = ConfidenceBands { high: 0.95, medium: 0.9, low: 0.85 };
        let recorder = MetricsRecorder::new(MetricsConfig { bands, ..Default::default() });
        recorder.record(record(RetrievalStrategy::Rag, 1, 0.9));
        let quality = recorder.get_quality_metrics(Duration::hours(1));
        assert_eq!(quality.medium_confidence_rate, 1.0);
    }

    #[test]
    fn test_success_rate() {
        let recorder = MetricsRecorder::default();
        recorder.record(record(RetrievalStrategy::Rag, 3, 0.5));
        recorder.record(record(RetrievalStrategy::NoAnswer, 0, 0.0));
        let performance = recorder.get_performance_metrics(Duration::hours(1));
        assert_eq!(performance.success_rate, 0.5);
    }

    #[test]
    fn test_recommendations_are_pure() {
        let performance = PerformanceMetrics {
            avg_latency_ms: 2500.0,
            total_requests: 4,
            success_rate: 0.5,
            strategy_distribution: BTreeMap::from([
                (RetrievalStrategy::Fallback, 3),
                (RetrievalStrategy::Direct, 1),
            ]),
        };
        let quality = QualityMetrics {
            avg_top_score: 0.2,
            high_confidence_rate: 0.0,
            medium_confidence_rate: 0.0,
            low_confidence_rate: 0.25,
            no_answer_rate: 0.75,
            avg_chunks_used: 1.0,
        };
        let thresholds = RecommendationThresholds::default();

        let first = recommend(&performance, &quality, &thresholds);
        assert_eq!(first.len(), 6);
        assert_eq!(first, recommend(&performance, &quality, &thresholds));
        assert!(first[2].contains("lowering confidence thresholds"));
    }

    #[test]
    fn test_no_recommendations_without_traffic() {
        assert!(MetricsRecorder::default().get_recommendations().is_empty());
    }

    #[test]
    fn test_export_keeps_latest_records() {
        let recorder =
            MetricsRecorder::new(MetricsConfig { export_records: 2, ..Default::default() });
        for score in [0.1, 0.2, 0.3] {
            recorder.record(record(RetrievalStrategy::Rag, 1, score));
        }

        let export = recorder.export(Duration::hours(24));
        assert_eq!(export.window_hours, 24);
        assert_eq!(export.performance.total_requests, 3);
        let scores: Vec<f32> = export.records.iter().map(|r| r.top_score).collect();
        assert_eq!(scores, vec![0.2, 0.3]);
        assert!(serde_json::to_string(&export).is_ok());
    }
}
