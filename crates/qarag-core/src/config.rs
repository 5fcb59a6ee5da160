pub mod sections;

use crate::error::{QaragError, Result};
use crate::processing::ChunkerConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

pub use sections::{
    AdaptiveThresholds, ConfidenceBands, EmbeddingConfig, HybridWeights, MetricsConfig,
    QualityFilter, RankingConfig, RecommendationThresholds, RerankConfig, RetrievalConfig,
    RetryConfig,
};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunker: ChunkerConfig,
    pub embedding: EmbeddingConfig,
    pub ranking: RankingConfig,
    pub rerank: RerankConfig,
    pub retrieval: RetrievalConfig,
    pub metrics: MetricsConfig,
}

impl RagConfig {
    /// Parse a full configuration from TOML, defaulting missing keys
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| QaragError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to parse TOML: {}", e),
        })
    }

    /// Reject internally inconsistent values
    pub fn validate(&self) -> Result<()> {
        self.chunker.validate()?;

        let embedding = &self.embedding;
        if embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }
        if embedding.max_chars() == 0 {
            return Err(invalid("embedding.max_tokens", "must be greater than 0"));
        }
        if embedding.model.trim().is_empty() {
            return Err(QaragError::ConfigMissing { key: "embedding.model".to_string() });
        }

        if self.ranking.overfetch_factor == 0 || self.ranking.max_fetch == 0 {
            return Err(invalid("ranking.overfetch_factor", "over-fetch must be greater than 0"));
        }
        if self.ranking.optimal_length_min > self.ranking.optimal_length_max {
            return Err(invalid(
                "ranking.optimal_length_min",
                "optimal length band is inverted",
            ));
        }

        let rerank = &self.rerank;
        if rerank.batch_size == 0 {
            return Err(invalid("rerank.batch_size", "must be greater than 0"));
        }
        if rerank.similarity_weight < 0.0 || rerank.rerank_weight < 0.0 {
            return Err(invalid("rerank", "weights must not be negative"));
        }
        if rerank.similarity_weight + rerank.rerank_weight <= 0.0 {
            return Err(invalid("rerank", "weights must not sum to 0"));
        }

        let retrieval = &self.retrieval;
        if retrieval.default_k == 0 || retrieval.default_k > retrieval.max_k {
            return Err(invalid(
                "retrieval.default_k",
                format!("must be within 1..={}", retrieval.max_k),
            ));
        }
        if retrieval.candidate_factor == 0 {
            return Err(invalid("retrieval.candidate_factor", "must be greater than 0"));
        }
        if retrieval.fallback_max_chunks == 0 {
            return Err(invalid("retrieval.fallback_max_chunks", "must be greater than 0"));
        }
        retrieval.thresholds.validate()?;
        retrieval.hybrid.validate()?;

        let metrics = &self.metrics;
        if metrics.capacity == 0 {
            return Err(invalid("metrics.capacity", "must be greater than 0"));
        }
        let bands = metrics.bands;
        if !(bands.low <= bands.medium && bands.medium <= bands.high) {
            return Err(invalid("metrics.bands", "bands must satisfy low <= medium <= high"));
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> QaragError {
    QaragError::ConfigInvalid { key: key.to_string(), reason: reason.into() }
}

/// Layered configuration for QARAG.
///
/// The full section tree comes from defaults and the optional TOML file;
/// the knobs below are additionally overridable from the environment and
/// the command line and remember which layer set them.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    base: RagConfig,
    pub embedder_model: ConfigValue<String>,
    pub embedder_url: ConfigValue<String>,
    pub chunk_size: ConfigValue<usize>,
    pub chunk_overlap: ConfigValue<usize>,
    pub default_k: ConfigValue<usize>,
    pub high_threshold: ConfigValue<f32>,
    pub fallback_threshold: ConfigValue<f32>,
    pub enable_reranking: ConfigValue<bool>,
    pub semantic_weight: ConfigValue<f32>,
    pub keyword_weight: ConfigValue<f32>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self::from_base(RagConfig::default(), ConfigSource::Default)
    }

    fn from_base(base: RagConfig, source: ConfigSource) -> Self {
        Self {
            embedder_model: ConfigValue::new(base.embedding.model.clone(), source),
            embedder_url: ConfigValue::new(base.embedding.base_url.clone(), source),
            chunk_size: ConfigValue::new(base.chunker.chunk_size, source),
            chunk_overlap: ConfigValue::new(base.chunker.chunk_overlap, source),
            default_k: ConfigValue::new(base.retrieval.default_k, source),
            high_threshold: ConfigValue::new(base.retrieval.thresholds.high, source),
            fallback_threshold: ConfigValue::new(base.retrieval.thresholds.fallback, source),
            enable_reranking: ConfigValue::new(base.retrieval.enable_reranking, source),
            semantic_weight: ConfigValue::new(base.retrieval.hybrid.semantic, source),
            keyword_weight: ConfigValue::new(base.retrieval.hybrid.keyword, source),
            base,
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| QaragError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| QaragError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        self.base = RagConfig::from_toml(&content)?;

        // Update tracked values from file
        if let Some(model) = file_config.embedding.model {
            self.embedder_model.update(model, ConfigSource::File);
        }

        if let Some(url) = file_config.embedding.base_url {
            self.embedder_url.update(url, ConfigSource::File);
        }

        if let Some(size) = file_config.chunker.chunk_size {
            self.chunk_size.update(size, ConfigSource::File);
        }

        if let Some(overlap) = file_config.chunker.chunk_overlap {
            self.chunk_overlap.update(overlap, ConfigSource::File);
        }

        let retrieval = file_config.retrieval;
        if let Some(k) = retrieval.default_k {
            self.default_k.update(k, ConfigSource::File);
        }

        if let Some(enabled) = retrieval.enable_reranking {
            self.enable_reranking.update(enabled, ConfigSource::File);
        }

        if let Some(high) = retrieval.thresholds.high {
            self.high_threshold.update(high, ConfigSource::File);
        }

        if let Some(fallback) = retrieval.thresholds.fallback {
            self.fallback_threshold.update(fallback, ConfigSource::File);
        }

        if let Some(semantic) = retrieval.hybrid.semantic {
            self.semantic_weight.update(semantic, ConfigSource::File);
        }

        if let Some(keyword) = retrieval.hybrid.keyword {
            self.keyword_weight.update(keyword, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // QARAG_EMBEDDER_MODEL
        if let Ok(model) = env::var("QARAG_EMBEDDER_MODEL") {
            self.embedder_model.update(model, ConfigSource::Environment);
        }

        // QARAG_EMBEDDER_URL
        if let Ok(url) = env::var("QARAG_EMBEDDER_URL") {
            self.embedder_url.update(url, ConfigSource::Environment);
        }

        if let Some(size) = parse_env("QARAG_CHUNK_SIZE", "positive integer") {
            self.chunk_size.update(size, ConfigSource::Environment);
        }

        if let Some(overlap) = parse_env("QARAG_CHUNK_OVERLAP", "integer") {
            self.chunk_overlap.update(overlap, ConfigSource::Environment);
        }

        if let Some(k) = parse_env("QARAG_DEFAULT_K", "positive integer") {
            self.default_k.update(k, ConfigSource::Environment);
        }

        if let Some(high) = parse_env("QARAG_HIGH_THRESHOLD", "number in [0, 1]") {
            self.high_threshold.update(high, ConfigSource::Environment);
        }

        if let Some(fallback) = parse_env("QARAG_FALLBACK_THRESHOLD", "number in [0, 1]") {
            self.fallback_threshold.update(fallback, ConfigSource::Environment);
        }

        // QARAG_ENABLE_RERANKING
        if let Ok(value) = env::var("QARAG_ENABLE_RERANKING") {
            match parse_bool(&value) {
                Ok(enabled) => self.enable_reranking.update(enabled, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid QARAG_ENABLE_RERANKING value '{}': expected true or false",
                    value
                ),
            }
        }

        if let Some(semantic) = parse_env("QARAG_SEMANTIC_WEIGHT", "number") {
            self.semantic_weight.update(semantic, ConfigSource::Environment);
        }

        if let Some(keyword) = parse_env("QARAG_KEYWORD_WEIGHT", "number") {
            self.keyword_weight.update(keyword, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(model) = overrides.embedder_model {
            self.embedder_model.update(model, ConfigSource::Cli);
        }

        if let Some(url) = overrides.embedder_url {
            self.embedder_url.update(url, ConfigSource::Cli);
        }

        if let Some(size) = overrides.chunk_size {
            self.chunk_size.update(size, ConfigSource::Cli);
        }

        if let Some(k) = overrides.default_k {
            self.default_k.update(k, ConfigSource::Cli);
        }

        if let Some(high) = overrides.high_threshold {
            self.high_threshold.update(high, ConfigSource::Cli);
        }

        if let Some(fallback) = overrides.fallback_threshold {
            self.fallback_threshold.update(fallback, ConfigSource::Cli);
        }

        if overrides.disable_reranking {
            self.enable_reranking.update(false, ConfigSource::Cli);
        }
    }

    /// Apply the tracked values onto the section tree and validate it
    pub fn resolve(&self) -> Result<RagConfig> {
        let mut config = self.base.clone();
        config.embedding.model = self.embedder_model.value.clone();
        config.embedding.base_url = self.embedder_url.value.clone();
        config.chunker.chunk_size = self.chunk_size.value;
        config.chunker.chunk_overlap = self.chunk_overlap.value;
        config.retrieval.default_k = self.default_k.value;
        config.retrieval.thresholds.high = self.high_threshold.value;
        config.retrieval.thresholds.fallback = self.fallback_threshold.value;
        config.retrieval.enable_reranking = self.enable_reranking.value;
        config.retrieval.hybrid.semantic = self.semantic_weight.value;
        config.retrieval.hybrid.keyword = self.keyword_weight.value;
        config.validate()?;
        Ok(config)
    }

    /// Get all tracked values as a map for inspection
    pub fn to_inspection_map(&self) -> BTreeMap<String, (String, ConfigSource)> {
        let mut map = BTreeMap::new();

        map.insert(
            "embedding.model".to_string(),
            (self.embedder_model.value.clone(), self.embedder_model.source),
        );
        map.insert(
            "embedding.base_url".to_string(),
            (self.embedder_url.value.clone(), self.embedder_url.source),
        );
        map.insert(
            "chunker.chunk_size".to_string(),
            (self.chunk_size.value.to_string(), self.chunk_size.source),
        );
        map.insert(
            "chunker.chunk_overlap".to_string(),
            (self.chunk_overlap.value.to_string(), self.chunk_overlap.source),
        );
        map.insert(
            "retrieval.default_k".to_string(),
            (self.default_k.value.to_string(), self.default_k.source),
        );
        map.insert(
            "retrieval.thresholds.high".to_string(),
            (self.high_threshold.value.to_string(), self.high_threshold.source),
        );
        map.insert(
            "retrieval.thresholds.fallback".to_string(),
            (self.fallback_threshold.value.to_string(), self.fallback_threshold.source),
        );
        map.insert(
            "retrieval.enable_reranking".to_string(),
            (self.enable_reranking.value.to_string(), self.enable_reranking.source),
        );
        map.insert(
            "retrieval.hybrid.semantic".to_string(),
            (self.semantic_weight.value.to_string(), self.semantic_weight.source),
        );
        map.insert(
            "retrieval.hybrid.keyword".to_string(),
            (self.keyword_weight.value.to_string(), self.keyword_weight.source),
        );

        map
    }
}

/// Tracked keys present in a TOML file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    embedding: FileEmbedding,
    chunker: FileChunker,
    retrieval: FileRetrieval,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileEmbedding {
    model: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileChunker {
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileRetrieval {
    default_k: Option<usize>,
    enable_reranking: Option<bool>,
    thresholds: FileThresholds,
    hybrid: FileHybrid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileThresholds {
    high: Option<f32>,
    fallback: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileHybrid {
    semantic: Option<f32>,
    keyword: Option<f32>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub embedder_model: Option<String>,
    pub embedder_url: Option<String>,
    pub chunk_size: Option<usize>,
    pub default_k: Option<usize>,
    pub high_threshold: Option<f32>,
    pub fallback_threshold: Option<f32>,
    pub disable_reranking: bool,
}

fn parse_env<T: std::str::FromStr>(key: &str, expected: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}': expected {}", key, raw, expected);
            None
        }
    }
}

/// Parse a boolean flag from string
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(QaragError::ConfigInvalid {
            key: "bool".to_string(),
            reason: format!("Invalid boolean: {}. Use true or false", s),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.embedder_model.value, "nomic-embed-text");
        assert_eq!(config.embedder_model.source, ConfigSource::Default);
        assert_eq!(config.default_k.value, 5);
        assert_eq!(config.high_threshold.value, 0.8);
        assert_eq!(config.fallback_threshold.value, 0.3);
        assert!(config.enable_reranking.value);
    }

    #[test]
    fn test_defaults_validate() {
        let config = LayeredConfig::with_defaults().resolve().unwrap();
        assert_eq!(config, RagConfig::default());
        assert_eq!(config.chunker.max_chunk_size, 6000);
        assert_eq!(config.metrics.capacity, 1000);
        assert_eq!(config.rerank.batch_size, 32);
        assert_eq!(config.embedding.max_chars(), 32_000);
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        // File should override default
        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        // Environment should override file
        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        // CLI should override environment
        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[embedding]
model = "mxbai-embed-large"
batch_size = 50

[retrieval]
default_k = 3

[retrieval.thresholds]
high = 0.9

[metrics]
capacity = 10
"#
        )
        .unwrap();

        let layered = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();
        assert_eq!(layered.embedder_model.value, "mxbai-embed-large");
        assert_eq!(layered.embedder_model.source, ConfigSource::File);
        assert_eq!(layered.default_k.source, ConfigSource::File);
        assert_eq!(layered.high_threshold.value, 0.9);
        assert_eq!(layered.fallback_threshold.source, ConfigSource::Default);

        let config = layered.resolve().unwrap();
        assert_eq!(config.embedding.batch_size, 50);
        assert_eq!(config.metrics.capacity, 10);
        assert_eq!(config.retrieval.thresholds.fallback, 0.3);
        assert_eq!(config.chunker.chunk_size, 4000);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        config.update_from_cli(CliConfigOverrides {
            default_k: Some(8),
            disable_reranking: true,
            ..Default::default()
        });

        assert_eq!(config.default_k.value, 8);
        assert_eq!(config.default_k.source, ConfigSource::Cli);
        assert!(!config.enable_reranking.value);
        assert_eq!(config.enable_reranking.source, ConfigSource::Cli);
        // These should still be defaults
        assert_eq!(config.chunk_size.source, ConfigSource::Default);
        assert_eq!(config.embedder_model.source, ConfigSource::Default);
    }

    #[test]
    fn test_validation_rejects_inconsistent_values() {
        let mut config = RagConfig::default();
        config.retrieval.thresholds = AdaptiveThresholds { high: 0.4, fallback: 0.6 };
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.retrieval.thresholds.high = 1.5;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.retrieval.hybrid = HybridWeights { semantic: 0.0, keyword: 0.0 };
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.metrics.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.chunker.chunk_overlap = config.chunker.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_rejects_bad_cli_thresholds() {
        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            fallback_threshold: Some(0.95),
            ..Default::default()
        });
        assert!(matches!(config.resolve(), Err(QaragError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_hybrid_weights_normalize() {
        let (s, k) = HybridWeights { semantic: 2.0, keyword: 2.0 }.normalized().unwrap();
        assert_eq!((s, k), (0.5, 0.5));
    }

    #[test]
    fn test_fetch_size() {
        let ranking = RankingConfig::default();
        assert_eq!(ranking.fetch_size(5), 15);
        assert_eq!(ranking.fetch_size(20), 50);
        assert_eq!(ranking.fetch_size(60), 60);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(!parse_bool("off").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_inspection_map() {
        let map = LayeredConfig::with_defaults().to_inspection_map();

        assert!(map.contains_key("embedding.model"));
        assert!(map.contains_key("retrieval.hybrid.keyword"));

        let (k_value, k_source) = &map["retrieval.default_k"];
        assert_eq!(k_value, "5");
        assert_eq!(*k_source, ConfigSource::Default);
    }
}
