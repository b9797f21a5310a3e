use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::LLMConfig;
use crate::summarize::SummaryStrategy;

/// Configuration for the recording summarizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Media tool settings
    pub media: MediaConfig,

    /// Transcription service settings
    pub transcription: TranscriptionConfig,

    /// Text-generation settings
    pub llm: LLMConfig,

    /// Topic segmentation settings
    pub segmentation: SegmentationConfig,

    /// Summarization settings
    pub summary: SummaryConfig,

    /// Snapshot extraction settings
    pub snapshots: SnapshotConfig,

    /// Output and storage settings
    pub output: OutputConfig,

    /// Performance and resource settings
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// ffmpeg binary to invoke
    pub ffmpeg_path: String,

    /// ffprobe binary to invoke
    pub ffprobe_path: String,

    /// ImageMagick compare binary to invoke
    pub compare_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Speech-to-text endpoint (OpenAI-compatible audio/transcriptions)
    pub endpoint: String,

    /// API key for the transcription service
    pub api_key: Option<String>,

    /// Model to use for transcription
    pub model: String,

    /// Timeout for transcription requests (seconds)
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Character budget per boundary-detection chunk
    pub chunk_chars: usize,

    /// Overall share a topic label needs to count as dominant
    pub dominant_topic_threshold: f64,

    /// Upper bound on distinct topic labels the labeling pass may assign
    pub max_topics: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Which summarization strategy to run
    pub strategy: SummaryStrategy,

    /// Character budget per raw transcript chunk
    pub chunk_chars: usize,

    /// Minimum minutes each summarized section should span
    pub minimum_summary_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Minimum spacing between kept snapshots (seconds)
    pub min_interval_secs: f64,

    /// Similarity percentage above which a new frame is discarded
    pub similarity_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base directory the per-recording working directory lands in
    pub base_dir: PathBuf,

    /// Log level directive
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum concurrent model requests
    pub max_concurrent_requests: usize,
}

impl Config {
    /// Load configuration from file, falling back to environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = [
            "media-recap.toml",
            "config/media-recap.toml",
            "~/.config/media-recap/config.toml",
            "/etc/media-recap/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Build configuration from defaults plus environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(workers) = std::env::var("MEDIA_RECAP_WORKERS") {
            config.performance.max_concurrent_requests = workers
                .parse()
                .unwrap_or(config.performance.max_concurrent_requests);
        }

        if let Ok(output_dir) = std::env::var("MEDIA_RECAP_OUTPUT_DIR") {
            config.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(log_level) = std::env::var("MEDIA_RECAP_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        if let Ok(endpoint) = std::env::var("MEDIA_RECAP_LLM_ENDPOINT") {
            config.llm.endpoint = Some(endpoint);
        }

        if let Ok(model) = std::env::var("MEDIA_RECAP_LLM_MODEL") {
            config.llm.model = model;
        }

        if let Ok(provider) = std::env::var("MEDIA_RECAP_LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }

        // The usual OpenAI convention covers both services when set
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if config.llm.api_key.is_none() {
                config.llm.api_key = Some(api_key.clone());
            }
            if config.transcription.api_key.is_none() {
                config.transcription.api_key = Some(api_key);
            }
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration ranges. Credential presence is checked where
    /// providers are constructed, so a keyless config still validates.
    pub fn validate(&self) -> Result<()> {
        if self.performance.max_concurrent_requests == 0 {
            return Err(anyhow!("max_concurrent_requests must be greater than 0"));
        }

        if self.segmentation.chunk_chars == 0 || self.summary.chunk_chars == 0 {
            return Err(anyhow!("chunk_chars must be greater than 0"));
        }

        let threshold = self.segmentation.dominant_topic_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(anyhow!(
                "dominant_topic_threshold must be in (0, 1], got {}",
                threshold
            ));
        }

        if self.segmentation.max_topics == 0 {
            return Err(anyhow!("max_topics must be greater than 0"));
        }

        if self.snapshots.min_interval_secs < 0.0 {
            return Err(anyhow!("min_interval_secs must not be negative"));
        }

        let similarity = self.snapshots.similarity_threshold;
        if !(0.0..=100.0).contains(&similarity) {
            return Err(anyhow!(
                "similarity_threshold must be a percentage, got {}",
                similarity
            ));
        }

        if self.summary.minimum_summary_minutes == 0 {
            return Err(anyhow!("minimum_summary_minutes must be greater than 0"));
        }

        Ok(())
    }

    /// Runtime configuration overview for startup logging
    pub fn overview(&self) -> String {
        format!(
            "media-recap configuration:\n\
            - Workers: {}\n\
            - LLM: {} ({})\n\
            - Strategy: {}\n\
            - Snapshot interval: {}s\n\
            - Output directory: {}",
            self.performance.max_concurrent_requests,
            self.llm.provider,
            self.llm.model,
            self.summary.strategy,
            self.snapshots.min_interval_secs,
            self.output.base_dir.display(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                compare_path: "compare".to_string(),
            },
            transcription: TranscriptionConfig {
                endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
                api_key: None,
                model: "whisper-1".to_string(),
                timeout_seconds: 600, // Long recordings upload slowly
            },
            llm: LLMConfig::default(),
            segmentation: SegmentationConfig {
                // Characters times the estimated characters per token
                chunk_chars: 12000 * 2,
                dominant_topic_threshold: 0.2,
                max_topics: 5,
            },
            summary: SummaryConfig {
                strategy: SummaryStrategy::ArticleStyle,
                chunk_chars: 12000 * 2,
                minimum_summary_minutes: 2,
            },
            snapshots: SnapshotConfig {
                min_interval_secs: 10.0,
                similarity_threshold: 90.0,
            },
            output: OutputConfig {
                base_dir: PathBuf::from("."),
                log_level: "warn".to_string(),
            },
            performance: PerformanceConfig {
                max_concurrent_requests: num_cpus::get().min(8),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.performance.max_concurrent_requests = workers;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.transcription.api_key = Some(api_key.clone());
        self.config.llm.api_key = Some(api_key);
        self
    }

    pub fn with_strategy(mut self, strategy: SummaryStrategy) -> Self {
        self.config.summary.strategy = strategy;
        self
    }

    pub fn with_snapshot_interval(mut self, seconds: f64) -> Self {
        self.config.snapshots.min_interval_secs = seconds;
        self
    }

    pub fn with_summary_minutes(mut self, minutes: u32) -> Self {
        self.config.summary.minimum_summary_minutes = minutes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.segmentation.chunk_chars, 24000);
        assert_eq!(config.snapshots.min_interval_secs, 10.0);
        assert_eq!(config.summary.minimum_summary_minutes, 2);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_workers(4)
            .with_output_dir(PathBuf::from("/tmp/recaps"))
            .with_api_key("sk-test".to_string())
            .with_strategy(SummaryStrategy::TimeWindowed)
            .with_snapshot_interval(30.0)
            .with_summary_minutes(5)
            .build();

        assert_eq!(config.performance.max_concurrent_requests, 4);
        assert_eq!(config.output.base_dir, PathBuf::from("/tmp/recaps"));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.transcription.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.summary.strategy, SummaryStrategy::TimeWindowed);
        assert_eq!(config.snapshots.min_interval_secs, 30.0);
        assert_eq!(config.summary.minimum_summary_minutes, 5);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_ranges() {
        let mut config = Config::default();
        config.performance.max_concurrent_requests = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.segmentation.dominant_topic_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.snapshots.similarity_threshold = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_round_trips_through_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("media-recap.toml");

        let config = Config::default();
        config.save(path.to_str().unwrap()).unwrap();

        let restored: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            restored.performance.max_concurrent_requests,
            config.performance.max_concurrent_requests
        );
        assert_eq!(restored.summary.strategy, config.summary.strategy);
    }
}
