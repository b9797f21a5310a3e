use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::time::{timeout, Duration};
use tracing::info;

use crate::config::TranscriptionConfig;

/// Speech-to-text boundary: audio file in, VTT text out
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// Client for OpenAI-compatible audio/transcriptions endpoints
pub struct OpenAiTranscriber {
    config: TranscriptionConfig,
    client: reqwest::Client,
}

impl OpenAiTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Transcription API key not configured"))?;

        info!("🎤 Transcribing audio: {}", audio_path.display());

        let audio_data = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio_data)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")?,
            )
            .text("model", self.config.model.clone())
            .text("response_format", "vtt");

        let response = timeout(
            Duration::from_secs(self.config.timeout_seconds),
            self.client
                .post(&self.config.endpoint)
                .header("Authorization", format!("Bearer {}", api_key))
                .multipart(form)
                .send(),
        )
        .await??;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Transcription API error {}: {}", status, error_text));
        }

        let vtt = response.text().await?;
        info!("✅ Transcription completed: {} characters", vtt.len());

        Ok(vtt)
    }
}
