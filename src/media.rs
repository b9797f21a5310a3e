use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::MediaConfig;

/// Stream kinds present in a media container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamKinds {
    pub has_video: bool,
    pub has_audio: bool,
}

/// Media operations the pipeline needs from the host system
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Probe which stream kinds the container holds
    async fn probe_streams(&self, media_path: &Path) -> Result<StreamKinds>;

    /// Transcode the source into a low-bitrate mp3 at `output`
    async fn transcode_audio(&self, media_path: &Path, output: &Path) -> Result<()>;

    /// Extract a single frame at `seconds` into `output`
    async fn extract_frame(&self, media_path: &Path, seconds: f64, output: &Path) -> Result<()>;

    /// Perceptual similarity of two frames as a percentage, 100 = identical
    async fn frame_similarity(&self, a: &Path, b: &Path) -> Result<f64>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
}

/// ffmpeg/ffprobe/ImageMagick-backed media tool
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg: String,
    ffprobe: String,
    compare: String,
}

impl FfmpegTool {
    pub fn new() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            compare: "compare".to_string(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            compare: config.compare_path.clone(),
        }
    }
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn probe_streams(&self, media_path: &Path) -> Result<StreamKinds> {
        debug!("Probing streams: {}", media_path.display());

        let output = tokio::process::Command::new(&self.ffprobe)
            .args(["-v", "error", "-show_entries", "stream=codec_type", "-of", "json"])
            .arg(media_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed for {}: {}",
                media_path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| anyhow!("Could not parse ffprobe output: {}", e))?;

        let has_video = probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("video"));
        let has_audio = probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        Ok(StreamKinds { has_video, has_audio })
    }

    async fn transcode_audio(&self, media_path: &Path, output: &Path) -> Result<()> {
        info!("🎵 Generating lower quality MP3: {}", output.display());

        let result = tokio::process::Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(media_path)
            .args(["-codec:a", "libmp3lame", "-qscale:a", "9"])
            .arg(output)
            .output()
            .await?;

        if !result.status.success() {
            return Err(anyhow!(
                "Audio transcode failed for {}: {}",
                media_path.display(),
                String::from_utf8_lossy(&result.stderr).trim()
            ));
        }

        Ok(())
    }

    async fn extract_frame(&self, media_path: &Path, seconds: f64, output: &Path) -> Result<()> {
        let position = seconds.max(0.0).trunc() as u64;
        debug!("Taking snapshot at {}s: {}", position, output.display());

        let result = tokio::process::Command::new(&self.ffmpeg)
            .arg("-y")
            .args(["-ss", &position.to_string()])
            .arg("-i")
            .arg(media_path)
            .args(["-q:v", "5", "-frames:v", "1"])
            .arg(output)
            .output()
            .await?;

        if !result.status.success() {
            return Err(anyhow!(
                "Snapshot failed at {}s for {}: {}",
                position,
                media_path.display(),
                String::from_utf8_lossy(&result.stderr).trim()
            ));
        }

        Ok(())
    }

    async fn frame_similarity(&self, a: &Path, b: &Path) -> Result<f64> {
        debug!("Comparing frames: {} vs {}", a.display(), b.display());

        // compare exits nonzero for differing images; only its metric matters
        let output = tokio::process::Command::new(&self.compare)
            .args(["-metric", "MAE"])
            .arg(a)
            .arg(b)
            .arg("/dev/null")
            .output()
            .await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        match parse_compare_metric(&stderr) {
            Some(normalized_error) => Ok((1.0 - normalized_error) * 100.0),
            None => {
                warn!("Could not read similarity metric from compare output: {}", stderr.trim());
                Ok(0.0)
            }
        }
    }
}

/// Pull the parenthesized normalized mean error out of compare's stderr,
/// e.g. "12939.9 (0.19745)" yields 0.19745
fn parse_compare_metric(stderr: &str) -> Option<f64> {
    let pattern = Regex::new(r"\((\d+(\.\d+)?)\)").ok()?;
    let caps = pattern.captures(stderr)?;
    caps.get(1)?.as_str().parse().ok()
}
