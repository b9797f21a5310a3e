use anyhow::{anyhow, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::llm::LLM;
use crate::media::MediaTool;
use crate::render;
use crate::snapshots::{snapshots_html, SnapshotExtractor};
use crate::summarize::{schema, Chapter, Summarizer};
use crate::transcription::Transcriber;
use crate::transcript::Transcript;

/// Pipeline failures, named by the stage that raised them
#[derive(Debug, Error)]
pub enum StageError {
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("{0} has no audio stream")]
    NoAudio(PathBuf),

    #[error("{stage} stage failed: {source}")]
    Failed {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl StageError {
    fn failed(stage: &'static str) -> impl FnOnce(anyhow::Error) -> StageError {
        move |source| StageError::Failed { stage, source }
    }
}

/// One summarize invocation
#[derive(Debug, Clone)]
pub struct SummarizeRequest {
    /// Source recording
    pub media_path: PathBuf,
    /// Supplied transcript, skipping the transcription stage
    pub transcript: Option<PathBuf>,
    /// Recompute stages whose artifacts already exist
    pub force: bool,
    /// Suppress progress printing
    pub quiet: bool,
}

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub work_dir: PathBuf,
    pub title: String,
    pub chapter_count: usize,
    pub snapshot_count: usize,
}

/// Sequences the stages: probe, audio, transcript, entries, chapters,
/// title, snapshots, rendered pages. Each stage's output is persisted
/// through the artifact store, so a rerun resumes at the first missing
/// artifact.
pub struct Pipeline {
    config: Config,
    llm: Arc<dyn LLM>,
    media: Arc<dyn MediaTool>,
    transcriber: Arc<dyn Transcriber>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        llm: Arc<dyn LLM>,
        media: Arc<dyn MediaTool>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            config,
            llm,
            media,
            transcriber,
        }
    }

    /// Working directory for a recording, under the configured output root
    pub fn store_for(&self, media_path: &Path) -> ArtifactStore {
        let dir_name = ArtifactStore::dir_name_for(media_path);
        ArtifactStore::new(self.config.output.base_dir.join(dir_name))
    }

    pub async fn run(&self, request: &SummarizeRequest) -> Result<PipelineReport> {
        if !request.media_path.exists() {
            return Err(StageError::MissingInput(request.media_path.clone()).into());
        }

        let store = self.store_for(&request.media_path);
        info!("🎬 Output directory: {}", store.work_dir().display());

        let streams = self
            .media
            .probe_streams(&request.media_path)
            .await
            .map_err(StageError::failed("probe"))?;
        if !streams.has_audio {
            return Err(StageError::NoAudio(request.media_path.clone()).into());
        }

        progress(request.quiet, "Generating audio sample...");
        let audio = store
            .ensure_file("audio", "audio.mp3", request.force, |path| async move {
                self.media.transcode_audio(&request.media_path, &path).await
            })
            .await
            .map_err(StageError::failed("audio"))?;

        if let Some(supplied) = &request.transcript {
            if !supplied.exists() {
                return Err(StageError::MissingInput(supplied.clone()).into());
            }
            store
                .import("transcript.vtt", supplied)
                .await
                .map_err(StageError::failed("transcript"))?;
        } else {
            progress(request.quiet, "Generating transcript...");
            let audio_path = audio.path.clone();
            store
                .ensure("transcript", "transcript.vtt", request.force, || async move {
                    self.transcriber.transcribe(&audio_path).await
                })
                .await
                .map_err(StageError::failed("transcript"))?;
        }

        let vtt_text = store.read("transcript.vtt").await?;
        let transcript =
            Transcript::parse_vtt(&vtt_text).map_err(StageError::failed("entries"))?;
        store
            .ensure("entries", "transcript.json", request.force, {
                let transcript = &transcript;
                move || async move { transcript.to_json() }
            })
            .await
            .map_err(StageError::failed("entries"))?;

        progress(request.quiet, "Generating summary...");
        let summarizer = Summarizer::new(Arc::clone(&self.llm), &self.config);
        let strategy = self.config.summary.strategy;
        store
            .ensure("chapters", "chapters.json", request.force, {
                let summarizer = &summarizer;
                let transcript = &transcript;
                let vtt_text = &vtt_text;
                move || async move {
                    let chapters = summarizer.summarize(strategy, transcript, vtt_text).await?;
                    Ok(serde_json::to_string_pretty(&chapters)?)
                }
            })
            .await
            .map_err(StageError::failed("chapters"))?;
        let chapters: Vec<Chapter> = serde_json::from_str(&store.read("chapters.json").await?)
            .map_err(|e| StageError::failed("chapters")(anyhow!("invalid cached chapters: {}", e)))?;

        store
            .ensure("title", "title.json", request.force, {
                let summarizer = &summarizer;
                let chapters = &chapters;
                let fallback = dir_title(&store);
                move || async move {
                    let title = if chapters.is_empty() {
                        fallback
                    } else {
                        summarizer.generate_title(chapters).await?
                    };
                    Ok(json!({ "title": title }).to_string())
                }
            })
            .await
            .map_err(StageError::failed("title"))?;
        let title = schema::parse_title(&store.read("title.json").await?)
            .map_err(StageError::failed("title"))?;

        let mut snapshot_count = 0;
        if streams.has_video {
            progress(request.quiet, "Generating snapshots...");
            let candidates = transcript.start_times();
            let work_dir = store.work_dir().to_path_buf();
            store
                .ensure_file("snapshots", "snapshots.html", request.force, |path| async move {
                    let extractor =
                        SnapshotExtractor::new(Arc::clone(&self.media), &self.config.snapshots);
                    let kept = extractor
                        .capture(&request.media_path, &candidates, &work_dir)
                        .await?;
                    tokio::fs::write(&path, snapshots_html(&kept)).await?;
                    Ok(())
                })
                .await
                .map_err(StageError::failed("snapshots"))?;
            snapshot_count = store
                .read("snapshots.html")
                .await?
                .lines()
                .filter(|line| !line.trim().is_empty())
                .count();
        }

        store
            .ensure("summary", "summary.html", request.force, {
                let chapters = &chapters;
                move || async move { Ok(render::summary_html(chapters)) }
            })
            .await
            .map_err(StageError::failed("render"))?;

        progress(request.quiet, "Creating HTML files...");
        write_index(&store, &title, request.force)
            .await
            .map_err(StageError::failed("render"))?;

        info!("✅ Summarized into {}", store.work_dir().display());
        Ok(PipelineReport {
            work_dir: store.work_dir().to_path_buf(),
            title,
            chapter_count: chapters.len(),
            snapshot_count,
        })
    }
}

/// Rebuild the report pages from artifacts already in `work_dir`. Needs no
/// external services, only the files a previous run left behind.
pub async fn update_index(work_dir: &Path, quiet: bool) -> Result<()> {
    let store = ArtifactStore::new(work_dir.to_path_buf());
    if !store.exists("summary.html") {
        return Err(StageError::MissingInput(store.path_of("summary.html")).into());
    }

    let title = if store.exists("title.json") {
        schema::parse_title(&store.read("title.json").await?)
            .map_err(StageError::failed("render"))?
    } else {
        dir_title(&store)
    };

    progress(quiet, "Creating HTML files...");
    write_index(&store, &title, true)
        .await
        .map_err(StageError::failed("render"))
        .map_err(Into::into)
}

/// Write index.html plus a page named after the working directory, both
/// holding the same filled template
async fn write_index(store: &ArtifactStore, title: &str, force: bool) -> Result<()> {
    let summary = store.read("summary.html").await?;
    let transcript = store.read("transcript.vtt").await?;
    let snapshots = if store.exists("snapshots.html") {
        store.read("snapshots.html").await?
    } else {
        String::new()
    };

    let page = render::index_html(title, &summary, &transcript, &snapshots);
    let dir_page = format!("{}.html", dir_title(store));

    for file_name in ["index.html", dir_page.as_str()] {
        if force || !store.exists(file_name) {
            tokio::fs::write(store.path_of(file_name), &page).await?;
            info!("📄 Wrote {}", file_name);
        } else {
            info!("📦 {} already exists, skipping...", file_name);
        }
    }
    Ok(())
}

fn progress(quiet: bool, message: &str) {
    if !quiet {
        println!("{}", message);
    }
}

fn dir_title(store: &ArtifactStore) -> String {
    store
        .work_dir()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("recording")
        .to_string()
}
