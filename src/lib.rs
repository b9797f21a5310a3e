//! Media Recap
//!
//! Turns a long audio/video recording into a structured, navigable summary:
//! topic segments, chapter-level summaries, a title, and deduplicated
//! keyframe snapshots, assembled into a self-contained HTML report. Every
//! pipeline stage persists its output, so interrupted runs resume at the
//! first missing artifact.

pub mod artifacts;
pub mod config;
pub mod llm;
pub mod media;
pub mod pipeline;
pub mod render;
pub mod snapshots;
pub mod summarize;
pub mod topics;
pub mod transcript;
pub mod transcription;

// Re-export main types for easy access
pub use crate::artifacts::{Artifact, ArtifactStore};
pub use crate::config::Config;
pub use crate::llm::{create_llm, LLMConfig, LLMProvider, LLM};
pub use crate::media::{FfmpegTool, MediaTool, StreamKinds};
pub use crate::pipeline::{Pipeline, PipelineReport, StageError, SummarizeRequest};
pub use crate::snapshots::{Snapshot, SnapshotExtractor};
pub use crate::summarize::{Chapter, ChunkSummarizer, Summarizer, SummaryStrategy};
pub use crate::topics::{Segment, Similarity, TurnBoundary};
pub use crate::transcript::{Transcript, TranscriptEntry};
pub use crate::transcription::{OpenAiTranscriber, Transcriber};
