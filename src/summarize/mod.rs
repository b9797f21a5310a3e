pub mod schema;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::{ChatMessage, LLM};
use crate::topics::{
    coalesce_similar_ids, segments_from_ids, split_by_dominant_topics, Segment, TurnBoundary,
};
use crate::transcript::{chunk_lines, chunk_text, numbered_lines, Transcript};

pub use schema::{Chapter, SummaryItem};

/// How the transcript is cut into summarization units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryStrategy {
    /// Fixed-size raw text chunks; the model reports section clock times
    #[serde(rename = "time-windowed")]
    TimeWindowed,
    /// Per-entry topic labeling, then dominant-topic grouping
    #[serde(rename = "topic-clustered")]
    TopicClustered,
    /// Topic-turn boundary detection, then article-style segment summaries
    #[serde(rename = "article")]
    ArticleStyle,
}

impl fmt::Display for SummaryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryStrategy::TimeWindowed => write!(f, "time-windowed"),
            SummaryStrategy::TopicClustered => write!(f, "topic-clustered"),
            SummaryStrategy::ArticleStyle => write!(f, "article"),
        }
    }
}

impl FromStr for SummaryStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "time-windowed" | "time" => Ok(SummaryStrategy::TimeWindowed),
            "topic-clustered" | "topics" => Ok(SummaryStrategy::TopicClustered),
            "article" | "articles" => Ok(SummaryStrategy::ArticleStyle),
            other => Err(anyhow!("Unknown summary strategy: {}", other)),
        }
    }
}

const BOUNDARY_TEMPLATE: &str = "\
Transcript entries, one JSON object per line:
{entries}
***
Identify each point where the discussion turns to a new topic.
For each turn give the id of the entry where it starts, a short topic label,
and how similar the turn is to the one before it.
Similarity must be one of: \"extremely similar\", \"very similar\", \
\"somewhat similar\", \"not similar\".
Respond with JSON only, in this shape:
{\"topics\": [{\"id\": 0, \"topic\": \"Intro\", \"similarity\": \"extremely similar\"}]}
";

const LABEL_TEMPLATE: &str = "\
Transcript entries, one JSON object per line:
{entries}
***
Assign every entry a topic label between 0 and {max_label}.
Entries discussing the same topic share a label. Skip an entry only if its
text carries no topical content at all.
Respond with JSON only, in this shape:
{\"labels\": [{\"id\": 0, \"topic\": 0}]}
";

const ARTICLE_TEMPLATE: &str = "\
Transcript entries, one JSON object per line:
{entries}
***
Write one or more short articles summarizing the discussion above.
Capture key points: things mentioned frequently, decisions that were made,
and any names of people, places, or times that are mentioned or can be
inferred from context.
Each article needs a title, a one-paragraph summary, and a list of insights.
Each insight cites the ids of the entries it draws from and states the
insight as markdown. Prefer articles covering at least {minimum_summary_minutes} \
minutes of discussion.
Respond with JSON only, in this shape:
{\"articles\": [{\"title\": \"Introduction\", \"summary\": \"Hello world.\", \
\"insights\": [{\"sourceIds\": [0], \"markdown\": \"Hello world.\"}]}]}
";

const SECTIONS_TEMPLATE: &str = "\
Transcript:
{transcript_text}
***
Create a list of sections summarizing the transcript above.
Capture topics briefly: key points are things mentioned frequently, or
decisions that were made. Include names of people, places, or times that
are mentioned or can be inferred from context.
Each section should span at least {minimum_summary_minutes} minutes.
Times are clock strings in hours:minutes, for example \"00:05\".
Respond with JSON only, in this shape:
{\"sections\": [{\"start\": \"00:00\", \"end\": \"00:10\", \"title\": \"Opening\", \
\"summary\": \"Discussed the weather.\", \"items\": [{\"markdown\": \"Weekend plans.\"}]}]}
";

const TITLE_TEMPLATE: &str = "\
Chapter outline:
{outline}
***
Give the recording behind this outline a concise, descriptive title.
Respond with JSON only, in this shape:
{\"title\": \"Quarterly planning sync\"}
";

/// Dispatches chunk prompts concurrently under a worker cap and aggregates
/// responses strictly in input order, failing the whole batch on the first
/// chunk error.
pub struct ChunkSummarizer {
    llm: Arc<dyn LLM>,
    semaphore: Arc<Semaphore>,
}

impl ChunkSummarizer {
    pub fn new(llm: Arc<dyn LLM>, max_concurrent: usize) -> Self {
        Self {
            llm,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run all prompts, returning responses in prompt order regardless of
    /// completion order.
    pub async fn run_ordered(&self, prompts: Vec<String>) -> Result<Vec<String>> {
        let total = prompts.len();
        let mut handles = Vec::with_capacity(total);

        for (index, prompt) in prompts.into_iter().enumerate() {
            let llm = Arc::clone(&self.llm);
            let semaphore = Arc::clone(&self.semaphore);

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                debug!("Dispatching chunk {}/{}", index + 1, total);
                let response = llm.chat(vec![ChatMessage::user(prompt)]).await?;
                Ok::<String, anyhow::Error>(response.content)
            }));
        }

        let mut outputs = Vec::with_capacity(total);
        let mut failure: Option<anyhow::Error> = None;

        for handle in handles {
            if failure.is_some() {
                handle.abort();
                continue;
            }
            match handle.await {
                Ok(Ok(content)) => outputs.push(content),
                Ok(Err(e)) => failure = Some(e),
                Err(e) => failure = Some(e.into()),
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    }
}

/// Strategy-driven transcript summarizer
pub struct Summarizer {
    runner: ChunkSummarizer,
    segmentation_chunk_chars: usize,
    summary_chunk_chars: usize,
    minimum_summary_minutes: u32,
    max_topics: usize,
    dominant_topic_threshold: f64,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LLM>, config: &Config) -> Self {
        Self {
            runner: ChunkSummarizer::new(llm, config.performance.max_concurrent_requests),
            segmentation_chunk_chars: config.segmentation.chunk_chars,
            summary_chunk_chars: config.summary.chunk_chars,
            minimum_summary_minutes: config.summary.minimum_summary_minutes,
            max_topics: config.segmentation.max_topics,
            dominant_topic_threshold: config.segmentation.dominant_topic_threshold,
        }
    }

    /// Produce ordered chapters for the transcript with the given strategy
    pub async fn summarize(
        &self,
        strategy: SummaryStrategy,
        transcript: &Transcript,
        raw_text: &str,
    ) -> Result<Vec<Chapter>> {
        if transcript.is_empty() {
            warn!("Transcript has no entries, nothing to summarize");
            return Ok(Vec::new());
        }

        info!("📝 Summarizing {} entries ({})", transcript.len(), strategy);

        match strategy {
            SummaryStrategy::TimeWindowed => self.time_windowed(raw_text).await,
            SummaryStrategy::TopicClustered => self.topic_clustered(transcript).await,
            SummaryStrategy::ArticleStyle => self.article_style(transcript).await,
        }
    }

    /// Detect topic-turn boundaries across the whole transcript
    pub async fn detect_boundaries(&self, transcript: &Transcript) -> Result<Vec<TurnBoundary>> {
        let lines = transcript.to_numbered_lines()?;
        let chunks = chunk_lines(&lines, self.segmentation_chunk_chars);
        info!("🔍 Detecting topic turns over {} chunks", chunks.len());

        let prompts = chunks
            .iter()
            .map(|chunk| BOUNDARY_TEMPLATE.replace("{entries}", chunk))
            .collect();
        let responses = self.runner.run_ordered(prompts).await?;

        let mut boundaries = Vec::new();
        for response in &responses {
            boundaries.extend(schema::parse_boundaries(response)?);
        }
        Ok(boundaries)
    }

    async fn article_style(&self, transcript: &Transcript) -> Result<Vec<Chapter>> {
        let boundaries = self.detect_boundaries(transcript).await?;
        let ids = coalesce_similar_ids(&boundaries);
        debug!("Coalesced {} boundaries into {} ids", boundaries.len(), ids.len());

        let mut segments = segments_from_ids(&ids);
        if segments.is_empty() {
            segments = vec![Segment::new(0, transcript.len() as u32)];
        }

        self.summarize_segments(transcript, &segments).await
    }

    async fn topic_clustered(&self, transcript: &Transcript) -> Result<Vec<Chapter>> {
        let assignments = self.label_topics(transcript).await?;

        let segments = if assignments.is_empty() {
            warn!("Topic labeling assigned nothing, summarizing as one segment");
            vec![Segment::new(0, transcript.len() as u32)]
        } else {
            let labels: Vec<i64> = assignments.iter().map(|a| a.topic).collect();
            let ranges = split_by_dominant_topics(&labels, self.dominant_topic_threshold);
            ranges
                .iter()
                .map(|range| {
                    Segment::new(assignments[range[0]].id, assignments[range[1]].id + 1)
                })
                .collect()
        };

        self.summarize_segments(transcript, &segments).await
    }

    async fn time_windowed(&self, raw_text: &str) -> Result<Vec<Chapter>> {
        let chunks = chunk_text(raw_text, self.summary_chunk_chars);
        info!("🧩 Summarizing {} raw chunks", chunks.len());

        let prompts = chunks
            .iter()
            .map(|chunk| {
                SECTIONS_TEMPLATE
                    .replace("{transcript_text}", chunk)
                    .replace(
                        "{minimum_summary_minutes}",
                        &self.minimum_summary_minutes.to_string(),
                    )
            })
            .collect();
        let responses = self.runner.run_ordered(prompts).await?;

        let mut chapters = Vec::new();
        for response in &responses {
            let sections = schema::parse_sections(response)?;
            chapters.extend(schema::sections_to_chapters(sections)?);
        }
        Ok(chapters)
    }

    /// Label transcript entries with small-integer topics. Entries the model
    /// leaves out are skipped; duplicate or unknown ids fail the stage.
    async fn label_topics(&self, transcript: &Transcript) -> Result<Vec<schema::TopicLabel>> {
        let lines = transcript.to_numbered_lines()?;
        let chunks = chunk_lines(&lines, self.segmentation_chunk_chars);
        info!("🏷️ Labeling topics over {} chunks", chunks.len());

        let max_label = self.max_topics.saturating_sub(1);
        let prompts = chunks
            .iter()
            .map(|chunk| {
                LABEL_TEMPLATE
                    .replace("{entries}", chunk)
                    .replace("{max_label}", &max_label.to_string())
            })
            .collect();
        let responses = self.runner.run_ordered(prompts).await?;

        let mut labels = Vec::new();
        for response in &responses {
            labels.extend(schema::parse_labels(response)?);
        }
        labels.sort_by_key(|label| label.id);

        let mut seen = HashSet::new();
        for label in &labels {
            if label.id as usize >= transcript.len() {
                return Err(anyhow!("Label names unknown entry id {}", label.id));
            }
            if !seen.insert(label.id) {
                return Err(anyhow!("Duplicate label for entry id {}", label.id));
            }
        }

        let skipped = transcript.len() - labels.len();
        if skipped > 0 {
            debug!("Skipping {} entries the model left unlabeled", skipped);
        }

        Ok(labels)
    }

    async fn summarize_segments(
        &self,
        transcript: &Transcript,
        segments: &[Segment],
    ) -> Result<Vec<Chapter>> {
        info!("📚 Summarizing {} segments", segments.len());

        let prompts = segments
            .iter()
            .map(|segment| {
                let lines = numbered_lines(transcript.slice(segment.start, segment.end))?;
                Ok(ARTICLE_TEMPLATE
                    .replace("{entries}", &lines.join("\n"))
                    .replace(
                        "{minimum_summary_minutes}",
                        &self.minimum_summary_minutes.to_string(),
                    ))
            })
            .collect::<Result<Vec<String>>>()?;
        let responses = self.runner.run_ordered(prompts).await?;

        let mut chapters = Vec::new();
        for (segment, response) in segments.iter().zip(&responses) {
            let articles = schema::parse_articles(response)?;
            schema::validate_source_ids(&articles, segment)?;
            chapters.extend(schema::articles_to_chapters(articles, segment, transcript));
        }
        Ok(chapters)
    }

    /// Collapse the chapter list into one title request
    pub async fn generate_title(&self, chapters: &[Chapter]) -> Result<String> {
        let outline = chapters
            .iter()
            .map(|c| format!("- {}: {}", c.title, c.summary))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = TITLE_TEMPLATE.replace("{outline}", &outline);
        let responses = self.runner.run_ordered(vec![prompt]).await?;
        let response = responses
            .first()
            .ok_or_else(|| anyhow!("Title request produced no response"))?;

        schema::parse_title(response)
    }
}
