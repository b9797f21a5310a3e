use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::topics::{Segment, TurnBoundary};
use crate::transcript::{parse_time_string, Transcript};

/// Boundary-detection response, `{"topics": [...]}`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BoundaryList {
    topics: Vec<TurnBoundary>,
}

/// Article-style summarization response, `{"articles": [...]}`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArticleList {
    articles: Vec<Article>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Article {
    pub title: String,
    pub summary: String,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Insight {
    #[serde(rename = "sourceIds")]
    pub source_ids: Vec<u32>,
    pub markdown: String,
}

/// Time-windowed summarization response, `{"sections": [...]}`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SectionList {
    sections: Vec<Section>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Section {
    /// Clock string like "00:05", hours:minutes
    pub start: String,
    pub end: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub items: Vec<SectionItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionItem {
    pub markdown: String,
}

/// Topic-labeling response, `{"labels": [...]}`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LabelList {
    labels: Vec<TopicLabel>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicLabel {
    /// Transcript entry id
    pub id: u32,
    /// Small-integer topic label
    pub topic: i64,
}

/// Title response, `{"title": "..."}`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TitleResponse {
    title: String,
}

/// Normalized summary unit every strategy converges on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub title: String,
    pub summary: String,
    pub items: Vec<SummaryItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryItem {
    /// Transcript entry ids the item draws from; empty for raw-chunk strategies
    pub source_ids: Vec<u32>,
    pub markdown: String,
}

/// Strip a markdown code fence if the model wrapped its JSON in one
fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

pub fn parse_boundaries(content: &str) -> Result<Vec<TurnBoundary>> {
    let list: BoundaryList = serde_json::from_str(extract_json(content))
        .map_err(|e| anyhow!("Invalid boundary response: {}", e))?;
    Ok(list.topics)
}

pub fn parse_articles(content: &str) -> Result<Vec<Article>> {
    let list: ArticleList = serde_json::from_str(extract_json(content))
        .map_err(|e| anyhow!("Invalid article response: {}", e))?;
    Ok(list.articles)
}

pub fn parse_sections(content: &str) -> Result<Vec<Section>> {
    let list: SectionList = serde_json::from_str(extract_json(content))
        .map_err(|e| anyhow!("Invalid section response: {}", e))?;
    Ok(list.sections)
}

pub fn parse_labels(content: &str) -> Result<Vec<TopicLabel>> {
    let list: LabelList = serde_json::from_str(extract_json(content))
        .map_err(|e| anyhow!("Invalid label response: {}", e))?;
    Ok(list.labels)
}

pub fn parse_title(content: &str) -> Result<String> {
    let response: TitleResponse = serde_json::from_str(extract_json(content))
        .map_err(|e| anyhow!("Invalid title response: {}", e))?;
    Ok(response.title.trim().to_string())
}

/// Every cited entry id must fall inside the segment the prompt covered
pub fn validate_source_ids(articles: &[Article], segment: &Segment) -> Result<()> {
    for article in articles {
        for insight in &article.insights {
            for &id in &insight.source_ids {
                if !segment.contains(id) {
                    return Err(anyhow!(
                        "Cited entry {} falls outside segment range {}..{}",
                        id,
                        segment.start,
                        segment.end
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Convert one segment's validated articles into chapters. Chapter timing
/// comes from the cited entries when present, otherwise the whole segment.
pub fn articles_to_chapters(
    articles: Vec<Article>,
    segment: &Segment,
    transcript: &Transcript,
) -> Vec<Chapter> {
    let segment_entries = transcript.slice(segment.start, segment.end);
    let segment_start = segment_entries.first().map_or(0.0, |e| e.start);
    let segment_end = segment_entries.last().map_or(segment_start, |e| e.end);

    articles
        .into_iter()
        .map(|article| {
            let cited_ids: Vec<u32> = article
                .insights
                .iter()
                .flat_map(|i| i.source_ids.iter().copied())
                .collect();

            let start = cited_ids
                .iter()
                .min()
                .and_then(|&id| entry_start(transcript, id))
                .unwrap_or(segment_start);
            let end = cited_ids
                .iter()
                .max()
                .and_then(|&id| entry_end(transcript, id))
                .unwrap_or(segment_end);

            Chapter {
                start,
                end,
                title: article.title,
                summary: article.summary,
                items: article
                    .insights
                    .into_iter()
                    .map(|insight| SummaryItem {
                        source_ids: insight.source_ids,
                        markdown: insight.markdown,
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Convert time-windowed sections into chapters, resolving the model's
/// clock strings. A malformed clock string fails the chunk.
pub fn sections_to_chapters(sections: Vec<Section>) -> Result<Vec<Chapter>> {
    sections
        .into_iter()
        .map(|section| {
            let start = parse_time_string(&section.start)?;
            let end = parse_time_string(&section.end)?;
            Ok(Chapter {
                start,
                end,
                title: section.title,
                summary: section.summary,
                items: section
                    .items
                    .into_iter()
                    .map(|item| SummaryItem {
                        source_ids: Vec::new(),
                        markdown: item.markdown,
                    })
                    .collect(),
            })
        })
        .collect()
}

fn entry_start(transcript: &Transcript, id: u32) -> Option<f64> {
    transcript.entries().get(id as usize).map(|e| e.start)
}

fn entry_end(transcript: &Transcript, id: u32) -> Option<f64> {
    transcript.entries().get(id as usize).map(|e| e.end)
}
