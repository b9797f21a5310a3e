use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Model verdict on how similar a detected turn is to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Similarity {
    #[serde(rename = "extremely similar")]
    ExtremelySimilar,
    #[serde(rename = "very similar")]
    VerySimilar,
    #[serde(rename = "somewhat similar")]
    SomewhatSimilar,
    #[serde(rename = "not similar")]
    NotSimilar,
}

impl Similarity {
    /// True when the turn is close enough to fold into the previous one
    pub fn is_continuation(&self) -> bool {
        matches!(self, Similarity::ExtremelySimilar | Similarity::VerySimilar)
    }
}

/// A topic turn the model detected at a transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurnBoundary {
    /// Transcript entry id where the turn starts
    pub id: u32,
    /// Short topic label for the turn
    pub topic: String,
    /// Similarity to the preceding turn
    pub similarity: Similarity,
}

/// Half-open range of transcript entry ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: u32,
    pub end: u32,
}

impl Segment {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, id: u32) -> bool {
        id >= self.start && id < self.end
    }
}

/// Drop boundaries whose turn is a continuation of the previous one,
/// keeping the ids where the topic genuinely changes. The first retained
/// boundary is always kept so the segment list covers the transcript head.
pub fn coalesce_similar_ids(boundaries: &[TurnBoundary]) -> Vec<u32> {
    let mut retained = Vec::new();

    for boundary in boundaries {
        if retained.is_empty() || !boundary.similarity.is_continuation() {
            retained.push(boundary.id);
        }
    }

    retained
}

/// Convert a sorted boundary id list into half-open segments between
/// consecutive ids. Fewer than two ids yield no segments; callers treat
/// that as "the whole transcript is one segment".
pub fn segments_from_ids(ids: &[u32]) -> Vec<Segment> {
    ids.iter()
        .zip(ids.iter().skip(1))
        .map(|(&start, &end)| Segment::new(start, end))
        .collect()
}

/// Split a label sequence into contiguous inclusive index ranges, one per
/// dominant label. A label is dominant when its overall share reaches
/// `threshold`; a range closes the first time the running share of a dominant
/// label strictly exceeds an equal split among the dominant labels. With one
/// dominant label or none, the whole sequence is a single range.
pub fn split_by_dominant_topics(topics: &[i64], threshold: f64) -> Vec<[usize; 2]> {
    let total = topics.len();
    if total == 0 {
        return Vec::new();
    }

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &topic in topics {
        *counts.entry(topic).or_insert(0) += 1;
    }

    let dominant: HashSet<i64> = counts
        .iter()
        .filter(|(_, &count)| count as f64 / total as f64 >= threshold)
        .map(|(&topic, _)| topic)
        .collect();

    if dominant.len() <= 1 {
        return vec![[0, total - 1]];
    }

    let dominant_threshold = 1.0 / dominant.len() as f64;
    let mut counts_so_far: HashMap<i64, usize> = HashMap::new();
    let mut finished: HashSet<i64> = HashSet::new();
    let mut result: Vec<[usize; 2]> = Vec::new();

    for (i, &topic) in topics.iter().enumerate() {
        let seen = counts_so_far.entry(topic).or_insert(0);
        *seen += 1;

        // Only the label just counted can newly cross its share.
        if !dominant.contains(&topic) || finished.contains(&topic) {
            continue;
        }
        if *seen as f64 / counts[&topic] as f64 > dominant_threshold {
            finished.insert(topic);
            let start = result.last().map_or(0, |last| last[1] + 1);
            result.push([start, i]);
        }
    }

    if let Some(last) = result.last_mut() {
        if last[1] != total - 1 {
            last[1] = total - 1;
        }
    }

    result
}
