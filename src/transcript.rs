use anyhow::{anyhow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One transcript cue with second-resolution timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Dense 0-based position in the transcript
    pub id: u32,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Cue text with surrounding whitespace trimmed
    pub text: String,
}

impl TranscriptEntry {
    pub fn new(id: u32, start: f64, end: f64, text: String) -> Self {
        Self {
            id,
            start,
            end,
            text: text.trim().to_string(),
        }
    }
}

/// Parsed transcript plus helpers for chunking it into model-sized pieces
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Parse WebVTT content into ordered, densely numbered entries.
    ///
    /// Cue timings may carry an hour component or not; fractional seconds
    /// are truncated. Header, cue identifiers and NOTE blocks are ignored.
    pub fn parse_vtt(content: &str) -> Result<Self> {
        let cue_timing =
            Regex::new(r"^(?:(\d{2,}):)?(\d{2}):(\d{2})\.(\d{3})\s+-->\s+(?:(\d{2,}):)?(\d{2}):(\d{2})\.(\d{3})")
                .map_err(|e| anyhow!("Invalid cue timing pattern: {}", e))?;

        let mut entries = Vec::new();
        let mut lines = content.lines().peekable();

        while let Some(line) = lines.next() {
            let Some(caps) = cue_timing.captures(line.trim()) else {
                continue;
            };

            let start = timing_seconds(caps.get(1), &caps[2], &caps[3])?;
            let end = timing_seconds(caps.get(5), &caps[6], &caps[7])?;

            let mut text = String::new();
            while let Some(text_line) = lines.peek() {
                if text_line.trim().is_empty() || cue_timing.is_match(text_line.trim()) {
                    break;
                }
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(text_line.trim());
                lines.next();
            }

            let id = entries.len() as u32;
            entries.push(TranscriptEntry::new(id, start, end, text));
        }

        Ok(Self { entries })
    }

    /// Load entries previously saved as JSON
    pub fn from_json(content: &str) -> Result<Self> {
        let entries: Vec<TranscriptEntry> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize entries for the transcript.json artifact
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Start times of all entries, in transcript order
    pub fn start_times(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.start).collect()
    }

    /// Render each entry as a single JSON line carrying id, start and text,
    /// the form the segmentation prompts consume
    pub fn to_numbered_lines(&self) -> Result<Vec<String>> {
        numbered_lines(&self.entries)
    }

    /// Entries within a half-open id range
    pub fn slice(&self, start: u32, end: u32) -> &[TranscriptEntry] {
        let lo = (start as usize).min(self.entries.len());
        let hi = (end as usize).min(self.entries.len());
        &self.entries[lo..hi.max(lo)]
    }
}

/// JSON-line rendering for any run of entries
pub fn numbered_lines(entries: &[TranscriptEntry]) -> Result<Vec<String>> {
    entries
        .iter()
        .map(|e| {
            let line = serde_json::json!({
                "id": e.id,
                "start": format_hms(e.start),
                "text": e.text,
            });
            Ok(serde_json::to_string(&line)?)
        })
        .collect()
}

fn timing_seconds(
    hours: Option<regex::Match<'_>>,
    minutes: &str,
    seconds: &str,
) -> Result<f64> {
    let h: u64 = match hours {
        Some(m) => m.as_str().parse()?,
        None => 0,
    };
    let m: u64 = minutes.parse()?;
    let s: u64 = seconds.parse()?;
    Ok((h * 3600 + m * 60 + s) as f64)
}

/// Parse a clock string in "hh:mm" or "hh:mm:ss[.ddd]" form to whole seconds.
///
/// Two components mean hours and minutes; fractional seconds are truncated.
pub fn parse_time_string(time_string: &str) -> Result<f64> {
    let parts: Vec<&str> = time_string.split(':').collect();

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m] => (*h, *m, "0"),
        [h, m, s] => (*h, *m, s.split('.').next().unwrap_or("0")),
        _ => return Err(anyhow!("Invalid time format: {}", time_string)),
    };

    let hours: u64 = hours
        .parse()
        .map_err(|_| anyhow!("Invalid hours in time string: {}", time_string))?;
    let minutes: u64 = minutes
        .parse()
        .map_err(|_| anyhow!("Invalid minutes in time string: {}", time_string))?;
    let seconds: u64 = seconds
        .parse()
        .map_err(|_| anyhow!("Invalid seconds in time string: {}", time_string))?;

    Ok((hours * 3600 + minutes * 60 + seconds) as f64)
}

/// Format whole seconds as "HH:MM:SS"
pub fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Split raw text into chunks of at most `max_chars` characters,
/// respecting UTF-8 boundaries
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect())
        .collect()
}

/// Pack whole lines into chunks of at most `max_chars` characters.
/// A line longer than the budget still becomes its own chunk.
pub fn chunk_lines(lines: &[String], max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for line in lines {
        let line_chars = line.chars().count();
        if current_chars > 0 && current_chars + 1 + line_chars > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if current_chars > 0 {
            current.push('\n');
            current_chars += 1;
        }
        current.push_str(line);
        current_chars += line_chars;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_VTT: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHi everybody.\n\n00:00:05.000 --> 00:00:10.000\nconsectetur adipiscing elit,\n";

    #[test]
    fn test_parse_time_string_two_parts_is_hours_minutes() {
        assert_eq!(parse_time_string("00:01").unwrap(), 60.0);
        assert_eq!(parse_time_string("01:02").unwrap(), 3720.0);
    }

    #[test]
    fn test_parse_time_string_three_parts() {
        assert_eq!(parse_time_string("01:00:00.000").unwrap(), 3600.0);
        assert_eq!(parse_time_string("00:01:02.000").unwrap(), 62.0);
        assert_eq!(parse_time_string("00:01:02.999").unwrap(), 62.0);
    }

    #[test]
    fn test_parse_time_string_rejects_garbage() {
        assert!(parse_time_string("1").is_err());
        assert!(parse_time_string("a:b").is_err());
        assert!(parse_time_string("1:2:3:4").is_err());
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0.0), "00:00:00");
        assert_eq!(format_hms(62.0), "00:01:02");
        assert_eq!(format_hms(3661.9), "01:01:01");
    }

    #[test]
    fn test_parse_vtt_assigns_dense_ids() {
        let transcript = Transcript::parse_vtt(SAMPLE_VTT).unwrap();
        assert_eq!(transcript.len(), 2);

        let entries = transcript.entries();
        assert_eq!(entries[0].id, 0);
        assert_eq!(entries[0].start, 1.0);
        assert_eq!(entries[0].end, 2.0);
        assert_eq!(entries[0].text, "Hi everybody.");
        assert_eq!(entries[1].id, 1);
        assert_eq!(entries[1].start, 5.0);
    }

    #[test]
    fn test_parse_vtt_without_hours() {
        let vtt = "WEBVTT\n\n00:01.500 --> 00:07.000\nshort form timing\n";
        let transcript = Transcript::parse_vtt(vtt).unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.entries()[0].start, 1.0);
        assert_eq!(transcript.entries()[0].end, 7.0);
    }

    #[test]
    fn test_parse_vtt_joins_multiline_cues() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:05.000\nfirst line\nsecond line\n";
        let transcript = Transcript::parse_vtt(vtt).unwrap();
        assert_eq!(transcript.entries()[0].text, "first line second line");
    }

    #[test]
    fn test_start_times() {
        let transcript = Transcript::parse_vtt(SAMPLE_VTT).unwrap();
        assert_eq!(transcript.start_times(), vec![1.0, 5.0]);
    }

    #[test]
    fn test_numbered_lines_carry_id_and_clock() {
        let transcript = Transcript::parse_vtt(SAMPLE_VTT).unwrap();
        let lines = transcript.to_numbered_lines().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"id\":0"));
        assert!(lines[0].contains("00:00:01"));
        assert!(lines[1].contains("\"id\":1"));
    }

    #[test]
    fn test_chunk_text_respects_char_budget() {
        let chunks = chunk_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_chunk_text_multibyte_safe() {
        let chunks = chunk_text("ééééé", 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_chunk_lines_packs_whole_lines() {
        let lines = vec!["aaaa".to_string(), "bbbb".to_string(), "cc".to_string()];
        let chunks = chunk_lines(&lines, 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cc"]);
    }

    #[test]
    fn test_chunk_lines_oversized_line_is_own_chunk() {
        let lines = vec!["tiny".to_string(), "x".repeat(50)];
        let chunks = chunk_lines(&lines, 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "tiny");
        assert_eq!(chunks[1].chars().count(), 50);
    }

    #[test]
    fn test_json_round_trip() {
        let transcript = Transcript::parse_vtt(SAMPLE_VTT).unwrap();
        let json = transcript.to_json().unwrap();
        let restored = Transcript::from_json(&json).unwrap();
        assert_eq!(restored.entries(), transcript.entries());
    }

    #[test]
    fn test_slice_clamps_out_of_range() {
        let transcript = Transcript::parse_vtt(SAMPLE_VTT).unwrap();
        assert_eq!(transcript.slice(0, 2).len(), 2);
        assert_eq!(transcript.slice(1, 99).len(), 1);
        assert_eq!(transcript.slice(5, 9).len(), 0);
    }
}
