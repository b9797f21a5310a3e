use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::SnapshotConfig;
use crate::media::MediaTool;
use crate::transcript::format_hms;

/// One keyframe retained after spacing and similarity filtering
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Whole-second timestamp the frame was taken at
    pub seconds: f64,
    /// Clock label, hours:minutes:seconds
    pub label: String,
    /// Image file name inside the working directory
    pub file_name: String,
}

/// Walks candidate timestamps left to right, extracting frames and dropping
/// ones too close in time or too similar in content to the last kept frame.
pub struct SnapshotExtractor {
    media: Arc<dyn MediaTool>,
    min_interval_secs: f64,
    similarity_threshold: f64,
}

impl SnapshotExtractor {
    pub fn new(media: Arc<dyn MediaTool>, config: &SnapshotConfig) -> Self {
        Self {
            media,
            min_interval_secs: config.min_interval_secs,
            similarity_threshold: config.similarity_threshold,
        }
    }

    /// Extract and filter frames at the candidate times, writing kept images
    /// into `out_dir`. Sequential by design: every keep/discard decision
    /// depends on the previous kept frame.
    pub async fn capture(
        &self,
        video: &Path,
        candidate_times: &[f64],
        out_dir: &Path,
    ) -> Result<Vec<Snapshot>> {
        info!(
            "📸 Capturing snapshots from {} candidate times",
            candidate_times.len()
        );

        let mut previous_time = 0.0;
        let mut previous_path: Option<PathBuf> = None;
        let mut kept = Vec::new();

        for &candidate in candidate_times {
            let seconds = candidate.max(0.0).trunc();
            if seconds - previous_time < self.min_interval_secs {
                continue;
            }

            let label = format_hms(seconds);
            let file_name = format!("{}.jpg", label.replace(':', "_"));
            let path = out_dir.join(&file_name);

            self.media.extract_frame(video, seconds, &path).await?;

            if let Some(last_kept) = &previous_path {
                let similarity = self.media.frame_similarity(last_kept, &path).await?;
                if similarity > self.similarity_threshold {
                    debug!(
                        "Frame at {} is {:.1}% similar to the last kept frame, removing",
                        label, similarity
                    );
                    tokio::fs::remove_file(&path).await?;
                    // A discarded frame still advances the spacing clock so
                    // near-identical stretches are not re-sampled every
                    // min_interval from the last kept time.
                    previous_time = seconds;
                    continue;
                }
            }

            previous_time = seconds;
            previous_path = Some(path);
            kept.push(Snapshot {
                seconds,
                label,
                file_name,
            });
        }

        info!("✅ Kept {} snapshots", kept.len());
        Ok(kept)
    }
}

/// Render the kept snapshots as image tags, one per line
pub fn snapshots_html(kept: &[Snapshot]) -> String {
    kept.iter()
        .map(|s| format!("<img data-start='{}' src='{}'>", s.label, s.file_name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::StreamKinds;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Media double that writes marker files and answers similarity
    /// questions from a queue
    struct ScriptedMedia {
        similarities: Mutex<VecDeque<f64>>,
        extracted: Mutex<Vec<f64>>,
        compared: Mutex<Vec<(PathBuf, PathBuf)>>,
    }

    impl ScriptedMedia {
        fn new(similarities: Vec<f64>) -> Self {
            Self {
                similarities: Mutex::new(similarities.into()),
                extracted: Mutex::new(Vec::new()),
                compared: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MediaTool for ScriptedMedia {
        async fn probe_streams(&self, _media_path: &Path) -> Result<StreamKinds> {
            Ok(StreamKinds {
                has_video: true,
                has_audio: true,
            })
        }

        async fn transcode_audio(&self, _media_path: &Path, _output: &Path) -> Result<()> {
            Ok(())
        }

        async fn extract_frame(
            &self,
            _media_path: &Path,
            seconds: f64,
            output: &Path,
        ) -> Result<()> {
            self.extracted.lock().unwrap().push(seconds);
            std::fs::write(output, seconds.to_string())?;
            Ok(())
        }

        async fn frame_similarity(&self, a: &Path, b: &Path) -> Result<f64> {
            self.compared
                .lock()
                .unwrap()
                .push((a.to_path_buf(), b.to_path_buf()));
            Ok(self.similarities.lock().unwrap().pop_front().unwrap_or(0.0))
        }
    }

    fn extractor(media: Arc<ScriptedMedia>, min_interval: f64) -> SnapshotExtractor {
        SnapshotExtractor::new(
            media,
            &SnapshotConfig {
                min_interval_secs: min_interval,
                similarity_threshold: 90.0,
            },
        )
    }

    #[tokio::test]
    async fn test_minimum_spacing_between_kept_frames() {
        let media = Arc::new(ScriptedMedia::new(vec![10.0]));
        let dir = TempDir::new().unwrap();

        let kept = extractor(Arc::clone(&media), 10.0)
            .capture(Path::new("video.mp4"), &[0.0, 5.0, 12.0, 15.0, 30.0], dir.path())
            .await
            .unwrap();

        let times: Vec<f64> = kept.iter().map(|s| s.seconds).collect();
        assert_eq!(times, vec![12.0, 30.0]);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= 10.0);
        }

        // Too-close candidates never hit the media tool
        assert_eq!(*media.extracted.lock().unwrap(), vec![12.0, 30.0]);
        for snapshot in &kept {
            assert!(dir.path().join(&snapshot.file_name).exists());
        }
    }

    #[tokio::test]
    async fn test_similar_frame_is_removed_but_advances_the_clock() {
        // 20s frame similar to 10s, 30s frame is not
        let media = Arc::new(ScriptedMedia::new(vec![95.0, 40.0]));
        let dir = TempDir::new().unwrap();

        let kept = extractor(Arc::clone(&media), 10.0)
            .capture(Path::new("video.mp4"), &[10.0, 20.0, 25.0, 30.0], dir.path())
            .await
            .unwrap();

        let times: Vec<f64> = kept.iter().map(|s| s.seconds).collect();
        assert_eq!(times, vec![10.0, 30.0]);

        // 25s was inside the discarded frame's spacing window
        assert_eq!(*media.extracted.lock().unwrap(), vec![10.0, 20.0, 30.0]);

        // The discarded image is gone from disk
        assert!(!dir.path().join("00_00_20.jpg").exists());
        assert!(dir.path().join("00_00_10.jpg").exists());
        assert!(dir.path().join("00_00_30.jpg").exists());
    }

    #[tokio::test]
    async fn test_comparisons_run_against_last_kept_frame() {
        let media = Arc::new(ScriptedMedia::new(vec![95.0, 40.0]));
        let dir = TempDir::new().unwrap();

        extractor(Arc::clone(&media), 10.0)
            .capture(Path::new("video.mp4"), &[10.0, 20.0, 30.0], dir.path())
            .await
            .unwrap();

        let compared = media.compared.lock().unwrap();
        assert_eq!(compared.len(), 2);
        // Both the 20s and 30s frames compare against the kept 10s frame
        assert_eq!(compared[0].0, dir.path().join("00_00_10.jpg"));
        assert_eq!(compared[1].0, dir.path().join("00_00_10.jpg"));
        assert_eq!(compared[1].1, dir.path().join("00_00_30.jpg"));
    }

    #[test]
    fn test_fractional_candidates_truncate_to_whole_seconds() {
        tokio_test::block_on(async {
            let media = Arc::new(ScriptedMedia::new(vec![]));
            let dir = TempDir::new().unwrap();

            let kept = extractor(Arc::clone(&media), 10.0)
                .capture(Path::new("video.mp4"), &[3661.5], dir.path())
                .await
                .unwrap();

            assert_eq!(kept.len(), 1);
            assert_eq!(kept[0].seconds, 3661.0);
            assert_eq!(kept[0].label, "01:01:01");
            assert_eq!(kept[0].file_name, "01_01_01.jpg");
        });
    }

    #[test]
    fn test_snapshots_html_one_image_tag_per_line() {
        let kept = vec![
            Snapshot {
                seconds: 12.0,
                label: "00:00:12".to_string(),
                file_name: "00_00_12.jpg".to_string(),
            },
            Snapshot {
                seconds: 30.0,
                label: "00:00:30".to_string(),
                file_name: "00_00_30.jpg".to_string(),
            },
        ];

        assert_eq!(
            snapshots_html(&kept),
            "<img data-start='00:00:12' src='00_00_12.jpg'>\n\
             <img data-start='00:00:30' src='00_00_30.jpg'>"
        );
    }

    #[test]
    fn test_snapshots_html_empty() {
        assert_eq!(snapshots_html(&[]), "");
    }
}
