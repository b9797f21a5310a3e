use anyhow::{anyhow, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One persisted stage output
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Stage that produced the artifact
    pub stage: String,
    /// Location on disk
    pub path: PathBuf,
    /// True when the file already existed and compute was skipped
    pub cached: bool,
}

/// Stage-keyed artifact cache over a per-recording working directory.
///
/// An artifact is valid iff its file exists; there is no hashing and no
/// expiry. A failed compute leaves nothing behind, so a rerun resumes at
/// the first missing artifact.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Working directory holding all artifacts for one recording
    work_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    /// Working directory name for a media file: the stem with dots and
    /// spaces flattened to underscores
    pub fn dir_name_for(media_path: &Path) -> String {
        let file_name = media_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("recording");

        let parts: Vec<&str> = file_name.split('.').collect();
        let stem = if parts.len() > 1 {
            parts[..parts.len() - 1].join("_")
        } else {
            file_name.to_string()
        };

        let cleaned = stem.replace(' ', "_");
        if cleaned.is_empty() {
            "recording".to_string()
        } else {
            cleaned
        }
    }

    /// Create the working directory if needed
    pub async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        debug!("📁 Working directory ready: {}", self.work_dir.display());
        Ok(())
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.work_dir.join(file_name)
    }

    pub fn exists(&self, file_name: &str) -> bool {
        self.path_of(file_name).exists()
    }

    /// Return the stage artifact, invoking `compute` for its content only
    /// when the file is missing or `force` is set.
    pub async fn ensure<F, Fut>(
        &self,
        stage: &str,
        file_name: &str,
        force: bool,
        compute: F,
    ) -> Result<Artifact>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let path = self.path_of(file_name);

        if !force && path.exists() {
            info!("📦 {} already exists, skipping...", stage);
            return Ok(Artifact {
                stage: stage.to_string(),
                path,
                cached: true,
            });
        }

        self.initialize().await?;
        let content = compute().await?;
        tokio::fs::write(&path, content).await?;
        debug!("💾 Saved {} artifact: {}", stage, path.display());

        Ok(Artifact {
            stage: stage.to_string(),
            path,
            cached: false,
        })
    }

    /// Like `ensure`, but `compute` writes the output file itself, which
    /// fits stages that shell out to external tools. A failed compute
    /// removes any partial output before the error propagates.
    pub async fn ensure_file<F, Fut>(
        &self,
        stage: &str,
        file_name: &str,
        force: bool,
        compute: F,
    ) -> Result<Artifact>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let path = self.path_of(file_name);

        if !force && path.exists() {
            info!("📦 {} already exists, skipping...", stage);
            return Ok(Artifact {
                stage: stage.to_string(),
                path,
                cached: true,
            });
        }

        self.initialize().await?;
        if let Err(e) = compute(path.clone()).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }
        if !path.exists() {
            return Err(anyhow!("{} produced no output at {}", stage, path.display()));
        }
        debug!("💾 Saved {} artifact: {}", stage, path.display());

        Ok(Artifact {
            stage: stage.to_string(),
            path,
            cached: false,
        })
    }

    /// Read an artifact produced earlier in the run
    pub async fn read(&self, file_name: &str) -> Result<String> {
        let path = self.path_of(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow!("Failed to read artifact {}: {}", path.display(), e))
    }

    /// Copy an external file in as a stage artifact (supplied transcripts)
    pub async fn import(&self, file_name: &str, source: &Path) -> Result<Artifact> {
        self.initialize().await?;
        let path = self.path_of(file_name);
        tokio::fs::copy(source, &path).await.map_err(|e| {
            anyhow!(
                "Failed to import {} as {}: {}",
                source.display(),
                file_name,
                e
            )
        })?;
        info!("📥 Imported {} as {}", source.display(), file_name);

        Ok(Artifact {
            stage: file_name.to_string(),
            path,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ArtifactStore {
        ArtifactStore::new(dir.path().join("work"))
    }

    #[test]
    fn test_dir_name_flattens_dots_and_spaces() {
        assert_eq!(
            ArtifactStore::dir_name_for(Path::new("/tmp/My lecture.v2.mp4")),
            "My_lecture_v2"
        );
        assert_eq!(ArtifactStore::dir_name_for(Path::new("talk.mp3")), "talk");
        assert_eq!(ArtifactStore::dir_name_for(Path::new("plain")), "plain");
    }

    #[tokio::test]
    async fn test_ensure_computes_once() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let artifact = store
            .ensure("title", "title.json", false, || async {
                Ok("first".to_string())
            })
            .await
            .unwrap();
        assert!(!artifact.cached);

        let artifact = store
            .ensure("title", "title.json", false, || async {
                panic!("compute must not run when the artifact exists")
            })
            .await
            .unwrap();
        assert!(artifact.cached);
        assert_eq!(store.read("title.json").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_force_recomputes() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .ensure("title", "title.json", false, || async {
                Ok("first".to_string())
            })
            .await
            .unwrap();
        store
            .ensure("title", "title.json", true, || async {
                Ok("second".to_string())
            })
            .await
            .unwrap();

        assert_eq!(store.read("title.json").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_failed_compute_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let result = store
            .ensure("title", "title.json", false, || async {
                Err(anyhow!("service unavailable"))
            })
            .await;

        assert!(result.is_err());
        assert!(!store.exists("title.json"));
    }

    #[tokio::test]
    async fn test_ensure_file_cleans_partial_output() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let result = store
            .ensure_file("audio", "audio.mp3", false, |path| async move {
                tokio::fs::write(&path, b"partial").await?;
                Err(anyhow!("encoder crashed"))
            })
            .await;

        assert!(result.is_err());
        assert!(!store.exists("audio.mp3"));
    }

    #[tokio::test]
    async fn test_ensure_file_requires_output() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let result = store
            .ensure_file("audio", "audio.mp3", false, |_| async { Ok(()) })
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_import_copies_source() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let source = dir.path().join("supplied.vtt");
        tokio::fs::write(&source, "WEBVTT\n").await.unwrap();

        store.import("transcript.vtt", &source).await.unwrap();
        assert_eq!(store.read("transcript.vtt").await.unwrap(), "WEBVTT\n");
    }
}
