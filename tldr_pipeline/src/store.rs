use serde::{Serialize, de::DeserializeOwned};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use types::{Artifact, RunStatus, Storyboard};

use crate::PipelineError;

/// Extensions accepted for the voiceover, synthesized or uploaded.
pub const AUDIO_EXTENSIONS: [&str; 6] = ["wav", "mp3", "m4a", "ogg", "flac", "webm"];

/// The brief that produced the current script, next to `script.txt`.
pub const SCRIPT_RECORD_FILE: &str = "script.json";

/// Prefix of the scratch directories videos are rendered into.
pub const RENDER_PREFIX: &str = ".render";

const VOICEOVER_STEM: &str = "voiceover";

const PARTIAL_SUFFIX: &str = ".partial";

/// The workspace directory holding the latest run's artifacts.
///
/// Each write goes to a uniquely named sibling file first and is renamed
/// into place, so readers never see a partial artifact.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the workspace and image directories if needed.
    ///
    /// # Errors
    /// If the directories cannot be created.
    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.path(Artifact::Images)).await
    }

    #[must_use]
    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.root.join(artifact.file_name())
    }

    /// Path of a scene image relative to the workspace root.
    #[must_use]
    pub fn image_file_name(index: u32) -> String {
        format!("{}/scene_{index:03}.png", Artifact::Images.file_name())
    }

    /// Resolves a path stored in an artifact (such as a scene's image file)
    /// against the workspace root.
    #[must_use]
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Atomically writes `bytes` to `relative` under the workspace.
    ///
    /// # Errors
    /// If the temporary file cannot be written or renamed.
    pub async fn write_bytes(
        &self,
        relative: &str,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let target = self.root.join(relative);
        let parent = target.parent().unwrap_or(&self.root).to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        let file_name = target
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let temp = parent.join(format!(
            ".{file_name}.{}{PARTIAL_SUFFIX}",
            uuid::Uuid::now_v7()
        ));

        if let Err(e) = tokio::fs::write(&temp, bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }

        tracing::debug!("wrote {} bytes to {}", bytes.len(), target.display());
        Ok(target)
    }

    /// Moves a finished file (for example an ffmpeg output rendered next
    /// to the workspace) into place under `relative`.
    ///
    /// # Errors
    /// If the file cannot be moved.
    pub async fn persist_file(
        &self,
        source: &Path,
        relative: &str,
    ) -> std::io::Result<PathBuf> {
        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if tokio::fs::rename(source, &target).await.is_err() {
            // different filesystem: fall back to copy + atomic write
            let bytes = tokio::fs::read(source).await?;
            self.write_bytes(relative, &bytes).await?;
            let _ = tokio::fs::remove_file(source).await;
        }

        Ok(target)
    }

    /// # Errors
    /// If the file cannot be written.
    pub async fn write_text(
        &self,
        artifact: Artifact,
        text: &str,
    ) -> std::io::Result<PathBuf> {
        self.write_bytes(artifact.file_name(), text.as_bytes()).await
    }

    /// # Errors
    /// `MissingArtifact` if the file does not exist, `Io` otherwise.
    pub async fn read_text(
        &self,
        artifact: Artifact,
    ) -> Result<String, PipelineError> {
        tokio::fs::read_to_string(self.path(artifact))
            .await
            .map_err(|e| missing_or_io(e, artifact))
    }

    /// # Errors
    /// If the value cannot be encoded or the file cannot be written.
    pub async fn write_json<T: Serialize + Sync>(
        &self,
        artifact: Artifact,
        value: &T,
    ) -> Result<PathBuf, PipelineError> {
        let json = serde_json::to_vec_pretty(value)?;
        Ok(self.write_bytes(artifact.file_name(), &json).await?)
    }

    /// # Errors
    /// `MissingArtifact` if the file does not exist, `Json` if it does not
    /// decode, `Io` otherwise.
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        artifact: Artifact,
    ) -> Result<T, PipelineError> {
        let bytes = tokio::fs::read(self.path(artifact))
            .await
            .map_err(|e| missing_or_io(e, artifact))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// The current voiceover file, whatever its extension.
    pub async fn voiceover_path(&self) -> Option<PathBuf> {
        for extension in AUDIO_EXTENSIONS {
            let path = self.root.join(format!("{VOICEOVER_STEM}.{extension}"));
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Some(path);
            }
        }
        None
    }

    /// Replaces the voiceover, removing one stored under another extension.
    ///
    /// # Errors
    /// If the extension is not an accepted audio type or the file cannot
    /// be written.
    pub async fn write_voiceover(
        &self,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, PipelineError> {
        let extension = extension.to_ascii_lowercase();
        if !AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            return Err(PipelineError::InvalidInput(format!(
                "unsupported audio type .{extension}, expected one of {}",
                AUDIO_EXTENSIONS.join(", ")
            )));
        }

        let path = self
            .write_bytes(&format!("{VOICEOVER_STEM}.{extension}"), bytes)
            .await?;

        for other in AUDIO_EXTENSIONS.iter().filter(|e| **e != extension) {
            remove_if_exists(
                &self.root.join(format!("{VOICEOVER_STEM}.{other}")),
            )
            .await?;
        }

        Ok(path)
    }

    pub async fn exists(&self, artifact: Artifact) -> bool {
        match artifact {
            Artifact::Voiceover => self.voiceover_path().await.is_some(),
            Artifact::Images => self.images_complete().await,
            _ => tokio::fs::try_exists(self.path(artifact))
                .await
                .unwrap_or(false),
        }
    }

    // Images count as present only when every scene of the current
    // storyboard has its file on disk.
    async fn images_complete(&self) -> bool {
        let Ok(storyboard) =
            self.read_json::<Storyboard>(Artifact::Storyboard).await
        else {
            return false;
        };

        if storyboard.scenes.is_empty() {
            return false;
        }

        for scene in &storyboard.scenes {
            let Some(image_file) = &scene.image_file else {
                return false;
            };
            if !tokio::fs::try_exists(self.resolve(image_file))
                .await
                .unwrap_or(false)
            {
                return false;
            }
        }

        true
    }

    pub async fn status(&self) -> RunStatus {
        let mut status = RunStatus::default();
        for artifact in Artifact::ALL {
            if self.exists(artifact).await {
                status.present.insert(artifact);
            }
        }
        status
    }

    /// Deletes every artifact of the current run.
    ///
    /// Only files the store writes are removed, so a workspace shared with
    /// other files (even `.`) keeps them.
    ///
    /// # Errors
    /// If a file exists but cannot be removed.
    pub async fn reset(&self) -> std::io::Result<()> {
        for artifact in Artifact::ALL {
            match artifact {
                Artifact::Voiceover => {
                    for extension in AUDIO_EXTENSIONS {
                        remove_if_exists(
                            &self.root.join(format!("{VOICEOVER_STEM}.{extension}")),
                        )
                        .await?;
                    }
                }
                Artifact::Images => {
                    remove_dir_if_exists(&self.path(artifact)).await?;
                }
                _ => remove_if_exists(&self.path(artifact)).await?,
            }
        }
        remove_if_exists(&self.root.join(SCRIPT_RECORD_FILE)).await?;
        self.remove_leftovers().await?;

        tracing::info!("cleared the run in {}", self.root.display());
        self.ensure().await
    }

    // Scratch files from interrupted writes and renders.
    async fn remove_leftovers(&self) -> std::io::Result<()> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(RENDER_PREFIX) {
                remove_dir_if_exists(&entry.path()).await?;
            } else if name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX) {
                remove_if_exists(&entry.path()).await?;
            }
        }
        Ok(())
    }
}

fn missing_or_io(error: std::io::Error, artifact: Artifact) -> PipelineError {
    if error.kind() == ErrorKind::NotFound {
        PipelineError::MissingArtifact(artifact)
    } else {
        PipelineError::Io(error)
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

async fn remove_dir_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
