use serde::de::DeserializeOwned;
use types::{
    Artifact, IdeaList, RunStatus, ScriptBrief, ScriptRecord, Storyboard,
    Transcript, VideoMetadata,
};

use crate::{Pipeline, PipelineError, store::SCRIPT_RECORD_FILE};

/// Everything the studio page shows about the current run.
///
/// Artifacts that are missing or unreadable are `None`; unreadable ones are
/// logged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSnapshot {
    pub status: RunStatus,
    pub ideas: Option<IdeaList>,
    pub script: Option<String>,
    /// File name of the voiceover inside the workspace.
    pub voiceover_file: Option<String>,
    pub brief: Option<ScriptBrief>,
    pub transcript: Option<Transcript>,
    pub storyboard: Option<Storyboard>,
    pub metadata: Option<VideoMetadata>,
}

impl Pipeline {
    pub async fn snapshot(&self) -> RunSnapshot {
        let script = optional(Artifact::Script, self.store.read_text(Artifact::Script).await);

        let brief = match tokio::fs::read(self.store.resolve(SCRIPT_RECORD_FILE)).await {
            Ok(bytes) => serde_json::from_slice::<ScriptRecord>(&bytes)
                .map(|record| record.brief)
                .map_err(|e| tracing::warn!("unreadable {}: {}", SCRIPT_RECORD_FILE, e))
                .ok(),
            Err(_) => None,
        };

        let voiceover_file = self.store.voiceover_path().await.and_then(|path| {
            path.file_name().map(|name| name.to_string_lossy().to_string())
        });

        RunSnapshot {
            status: self.store.status().await,
            ideas: self.read_optional(Artifact::Ideas).await,
            script,
            voiceover_file,
            brief,
            transcript: self.read_optional(Artifact::Transcript).await,
            storyboard: self.read_optional(Artifact::Storyboard).await,
            metadata: self.read_optional(Artifact::Metadata).await,
        }
    }

    async fn read_optional<T: DeserializeOwned>(&self, artifact: Artifact) -> Option<T> {
        optional(artifact, self.store.read_json(artifact).await)
    }
}

fn optional<T>(artifact: Artifact, result: Result<T, PipelineError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(PipelineError::MissingArtifact(_)) => None,
        Err(e) => {
            tracing::warn!("unreadable {}: {}", artifact, e);
            None
        }
    }
}
