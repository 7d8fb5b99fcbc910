use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A file (or directory) in the workspace produced by one pipeline stage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Ideas,
    Script,
    Voiceover,
    Transcript,
    Storyboard,
    Images,
    Metadata,
    Thumbnail,
    Video,
}

impl Artifact {
    /// Pipeline order.
    pub const ALL: [Self; 9] = [
        Self::Ideas,
        Self::Script,
        Self::Voiceover,
        Self::Transcript,
        Self::Storyboard,
        Self::Images,
        Self::Metadata,
        Self::Thumbnail,
        Self::Video,
    ];

    /// File name inside the workspace.
    ///
    /// The voiceover keeps the extension of whatever produced it, so this is
    /// only its default (synthesized) name. `Images` is a directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Ideas => "ideas.json",
            Self::Script => "script.txt",
            Self::Voiceover => "voiceover.wav",
            Self::Transcript => "timestamps.json",
            Self::Storyboard => "storyboard.json",
            Self::Images => "images",
            Self::Metadata => "metadata.json",
            Self::Thumbnail => "thumbnail.png",
            Self::Video => "video.mp4",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ideas => "ideas",
            Self::Script => "script",
            Self::Voiceover => "voice-over",
            Self::Transcript => "timestamps",
            Self::Storyboard => "storyboard",
            Self::Images => "scene images",
            Self::Metadata => "SEO metadata",
            Self::Thumbnail => "thumbnail",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which artifacts of the current run exist on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub present: BTreeSet<Artifact>,
}

impl RunStatus {
    #[must_use]
    pub fn has(&self, artifact: Artifact) -> bool {
        self.present.contains(&artifact)
    }

    /// First artifact of the main line (script through video) that is
    /// still missing. Ideas and the thumbnail are optional side steps.
    #[must_use]
    pub fn next_missing(&self) -> Option<Artifact> {
        Artifact::ALL
            .into_iter()
            .filter(|artifact| {
                !matches!(artifact, Artifact::Ideas | Artifact::Thumbnail)
            })
            .find(|artifact| !self.has(*artifact))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_next_missing_skips_optional_steps() {
        let mut status = RunStatus::default();
        assert_eq!(status.next_missing(), Some(Artifact::Script));

        status.present.insert(Artifact::Script);
        status.present.insert(Artifact::Voiceover);
        assert_eq!(status.next_missing(), Some(Artifact::Transcript));

        status.present.extend([
            Artifact::Transcript,
            Artifact::Storyboard,
            Artifact::Images,
            Artifact::Metadata,
            Artifact::Video,
        ]);
        assert_eq!(status.next_missing(), None);
    }
}
