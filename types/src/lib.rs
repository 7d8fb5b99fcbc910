// Data model shared by the pipeline stages and the studio UI.
//
// Every struct in this crate is persisted as JSON in the workspace directory,
// so field names are part of the on-disk format.

pub mod artifact;

pub use artifact::{Artifact, RunStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speaking rate used to turn a target duration into a word budget.
pub const WORDS_PER_MINUTE: f32 = 150.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaList {
    pub niche: String,

    pub ideas: Vec<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptBrief {
    pub topic: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,

    pub minutes: f32,
}

impl ScriptBrief {
    /// Approximate number of words that fit the requested duration.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn target_words(&self) -> u32 {
        (self.minutes.max(0.0) * WORDS_PER_MINUTE).round() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub run_id: Uuid,

    pub brief: ScriptBrief,

    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SpeechVoice {
    #[default]
    Alloy,

    Ash,

    Coral,

    Echo,

    Fable,

    Onyx,

    Nova,

    Sage,

    Shimmer,
}

impl SpeechVoice {
    pub const ALL: [Self; 9] = [
        Self::Alloy,
        Self::Ash,
        Self::Coral,
        Self::Echo,
        Self::Fable,
        Self::Onyx,
        Self::Nova,
        Self::Sage,
        Self::Shimmer,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
        }
    }
}

impl std::fmt::Display for SpeechVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SpeechVoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|voice| voice.as_str() == s)
            .ok_or_else(|| format!("unknown voice: {s}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// End of the spoken timeline in seconds.
    ///
    /// The reported audio duration wins over the last segment end because
    /// trailing silence still belongs in the video.
    #[must_use]
    pub fn end_time(&self) -> f64 {
        let last_segment_end = self
            .segments
            .iter()
            .map(|segment| segment.end)
            .fold(0.0_f64, f64::max);

        self.duration.map_or(last_segment_end, |duration| {
            duration.max(last_segment_end)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,

    pub end: f64,

    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Storyboard {
    pub scenes: Vec<Scene>,
}

impl Storyboard {
    #[must_use]
    pub fn total_duration(&self) -> f64 {
        self.scenes.iter().map(Scene::duration).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub index: u32,

    pub start: f64,

    pub end: f64,

    pub narration: String,

    pub image_prompt: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_file: Option<String>,
}

impl Scene {
    #[must_use]
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,

    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    pub thumbnail_prompt: String,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_target_words() {
        let brief = ScriptBrief {
            topic: "black holes".to_string(),
            audience: None,
            tone: None,
            minutes: 2.5,
        };
        assert_eq!(brief.target_words(), 375);

        let negative = ScriptBrief {
            minutes: -1.0,
            ..brief
        };
        assert_eq!(negative.target_words(), 0);
    }

    #[test]
    fn test_voice_from_str() {
        assert_eq!("Nova".parse::<SpeechVoice>(), Ok(SpeechVoice::Nova));
        assert_eq!(" alloy ".parse::<SpeechVoice>(), Ok(SpeechVoice::Alloy));
        assert!("robot".parse::<SpeechVoice>().is_err());
    }

    #[test]
    fn test_voice_serializes_lowercase() {
        let json = serde_json::to_string(&SpeechVoice::Shimmer).unwrap();
        assert_eq!(json, "\"shimmer\"");
    }

    #[test]
    fn test_transcript_end_time() {
        let mut transcript = Transcript {
            text: "hello world".to_string(),
            language: Some("english".to_string()),
            duration: None,
            segments: vec![
                TranscriptSegment {
                    start: 0.0,
                    end: 1.5,
                    text: "hello".to_string(),
                },
                TranscriptSegment {
                    start: 1.5,
                    end: 3.25,
                    text: "world".to_string(),
                },
            ],
        };
        assert!((transcript.end_time() - 3.25).abs() < f64::EPSILON);

        transcript.duration = Some(4.0);
        assert!((transcript.end_time() - 4.0).abs() < f64::EPSILON);

        assert!(Transcript::default().end_time().abs() < f64::EPSILON);
    }

    #[test]
    fn test_metadata_tags_default() {
        let metadata: VideoMetadata = serde_json::from_str(
            r#"{"title":"t","description":"d","thumbnail_prompt":"p"}"#,
        )
        .unwrap();
        assert!(metadata.tags.is_empty());
    }
}
