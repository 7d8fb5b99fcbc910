use serde::Deserialize;
use types::{Scene, Storyboard};

use crate::{PipelineError, prompts::extract_json};

/// Starts closer than this are treated as the same instant.
const START_EPSILON: f64 = 1e-3;

#[derive(Debug, Deserialize)]
struct StoryboardReply {
    scenes: Vec<SceneDraft>,
}

#[derive(Debug, Deserialize)]
struct SceneDraft {
    // the end comes from the next scene's start, so a model-given one is
    // ignored
    start: f64,

    #[serde(default)]
    narration: String,

    #[serde(default)]
    image_prompt: String,
}

/// Parses the model's storyboard reply and normalizes it onto the
/// `[0, end_time]` timeline.
///
/// # Errors
/// If the reply is not the expected JSON or contains no usable scene.
pub fn parse_storyboard(
    reply: &str,
    end_time: f64,
    max_scenes: usize,
) -> Result<Storyboard, PipelineError> {
    let reply: StoryboardReply = serde_json::from_str(extract_json(reply))
        .map_err(|e| {
            PipelineError::ModelOutput(format!("storyboard is not valid JSON: {e}"))
        })?;

    let drafts = reply
        .scenes
        .into_iter()
        .take(max_scenes.max(1))
        .map(|draft| Scene {
            index: 0,
            start: draft.start,
            end: draft.start,
            narration: draft.narration,
            image_prompt: draft.image_prompt,
            image_file: None,
        })
        .collect();

    let scenes = normalize_scenes(drafts, end_time);
    if scenes.is_empty() {
        return Err(PipelineError::ModelOutput(
            "storyboard has no scenes with an image prompt".to_string(),
        ));
    }

    Ok(Storyboard { scenes })
}

/// Makes scenes tile `[0, end_time]` without gaps or overlaps.
///
/// Scenes are ordered by start and clamped to the timeline; scenes sharing
/// a start, starting at or past the end, or lacking any prompt text are
/// dropped. Each scene then ends where the next begins, the first starts at
/// zero and the last ends at `end_time`. Indices are renumbered and image
/// files cleared, since the images belong to the previous storyboard.
#[must_use]
pub fn normalize_scenes(scenes: Vec<Scene>, end_time: f64) -> Vec<Scene> {
    if !end_time.is_finite() || end_time <= 0.0 {
        return Vec::new();
    }

    let mut scenes: Vec<Scene> = scenes
        .into_iter()
        .filter(|scene| scene.start.is_finite())
        .filter_map(|mut scene| {
            scene.narration = scene.narration.trim().to_string();
            scene.image_prompt = scene.image_prompt.trim().to_string();
            if scene.image_prompt.is_empty() {
                scene.image_prompt.clone_from(&scene.narration);
            }
            (!scene.image_prompt.is_empty()).then_some(scene)
        })
        .map(|mut scene| {
            scene.start = scene.start.clamp(0.0, end_time);
            scene
        })
        .collect();

    scenes.sort_by(|a, b| a.start.total_cmp(&b.start));
    scenes.dedup_by(|later, earlier| later.start - earlier.start < START_EPSILON);

    // a scene starting at the very end would have no screen time; only
    // keep it if it is all there is
    if scenes.len() > 1 {
        scenes.retain(|scene| end_time - scene.start >= START_EPSILON);
    }

    let starts: Vec<f64> = scenes.iter().map(|scene| scene.start).collect();
    for (i, scene) in scenes.iter_mut().enumerate() {
        scene.index = u32::try_from(i).unwrap_or(u32::MAX);
        scene.start = if i == 0 { 0.0 } else { starts[i] };
        scene.end = starts.get(i + 1).copied().unwrap_or(end_time);
        scene.image_file = None;
    }

    scenes
}
