// Prompts sent to the chat model and the helpers that read its replies.

use std::fmt::Write;
use types::{ScriptBrief, Transcript};

pub const SCRIPTWRITER_SYSTEM: &str = "You are the head writer of TL;DR Studios, a channel that explains \
     complex topics in short, punchy, factual videos. Write narration only: \
     no stage directions, no scene headings, no speaker labels, no markdown.";

pub const JSON_SYSTEM: &str = "You are a video production assistant. Reply with a single JSON object \
     and nothing else.";

pub fn ideas_prompt(niche: &str, count: usize) -> String {
    format!(
        "Suggest {count} distinct short explainer video ideas for the niche \"{niche}\". \
         Each idea is one line that could serve as the video's topic. \
         Return JSON of the form {{\"ideas\": [\"...\"]}}."
    )
}

pub fn script_prompt(brief: &ScriptBrief) -> String {
    let mut prompt = format!(
        "Write a voice-over script about \"{topic}\". \
         It must take about {minutes} minutes to read aloud, roughly {words} words.",
        topic = brief.topic.trim(),
        minutes = brief.minutes,
        words = brief.target_words(),
    );

    if let Some(audience) = non_blank(brief.audience.as_deref()) {
        let _ = write!(prompt, " The audience is {audience}.");
    }
    if let Some(tone) = non_blank(brief.tone.as_deref()) {
        let _ = write!(prompt, " Use a {tone} tone.");
    }

    prompt.push_str(
        " Open with a hook in the first sentence and end with a one sentence takeaway.",
    );
    prompt
}

pub fn storyboard_prompt(transcript: &Transcript, max_scenes: usize) -> String {
    let mut prompt = format!(
        "Split this narrated video into at most {max_scenes} visual scenes. \
         Each scene covers a continuous time range of the narration and gets one \
         illustration. Scenes must be in order, must not overlap and together must \
         cover 0 to {end:.2} seconds. Write each image_prompt as a concrete visual \
         description for an image generator, without any text or lettering in the image.\n\
         Return JSON of the form {{\"scenes\": [{{\"start\": 0.0, \"end\": 4.5, \
         \"narration\": \"...\", \"image_prompt\": \"...\"}}]}}.\n\nTimed narration:\n",
        end = transcript.end_time(),
    );

    for segment in &transcript.segments {
        let _ = writeln!(
            prompt,
            "[{:.2} - {:.2}] {}",
            segment.start, segment.end, segment.text
        );
    }

    prompt
}

pub fn metadata_prompt(script: &str) -> String {
    format!(
        "Write YouTube SEO metadata for the video narrated by the script below. \
         The title is at most 70 characters, the description two short paragraphs \
         followed by a line of hashtags, 5 to 15 lowercase tags, and a thumbnail_prompt \
         describing a bold, high-contrast thumbnail image without text.\n\
         Return JSON of the form {{\"title\": \"...\", \"description\": \"...\", \
         \"tags\": [\"...\"], \"thumbnail_prompt\": \"...\"}}.\n\nScript:\n{script}"
    )
}

pub fn image_prompt(prompt: &str, style: &str) -> String {
    let prompt = prompt.trim().trim_end_matches('.');
    let style = style.trim();
    if style.is_empty() {
        format!("{prompt}.")
    } else {
        format!("{prompt}. Style: {style}.")
    }
}

/// Strips a markdown code fence the model may wrap its JSON in.
pub fn extract_json(reply: &str) -> &str {
    let reply = reply.trim();
    let Some(inner) = reply.strip_prefix("```") else {
        return reply;
    };

    // drop the info string (```json), which ends at the first newline or
    // runs straight into the JSON on a one-line reply
    let first_line = inner.split('\n').next().unwrap_or_default();
    let inner = match first_line.find(['{', '[']) {
        Some(start) => &inner[start..],
        None => inner.split_once('\n').map_or("", |(_, rest)| rest),
    };
    inner.trim_end().trim_end_matches("```").trim()
}

/// Removes a leading list marker and surrounding quotes, which models like
/// to add to one-line answers.
pub fn clean_line(line: &str) -> String {
    let line = line.trim();
    let line = line.strip_prefix(['-', '*', '\u{2022}']).unwrap_or_else(|| {
        let digits = line
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(0);
        if digits > 0 && line[digits..].starts_with(['.', ')']) {
            &line[digits + 1..]
        } else {
            line
        }
    });

    line.trim().trim_matches('"').trim().to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
