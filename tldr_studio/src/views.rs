// Server-rendered HTML for the studio page.

use std::fmt::Write;

use tldr_pipeline::{DEFAULT_MAX_SCENES, MAX_SCENES, RunSnapshot};
use types::{Artifact, SpeechVoice};

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem;color:#222}\
section{border:1px solid #ddd;border-radius:6px;padding:1rem;margin:1rem 0}\
h2{margin-top:0}label{display:block;margin:.4rem 0}input,select,textarea{font:inherit}\
textarea{width:100%;min-height:12rem}table{border-collapse:collapse;width:100%}\
td,th{border-bottom:1px solid #eee;padding:.3rem;text-align:left;vertical-align:top}\
.error{background:#fdecea;border:1px solid #f5c2c0;padding:.8rem;border-radius:6px}\
.status span{margin-right:.8rem}.done{color:#1a7f37}.todo{color:#888}\
img.scene{max-width:240px}img.thumb{max-width:480px}";

/// Escapes text for use in HTML content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Renders the whole studio page.
pub fn page(
    snapshot: &RunSnapshot,
    default_voice: SpeechVoice,
    error: Option<&str>,
) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>TL;DR Studios</title>\n");
    let _ = writeln!(html, "<style>{STYLE}</style>\n</head>\n<body>");
    html.push_str("<h1>TL;DR Studios</h1>\n");

    if let Some(error) = error {
        let _ = writeln!(
            html,
            "<p class=\"error\" role=\"alert\">{}</p>",
            escape(error)
        );
    }

    status_bar(&mut html, snapshot);
    ideas_section(&mut html, snapshot);
    script_section(&mut html, snapshot);
    voiceover_section(&mut html, snapshot, default_voice);
    transcript_section(&mut html, snapshot);
    storyboard_section(&mut html, snapshot);
    metadata_section(&mut html, snapshot);
    video_section(&mut html, snapshot);

    html.push_str(
        "<section>\n<h2>Start over</h2>\n<form method=\"post\" action=\"/reset\">\
         <button type=\"submit\">Delete all artifacts</button></form>\n</section>\n",
    );
    html.push_str("</body>\n</html>\n");
    html
}

fn status_bar(html: &mut String, snapshot: &RunSnapshot) {
    html.push_str("<p class=\"status\">");
    for artifact in Artifact::ALL {
        let (class, mark) = if snapshot.status.has(artifact) {
            ("done", "&#10003;")
        } else {
            ("todo", "&#8211;")
        };
        let _ = write!(
            html,
            "<span class=\"{class}\">{mark} {}</span>",
            escape(artifact.label())
        );
    }
    html.push_str("</p>\n");

    match snapshot.status.next_missing() {
        Some(next) => {
            let _ = writeln!(html, "<p>Next step: {}</p>", escape(next.label()));
        }
        None => html.push_str("<p>The video is ready.</p>\n"),
    }
}

// A form with no inputs of its own that triggers one stage.
fn stage_button(html: &mut String, action: &str, label: &str) {
    let _ = writeln!(
        html,
        "<form method=\"post\" action=\"{action}\"><button type=\"submit\">{label}</button></form>"
    );
}

fn ideas_section(html: &mut String, snapshot: &RunSnapshot) {
    html.push_str("<section id=\"ideas\">\n<h2>1. Ideas</h2>\n");
    let niche = snapshot
        .ideas
        .as_ref()
        .map(|ideas| escape(&ideas.niche))
        .unwrap_or_default();
    let _ = writeln!(
        html,
        "<form method=\"post\" action=\"/steps/ideas\">\
         <label>Niche <input name=\"niche\" value=\"{niche}\" required></label>\
         <button type=\"submit\">Brainstorm ideas</button></form>"
    );

    if let Some(ideas) = &snapshot.ideas {
        html.push_str("<ol>");
        for idea in &ideas.ideas {
            let _ = write!(html, "<li>{}</li>", escape(idea));
        }
        html.push_str("</ol>\n");
    }
    html.push_str("</section>\n");
}

fn script_section(html: &mut String, snapshot: &RunSnapshot) {
    html.push_str("<section id=\"script\">\n<h2>2. Script</h2>\n");

    let brief = snapshot.brief.as_ref();
    let topic = brief.map(|b| escape(&b.topic)).unwrap_or_default();
    let audience = brief
        .and_then(|b| b.audience.as_deref())
        .map(escape)
        .unwrap_or_default();
    let tone = brief
        .and_then(|b| b.tone.as_deref())
        .map(escape)
        .unwrap_or_default();
    let minutes = brief.map_or(1.0, |b| b.minutes);

    let _ = writeln!(
        html,
        "<form method=\"post\" action=\"/steps/script\">\
         <label>Topic <input name=\"topic\" value=\"{topic}\" required></label>\
         <label>Audience <input name=\"audience\" value=\"{audience}\"></label>\
         <label>Tone <input name=\"tone\" value=\"{tone}\"></label>\
         <label>Minutes <input name=\"minutes\" type=\"number\" step=\"0.5\" min=\"0.5\" value=\"{minutes}\"></label>\
         <button type=\"submit\">Write script</button></form>"
    );

    if let Some(script) = &snapshot.script {
        let words = script.split_whitespace().count();
        let _ = writeln!(
            html,
            "<form method=\"post\" action=\"/steps/script/edit\">\
             <label>Script ({words} words)<textarea name=\"script\">{}</textarea></label>\
             <button type=\"submit\">Save edits</button></form>",
            escape(script)
        );
    }
    html.push_str("</section>\n");
}

fn voiceover_section(
    html: &mut String,
    snapshot: &RunSnapshot,
    default_voice: SpeechVoice,
) {
    html.push_str("<section id=\"voiceover\">\n<h2>3. Voice-over</h2>\n");

    html.push_str(
        "<form method=\"post\" action=\"/steps/voiceover\"><label>Voice <select name=\"voice\">",
    );
    for voice in SpeechVoice::ALL {
        let selected = if voice == default_voice { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{voice}\"{selected}>{voice}</option>");
    }
    html.push_str("</select></label><button type=\"submit\">Read script aloud</button></form>\n");

    html.push_str(
        "<form method=\"post\" action=\"/steps/voiceover/upload\" enctype=\"multipart/form-data\">\
         <label>Or upload a recording <input type=\"file\" name=\"audio\" accept=\"audio/*\" required></label>\
         <button type=\"submit\">Upload</button></form>\n",
    );

    if let Some(file) = &snapshot.voiceover_file {
        let _ = writeln!(
            html,
            "<audio controls src=\"/artifacts/{}\"></audio>",
            escape(file)
        );
    }
    html.push_str("</section>\n");
}

fn transcript_section(html: &mut String, snapshot: &RunSnapshot) {
    html.push_str("<section id=\"transcript\">\n<h2>4. Timestamps</h2>\n");
    stage_button(html, "/steps/transcript", "Transcribe voice-over");

    if let Some(transcript) = &snapshot.transcript {
        if transcript.segments.is_empty() {
            html.push_str("<p>No speech was found in the voice-over.</p>\n");
        } else {
            html.push_str("<table><tr><th>Start</th><th>End</th><th>Text</th></tr>");
            for segment in &transcript.segments {
                let _ = write!(
                    html,
                    "<tr><td>{:.2}</td><td>{:.2}</td><td>{}</td></tr>",
                    segment.start,
                    segment.end,
                    escape(&segment.text)
                );
            }
            html.push_str("</table>\n");
        }
    }
    html.push_str("</section>\n");
}

fn storyboard_section(html: &mut String, snapshot: &RunSnapshot) {
    html.push_str("<section id=\"storyboard\">\n<h2>5. Storyboard and images</h2>\n");
    let _ = writeln!(
        html,
        "<form method=\"post\" action=\"/steps/storyboard\">\
         <label>Scenes <input name=\"max_scenes\" type=\"number\" min=\"1\" max=\"{MAX_SCENES}\" value=\"{DEFAULT_MAX_SCENES}\"></label>\
         <button type=\"submit\">Plan storyboard</button></form>"
    );
    stage_button(html, "/steps/images", "Generate scene images");

    if let Some(storyboard) = &snapshot.storyboard {
        html.push_str(
            "<table><tr><th>#</th><th>Time</th><th>Narration</th><th>Image</th></tr>",
        );
        for scene in &storyboard.scenes {
            let image = scene.image_file.as_deref().map_or_else(
                || escape(&scene.image_prompt),
                |file| {
                    format!(
                        "<img class=\"scene\" src=\"/artifacts/{}\" alt=\"{}\">",
                        escape(file),
                        escape(&scene.image_prompt)
                    )
                },
            );
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{:.2}&#8211;{:.2}</td><td>{}</td><td>{image}</td></tr>",
                scene.index + 1,
                scene.start,
                scene.end,
                escape(&scene.narration)
            );
        }
        html.push_str("</table>\n");
    }
    html.push_str("</section>\n");
}

fn metadata_section(html: &mut String, snapshot: &RunSnapshot) {
    html.push_str("<section id=\"metadata\">\n<h2>6. Metadata and thumbnail</h2>\n");
    stage_button(html, "/steps/metadata", "Write metadata");
    stage_button(html, "/steps/thumbnail", "Generate thumbnail");

    if let Some(metadata) = &snapshot.metadata {
        let tags = metadata
            .tags
            .iter()
            .map(|tag| escape(tag))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            html,
            "<h3>{}</h3><p style=\"white-space:pre-wrap\">{}</p><p>Tags: {tags}</p>",
            escape(&metadata.title),
            escape(&metadata.description)
        );
    }
    if snapshot.status.has(Artifact::Thumbnail) {
        let _ = writeln!(
            html,
            "<img class=\"thumb\" src=\"/artifacts/{}\" alt=\"thumbnail\">",
            Artifact::Thumbnail.file_name()
        );
    }
    html.push_str("</section>\n");
}

fn video_section(html: &mut String, snapshot: &RunSnapshot) {
    html.push_str("<section id=\"video\">\n<h2>7. Video</h2>\n");
    stage_button(html, "/steps/video", "Assemble video");

    if snapshot.status.has(Artifact::Video) {
        let file = Artifact::Video.file_name();
        let _ = writeln!(
            html,
            "<video controls width=\"640\" src=\"/artifacts/{file}\"></video>\
             <p><a href=\"/artifacts/{file}\" download>Download {file}</a></p>"
        );
    }
    html.push_str("</section>\n");
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use types::{IdeaList, RunStatus};

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_empty_page_points_to_script() {
        let html = page(&RunSnapshot::default(), SpeechVoice::Alloy, None);
        assert!(html.contains("Next step: script"));
        assert!(!html.contains("class=\"error\""));
        assert!(!html.contains("<audio"));
        assert!(html.contains("<option value=\"alloy\" selected>alloy</option>"));
    }

    #[test]
    fn test_page_escapes_model_output() {
        let snapshot = RunSnapshot {
            ideas: Some(IdeaList {
                niche: "space".to_string(),
                ideas: vec!["<script>alert(1)</script>".to_string()],
                created_at: chrono::DateTime::UNIX_EPOCH,
            }),
            script: Some("Tom & Jerry".to_string()),
            ..RunSnapshot::default()
        };

        let html = page(&snapshot, SpeechVoice::Nova, Some("bad <input>"));

        assert!(html.contains("<li>&lt;script&gt;alert(1)&lt;/script&gt;</li>"));
        assert!(html.contains("<textarea name=\"script\">Tom &amp; Jerry</textarea>"));
        assert!(html.contains("<p class=\"error\" role=\"alert\">bad &lt;input&gt;</p>"));
        assert!(html.contains("<option value=\"nova\" selected>nova</option>"));
    }

    #[test]
    fn test_finished_run_shows_video() {
        let snapshot = RunSnapshot {
            status: RunStatus {
                present: Artifact::ALL.into_iter().collect(),
            },
            ..RunSnapshot::default()
        };

        let html = page(&snapshot, SpeechVoice::Alloy, None);
        assert!(html.contains("The video is ready."));
        assert!(html.contains("src=\"/artifacts/video.mp4\""));
        assert!(html.contains("src=\"/artifacts/thumbnail.png\""));
    }
}
