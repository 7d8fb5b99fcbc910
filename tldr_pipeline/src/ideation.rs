// Ideas and the script: the text half of a run.

use chrono::Utc;
use serde::Deserialize;
use tldr_openai::CompletionRequest;
use types::{Artifact, IdeaList, ScriptBrief, ScriptRecord};
use uuid::Uuid;

use crate::{
    IDEA_COUNT, MAX_SCRIPT_MINUTES, Pipeline, PipelineError,
    prompts::{self, clean_line, extract_json},
    store::SCRIPT_RECORD_FILE,
};

#[derive(Debug, Deserialize)]
struct IdeasReply {
    #[serde(default)]
    ideas: Vec<String>,
}

impl Pipeline {
    /// Asks the chat model for video topics in `niche`.
    ///
    /// # Errors
    /// `InvalidInput` for a blank niche, `ModelOutput` when the reply holds
    /// no ideas, plus provider and storage failures.
    #[tracing::instrument(skip(self))]
    pub async fn generate_ideas(
        &self,
        niche: &str,
    ) -> Result<IdeaList, PipelineError> {
        let niche = niche.trim();
        if niche.is_empty() {
            return Err(PipelineError::InvalidInput(
                "enter a niche to brainstorm ideas for".to_string(),
            ));
        }

        let request = CompletionRequest::json(
            prompts::JSON_SYSTEM,
            prompts::ideas_prompt(niche, IDEA_COUNT),
        );
        let reply = self.provider.complete(&request).await?;

        let ideas = parse_ideas(&reply)?;
        tracing::info!("generated {} ideas", ideas.len());

        let list = IdeaList {
            niche: niche.to_string(),
            ideas,
            created_at: Utc::now(),
        };
        self.store.write_json(Artifact::Ideas, &list).await?;
        Ok(list)
    }

    /// Writes a narration script for `brief`, replacing the current one.
    ///
    /// # Errors
    /// `InvalidInput` for a blank topic or an out of range duration,
    /// `ModelOutput` for an empty reply.
    #[tracing::instrument(skip(self))]
    pub async fn generate_script(
        &self,
        brief: ScriptBrief,
    ) -> Result<String, PipelineError> {
        let brief = validate_brief(brief)?;

        let request = CompletionRequest {
            system: Some(prompts::SCRIPTWRITER_SYSTEM.to_string()),
            prompt: prompts::script_prompt(&brief),
            json: false,
        };
        let script = self.provider.complete(&request).await?.trim().to_string();
        if script.is_empty() {
            return Err(PipelineError::ModelOutput(
                "the script came back empty".to_string(),
            ));
        }

        let words = script.split_whitespace().count();
        tracing::info!(
            "script has {} words, target was {}",
            words,
            brief.target_words()
        );

        self.store.write_text(Artifact::Script, &script).await?;

        let record = ScriptRecord {
            run_id: Uuid::now_v7(),
            brief,
            created_at: Utc::now(),
        };
        self.store
            .write_bytes(SCRIPT_RECORD_FILE, &serde_json::to_vec_pretty(&record)?)
            .await?;

        Ok(script)
    }

    /// Replaces the script with hand-edited text.
    ///
    /// # Errors
    /// `InvalidInput` if the text is blank.
    #[tracing::instrument(skip_all)]
    pub async fn save_script(&self, text: &str) -> Result<(), PipelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::InvalidInput(
                "the script cannot be empty".to_string(),
            ));
        }

        // browsers submit textarea content with CRLF line endings
        let text = text.replace("\r\n", "\n");
        self.store.write_text(Artifact::Script, &text).await?;
        tracing::info!("saved edited script ({} chars)", text.chars().count());
        Ok(())
    }
}

fn validate_brief(brief: ScriptBrief) -> Result<ScriptBrief, PipelineError> {
    let topic = brief.topic.trim().to_string();
    if topic.is_empty() {
        return Err(PipelineError::InvalidInput(
            "enter a topic for the script".to_string(),
        ));
    }
    if !brief.minutes.is_finite()
        || brief.minutes <= 0.0
        || brief.minutes > MAX_SCRIPT_MINUTES
    {
        return Err(PipelineError::InvalidInput(format!(
            "the duration must be between 0 and {MAX_SCRIPT_MINUTES} minutes"
        )));
    }

    Ok(ScriptBrief { topic, ..brief })
}

fn parse_ideas(reply: &str) -> Result<Vec<String>, PipelineError> {
    let reply: IdeasReply = serde_json::from_str(extract_json(reply))
        .map_err(|e| PipelineError::ModelOutput(format!("ideas are not valid JSON: {e}")))?;

    let mut ideas: Vec<String> = Vec::with_capacity(reply.ideas.len());
    for idea in reply.ideas.iter().map(|idea| clean_line(idea)) {
        if !idea.is_empty() && !ideas.contains(&idea) {
            ideas.push(idea);
        }
    }

    if ideas.is_empty() {
        return Err(PipelineError::ModelOutput(
            "the model suggested no ideas".to_string(),
        ));
    }
    Ok(ideas)
}
