use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use types::Transcript;

use crate::{
    AiError, AiProvider, AudioInput, CompletionRequest, ImageRequest,
    SpeechRequest,
};

/// Smallest valid PNG header; enough for anything that only stores bytes.
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";

/// What the fake was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Complete(CompletionRequest),
    Speech(SpeechRequest),
    Transcribe { file_name: String, size: usize },
    Image(ImageRequest),
}

/// Provider answering from canned data.
///
/// Completions are consumed front to back; running out is an error so a
/// test notices an unexpected extra call.
#[derive(Debug, Default)]
pub struct FakeProvider {
    completions: Mutex<VecDeque<String>>,
    transcript: Mutex<Transcript>,
    image_limit: Mutex<Option<usize>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_completions<I, S>(self, completions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut queue) = self.completions.lock() {
            queue.extend(completions.into_iter().map(Into::into));
        }
        self
    }

    #[must_use]
    pub fn with_transcript(self, transcript: Transcript) -> Self {
        if let Ok(mut current) = self.transcript.lock() {
            *current = transcript;
        }
        self
    }

    /// Makes every image request after the first `count` fail.
    #[must_use]
    pub fn with_image_failure_after(self, count: usize) -> Self {
        if let Ok(mut limit) = self.image_limit.lock() {
            *limit = Some(count);
        }
        self
    }

    /// Snapshot of every call so far.
    ///
    /// # Panics
    /// If a previous holder of the lock panicked.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

/// A canonical 16 kHz mono PCM WAV with `samples` silent samples.
#[must_use]
pub fn silent_wav(samples: u32) -> Vec<u8> {
    let data_len = samples * 2;
    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16_u32.to_le_bytes());
    wav.extend_from_slice(&1_u16.to_le_bytes());
    wav.extend_from_slice(&1_u16.to_le_bytes());
    wav.extend_from_slice(&16_000_u32.to_le_bytes());
    wav.extend_from_slice(&32_000_u32.to_le_bytes());
    wav.extend_from_slice(&2_u16.to_le_bytes());
    wav.extend_from_slice(&16_u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}

#[async_trait]
impl AiProvider for FakeProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<String, AiError> {
        self.record(Call::Complete(request.clone()));
        self.completions
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .ok_or(AiError::EmptyResponse("fake has no completion queued"))
    }

    async fn synthesize_speech(
        &self,
        request: &SpeechRequest,
    ) -> Result<Vec<u8>, AiError> {
        self.record(Call::Speech(request.clone()));
        Ok(silent_wav(16_000))
    }

    async fn transcribe(&self, audio: &AudioInput) -> Result<Transcript, AiError> {
        self.record(Call::Transcribe {
            file_name: audio.file_name.clone(),
            size: audio.bytes.len(),
        });
        Ok(self
            .transcript
            .lock()
            .map(|transcript| transcript.clone())
            .unwrap_or_default())
    }

    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<u8>, AiError> {
        self.record(Call::Image(request.clone()));

        let limit = self.image_limit.lock().ok().and_then(|limit| *limit);
        if let Some(limit) = limit {
            let images = self
                .calls()
                .iter()
                .filter(|call| matches!(call, Call::Image(_)))
                .count();
            if images > limit {
                return Err(AiError::Api {
                    status: 500,
                    message: "fake image failure".to_string(),
                });
            }
        }

        Ok(FAKE_PNG.to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
