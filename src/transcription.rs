//! Voice message transcription using the Groq Whisper API
//!
//! Groq exposes an OpenAI-compatible surface, so this is a plain multipart
//! upload to `audio/transcriptions`. Without a `GROQ_API_KEY` the feature
//! is disabled rather than an error.

use reqwest::multipart::{Form, Part};
use tracing::{info, warn};

use crate::config::env_key;
use crate::error::{ArgusError, Result};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const WHISPER_MODEL: &str = "whisper-large-v3-turbo";

/// Speech-to-text client.
pub struct Transcriber {
    client: reqwest::Client,
    api_key: String,
}

impl Transcriber {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Build from `GROQ_API_KEY`, or report the feature disabled.
    pub fn from_env() -> Option<Self> {
        match env_key("GROQ_API_KEY") {
            Some(key) => Some(Self::new(key)),
            None => {
                warn!("GROQ_API_KEY not configured, voice transcription disabled");
                None
            }
        }
    }

    /// Transcribe an OGG/Opus voice message to text.
    pub async fn transcribe(&self, audio: Vec<u8>) -> Result<String> {
        if audio.is_empty() {
            return Err(ArgusError::Audio("empty audio buffer".to_string()));
        }
        info!(bytes = audio.len(), "transcribing voice message");

        let part = Part::bytes(audio)
            .file_name("voice.ogg")
            .mime_str("audio/ogg")?;
        let form = Form::new()
            .part("file", part)
            .text("model", WHISPER_MODEL)
            .text("response_format", "text");

        let response = self
            .client
            .post(format!("{GROQ_BASE_URL}/audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ArgusError::Audio(format!(
                "transcription request failed ({status}): {text}"
            )));
        }

        let transcript = text.trim().to_string();
        info!(length = transcript.len(), "voice message transcribed");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_disabled_without_api_key() {
        std::env::remove_var("GROQ_API_KEY");
        assert!(Transcriber::from_env().is_none());
    }

    #[test]
    #[serial]
    fn test_enabled_with_api_key() {
        std::env::set_var("GROQ_API_KEY", "gsk_test");
        assert!(Transcriber::from_env().is_some());
        std::env::remove_var("GROQ_API_KEY");
    }

    #[tokio::test]
    async fn test_empty_audio_is_rejected() {
        let transcriber = Transcriber::new("gsk_test");
        let err = transcriber.transcribe(Vec::new()).await.unwrap_err();
        assert!(matches!(err, ArgusError::Audio(_)));
    }
}
