//! Text-to-speech synthesis
//!
//! One linear call to an OpenAI-compatible `audio/speech` endpoint, plus an
//! ffmpeg pass to repackage the result as OGG/Opus for voice-note
//! transports that require it.

use std::process::Stdio;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::env_key;
use crate::error::{ArgusError, Result};

const SPEECH_BASE_URL: &str = "https://api.groq.com/openai/v1";
const SPEECH_MODEL: &str = "playai-tts";
const DEFAULT_VOICE: &str = "Arista-PlayAI";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// Speech synthesis client. Voice comes from `TTS_VOICE` when set.
pub struct Synthesizer {
    client: reqwest::Client,
    api_key: String,
    voice: String,
}

impl Synthesizer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            voice: env_key("TTS_VOICE").unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        }
    }

    /// Build from `GROQ_API_KEY`, or report the feature disabled.
    pub fn from_env() -> Option<Self> {
        match env_key("GROQ_API_KEY") {
            Some(key) => Some(Self::new(key)),
            None => {
                warn!("GROQ_API_KEY not configured, speech synthesis disabled");
                None
            }
        }
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Synthesize text to a WAV audio buffer.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(ArgusError::Audio("nothing to synthesize".to_string()));
        }

        let request = SpeechRequest {
            model: SPEECH_MODEL,
            voice: &self.voice,
            input: text,
            response_format: "wav",
        };
        let response = self
            .client
            .post(format!("{SPEECH_BASE_URL}/audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArgusError::Audio(format!(
                "speech request failed ({status}): {body}"
            )));
        }

        let audio = response.bytes().await?.to_vec();
        info!(
            voice = %self.voice,
            text_length = text.len(),
            audio_bytes = audio.len(),
            "speech synthesized"
        );
        Ok(audio)
    }
}

/// Repackage an audio buffer as OGG/Opus via ffmpeg.
pub async fn to_ogg_opus(audio: &[u8]) -> Result<Vec<u8>> {
    let mut child = Command::new("ffmpeg")
        .args(["-i", "pipe:0", "-c:a", "libopus", "-f", "ogg", "pipe:1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ArgusError::Audio(format!("ffmpeg unavailable: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ArgusError::Audio("ffmpeg stdin unavailable".to_string()))?;
    let input = audio.to_vec();
    // feed stdin from a separate task so a full stdout pipe can't deadlock us
    let writer = tokio::spawn(async move {
        let _ = stdin.write_all(&input).await;
    });

    let output = child.wait_with_output().await?;
    let _ = writer.await;

    if !output.status.success() {
        return Err(ArgusError::Audio(format!(
            "ffmpeg exited with {}",
            output.status
        )));
    }
    Ok(output.stdout)
}
