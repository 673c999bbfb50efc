//! Alert email via the Resend API
//!
//! Respects a 30-minute cooldown, persisted to a state file so it survives
//! restart cycles. Sending is total: missing configuration, an active
//! cooldown, and transport failures all log and return — alerting must
//! never take the host process down with it.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{env_key, state_dir};

const COOLDOWN: Duration = Duration::from_secs(30 * 60);
const COOLDOWN_FILE: &str = "last-alert.txt";
const RESEND_URL: &str = "https://api.resend.com/emails";
const FROM_ADDRESS: &str = "Argus <onboarding@resend.dev>";

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
}

/// Cooldown-gated email alert sender.
pub struct AlertSender {
    client: reqwest::Client,
    state_dir: PathBuf,
}

impl AlertSender {
    pub fn new() -> Self {
        Self::with_state_dir(state_dir())
    }

    /// Use a specific directory for the cooldown marker.
    pub fn with_state_dir(state_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            state_dir,
        }
    }

    /// Send an alert email, unless one went out within the cooldown window.
    ///
    /// Reads `RESEND_API_KEY` and `ALERT_EMAIL` from the environment; when
    /// either is missing the alert is skipped with a warning.
    pub async fn send(&self, subject: &str, body: &str) {
        if self.cooldown_active() {
            info!("alert skipped, cooldown active");
            return;
        }

        let (Some(api_key), Some(to)) = (env_key("RESEND_API_KEY"), env_key("ALERT_EMAIL"))
        else {
            warn!("RESEND_API_KEY or ALERT_EMAIL not set, skipping alert");
            return;
        };

        let request = ResendRequest {
            from: FROM_ADDRESS,
            to: vec![to.as_str()],
            subject,
            text: body,
        };

        match self
            .client
            .post(RESEND_URL)
            .bearer_auth(&api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                self.record_sent();
                info!(subject, "alert email sent");
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(%status, body, "failed to send alert email");
            }
            Err(e) => error!("alert sending failed: {e}"),
        }
    }

    fn cooldown_active(&self) -> bool {
        let path = self.state_dir.join(COOLDOWN_FILE);
        let Ok(raw) = std::fs::read_to_string(path) else {
            return false;
        };
        let Ok(last_ms) = raw.trim().parse::<i64>() else {
            return false;
        };
        let elapsed = chrono::Utc::now().timestamp_millis().saturating_sub(last_ms);
        elapsed < COOLDOWN.as_millis() as i64
    }

    fn record_sent(&self) {
        let write = std::fs::create_dir_all(&self.state_dir).and_then(|_| {
            std::fs::write(
                self.state_dir.join(COOLDOWN_FILE),
                chrono::Utc::now().timestamp_millis().to_string(),
            )
        });
        if let Err(e) = write {
            warn!("could not record alert cooldown: {e}");
        }
    }
}

impl Default for AlertSender {
    fn default() -> Self {
        Self::new()
    }
}
