use crate::error::ChaosError;
use tracing::info;

/// Out-of-band notification channel for run reports.
#[async_trait::async_trait]
pub trait Reporter: Send + Sync {
    async fn send_event(&self, title: &str, message: &str) -> Result<(), ChaosError>;
}

/// Emits reports through the log.
#[derive(Debug, Default)]
pub struct LogReporter;

#[async_trait::async_trait]
impl Reporter for LogReporter {
    async fn send_event(&self, title: &str, message: &str) -> Result<(), ChaosError> {
        info!("{}{}", title, message);
        Ok(())
    }
}

/// POSTs reports as JSON to a webhook URL using curl.
/// The `text` field makes the payload acceptable to Slack-style hooks.
#[derive(Debug, Clone)]
pub struct WebhookReporter {
    url: String,
}

impl WebhookReporter {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn payload(title: &str, message: &str) -> serde_json::Value {
        serde_json::json!({
            "title": title,
            "text": format!("{}{}", title, message),
        })
    }
}

#[async_trait::async_trait]
impl Reporter for WebhookReporter {
    async fn send_event(&self, title: &str, message: &str) -> Result<(), ChaosError> {
        let body = serde_json::to_string(&Self::payload(title, message))?;

        let output = tokio::process::Command::new("curl")
            .args([
                "-s",
                "-f",
                "-X",
                "POST",
                "-H",
                "Content-Type: application/json",
                "-d",
                &body,
                "--max-time",
                "10",
                &self.url,
            ])
            .output()
            .await
            .map_err(|e| ChaosError::Reporter(format!("Failed to run curl: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChaosError::Reporter(format!(
                "Webhook POST failed: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_payload_carries_title_and_text() {
        let payload = WebhookReporter::payload("Chaos Run Destruction (x)", "\n0 VMs destroyed:\n");
        assert_eq!(payload["title"], "Chaos Run Destruction (x)");
        assert_eq!(payload["text"], "Chaos Run Destruction (x)\n0 VMs destroyed:\n");
    }

    #[tokio::test]
    async fn log_reporter_never_fails() {
        assert!(LogReporter.send_event("t", "m").await.is_ok());
    }
}
