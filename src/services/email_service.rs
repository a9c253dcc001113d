//! Email dispatch for sign-in codes.
//!
//! Sign-in codes go out through the SendGrid v3 HTTP API. The sign-in flow only
//! depends on the [`CodeMailer`] trait, so tests substitute a recording mailer.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const SUBJECT: &str = "Your Sign-In Code";
pub const FALLBACK_FROM_ADDRESS: &str = "no-reply@example.com";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SENDGRID_API_KEY not set, cannot send email")]
    NotConfigured,

    #[error("failed to reach sendgrid: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sendgrid returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Capability to deliver a one-time sign-in code to an address.
#[async_trait]
pub trait CodeMailer: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

#[derive(Debug, Serialize)]
struct SendMailBody<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content>,
}

/// SendGrid-backed mailer.
///
/// A missing API key is not a startup error: the mailer is still built and
/// every send fails with [`MailError::NotConfigured`].
#[derive(Debug, Clone)]
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    from_address: String,
    from_name: String,
}

impl SendGridMailer {
    pub fn new(
        api_key: Option<String>,
        from_address: Option<String>,
        from_name: String,
    ) -> Result<Self, MailError> {
        let from_address = match from_address.filter(|a| !a.trim().is_empty()) {
            Some(address) => address,
            None => {
                tracing::warn!(
                    "SENDGRID_FROM_ADDRESS not set, using fallback '{}'",
                    FALLBACK_FROM_ADDRESS
                );
                FALLBACK_FROM_ADDRESS.to_string()
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            from_address,
            from_name,
        })
    }

    fn body<'a>(&'a self, to: &'a str, code: &str) -> SendMailBody<'a> {
        SendMailBody {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: to,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.from_address,
                name: Some(&self.from_name),
            },
            subject: SUBJECT,
            content: vec![
                Content {
                    kind: "text/plain",
                    value: format!(
                        "Your sign-in code is: {}\n\nUse this code to finish signing in.",
                        code
                    ),
                },
                Content {
                    kind: "text/html",
                    value: format!(
                        "<strong>Your sign-in code is: {}</strong><br>Use this code to finish signing in.",
                        code
                    ),
                },
            ],
        }
    }
}

#[async_trait]
impl CodeMailer for SendGridMailer {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), MailError> {
        let api_key = self.api_key.as_deref().ok_or(MailError::NotConfigured)?;

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(api_key)
            .json(&self.body(email, code))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("SendGrid rejected message: status {}", status);
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Sign-in code email sent to {}", email);
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every code instead of sending it.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn last_code_for(&self, email: &str) -> Option<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(to, _)| to == email)
                .map(|(_, code)| code.clone())
        }
    }

    #[async_trait]
    impl CodeMailer for RecordingMailer {
        async fn send_code(&self, email: &str, code: &str) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::NotConfigured);
            }
            self.sent
                .lock()
                .unwrap()
                .push((email.to_string(), code.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_without_api_key_fails() {
        let mailer = SendGridMailer::new(None, None, "MyApp".to_string()).unwrap();
        let err = mailer.send_code("a@b.com", "123456").await.unwrap_err();
        assert!(matches!(err, MailError::NotConfigured));
    }

    #[test]
    fn body_carries_code_and_sender() {
        let mailer = SendGridMailer::new(
            Some("key".to_string()),
            Some("hello@mylocal.ing".to_string()),
            "myLocal".to_string(),
        )
        .unwrap();

        let body = serde_json::to_value(mailer.body("a@b.com", "042042")).unwrap();
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "a@b.com");
        assert_eq!(body["from"]["email"], "hello@mylocal.ing");
        assert_eq!(body["from"]["name"], "myLocal");
        assert_eq!(body["subject"], SUBJECT);
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert!(body["content"][0]["value"].as_str().unwrap().contains("042042"));
        assert!(body["content"][1]["value"].as_str().unwrap().contains("042042"));
    }

    #[test]
    fn blank_from_address_uses_fallback() {
        let mailer = SendGridMailer::new(None, Some("  ".to_string()), "MyApp".to_string()).unwrap();
        assert_eq!(mailer.from_address, FALLBACK_FROM_ADDRESS);
    }
}
