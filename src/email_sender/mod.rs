// src/email_sender/mod.rs
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, info};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub struct MailgunConfig {
    pub api_key: String,
    pub domain: String,
    pub from_email: String,
    pub from_name: String,
    pub base_url: String,
    /// Public base URL for the open/click tracking endpoints, if exposed.
    pub tracking_base_url: Option<String>,
}

impl MailgunConfig {
    pub fn from_env() -> Result<Self> {
        Ok(MailgunConfig {
            api_key: std::env::var("MAILGUN_API_KEY")
                .map_err(|_| "MAILGUN_API_KEY environment variable required")?,
            domain: std::env::var("MAILGUN_DOMAIN")
                .map_err(|_| "MAILGUN_DOMAIN environment variable required")?,
            from_email: std::env::var("FROM_EMAIL")
                .map_err(|_| "FROM_EMAIL environment variable required")?,
            from_name: std::env::var("FROM_NAME").unwrap_or_else(|_| "Outreach".to_string()),
            base_url: "https://api.mailgun.net/v3".to_string(),
            tracking_base_url: std::env::var("TRACKING_BASE_URL").ok(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MailgunResponse {
    pub id: String,
    pub message: String,
}

/// A stored inbound message matched against one of our outbound threads.
#[derive(Debug, Clone)]
pub struct InboundReply {
    pub thread_id: String,
    pub from: String,
    pub received_at: DateTime<Utc>,
}

pub struct MailgunSender {
    pub config: MailgunConfig,
    client: Client,
}

impl MailgunSender {
    pub fn new(config: MailgunConfig) -> Self {
        let client = Client::new();
        debug!("Created MailgunSender for domain: {}", config.domain);
        Self { config, client }
    }

    /// Send one fully-rendered email. The returned message id doubles as
    /// the thread id replies are matched against.
    pub async fn send_email(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        body: &str,
        record_id: &str,
    ) -> Result<MailgunResponse> {
        let url = format!("{}/{}/messages", self.config.base_url, self.config.domain);

        debug!("Preparing email for {}: {}", to_email, subject);

        let mut form_data = HashMap::new();
        form_data.insert(
            "from",
            format!("{} <{}>", self.config.from_name, self.config.from_email),
        );
        form_data.insert("to", format!("{} <{}>", to_name, to_email));
        form_data.insert("subject", subject.to_string());
        form_data.insert("text", body.to_string());

        if let Some(tracking_base) = &self.config.tracking_base_url {
            let html = format!(
                "<html><body><pre>{}</pre><img src=\"{}/api/track/open/{}\" width=\"1\" height=\"1\" alt=\"\"/></body></html>",
                body, tracking_base, record_id
            );
            form_data.insert("html", html);
        }

        form_data.insert("o:tracking", "yes".to_string());

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.config.api_key))
            .form(&form_data)
            .send()
            .await?;

        debug!("Mailgun response status: {}", response.status());

        if response.status().is_success() {
            let mailgun_response: MailgunResponse = response.json().await?;
            Ok(mailgun_response)
        } else {
            let error_text = response.text().await?;
            error!("Mailgun API error: {}", error_text);
            Err(format!("Mailgun error: {}", error_text).into())
        }
    }

    /// Poll the provider's stored-message events and match them to our
    /// outbound threads. A match counts as a reply only when the sender's
    /// domain differs from our sending domain.
    pub async fn fetch_replies(&self, thread_ids: &[String]) -> Result<Vec<InboundReply>> {
        let url = format!("{}/{}/events", self.config.base_url, self.config.domain);

        let response = self
            .client
            .get(&url)
            .basic_auth("api", Some(&self.config.api_key))
            .query(&[("event", "stored"), ("limit", "300")])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            error!("Mailgun events API error: {}", error_text);
            return Err(format!("Mailgun events error: {}", error_text).into());
        }

        let payload: serde_json::Value = response.json().await?;
        let items = payload["items"].as_array().cloned().unwrap_or_default();
        debug!("Fetched {} stored events", items.len());

        let mut replies = Vec::new();
        for item in &items {
            let headers = &item["message"]["headers"];
            let in_reply_to = headers["in-reply-to"].as_str().unwrap_or("");
            let from = headers["from"].as_str().unwrap_or("");

            let matched = thread_ids
                .iter()
                .find(|tid| !tid.is_empty() && in_reply_to.contains(tid.as_str()));
            let thread_id = match matched {
                Some(tid) => tid.clone(),
                None => continue,
            };

            if !is_external_sender(from, &self.config.domain) {
                debug!("Ignoring same-domain message on thread {}", thread_id);
                continue;
            }

            let received_at = item["timestamp"]
                .as_f64()
                .and_then(|ts| Utc.timestamp_opt(ts as i64, 0).single())
                .unwrap_or_else(Utc::now);

            replies.push(InboundReply {
                thread_id,
                from: from.to_string(),
                received_at,
            });
        }

        info!("Reply poll matched {} of {} threads", replies.len(), thread_ids.len());
        Ok(replies)
    }

    pub async fn test_connection(&self) -> Result<()> {
        let url = format!(
            "{}/{}/stats/total?event=delivered",
            self.config.base_url, self.config.domain
        );

        let response = self
            .client
            .get(&url)
            .basic_auth("api", Some(&self.config.api_key))
            .send()
            .await?;

        if response.status().is_success() {
            info!("✅ Mailgun connection test successful");
            Ok(())
        } else {
            let error_text = response.text().await?;
            error!("❌ Mailgun connection test failed: {}", error_text);
            Err(format!("Mailgun connection failed: {}", error_text).into())
        }
    }
}

/// True when the address' domain is not ours (i.e. a real inbound reply,
/// not our own copy landing back in the store).
pub fn is_external_sender(from: &str, sending_domain: &str) -> bool {
    let address = from
        .rsplit('<')
        .next()
        .unwrap_or(from)
        .trim_end_matches('>')
        .trim();
    match address.split('@').nth(1) {
        Some(domain) => !domain.eq_ignore_ascii_case(sending_domain),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_sender_detection() {
        assert!(is_external_sender("Jo <jo@customer.com>", "mg.acme.in"));
        assert!(!is_external_sender("Us <bot@mg.acme.in>", "mg.acme.in"));
        assert!(!is_external_sender("Us <bot@MG.ACME.IN>", "mg.acme.in"));
        assert!(!is_external_sender("not-an-address", "mg.acme.in"));
        assert!(is_external_sender("plain@other.org", "mg.acme.in"));
    }
}
