use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub ingest: IngestConfig,
    pub outreach: OutreachConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Country calling code prepended during E.164 normalization, without "+".
    pub country_code: String,

    /// National trunk prefix stripped before prepending the country code.
    pub trunk_prefix: String,

    /// Accepted lengths for a bare national mobile number.
    pub local_number_lengths: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutreachConfig {
    /// Per-user daily send ceiling.
    pub daily_quota: i64,

    pub follow_up_interval_hours: i64,
    pub max_follow_ups: u8,

    /// Days a closed record is kept before the purge deletes it.
    pub retention_days: i64,

    pub delay_between_emails_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub progress_interval: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub directory: String,
    pub pretty_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ingest: IngestConfig {
                country_code: "91".to_string(),
                trunk_prefix: "0".to_string(),
                local_number_lengths: vec![9, 10],
            },
            outreach: OutreachConfig {
                daily_quota: 500,
                follow_up_interval_hours: 48,
                max_follow_ups: 3,
                retention_days: 30,
                delay_between_emails_ms: 3000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                progress_interval: 10,
            },
            output: OutputConfig {
                directory: "out".to_string(),
                pretty_json: true,
            },
        }
    }
}

pub async fn load_config(
    path: &str,
) -> std::result::Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&content)?;
    Ok(config)
}
