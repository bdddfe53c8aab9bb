// src/cli/debug_environment_check.rs
use crate::email_sender::{MailgunConfig, MailgunSender};
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn debug_environment_check(&self) -> Result<()> {
        println!("\n🔍 Environment Check");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let vars = [
            ("MAILGUN_API_KEY", true),
            ("MAILGUN_DOMAIN", true),
            ("FROM_EMAIL", true),
            ("FROM_NAME", false),
            ("TRACKING_BASE_URL", false),
        ];
        for (name, required) in vars {
            match std::env::var(name) {
                Ok(value) if !value.is_empty() => {
                    println!("   ✅ {} is set ({} chars)", name, value.len())
                }
                _ if required => println!("   ❌ {} is MISSING (required)", name),
                _ => println!("   ⚪ {} not set (optional)", name),
            }
        }

        println!(
            "\n   Quota: {}/day, follow-up every {}h (max {}), retention {} days",
            self.config.outreach.daily_quota,
            self.config.outreach.follow_up_interval_hours,
            self.config.outreach.max_follow_ups,
            self.config.outreach.retention_days
        );

        match MailgunConfig::from_env() {
            Ok(config) => {
                let sender = MailgunSender::new(config);
                match sender.test_connection().await {
                    Ok(()) => println!("   ✅ Mailgun connection OK"),
                    Err(e) => println!("   ❌ Mailgun connection failed: {}", e),
                }
            }
            Err(e) => println!("   ⚠️  Skipping connection test: {}", e),
        }

        Ok(())
    }
}
