// src/cli/run_reply_check.rs
use dialoguer::{theme::ColorfulTheme, Input};

use crate::email_sender::{MailgunConfig, MailgunSender};
use crate::models::{CliApp, Result};
use crate::outreach::OutreachScheduler;

impl CliApp {
    pub async fn run_reply_check(&self) -> Result<()> {
        println!("\n📨 Reply Check");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let mailgun_config = MailgunConfig::from_env().map_err(|e| {
            println!("❌ Mailgun configuration error: {}", e);
            e
        })?;
        let sender = MailgunSender::new(mailgun_config);

        let user_id: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("User id")
            .default("default".to_string())
            .interact_text()?;

        let scheduler = OutreachScheduler::new(self.db_pool.clone(), self.config.outreach.clone());
        let replies = scheduler.check_replies(&sender, &user_id).await?;

        if replies == 0 {
            println!("ℹ️  No new replies.");
        } else {
            println!("✅ {} record(s) marked as replied.", replies);
        }

        Ok(())
    }
}
