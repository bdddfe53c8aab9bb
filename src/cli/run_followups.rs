// src/cli/run_followups.rs
use dialoguer::{theme::ColorfulTheme, Confirm, Input};

use crate::email_sender::{MailgunConfig, MailgunSender};
use crate::models::{CliApp, Result};
use crate::outreach::{FollowUpRequest, OutreachScheduler};

impl CliApp {
    pub async fn run_followups(&self) -> Result<()> {
        println!("\n📬 Follow-up Run");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let mailgun_config = MailgunConfig::from_env().map_err(|e| {
            println!("❌ Mailgun configuration error: {}", e);
            e
        })?;
        let sender = MailgunSender::new(mailgun_config);

        let user_id: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("User id (quota scope)")
            .default("default".to_string())
            .interact_text()?;

        let sender_name: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Sender name")
            .interact_text()?;

        let body_template: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Follow-up body template")
            .default(
                "Hi {{name}},\n\nJust floating this back to the top of your inbox.\n\nBest,\n{{sender_name}}"
                    .to_string(),
            )
            .interact_text()?;

        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Send all due follow-ups now?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }

        let request = FollowUpRequest {
            user_id,
            sender_name,
            body_template,
            field_mapping: [("name".to_string(), "contact_name".to_string())]
                .into_iter()
                .collect(),
        };

        let scheduler = OutreachScheduler::new(self.db_pool.clone(), self.config.outreach.clone());
        let report = scheduler.run_follow_ups(&sender, &request).await?;

        println!("\n✅ Follow-up run finished");
        println!("   Sent:    {}", report.sent);
        println!("   Failed:  {}", report.failed);
        println!("   Skipped: {}", report.skipped);
        for error in report.errors.iter().take(10) {
            println!("   ⚠️  {}", error);
        }

        Ok(())
    }
}
