// src/cli/run_campaign.rs
use std::collections::HashMap;

use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use tracing::debug;

use crate::database::get_leads;
use crate::email_sender::{MailgunConfig, MailgunSender};
use crate::models::{CliApp, ContactStatus, Result};
use crate::outreach::{CampaignRequest, OutreachScheduler};

/// CLI campaigns use the standard lead columns; API callers can supply
/// their own mapping.
fn default_field_mapping() -> HashMap<String, String> {
    [
        ("name", "contact_name"),
        ("business", "business_name"),
        ("category", "category"),
        ("city", "address"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl CliApp {
    pub async fn run_campaign(&self) -> Result<()> {
        println!("\n📧 Email Campaign");
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

        let subject_template: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Subject template")
            .default("Quick question about {{business}}".to_string())
            .interact_text()?;

        let body_template: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Body template")
            .default(
                "Hi {{name}},\n\nI came across {{business}} and wanted to reach out.\n\nBest,\n{{sender_name}}"
                    .to_string(),
            )
            .interact_text()?;

        let batch_size: usize = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Max recipients this run")
            .default(25)
            .interact_text()?;

        // Fresh leads only; anyone already contacted has a record and
        // would be skipped by the scheduler anyway.
        let leads = get_leads(
            &self.db_pool,
            None,
            Some(ContactStatus::NeverContacted),
            batch_size,
            0,
        )
        .await?;
        let recipients: Vec<String> = leads.iter().filter_map(|l| l.email.clone()).collect();
        debug!("Campaign candidate pool: {} leads", recipients.len());

        if recipients.is_empty() {
            println!("ℹ️  No uncontacted leads with an email address.");
            return Ok(());
        }

        let scheduler = OutreachScheduler::new(self.db_pool.clone(), self.config.outreach.clone());
        let status = scheduler.quota().status(&user_id, chrono::Utc::now()).await?;
        println!(
            "\n   Recipients: {}   Quota today: {}/{} used",
            recipients.len(),
            status.sent_today,
            status.quota
        );

        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Send to {} recipients?", recipients.len()))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }

        let request = CampaignRequest {
            user_id,
            sender_name,
            subject_template,
            body_template,
            field_mapping: default_field_mapping(),
            recipients,
        };

        let report = scheduler.send_campaign(&sender, &request).await?;

        println!("\n✅ Campaign finished");
        println!("   Sent:    {}", report.sent);
        println!("   Failed:  {}", report.failed);
        println!("   Skipped: {}", report.skipped);
        for error in report.errors.iter().take(10) {
            println!("   ⚠️  {}", error);
        }

        Ok(())
    }
}
