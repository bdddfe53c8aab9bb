// src/cli/show_followups.rs
use chrono::Utc;
use dialoguer::{theme::ColorfulTheme, Input};

use crate::database::get_followup_candidates;
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn show_followup_candidates(&self) -> Result<()> {
        println!("\n🗓️  Due Follow-ups");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let user_id: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("User id")
            .default("default".to_string())
            .interact_text()?;

        let candidates = get_followup_candidates(&self.db_pool, &user_id, Utc::now()).await?;

        if candidates.is_empty() {
            println!("ℹ️  Nothing is due.");
            return Ok(());
        }

        println!(
            "{:<35} {:>9} {:>8}  {}",
            "Email", "FollowUps", "Interest", "Subject"
        );
        for record in &candidates {
            println!(
                "{:<35} {:>9} {:>8}  {}",
                record.email, record.follow_up_count, record.interest_score, record.subject
            );
        }
        println!("\n{} record(s) due.", candidates.len());

        Ok(())
    }
}
