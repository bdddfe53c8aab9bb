// src/cli/run_purge.rs
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::models::{CliApp, Result};
use crate::outreach::OutreachScheduler;

impl CliApp {
    pub async fn run_purge(&self) -> Result<()> {
        println!("\n🧹 Purge Closed Records");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!(
            "Deletes replied/closed records more than {} days past closure.",
            self.config.outreach.retention_days
        );

        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Proceed?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }

        let scheduler = OutreachScheduler::new(self.db_pool.clone(), self.config.outreach.clone());
        let purged = scheduler.purge_closed().await?;
        println!("✅ Purged {} record(s).", purged);

        Ok(())
    }
}
