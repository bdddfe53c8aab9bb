use dialoguer::{theme::ColorfulTheme, Select};

use crate::{
    cli::cli::MenuAction,
    models::{CliApp, Result},
};
use tracing::error;

impl CliApp {
    pub async fn run(&self) -> Result<()> {
        println!("\n🚀 Welcome to Lead Outreach!");
        println!("═══════════════════════════════════════");

        // Show initial stats
        self.show_database_stats().await?;

        loop {
            let actions = vec![
                MenuAction::IngestCsv,
                MenuAction::SendCampaign,
                MenuAction::RunFollowUps,
                MenuAction::CheckReplies,
                MenuAction::ShowFollowupCandidates,
                MenuAction::ShowStats,
                MenuAction::ExportLeads,
                MenuAction::PurgeClosed,
                MenuAction::DebugEnvironmentCheck,
                MenuAction::Exit,
            ];

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("\nSelect an action")
                .default(0)
                .items(&actions)
                .interact()?;

            match &actions[selection] {
                MenuAction::IngestCsv => {
                    if let Err(e) = self.run_ingest().await {
                        error!("Ingest failed: {}", e);
                    }
                }
                MenuAction::SendCampaign => {
                    if let Err(e) = self.run_campaign().await {
                        error!("Campaign failed: {}", e);
                    }
                }
                MenuAction::RunFollowUps => {
                    if let Err(e) = self.run_followups().await {
                        error!("Follow-up run failed: {}", e);
                    }
                }
                MenuAction::CheckReplies => {
                    if let Err(e) = self.run_reply_check().await {
                        error!("Reply check failed: {}", e);
                    }
                }
                MenuAction::ShowFollowupCandidates => {
                    if let Err(e) = self.show_followup_candidates().await {
                        error!("Failed to list follow-up candidates: {}", e);
                    }
                }
                MenuAction::ShowStats => {
                    if let Err(e) = self.show_database_stats().await {
                        error!("Failed to show stats: {}", e);
                    }
                }
                MenuAction::ExportLeads => {
                    if let Err(e) = self.run_export_leads().await {
                        error!("Lead export failed: {}", e);
                    }
                }
                MenuAction::PurgeClosed => {
                    if let Err(e) = self.run_purge().await {
                        error!("Purge failed: {}", e);
                    }
                }
                MenuAction::DebugEnvironmentCheck => {
                    if let Err(e) = self.debug_environment_check().await {
                        error!("Debug environment check failed: {}", e);
                    }
                }
                MenuAction::Exit => {
                    println!("\n👋 Thanks for using Lead Outreach!");
                    break;
                }
            }
        }

        Ok(())
    }
}
