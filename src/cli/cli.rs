// src/cli/cli.rs
use tracing::info;

use crate::config::Config;
use crate::database::DbPool;
use crate::models::CliApp;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub enum MenuAction {
    IngestCsv,
    SendCampaign,
    RunFollowUps,
    CheckReplies,
    ShowFollowupCandidates,
    ShowStats,
    ExportLeads,
    PurgeClosed,
    DebugEnvironmentCheck,
    Exit,
}

impl std::fmt::Display for MenuAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MenuAction::IngestCsv => write!(f, "📥 Ingest leads from a CSV file"),
            MenuAction::SendCampaign => write!(f, "📧 Send email campaign"),
            MenuAction::RunFollowUps => write!(f, "📬 Send due follow-ups"),
            MenuAction::CheckReplies => write!(f, "📨 Check inbox for replies"),
            MenuAction::ShowFollowupCandidates => write!(f, "🗓️  Show due follow-up candidates"),
            MenuAction::ShowStats => write!(f, "📊 Show database statistics"),
            MenuAction::ExportLeads => write!(f, "📤 Export leads to CSV"),
            MenuAction::PurgeClosed => write!(f, "🧹 Purge closed outreach records"),
            MenuAction::DebugEnvironmentCheck => write!(f, "🔍 Debug environment check"),
            MenuAction::Exit => write!(f, "🚪 Exit"),
        }
    }
}

impl CliApp {
    pub async fn new(config: Config, db_pool: DbPool) -> Result<Self> {
        info!("CLI initialized (quota {}/day)", config.outreach.daily_quota);
        Ok(Self { config, db_pool })
    }
}
