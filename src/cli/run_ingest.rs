// src/cli/run_ingest.rs
use dialoguer::{theme::ColorfulTheme, Input};
use tracing::info;

use crate::database::upsert_lead;
use crate::ingest::IngestPipeline;
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn run_ingest(&self) -> Result<()> {
        println!("\n📥 CSV Lead Ingest");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let path: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Path to CSV file")
            .default("data/leads.csv".to_string())
            .interact_text()?;

        let csv_text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                println!("❌ File not found: {}", path);
                return Ok(());
            }
            Err(e) => return Err(Box::new(e)),
        };

        let pipeline = IngestPipeline::new(self.config.ingest.clone());
        let (leads, report) = pipeline.run(&csv_text)?;

        for lead in &leads {
            upsert_lead(&self.db_pool, lead).await?;
        }
        info!("Stored {} leads from {}", leads.len(), path);

        println!("\n✅ Ingest complete");
        println!("   Rows seen:   {}", report.rows_seen);
        println!("   Imported:    {}", report.imported);
        println!("   Duplicates:  {}", report.duplicates);
        println!("   Invalid:     {}", report.invalid);
        println!("   Skipped:     {}", report.skipped);
        if !report.errors.is_empty() {
            println!("   ⚠️  Row errors:");
            for error in report.errors.iter().take(10) {
                println!("      - {}", error);
            }
        }

        Ok(())
    }
}
