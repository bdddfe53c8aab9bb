// src/cli/run_export_leads.rs
use dialoguer::{theme::ColorfulTheme, Select};

use crate::database::get_leads;
use crate::export::LeadExporter;
use crate::models::{CliApp, LeadQuality, Result};

impl CliApp {
    pub async fn run_export_leads(&self) -> Result<()> {
        println!("\n📤 Export Leads to CSV");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let filters = vec!["All leads", "HOT only", "HOT + WARM"];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Which leads?")
            .default(0)
            .items(&filters)
            .interact()?;

        let quality = match selection {
            1 => Some(LeadQuality::Hot),
            _ => None,
        };

        let mut leads = get_leads(&self.db_pool, quality, None, 100_000, 0).await?;
        if selection == 2 {
            leads.retain(|l| l.lead_quality != LeadQuality::Cold);
        }

        if leads.is_empty() {
            println!("ℹ️  Nothing to export.");
            return Ok(());
        }

        let exporter = LeadExporter::new();
        let filename = exporter.generate_filename(&self.config.output.directory);
        exporter.export_to_csv(&leads, &filename).await?;

        let stats = exporter.generate_stats(&leads);
        exporter.print_stats(&stats);
        println!("\n✅ Wrote {} leads to {}", leads.len(), filename);

        Ok(())
    }
}
