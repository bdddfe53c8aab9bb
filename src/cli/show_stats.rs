// src/cli/show_stats.rs
use crate::database::get_database_stats;
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn show_database_stats(&self) -> Result<()> {
        let stats = get_database_stats(&self.db_pool).await?;

        println!("\n📊 Database Statistics");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("   Leads:          {}", stats.total_leads);
        println!("     🔥 HOT:       {}", stats.hot_leads);
        println!("     🌤️  WARM:      {}", stats.warm_leads);
        println!("     🧊 COLD:      {}", stats.cold_leads);
        println!("     📧 With email: {}", stats.leads_with_email);
        println!("     📱 With phone: {}", stats.leads_with_phone);
        println!("     ✉️  Contacted:  {}", stats.contacted_leads);
        println!("   Outreach records:");
        println!("     Open:         {}", stats.records_open);
        println!("     Replied:      {}", stats.records_replied);
        println!("     Closed:       {}", stats.records_closed);
        println!("     Opens:        {}", stats.total_opens);
        println!("     Clicks:       {}", stats.total_clicks);
        println!("     Avg interest: {:.1}", stats.avg_interest_score);

        Ok(())
    }
}
