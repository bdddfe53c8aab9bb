// src/export.rs
use std::collections::HashMap;
use std::io::Write;

use chrono::Utc;

use crate::models::Lead;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub struct ExportStats {
    pub total_leads: usize,
    pub by_quality: HashMap<String, usize>,
    pub with_email: usize,
    pub with_phone: usize,
}

pub struct LeadExporter;

impl LeadExporter {
    pub fn new() -> Self {
        Self
    }

    pub async fn export_to_csv(&self, leads: &[Lead], filename: &str) -> Result<()> {
        if let Some(parent) = std::path::Path::new(filename).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::File::create(filename)?;

        writeln!(
            file,
            "business_name,contact_name,category,phone_raw,phone_e164,email,website,address,rating,review_count,lead_quality,scraped_date,tags,contact_status"
        )?;

        for lead in leads {
            let fields = [
                lead.business_name.clone(),
                lead.contact_name.clone().unwrap_or_default(),
                lead.category.clone().unwrap_or_default(),
                lead.phone_raw.clone().unwrap_or_default(),
                lead.phone_e164.clone().unwrap_or_default(),
                lead.email.clone().unwrap_or_default(),
                lead.website.clone().unwrap_or_default(),
                lead.address.clone().unwrap_or_default(),
                lead.rating.map(|r| r.to_string()).unwrap_or_default(),
                lead.review_count.map(|c| c.to_string()).unwrap_or_default(),
                lead.lead_quality.as_str().to_string(),
                lead.scraped_date.clone().unwrap_or_default(),
                lead.tags.join(","),
                lead.contact_status.as_str().to_string(),
            ];
            let line: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
            writeln!(file, "{}", line.join(","))?;
        }

        Ok(())
    }

    pub fn generate_stats(&self, leads: &[Lead]) -> ExportStats {
        let mut by_quality: HashMap<String, usize> = HashMap::new();
        for lead in leads {
            *by_quality
                .entry(lead.lead_quality.as_str().to_string())
                .or_insert(0) += 1;
        }

        ExportStats {
            total_leads: leads.len(),
            by_quality,
            with_email: leads.iter().filter(|l| l.email.is_some()).count(),
            with_phone: leads.iter().filter(|l| l.phone_e164.is_some()).count(),
        }
    }

    pub fn print_stats(&self, stats: &ExportStats) {
        println!("\n📊 Export Statistics:");
        println!("━━━━━━━━━━━━━━━━━━━━━");
        println!("   Total leads: {}", stats.total_leads);
        for (quality, count) in &stats.by_quality {
            let icon = match quality.as_str() {
                "HOT" => "🔥",
                "WARM" => "🌤️",
                _ => "🧊",
            };
            println!("   {} {}: {}", icon, quality, count);
        }
        println!("   📧 With email: {}", stats.with_email);
        println!("   📱 With phone: {}", stats.with_phone);
    }

    pub fn generate_filename(&self, directory: &str) -> String {
        format!(
            "{}/leads_export_{}.csv",
            directory,
            Utc::now().format("%Y%m%d_%H%M%S")
        )
    }
}

impl Default for LeadExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote a field when it contains a comma, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
