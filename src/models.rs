use serde::{Deserialize, Serialize};

use crate::{config::Config, database::DbPool};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadQuality {
    #[serde(rename = "HOT")]
    Hot,
    #[serde(rename = "WARM")]
    Warm,
    #[serde(rename = "COLD")]
    Cold,
}

impl LeadQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadQuality::Hot => "HOT",
            LeadQuality::Warm => "WARM",
            LeadQuality::Cold => "COLD",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "HOT" => LeadQuality::Hot,
            "WARM" => LeadQuality::Warm,
            _ => LeadQuality::Cold,
        }
    }

    // HOT sorts first in ingest output and exports
    pub fn rank(&self) -> u8 {
        match self {
            LeadQuality::Hot => 0,
            LeadQuality::Warm => 1,
            LeadQuality::Cold => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactStatus {
    #[serde(rename = "never_contacted")]
    NeverContacted,
    #[serde(rename = "contacted")]
    Contacted,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::NeverContacted => "never_contacted",
            ContactStatus::Contacted => "contacted",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "contacted" => ContactStatus::Contacted,
            _ => ContactStatus::NeverContacted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub business_name: String,
    pub contact_name: Option<String>,
    pub category: Option<String>,
    pub phone_raw: Option<String>,
    pub phone_e164: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub lead_quality: LeadQuality,
    pub scraped_date: Option<String>,
    pub tags: Vec<String>,
    pub contact_status: ContactStatus,
}

impl Lead {
    /// Lowercased composite key used to drop duplicates within one ingest batch.
    pub fn dedupe_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.business_name,
            self.phone_e164.as_deref().unwrap_or(""),
            self.email.as_deref().unwrap_or("")
        )
        .to_lowercase()
    }

    /// The row's field map as seen by the template renderer.
    pub fn field_map(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();
        map.insert("business_name".to_string(), self.business_name.clone());
        let mut put = |key: &str, value: &Option<String>| {
            if let Some(v) = value {
                map.insert(key.to_string(), v.clone());
            }
        };
        put("contact_name", &self.contact_name);
        put("category", &self.category);
        put("phone_raw", &self.phone_raw);
        put("phone_e164", &self.phone_e164);
        put("email", &self.email);
        put("website", &self.website);
        put("address", &self.address);
        put("scraped_date", &self.scraped_date);
        if let Some(r) = self.rating {
            map.insert("rating".to_string(), r.to_string());
        }
        if let Some(c) = self.review_count {
            map.insert("review_count".to_string(), c.to_string());
        }
        if !self.tags.is_empty() {
            map.insert("tags".to_string(), self.tags.join(","));
        }
        map.insert(
            "lead_quality".to_string(),
            self.lead_quality.as_str().to_string(),
        );
        map
    }
}

#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub rows_seen: usize,
    pub imported: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct CampaignReport {
    pub campaign_id: String,
    pub requested: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

pub struct CliApp {
    pub config: Config,
    pub db_pool: DbPool,
}
