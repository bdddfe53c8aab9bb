// src/ingest/normalizer.rs
use regex::Regex;
use tracing::debug;

use crate::config::IngestConfig;
use crate::ingest::reader::Row;
use crate::models::{ContactStatus, Lead, LeadQuality};

/// Why a row was rejected rather than normalized.
#[derive(Debug, PartialEq, Eq)]
pub enum RowRejection {
    EmptyBusinessName,
    SummaryRow,
}

pub struct Normalizer {
    config: IngestConfig,
    email_re: Regex,
}

impl Normalizer {
    pub fn new(config: IngestConfig) -> Self {
        // local@domain.tld — deliberately simple, matching what the
        // upstream scrapers emit
        let email_re = Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .expect("email regex is static");
        Self { config, email_re }
    }

    /// Turn one parsed CSV row into a Lead, or explain why it was dropped.
    pub fn normalize_row(&self, row: &Row) -> std::result::Result<Lead, RowRejection> {
        let business_name = sanitize(row.get("business_name").map(String::as_str).unwrap_or(""));
        if business_name.is_empty() {
            return Err(RowRejection::EmptyBusinessName);
        }
        // Scraped exports end with a totals row; drop anything that
        // mentions "summary" in the name or category.
        let category = row.get("category").map(|s| sanitize(s));
        if business_name.to_lowercase().contains("summary")
            || category
                .as_deref()
                .map(|c| c.to_lowercase().contains("summary"))
                .unwrap_or(false)
        {
            return Err(RowRejection::SummaryRow);
        }

        let phone_raw = row.get("phone").map(|s| sanitize(s)).filter(|s| !s.is_empty());
        let phone_e164 = phone_raw
            .as_deref()
            .map(|p| self.normalize_phone(p))
            .filter(|p| !p.is_empty());

        let email = row
            .get("email")
            .map(|s| sanitize(s).to_lowercase())
            .filter(|e| self.is_valid_email(e));

        let website = row
            .get("website")
            .map(|s| sanitize(s))
            .filter(|w| is_plausible_url(w));

        let rating = row.get("rating").and_then(|r| r.trim().parse::<f64>().ok());
        let review_count = row
            .get("review_count")
            .and_then(|r| r.trim().parse::<i64>().ok());

        let tags = row
            .get("tags")
            .map(|t| {
                t.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Lead {
            business_name,
            contact_name: row.get("contact_name").map(|s| sanitize(s)).filter(|s| !s.is_empty()),
            category: category.filter(|s| !s.is_empty()),
            phone_raw,
            phone_e164,
            email,
            website,
            address: row.get("address").map(|s| sanitize(s)).filter(|s| !s.is_empty()),
            rating,
            review_count,
            lead_quality: row
                .get("lead_quality")
                .map(|q| LeadQuality::parse(q))
                .unwrap_or(LeadQuality::Cold),
            scraped_date: row.get("scraped_date").map(|s| sanitize(s)).filter(|s| !s.is_empty()),
            tags,
            contact_status: row
                .get("contact_status")
                .map(|s| ContactStatus::parse(s))
                .unwrap_or(ContactStatus::NeverContacted),
        })
    }

    /// Normalize a raw phone string to E.164 ("+<cc><national>").
    ///
    /// Strip everything but digits; rewrite trunk-prefixed local numbers
    /// with the configured country code; pass through numbers that already
    /// carry it; anything else is invalid and comes back empty.
    pub fn normalize_phone(&self, raw: &str) -> String {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return String::new();
        }

        let cc = &self.config.country_code;
        let trunk = &self.config.trunk_prefix;
        let lengths = &self.config.local_number_lengths;

        if digits.starts_with(trunk.as_str())
            && lengths.contains(&(digits.len() - trunk.len()))
        {
            return format!("+{}{}", cc, &digits[trunk.len()..]);
        }
        if lengths.contains(&digits.len()) {
            return format!("+{}{}", cc, digits);
        }
        if digits.starts_with(cc.as_str()) && lengths.contains(&(digits.len() - cc.len())) {
            return format!("+{}", digits);
        }

        debug!("phone '{}' did not match any accepted shape", raw);
        String::new()
    }

    pub fn is_valid_email(&self, email: &str) -> bool {
        if email.chars().filter(|c| *c == '@').count() != 1 {
            return false;
        }
        let domain = match email.split('@').nth(1) {
            Some(d) => d,
            None => return false,
        };
        if !domain.contains('.') {
            return false;
        }
        self.email_re.is_match(email)
    }
}

/// Collapse interior whitespace, strip control characters and surrounding
/// quotes left over from sloppy exports.
pub fn sanitize(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    cleaned.trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}

fn is_plausible_url(s: &str) -> bool {
    if s.contains('.') && !s.contains(' ') {
        let candidate = if s.contains("://") {
            s.to_string()
        } else {
            format!("https://{}", s)
        };
        return url::Url::parse(&candidate).is_ok();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn normalizer() -> Normalizer {
        Normalizer::new(Config::default().ingest)
    }

    #[test]
    fn trunk_prefixed_local_number_gets_country_code() {
        let n = normalizer();
        assert_eq!(n.normalize_phone("09876543210"), "+919876543210");
        assert_eq!(n.normalize_phone("0 98765-43210"), "+919876543210");
    }

    #[test]
    fn bare_local_number_gets_country_code() {
        let n = normalizer();
        assert_eq!(n.normalize_phone("9876543210"), "+919876543210");
        assert_eq!(n.normalize_phone("987654321"), "+91987654321");
    }

    #[test]
    fn already_prefixed_number_passes_through() {
        let n = normalizer();
        assert_eq!(n.normalize_phone("+91 98765 43210"), "+919876543210");
        assert_eq!(n.normalize_phone("919876543210"), "+919876543210");
    }

    #[test]
    fn unrecognized_shapes_are_invalid() {
        let n = normalizer();
        assert_eq!(n.normalize_phone("12345"), "");
        assert_eq!(n.normalize_phone("call me maybe"), "");
        assert_eq!(n.normalize_phone(""), "");
    }

    #[test]
    fn normalized_phones_have_no_stray_characters() {
        let n = normalizer();
        for raw in ["(098) 7654-3210", "098 7654 3210", "+91-98765-43210"] {
            let out = n.normalize_phone(raw);
            assert!(out.starts_with("+91"), "{} -> {}", raw, out);
            assert!(out[1..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn email_validation_rules() {
        let n = normalizer();
        assert!(n.is_valid_email("sales@acme.co.in"));
        assert!(!n.is_valid_email("no-at-sign.com"));
        assert!(!n.is_valid_email("two@@acme.com"));
        assert!(!n.is_valid_email("user@nodot"));
        assert!(!n.is_valid_email("user@"));
    }

    #[test]
    fn summary_rows_are_rejected() {
        let n = normalizer();
        let mut row = Row::new();
        row.insert("business_name".to_string(), "Summary of 120 leads".to_string());
        assert_eq!(n.normalize_row(&row).unwrap_err(), RowRejection::SummaryRow);
    }

    #[test]
    fn empty_business_name_is_rejected() {
        let n = normalizer();
        let mut row = Row::new();
        row.insert("email".to_string(), "x@y.com".to_string());
        assert_eq!(
            n.normalize_row(&row).unwrap_err(),
            RowRejection::EmptyBusinessName
        );
    }

    #[test]
    fn invalid_email_is_dropped_not_fatal() {
        let n = normalizer();
        let mut row = Row::new();
        row.insert("business_name".to_string(), "Acme".to_string());
        row.insert("email".to_string(), "not-an-email".to_string());
        let lead = n.normalize_row(&row).unwrap();
        assert!(lead.email.is_none());
    }

    #[test]
    fn sanitize_collapses_whitespace_and_quotes() {
        assert_eq!(sanitize("  \"Acme   Motors\"  "), "Acme Motors");
        assert_eq!(sanitize("a\tb\nc"), "a b c");
    }
}
