// src/ingest/dedupe.rs
use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::models::Lead;

/// Hex SHA-256 over the lead's identity fields. Doubles as the storage key,
/// so re-ingesting an identical row upserts instead of duplicating.
pub fn content_hash(lead: &Lead) -> String {
    let mut hasher = Sha256::new();
    hasher.update(lead.dedupe_key().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Batch-scoped deduplication: first occurrence wins, later duplicates are
/// dropped. The seen-set lives only for one ingest pass.
pub struct Deduplicator {
    seen: HashSet<String>,
    pub dropped: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            dropped: 0,
        }
    }

    /// Returns true if this lead is the first with its key in the batch.
    pub fn admit(&mut self, lead: &Lead) -> bool {
        let key = lead.dedupe_key();
        if self.seen.insert(key) {
            true
        } else {
            self.dropped += 1;
            debug!("dropping duplicate lead: {}", lead.business_name);
            false
        }
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactStatus, LeadQuality};

    fn lead(name: &str, phone: &str, email: &str) -> Lead {
        Lead {
            business_name: name.to_string(),
            contact_name: None,
            category: None,
            phone_raw: None,
            phone_e164: if phone.is_empty() {
                None
            } else {
                Some(phone.to_string())
            },
            email: if email.is_empty() {
                None
            } else {
                Some(email.to_string())
            },
            website: None,
            address: None,
            rating: None,
            review_count: None,
            lead_quality: LeadQuality::Cold,
            scraped_date: None,
            tags: Vec::new(),
            contact_status: ContactStatus::NeverContacted,
        }
    }

    #[test]
    fn identical_identity_keeps_first_only() {
        let mut dedupe = Deduplicator::new();
        let a = lead("Acme Motors", "+919876543210", "sales@acme.in");
        let b = lead("ACME MOTORS", "+919876543210", "SALES@acme.in");
        assert!(dedupe.admit(&a));
        assert!(!dedupe.admit(&b));
        assert_eq!(dedupe.dropped, 1);
    }

    #[test]
    fn differing_phone_is_a_different_lead() {
        let mut dedupe = Deduplicator::new();
        assert!(dedupe.admit(&lead("Acme", "+911111111111", "a@b.com")));
        assert!(dedupe.admit(&lead("Acme", "+912222222222", "a@b.com")));
        assert_eq!(dedupe.dropped, 0);
    }

    #[test]
    fn content_hash_is_case_insensitive_and_stable() {
        let a = lead("Acme", "+911111111111", "a@b.com");
        let b = lead("ACME", "+911111111111", "A@B.COM");
        assert_eq!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a).len(), 64);
    }
}
