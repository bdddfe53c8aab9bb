// src/ingest/mod.rs
pub mod dedupe;
pub mod normalizer;
pub mod reader;

use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::models::{IngestReport, Lead};
use dedupe::Deduplicator;
use normalizer::{Normalizer, RowRejection};
use reader::CsvReader;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Straight-line ingest: parse -> sanitize -> validate -> dedupe -> sort.
pub struct IngestPipeline {
    normalizer: Normalizer,
}

impl IngestPipeline {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            normalizer: Normalizer::new(config),
        }
    }

    pub fn run(&self, csv_text: &str) -> Result<(Vec<Lead>, IngestReport)> {
        let mut report = IngestReport::default();
        let mut dedupe = Deduplicator::new();
        let mut leads = Vec::new();

        let rows = CsvReader::parse(csv_text)?;
        report.rows_seen = rows.len();

        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    // Malformed rows are skipped, never raised
                    warn!("skipping malformed CSV row: {}", e);
                    report.invalid += 1;
                    report.errors.push(e);
                    continue;
                }
            };

            match self.normalizer.normalize_row(&row) {
                Ok(lead) => {
                    if dedupe.admit(&lead) {
                        leads.push(lead);
                    }
                }
                Err(RowRejection::EmptyBusinessName) => {
                    debug!("skipping row without a business name");
                    report.skipped += 1;
                }
                Err(RowRejection::SummaryRow) => {
                    debug!("skipping trailing summary row");
                    report.skipped += 1;
                }
            }
        }

        report.duplicates = dedupe.dropped;

        leads.sort_by(|a, b| {
            a.lead_quality
                .rank()
                .cmp(&b.lead_quality.rank())
                .then_with(|| a.business_name.cmp(&b.business_name))
        });
        report.imported = leads.len();

        info!(
            "Ingest complete: {} rows -> {} leads ({} duplicates, {} invalid, {} skipped)",
            report.rows_seen, report.imported, report.duplicates, report.invalid, report.skipped
        );

        Ok((leads, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn pipeline() -> IngestPipeline {
        IngestPipeline::new(Config::default().ingest)
    }

    #[test]
    fn full_pass_dedupes_and_sorts() {
        let csv = "\
business_name,phone,email,lead_quality
Zippy Spares,09876543210,sales@zippy.in,WARM
Acme Motors,09876500000,hello@acme.in,HOT
zippy spares,+91 98765 43210,SALES@zippy.in,WARM
,1234,orphan@x.com,COLD
Summary,,,
";
        let (leads, report) = pipeline().run(csv).unwrap();
        assert_eq!(report.rows_seen, 5);
        assert_eq!(report.imported, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.skipped, 2);
        // HOT before WARM
        assert_eq!(leads[0].business_name, "Acme Motors");
        assert_eq!(leads[1].phone_e164.as_deref(), Some("+919876543210"));
    }

    #[test]
    fn malformed_rows_are_counted_not_fatal() {
        let csv = "business_name,phone\nAcme,123,too,many,cells\nBolt,09876543210\n";
        let (leads, report) = pipeline().run(csv).unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(pipeline().run("").is_err());
    }
}
