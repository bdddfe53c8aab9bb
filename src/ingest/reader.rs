// src/ingest/reader.rs
use std::collections::HashMap;

use tracing::debug;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Scraped CSVs arrive with loosely-specified headers. Map the common
/// aliases onto canonical names; unknown headers pass through lowercased.
fn canonical_header(raw: &str) -> String {
    let key = raw.trim().to_lowercase().replace([' ', '-'], "_");
    match key.as_str() {
        "business_name" | "business" | "company" | "company_name" | "name" => {
            "business_name".to_string()
        }
        "contact_name" | "contact" | "owner" | "owner_name" | "person" => {
            "contact_name".to_string()
        }
        "phone" | "phone_raw" | "phone_number" | "whatsapp" | "whatsapp_number"
        | "contact_number" | "mobile" | "mobile_number" => "phone".to_string(),
        "email" | "email_address" | "mail" => "email".to_string(),
        "website" | "url" | "site" | "web" => "website".to_string(),
        "address" | "location" | "full_address" => "address".to_string(),
        "rating" | "stars" | "avg_rating" => "rating".to_string(),
        "review_count" | "reviews" | "total_reviews" | "num_reviews" => {
            "review_count".to_string()
        }
        "lead_quality" | "quality" | "score" => "lead_quality".to_string(),
        "scraped_date" | "scraped_at" | "date" => "scraped_date".to_string(),
        "tags" | "labels" => "tags".to_string(),
        "contact_status" | "status" => "contact_status".to_string(),
        "category" | "business_category" | "type" => "category".to_string(),
        other => other.to_string(),
    }
}

/// A parsed CSV row keyed by canonical column name. Empty cells are omitted.
pub type Row = HashMap<String, String>;

pub struct CsvReader;

impl CsvReader {
    /// Parse quoted-field CSV text (header row required) into rows keyed by
    /// canonical column names. Structural problems on a data row are
    /// reported per-row so callers can skip and keep going.
    pub fn parse(text: &str) -> Result<Vec<std::result::Result<Row, String>>> {
        let mut records = split_records(text);
        if records.is_empty() {
            return Err("CSV input has no header row".into());
        }

        let header_cells = records.remove(0);
        let headers: Vec<String> = header_cells.iter().map(|h| canonical_header(h)).collect();
        debug!("CSV headers resolved: {:?}", headers);

        let mut rows = Vec::with_capacity(records.len());
        for (line_no, cells) in records.into_iter().enumerate() {
            // 1-based, +1 for the header line
            let display_line = line_no + 2;

            if cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            if cells.len() > headers.len() {
                rows.push(Err(format!(
                    "line {}: {} fields but header has {}",
                    display_line,
                    cells.len(),
                    headers.len()
                )));
                continue;
            }

            let mut row = Row::new();
            for (header, cell) in headers.iter().zip(cells.iter()) {
                let value = cell.trim();
                if !value.is_empty() {
                    row.insert(header.clone(), value.to_string());
                }
            }
            rows.push(Ok(row));
        }

        Ok(rows)
    }
}

/// Split CSV text into records of fields, honoring quoted fields with
/// embedded commas, doubled quotes, and CR/LF line endings.
fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => {
                record.push(std::mem::take(&mut field));
            }
            '\r' => {
                // swallow; the LF that follows ends the record
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_aliases() {
        let csv = "Company,WhatsApp Number,Email Address\nAcme Motors,0412345678,a@b.com\n";
        let rows = CsvReader::parse(csv).unwrap();
        assert_eq!(rows.len(), 1);
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("business_name").unwrap(), "Acme Motors");
        assert_eq!(row.get("phone").unwrap(), "0412345678");
        assert_eq!(row.get("email").unwrap(), "a@b.com");
    }

    #[test]
    fn handles_quoted_fields_and_embedded_commas() {
        let csv = "business_name,address\n\"Spice, Traders\",\"12 Market St, \"\"Old\"\" Town\"\n";
        let rows = CsvReader::parse(csv).unwrap();
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("business_name").unwrap(), "Spice, Traders");
        assert_eq!(row.get("address").unwrap(), "12 Market St, \"Old\" Town");
    }

    #[test]
    fn handles_crlf_and_blank_lines() {
        let csv = "business_name,phone\r\nAcme,123\r\n\r\nBolt,456\r\n";
        let rows = CsvReader::parse(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].as_ref().unwrap().get("business_name").unwrap(), "Bolt");
    }

    #[test]
    fn reports_overlong_rows_without_aborting() {
        let csv = "business_name,phone\nAcme,123,extra,cells\nBolt,456\n";
        let rows = CsvReader::parse(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_err());
        assert!(rows[1].is_ok());
    }

    #[test]
    fn missing_header_is_an_error() {
        assert!(CsvReader::parse("").is_err());
    }

    #[test]
    fn short_rows_omit_trailing_columns() {
        let csv = "business_name,phone,email\nAcme,123\n";
        let rows = CsvReader::parse(csv).unwrap();
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("phone").unwrap(), "123");
        assert!(row.get("email").is_none());
    }
}
