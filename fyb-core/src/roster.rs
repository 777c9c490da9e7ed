///! CSV roster loading
///!
///! Streams the source table into normalized student records and exposes
///! header-only extraction for interactive mapping configuration.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::record::{self, ColumnMapping, StudentRecord};

/// Parse CSV content into normalized records.
///
/// The reader is strict: a row with a column count that does not match the
/// header fails the whole load rather than salvaging partial data.
pub fn records_from_reader<R: Read>(
    reader: R,
    mapping: Option<&ColumnMapping>,
) -> Result<Vec<StudentRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .context("Failed to read CSV header row")?
        .clone();

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let raw = result.with_context(|| format!("Malformed CSV row {}", index + 2))?;
        let mut row: HashMap<String, String> = HashMap::new();
        for (column, value) in headers.iter().zip(raw.iter()) {
            row.insert(column.to_string(), value.to_string());
        }
        records.push(record::normalize(&row, mapping));
    }

    Ok(records)
}

/// Read the ordered column names from CSV content without touching data rows.
pub fn headers_from_reader<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .context("Failed to read CSV header row")?;

    Ok(headers.iter().map(|h| h.to_string()).collect())
}

/// Load and normalize every row of a CSV file.
pub async fn load_records(
    path: impl AsRef<Path>,
    mapping: Option<&ColumnMapping>,
) -> Result<Vec<StudentRecord>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
    records_from_reader(content.as_bytes(), mapping)
}

/// Read only the header row of a CSV file.
pub async fn read_headers(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
    headers_from_reader(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
name,department,stateOfOrigin,Matric Number
John Doe,Computer Science,Lagos,2019/12345
Jane Smith,Electrical Engineering,Abuja,2019/54321
";

    #[test]
    fn test_parse_rows() {
        let records = records_from_reader(SAMPLE_CSV.as_bytes(), None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "John Doe");
        assert_eq!(records[1].state_of_origin, "Abuja");
        assert_eq!(
            records[0].extra.get("Matric Number").map(String::as_str),
            Some("2019/12345")
        );
    }

    #[test]
    fn test_parse_rows_with_mapping() {
        let csv = "Full Name,Dept\nAda Lovelace,Mathematics\n";
        let mut mapping = ColumnMapping::new();
        mapping.insert("name".to_string(), "Full Name".to_string());
        mapping.insert("department".to_string(), "Dept".to_string());

        let records = records_from_reader(csv.as_bytes(), Some(&mapping)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ada Lovelace");
        assert_eq!(records[0].department, "Mathematics");
    }

    #[test]
    fn test_headers_keep_order() {
        let headers = headers_from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(
            headers,
            vec!["name", "department", "stateOfOrigin", "Matric Number"]
        );
    }

    #[test]
    fn test_ragged_row_fails_whole_load() {
        let csv = "name,department\nJohn Doe,Computer Science\nJane Smith\n";
        assert!(records_from_reader(csv.as_bytes(), None).is_err());
    }
}
