use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::parser::{CsvTable, Table};

/// Where a CSV document comes from: a local file or a published URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Url(String),
}

impl Source {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(Source::Url(raw.to_string()))
        } else {
            Some(Source::File(PathBuf::from(raw)))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => f.write_str(url),
        }
    }
}

/// Reads the raw text of a source. File bytes are decoded as UTF-8, lossily.
pub fn fetch_text(source: &Source, timeout: Duration) -> Result<String> {
    match source {
        Source::File(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read file: {:?}", path))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        Source::Url(url) => {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?;
            let response = client
                .get(url)
                .send()
                .with_context(|| format!("Failed to fetch {}", url))?
                .error_for_status()
                .with_context(|| format!("Bad response from {}", url))?;
            response
                .text()
                .with_context(|| format!("Failed to read body from {}", url))
        }
    }
}

pub fn load_table(source: &Source, timeout: Duration) -> Result<Table> {
    let text = fetch_text(source, timeout)?;
    let table = CsvTable::parse(&text);
    tracing::info!(
        source = %source,
        records = table.len(),
        dropped = table.dropped_rows(),
        "Loaded table"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_source_parse() {
        assert_eq!(
            Source::parse(" https://example.com/pub?output=csv "),
            Some(Source::Url("https://example.com/pub?output=csv".to_string()))
        );
        assert_eq!(
            Source::parse("HTTP://example.com/a.csv"),
            Some(Source::Url("HTTP://example.com/a.csv".to_string()))
        );
        assert_eq!(
            Source::parse("data/contacts.csv"),
            Some(Source::File(PathBuf::from("data/contacts.csv")))
        );
        assert_eq!(Source::parse("   "), None);
    }

    #[test]
    fn test_load_table_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "\u{feff}COMPANY NAME,AGENT NAME\r\nAcme,Ann\r\nbroken\r\nAcme,Bob\r\n")?;

        let table = load_table(&Source::File(file.path().to_path_buf()), TIMEOUT)?;
        assert_eq!(table.headers(), &["COMPANY NAME", "AGENT NAME"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.dropped_rows(), 1);
        Ok(())
    }

    #[test]
    fn test_invalid_utf8_is_replaced() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"Name\nAn\xffn")?;

        let text = fetch_text(&Source::File(file.path().to_path_buf()), TIMEOUT)?;
        assert_eq!(text, "Name\nAn\u{fffd}n");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let source = Source::File(PathBuf::from("/definitely/not/here.csv"));
        let err = load_table(&source, TIMEOUT).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
