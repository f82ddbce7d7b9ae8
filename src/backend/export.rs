use anyhow::{Context, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::merge::{MergeResult, TemplateMerger};
use super::parser::Record;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// A contact's fields followed by its merged `Subject` and `Body`.
struct DraftRow<'a> {
    contact: &'a Record,
    draft: MergeResult,
}

impl Serialize for DraftRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in self.contact.fields() {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("Subject", &self.draft.subject)?;
        map.serialize_entry("Body", &self.draft.body)?;
        map.end()
    }
}

/// Merges `template` with every contact and writes one row per contact.
/// Returns the number of rows written.
pub fn export_drafts(
    contacts: &[&Record],
    template: &Record,
    output_path: &Path,
    format: ExportFormat,
) -> Result<usize> {
    let rows: Vec<DraftRow<'_>> = contacts
        .iter()
        .map(|&contact| DraftRow {
            contact,
            draft: TemplateMerger::merge(contact, template),
        })
        .collect();

    match format {
        ExportFormat::Csv => write_csv(&rows, output_path)?,
        ExportFormat::Json => write_json(&rows, output_path)?,
    }

    tracing::info!(rows = rows.len(), path = ?output_path, "Exported drafts");
    Ok(rows.len())
}

fn write_csv(rows: &[DraftRow<'_>], output_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create {:?}", output_path))?;

    let mut header: Vec<&str> = rows
        .first()
        .map(|row| row.contact.keys().collect())
        .unwrap_or_default();
    header.extend(["Subject", "Body"]);
    writer.write_record(&header)?;

    for row in rows {
        let mut fields: Vec<&str> = row.contact.fields().map(|(_, value)| value).collect();
        fields.push(&row.draft.subject);
        fields.push(&row.draft.body);
        writer.write_record(&fields)?;
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

fn write_json(rows: &[DraftRow<'_>], output_path: &Path) -> Result<()> {
    let output = File::create(output_path)
        .with_context(|| format!("Failed to create {:?}", output_path))?;
    let mut writer = BufWriter::new(output);
    serde_json::to_writer_pretty(&mut writer, rows).context("Failed to serialize drafts")?;
    writer.flush()?;
    Ok(())
}

pub fn record_to_json(record: &Record) -> Result<String> {
    serde_json::to_string_pretty(record).context("Failed to serialize record")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::parser::{CsvTable, Table};
    use tempfile::tempdir;

    fn tables() -> (Table, Table) {
        let contacts = CsvTable::parse(
            "COMPANY NAME,AGENT NAME\nAcme,Ann\nAcme,\"Bob, Jr.\"\nZeta,Zoe",
        );
        let templates = CsvTable::parse(
            "TemplateName,Subject,Body\nIntro,Hi {AGENT NAME},\"Dear {AGENT NAME},<br>from {Sender}\"",
        );
        (contacts, templates)
    }

    #[test]
    fn test_export_csv() -> Result<()> {
        let (contacts, templates) = tables();
        let dir = tempdir()?;
        let path = dir.path().join("drafts.csv");

        let selected: Vec<&Record> = contacts.records().iter().take(2).collect();
        let written = export_drafts(&selected, &templates.records()[0], &path, ExportFormat::Csv)?;
        assert_eq!(written, 2);

        let mut reader = csv::Reader::from_path(&path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        assert_eq!(headers, vec!["COMPANY NAME", "AGENT NAME", "Subject", "Body"]);

        let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][1], "Bob, Jr.");
        assert_eq!(&rows[1][2], "Hi Bob, Jr.");
        assert_eq!(&rows[1][3], "Dear Bob, Jr.,\nfrom {Sender}");
        Ok(())
    }

    #[test]
    fn test_export_json_keeps_column_order() -> Result<()> {
        let (contacts, templates) = tables();
        let dir = tempdir()?;
        let path = dir.path().join("drafts.json");

        let selected: Vec<&Record> = contacts.records().iter().skip(2).collect();
        export_drafts(&selected, &templates.records()[0], &path, ExportFormat::Json)?;

        let text = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(value[0]["AGENT NAME"], "Zoe");
        assert_eq!(value[0]["Subject"], "Hi Zoe");

        let company = text.find("COMPANY NAME").unwrap();
        let subject = text.find("Subject").unwrap();
        assert!(company < subject);
        Ok(())
    }

    #[test]
    fn test_export_without_contacts_writes_header_only() -> Result<()> {
        let (_, templates) = tables();
        let dir = tempdir()?;
        let path = dir.path().join("empty.csv");

        assert_eq!(export_drafts(&[], &templates.records()[0], &path, ExportFormat::Csv)?, 0);
        assert_eq!(std::fs::read_to_string(&path)?.trim_end(), "Subject,Body");
        Ok(())
    }

    #[test]
    fn test_record_to_json() -> Result<()> {
        let (contacts, _) = tables();
        let json = record_to_json(&contacts.records()[0])?;
        assert_eq!(json, "{\n  \"COMPANY NAME\": \"Acme\",\n  \"AGENT NAME\": \"Ann\"\n}");
        Ok(())
    }
}
