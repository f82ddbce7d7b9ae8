use serde::ser::{Serialize, SerializeMap, Serializer};

/// Stable handle for a record, assigned when its table is parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(usize);

impl RecordId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One data row, keyed by header name in header order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    fields: Vec<(String, String)>,
}

impl Record {
    fn from_row(id: RecordId, headers: &[String], values: Vec<String>) -> Self {
        let mut fields: Vec<(String, String)> = Vec::with_capacity(headers.len());
        for (header, value) in headers.iter().zip(values) {
            // A repeated header keeps its first position but takes the later value.
            match fields.iter_mut().find(|(key, _)| key == header) {
                Some(existing) => existing.1 = value,
                None => fields.push((header.clone(), value)),
            }
        }
        Self { id, fields }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Records sharing the header row they were parsed with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    records: Vec<Record>,
    dropped_rows: usize,
}

impl Table {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Data lines skipped because their field count did not match the header.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }
}

pub struct CsvTable;

impl CsvTable {
    /// Parses a whole CSV document with a header row.
    ///
    /// Never fails: input with fewer than two lines yields an empty table,
    /// and data lines whose field count differs from the header are dropped.
    /// Quoted fields cannot span lines, since lines are split before
    /// tokenizing.
    pub fn parse(text: &str) -> Table {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text).trim();
        let lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        if lines.len() < 2 {
            tracing::debug!("CSV has {} line(s), need a header and at least one row", lines.len());
            return Table::default();
        }

        let headers = Self::tokenize_line(lines[0]);
        let mut records = Vec::new();
        let mut dropped_rows = 0;

        for (offset, line) in lines[1..].iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let values = Self::tokenize_line(line);
            if values.len() != headers.len() {
                tracing::warn!(
                    line = offset + 2,
                    expected = headers.len(),
                    found = values.len(),
                    "Skipping CSV row with mismatched column count"
                );
                dropped_rows += 1;
                continue;
            }
            let id = RecordId(records.len());
            records.push(Record::from_row(id, &headers, values));
        }

        Table {
            headers,
            records,
            dropped_rows,
        }
    }

    /// Splits one line into trimmed fields.
    ///
    /// `""` inside a quoted field is a literal quote; any other quote toggles
    /// quoting. An unterminated quote runs to the end of the line.
    pub fn tokenize_line(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quote = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '"' => {
                    if in_quote && chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quote = !in_quote;
                    }
                }
                ',' if !in_quote => {
                    fields.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            }
        }
        fields.push(current.trim().to_string());

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(record: &Record) -> Vec<(&str, &str)> {
        record.fields().collect()
    }

    #[test]
    fn test_parse_simple() {
        let table = CsvTable::parse("H1,H2\na,b");
        assert_eq!(table.len(), 1);
        assert_eq!(row(&table.records()[0]), vec![("H1", "a"), ("H2", "b")]);
    }

    #[test]
    fn test_parse_quotes() {
        let fields = CsvTable::tokenize_line("\"x,y\",\"a\"\"b\",plain");
        assert_eq!(fields, vec!["x,y", "a\"b", "plain"]);

        let table = CsvTable::parse("A,B\n\"x,y\",\"a\"\"b\"");
        let record = &table.records()[0];
        assert_eq!(record.get("A"), Some("x,y"));
        assert_eq!(record.get("B"), Some("a\"b"));
    }

    #[test]
    fn test_fields_are_trimmed_even_inside_quotes() {
        assert_eq!(CsvTable::tokenize_line(" a ,\"  b  \", c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_quote_toggles_mid_field() {
        assert_eq!(CsvTable::tokenize_line("ab\"c,d\"e,f"), vec!["abc,de", "f"]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end_of_line() {
        assert_eq!(CsvTable::tokenize_line("a,\"b,c"), vec!["a", "b,c"]);
    }

    #[test]
    fn test_empty_fields_are_kept() {
        assert_eq!(CsvTable::tokenize_line(",,"), vec!["", "", ""]);
        assert_eq!(CsvTable::tokenize_line(""), vec![""]);
    }

    #[test]
    fn test_mismatched_rows_are_dropped() {
        let table = CsvTable::parse("A,B\n1,2\n3\n4,5,6\n7,8");
        assert_eq!(table.len(), 2);
        assert_eq!(table.dropped_rows(), 2);
        assert_eq!(table.records()[0].get("A"), Some("1"));
        assert_eq!(table.records()[1].get("A"), Some("7"));
    }

    #[test]
    fn test_bom_is_ignored() {
        let plain = CsvTable::parse("Name,Email\nAnn,ann@example.com");
        let with_bom = CsvTable::parse("\u{feff}Name,Email\nAnn,ann@example.com");
        assert_eq!(plain, with_bom);
        assert_eq!(with_bom.headers(), &["Name", "Email"]);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let table = CsvTable::parse("A,B\r\n1,2\r\n\r\n   \r\n3,4\r\n");
        assert_eq!(table.len(), 2);
        assert_eq!(table.dropped_rows(), 0);
        assert_eq!(table.records()[1].get("B"), Some("4"));
    }

    #[test]
    fn test_insufficient_lines_give_empty_table() {
        assert!(CsvTable::parse("").is_empty());
        assert!(CsvTable::parse("A,B").is_empty());
        assert!(CsvTable::parse("  \n A,B \n\n").is_empty());
        assert!(CsvTable::parse("A,B\n").headers().is_empty());
    }

    #[test]
    fn test_header_keys_keep_spaces_and_case() {
        let table = CsvTable::parse(" COMPANY NAME , agent Name\nAcme,Bob");
        let record = &table.records()[0];
        assert_eq!(record.get("COMPANY NAME"), Some("Acme"));
        assert_eq!(record.get("agent Name"), Some("Bob"));
        assert_eq!(record.get("AGENT NAME"), None);
    }

    #[test]
    fn test_record_ids_follow_kept_rows() {
        let table = CsvTable::parse("A\n1\n2\n\n3");
        let ids: Vec<usize> = table.records().iter().map(|r| r.id().index()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        let third = table.records()[2].id();
        assert_eq!(table.get(third).and_then(|r| r.get("A")), Some("3"));
    }

    #[test]
    fn test_every_record_follows_header_order() {
        let table = CsvTable::parse("C,A,B\n1,2,3\n4,5,6\n7,8,9");
        assert_eq!(table.len(), 3);
        for record in table.records() {
            assert_eq!(record.keys().collect::<Vec<_>>(), vec!["C", "A", "B"]);
        }
    }

    #[test]
    fn test_duplicate_header_keeps_first_position() {
        let table = CsvTable::parse("A,B,A\n1,2,3");
        assert_eq!(row(&table.records()[0]), vec![("A", "3"), ("B", "2")]);
    }

    #[test]
    fn test_record_serializes_in_header_order() {
        let table = CsvTable::parse("Zed,Alpha\nz,a");
        let json = serde_json::to_string(&table.records()[0]).unwrap();
        assert_eq!(json, r#"{"Zed":"z","Alpha":"a"}"#);
    }
}
