use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::merge::{MergeResult, TemplateMerger};
use super::parser::{Record, RecordId, Table};

/// Column names the selection widgets read from the two tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub company: String,
    pub contact: String,
    pub template_name: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            company: "COMPANY NAME".to_string(),
            contact: "AGENT NAME".to_string(),
            template_name: "TemplateName".to_string(),
        }
    }
}

/// Distinct, non-empty values of `column`, sorted.
pub fn companies(table: &Table, column: &str) -> Vec<String> {
    table
        .records()
        .iter()
        .filter_map(|record| record.get(column))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Records whose `column` equals `company`, in table order.
pub fn contacts_for<'a>(table: &'a Table, column: &str, company: &str) -> Vec<&'a Record> {
    table
        .records()
        .iter()
        .filter(|record| record.get(column) == Some(company))
        .collect()
}

pub fn find_by<'a>(table: &'a Table, column: &str, value: &str) -> Option<&'a Record> {
    table
        .records()
        .iter()
        .find(|record| record.get(column) == Some(value))
}

pub fn missing_columns(table: &Table, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !table.headers().iter().any(|header| header.as_str() == **name))
        .map(|name| name.to_string())
        .collect()
}

/// Current company, contact and template picks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    company: Option<String>,
    contact: Option<RecordId>,
    template: Option<RecordId>,
}

impl Selection {
    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn contact(&self) -> Option<RecordId> {
        self.contact
    }

    pub fn template(&self) -> Option<RecordId> {
        self.template
    }

    /// Picking a company always clears the contact.
    pub fn set_company(&mut self, company: Option<String>) {
        self.company = company.filter(|c| !c.is_empty());
        self.contact = None;
    }

    pub fn set_contact(&mut self, contact: Option<RecordId>) {
        self.contact = contact;
    }

    pub fn set_template(&mut self, template: Option<RecordId>) {
        self.template = template;
    }

    pub fn draft(&self, contacts: &Table, templates: &Table) -> Option<MergeResult> {
        let contact = contacts.get(self.contact?)?;
        let template = templates.get(self.template?)?;
        Some(TemplateMerger::merge(contact, template))
    }
}
