use anyhow::{Context, Result, anyhow, bail};
use clap::Subcommand;
use std::path::PathBuf;

use crate::backend::directory::{self, ColumnNames};
use crate::backend::export::{self, ExportFormat};
use crate::backend::loader::{self, Source};
use crate::backend::merge::{MergeResult, TemplateMerger};
use crate::backend::parser::{Record, Table};
use crate::backend::settings::Settings;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print one merged draft to stdout
    Draft {
        /// Value of the contact name column
        #[arg(long)]
        contact: String,
        /// Only match contacts of this company
        #[arg(long)]
        company: Option<String>,
        /// Value of the template name column
        #[arg(long)]
        template: String,
    },
    /// Merge a template with every contact and write the drafts to a file
    Export {
        #[arg(long)]
        template: String,
        /// Only export contacts of this company
        #[arg(long)]
        company: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
}

pub fn run(command: Command, settings: &Settings) -> Result<()> {
    let contacts = load_required(&settings.contacts_source, "contacts", settings)?;
    let templates = load_required(&settings.templates_source, "templates", settings)?;
    let columns = &settings.columns;

    match command {
        Command::Draft {
            contact,
            company,
            template,
        } => {
            let draft = draft_for(
                &contacts,
                &templates,
                columns,
                &contact,
                company.as_deref(),
                &template,
            )?;
            println!("{}\n\n{}", draft.subject, draft.body);
        }
        Command::Export {
            template,
            company,
            output,
            format,
        } => {
            let template = find_template(&templates, columns, &template)?;
            let selected = select_contacts(&contacts, columns, company.as_deref());
            if selected.is_empty() {
                bail!("No contacts to export");
            }
            let written = export::export_drafts(&selected, template, &output, format)?;
            println!("Wrote {} drafts to {}", written, output.display());
        }
    }
    Ok(())
}

fn load_required(raw: &str, label: &str, settings: &Settings) -> Result<Table> {
    let source = Source::parse(raw)
        .with_context(|| format!("No {} source configured; pass --{}", label, label))?;
    let table = loader::load_table(&source, settings.fetch_timeout())
        .with_context(|| format!("Error loading {}", label))?;
    if table.is_empty() {
        bail!("No {} found in {}; check headers", label, source);
    }
    Ok(table)
}

fn select_contacts<'a>(contacts: &'a Table, columns: &ColumnNames, company: Option<&str>) -> Vec<&'a Record> {
    match company {
        Some(company) => directory::contacts_for(contacts, &columns.company, company),
        None => contacts.records().iter().collect(),
    }
}

fn find_template<'a>(templates: &'a Table, columns: &ColumnNames, name: &str) -> Result<&'a Record> {
    directory::find_by(templates, &columns.template_name, name)
        .ok_or_else(|| anyhow!("No template named {:?}", name))
}

fn draft_for(
    contacts: &Table,
    templates: &Table,
    columns: &ColumnNames,
    contact: &str,
    company: Option<&str>,
    template: &str,
) -> Result<MergeResult> {
    let template = find_template(templates, columns, template)?;
    let contact = select_contacts(contacts, columns, company)
        .into_iter()
        .find(|record| record.get(&columns.contact) == Some(contact))
        .ok_or_else(|| anyhow!("No contact named {:?}", contact))?;
    Ok(TemplateMerger::merge(contact, template))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::parser::CsvTable;

    fn tables() -> (Table, Table) {
        let contacts = CsvTable::parse(
            "COMPANY NAME,AGENT NAME,City\nAcme,Sam,Leeds\nZeta,Sam,York\nZeta,Ann,Hull",
        );
        let templates = CsvTable::parse(
            "TemplateName,Subject,Body\nIntro,Hi {AGENT NAME},See you in {City}",
        );
        (contacts, templates)
    }

    #[test]
    fn test_draft_for_respects_company() -> Result<()> {
        let (contacts, templates) = tables();
        let columns = ColumnNames::default();

        let first = draft_for(&contacts, &templates, &columns, "Sam", None, "Intro")?;
        assert_eq!(first.body, "See you in Leeds");

        let zeta = draft_for(&contacts, &templates, &columns, "Sam", Some("Zeta"), "Intro")?;
        assert_eq!(zeta.subject, "Hi Sam");
        assert_eq!(zeta.body, "See you in York");
        Ok(())
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let (contacts, templates) = tables();
        let columns = ColumnNames::default();

        let err = draft_for(&contacts, &templates, &columns, "Nobody", None, "Intro").unwrap_err();
        assert!(err.to_string().contains("No contact named"));

        let err = draft_for(&contacts, &templates, &columns, "Ann", None, "Outro").unwrap_err();
        assert!(err.to_string().contains("No template named"));

        let err = draft_for(&contacts, &templates, &columns, "Ann", Some("Acme"), "Intro").unwrap_err();
        assert!(err.to_string().contains("No contact named"));
    }

    #[test]
    fn test_select_contacts() {
        let (contacts, _) = tables();
        let columns = ColumnNames::default();
        assert_eq!(select_contacts(&contacts, &columns, None).len(), 3);
        assert_eq!(select_contacts(&contacts, &columns, Some("Zeta")).len(), 2);
        assert!(select_contacts(&contacts, &columns, Some("Nope")).is_empty());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let settings = Settings::default();
        let err = load_required(&settings.contacts_source, "contacts", &settings).unwrap_err();
        assert!(err.to_string().contains("--contacts"));
    }
}
