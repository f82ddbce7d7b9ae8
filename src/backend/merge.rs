use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use super::parser::Record;

/// Shortest `{...}` run on a single line.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(.+?)\}").expect("placeholder pattern is valid"));

const BREAK_MARKER: &str = "<br>";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    pub subject: String,
    pub body: String,
}

pub struct TemplateMerger;

impl TemplateMerger {
    /// Fills a template's `Subject` and `Body` from one contact.
    ///
    /// `<br>` in the body becomes a newline before placeholders are filled,
    /// so values are inserted verbatim. Placeholders with no matching key, or
    /// an empty value, are left as written.
    pub fn merge(contact: &Record, template: &Record) -> MergeResult {
        let subject = template.get("Subject").unwrap_or_default();
        let body = template
            .get("Body")
            .unwrap_or_default()
            .replace(BREAK_MARKER, "\n");

        MergeResult {
            subject: fill_placeholders(subject, contact),
            body: fill_placeholders(&body, contact),
        }
    }
}

fn fill_placeholders(text: &str, contact: &Record) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| match contact.get(&caps[1]) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}
