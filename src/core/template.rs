//! `{{ field }}` templates for the generated documents.
//!
//! Rendering only substitutes values: the same template and field map always
//! produce the same bytes. [`Template::parse`] goes the other way and recovers
//! field values from a rendered document.

use crate::utils::error::{BotError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const DASHBOARD_GUIDE_TEMPLATE: &str = include_str!("../../templates/dashboard_guide.md");
pub const DATA_REPORT_TEMPLATE: &str = include_str!("../../templates/data_report.md");
pub const QUICKSIGHT_REPORT_TEMPLATE: &str =
    include_str!("../../templates/quicksight_report.md");

pub type Fields = BTreeMap<String, String>;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("valid placeholder pattern")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn new(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in placeholder_pattern().captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(source[last..whole.start()].to_string()));
            }
            segments.push(Segment::Field(caps[1].to_string()));
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Literal(source[last..].to_string()));
        }

        Self { segments }
    }

    pub fn dashboard_guide() -> Self {
        Self::new(DASHBOARD_GUIDE_TEMPLATE)
    }

    pub fn data_report() -> Self {
        Self::new(DATA_REPORT_TEMPLATE)
    }

    pub fn quicksight_report() -> Self {
        Self::new(QUICKSIGHT_REPORT_TEMPLATE)
    }

    /// Field names in first-appearance order.
    pub fn fields(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Field(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn render(&self, fields: &Fields) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = fields.get(name).ok_or_else(|| BotError::TemplateError {
                        message: format!("No value for placeholder '{}'", name),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Recover field values from `rendered`. A field used twice must hold the same value both times.
    ///
    /// Matching is lazy, so a value that itself contains the literal text following its
    /// placeholder is split early. Keep the values around instead of re-parsing when they
    /// are free-form model output.
    pub fn parse(&self, rendered: &str) -> Result<Fields> {
        let mut pattern = String::from(r"(?s)\A");
        let mut order = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Field(name) => {
                    pattern.push_str("(.*?)");
                    order.push(name.as_str());
                }
            }
        }
        pattern.push_str(r"\z");

        let re = Regex::new(&pattern).map_err(|e| BotError::TemplateError {
            message: format!("Could not build parser for template: {}", e),
        })?;
        let caps = re.captures(rendered).ok_or_else(|| BotError::TemplateError {
            message: "Document does not match the template".to_string(),
        })?;

        let mut fields = Fields::new();
        for (i, name) in order.into_iter().enumerate() {
            let value = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
            match fields.get(name) {
                Some(existing) if existing != value => {
                    return Err(BotError::TemplateError {
                        message: format!("Placeholder '{}' has conflicting values", name),
                    });
                }
                Some(_) => {}
                None => {
                    fields.insert(name.to_string(), value.to_string());
                }
            }
        }
        Ok(fields)
    }
}

/// Convenience for building a field map inline.
pub fn fields<I, K, V>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
