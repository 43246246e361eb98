//! `$`-placeholder templates with typed substitution values.
//!
//! Supported syntax: `${name}`, `$name`, and `$$` for a literal `$`.
//! Rendering fails on the first placeholder that has no field rather than
//! leaving it in the output.

use crate::error::TemplateError;
use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(?P<escaped>\$)|\{(?P<braced>[^}]*)\}|(?P<named>[A-Za-z_][A-Za-z0-9_]*))?")
        .unwrap_or_else(|e| panic!("placeholder pattern is invalid: {e}"))
});

/// Supplies values for placeholder names
pub trait TemplateFields {
    /// Value for `name`, or `None` when the struct has no such field
    fn field(&self, name: &str) -> Option<&str>;
}

/// Values for the OWNERS document template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnersFields<'a> {
    /// Vendor label
    pub vendor: &'a str,
    /// Chart name
    pub chart_name: &'a str,
}

impl TemplateFields for OwnersFields<'_> {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "vendor" => Some(self.vendor),
            "chart_name" => Some(self.chart_name),
            _ => None,
        }
    }
}

/// Values for the chart verifier report template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFields<'a> {
    /// `owner/name` of the repository receiving the PR
    pub repository: &'a str,
    /// Base branch of the PR
    pub branch: &'a str,
}

impl TemplateFields for ReportFields<'_> {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "repository" => Some(self.repository),
            "branch" => Some(self.branch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template text, rejecting malformed placeholders
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            literal.push_str(&text[last..whole.start()]);
            last = whole.end();

            if caps.name("escaped").is_some() {
                literal.push('$');
                continue;
            }

            let name = caps
                .name("braced")
                .or_else(|| caps.name("named"))
                .map(|m| m.as_str())
                .filter(|name| is_identifier(name))
                .ok_or(TemplateError::InvalidPlaceholder {
                    offset: whole.start(),
                })?;

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(name.to_string()));
        }

        literal.push_str(&text[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Placeholder names in order of appearance, duplicates removed
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment
                && !names.contains(&name.as_str())
            {
                names.push(name);
            }
        }
        names
    }

    /// Substitute every placeholder from `fields`
    pub fn render(&self, fields: &impl TemplateFields) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = fields.field(name).ok_or_else(|| TemplateError::MissingField {
                        placeholder: name.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Parse and render in one step
pub fn render(text: &str, fields: &impl TemplateFields) -> Result<String, TemplateError> {
    Template::parse(text)?.render(fields)
}
