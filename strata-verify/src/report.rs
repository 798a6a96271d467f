//! Per-entry layout checks and their text rendering.

use std::fmt::Write as _;

use serde_json::Value;
use strata_core::{normalize, validate_value, PayloadFormat, SchemaViolation};

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutStatus {
    /// The entry has no layout field, or it is `null`.
    Missing,
    Valid {
        components: usize,
        format: PayloadFormat,
    },
    Invalid {
        violations: Vec<SchemaViolation>,
        /// Set when the editor can still read the value in an older encoding.
        legacy: Option<PayloadFormat>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryReport {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub status: LayoutStatus,
}

impl EntryReport {
    pub fn from_entry(entry: &Value, field: &str) -> Self {
        let fields = &entry["fields"];
        Self {
            title: text_field(fields, "title"),
            slug: text_field(fields, "slug"),
            status: check_layout(fields.get(field).unwrap_or(&Value::Null)),
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.status, LayoutStatus::Invalid { .. })
    }
}

fn text_field(fields: &Value, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

/// Validate a stored layout value against the current envelope schema.
///
/// JSON-encoded strings are decoded once first, so an encoded envelope that
/// is otherwise well-formed passes and is reported as legacy.
pub fn check_layout(raw: &Value) -> LayoutStatus {
    if raw.is_null() {
        return LayoutStatus::Missing;
    }

    let decoded = match raw {
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(value) => value,
            Err(e) => {
                return LayoutStatus::Invalid {
                    violations: vec![SchemaViolation {
                        path: "$".to_string(),
                        reason: format!("string is not valid JSON: {e}"),
                    }],
                    legacy: None,
                }
            }
        },
        other => other.clone(),
    };

    let readable = normalize(raw).ok().flatten();
    let violations = validate_value(&decoded);
    match readable {
        Some(payload) if violations.is_empty() => LayoutStatus::Valid {
            components: payload.layout.len(),
            format: payload.format,
        },
        readable => LayoutStatus::Invalid {
            violations,
            legacy: readable
                .map(|payload| payload.format)
                .filter(|format| format.is_legacy()),
        },
    }
}

/// Result of looking up one entry by slug.
#[derive(Debug, Clone, PartialEq)]
pub enum SlugLookup {
    NotFound { slug: String },
    Found { slug: String, components: Option<usize> },
}

impl SlugLookup {
    pub fn from_entry(slug: &str, entry: Option<&Value>, field: &str) -> Self {
        let slug = slug.to_string();
        match entry {
            None => SlugLookup::NotFound { slug },
            Some(entry) => {
                let components = normalize(&entry["fields"][field])
                    .ok()
                    .flatten()
                    .map(|payload| payload.layout.len());
                SlugLookup::Found { slug, components }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    pub entries: Vec<EntryReport>,
    pub lookup: Option<SlugLookup>,
}

impl VerifyReport {
    pub fn invalid_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_invalid()).count()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.entries.is_empty() {
            out.push_str("No entries found.\n");
        } else {
            let _ = writeln!(out, "Found {} entries\n", self.entries.len());
        }

        for (index, entry) in self.entries.iter().enumerate() {
            let _ = writeln!(out, "--- Entry {} ---", index + 1);
            let _ = writeln!(out, "Title: {}", entry.title.as_deref().unwrap_or("N/A"));
            let _ = writeln!(out, "Slug: {}", entry.slug.as_deref().unwrap_or("N/A"));
            match &entry.status {
                LayoutStatus::Missing => out.push_str("Layout: missing\n"),
                LayoutStatus::Valid { components, format } => {
                    let _ = write!(out, "Layout: valid ({components} components)");
                    if format.is_legacy() {
                        let _ = write!(out, ", stored as {format}");
                    }
                    out.push('\n');
                }
                LayoutStatus::Invalid { violations, legacy } => {
                    let _ = writeln!(out, "Layout: invalid ({} problems)", violations.len());
                    for violation in violations {
                        let _ = writeln!(out, "  - {violation}");
                    }
                    if let Some(format) = legacy {
                        let _ = writeln!(out, "  note: readable by the editor as {format}");
                    }
                }
            }
            out.push('\n');
        }

        match &self.lookup {
            Some(SlugLookup::NotFound { slug }) => {
                let _ = writeln!(out, "No entry found with slug {slug:?}");
            }
            Some(SlugLookup::Found { slug, components }) => {
                let _ = writeln!(out, "Found entry with slug {slug:?}");
                match components {
                    Some(count) => {
                        let _ = writeln!(out, "Layout is readable: {count} components");
                    }
                    None => out.push_str("Layout is missing or unreadable\n"),
                }
            }
            None => {}
        }
        out
    }
}
