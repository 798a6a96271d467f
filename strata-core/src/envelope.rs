//! Persisted representation of a layout.
//!
//! Wire format (current schema):
//! ```text
//! {
//!   "components":   [ { "id": .., "type": .., "name": .. }, ... ],
//!   "lastModified": "2025-01-01T12:00:00.000Z",
//!   "version":      "1.0"
//! }
//! ```
//!
//! Reads also accept two legacy encodings: a bare component array, and a
//! JSON string holding either shape. Writes always produce the envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::catalog::ComponentType;
use crate::layout::{Layout, LayoutError, PlacedComponent};

/// Schema generation written by this crate.
pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Invalid JSON in string payload: {0}")]
    InvalidJson(String),
    #[error("Payload object has no components array")]
    MissingComponents,
    #[error("Unsupported payload shape: {0}")]
    UnsupportedShape(&'static str),
    #[error("Invalid component list: {0}")]
    InvalidComponents(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The versioned wrapper persisted to the field store.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveEnvelope {
    pub components: Layout,
    #[serde(with = "iso_millis")]
    pub last_modified: DateTime<Utc>,
    pub version: String,
}

impl SaveEnvelope {
    pub fn new(components: Layout, last_modified: DateTime<Utc>) -> Self {
        Self {
            components,
            last_modified,
            version: SCHEMA_VERSION.to_string(),
        }
    }

    /// Envelope stamped with the current wall-clock time.
    pub fn stamped_now(components: Layout) -> Self {
        Self::new(components, Utc::now())
    }

    pub fn to_value(&self) -> Result<Value, EnvelopeError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// `lastModified` is written like JavaScript's `toISOString()`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Which encoding a payload arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Envelope,
    BareArray,
    EncodedEnvelope,
    EncodedArray,
}

impl PayloadFormat {
    pub fn is_legacy(self) -> bool {
        self != PayloadFormat::Envelope
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PayloadFormat::Envelope => "envelope",
            PayloadFormat::BareArray => "legacy bare array",
            PayloadFormat::EncodedEnvelope => "legacy JSON-encoded envelope",
            PayloadFormat::EncodedArray => "legacy JSON-encoded array",
        };
        f.write_str(label)
    }
}

/// A payload reduced to its layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPayload {
    pub layout: Layout,
    pub format: PayloadFormat,
}

/// Reduce any accepted encoding to a layout.
///
/// `null` yields `Ok(None)`: the field is empty, not malformed.
pub fn normalize(raw: &Value) -> Result<Option<NormalizedPayload>, EnvelopeError> {
    match raw {
        Value::Null => Ok(None),
        Value::String(encoded) => {
            let decoded: Value = serde_json::from_str(encoded)
                .map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;
            let (layout, format) = match &decoded {
                Value::Object(map) => (components_of(map)?, PayloadFormat::EncodedEnvelope),
                Value::Array(_) => (parse_components(&decoded)?, PayloadFormat::EncodedArray),
                _ => return Err(EnvelopeError::UnsupportedShape(shape_name(&decoded))),
            };
            log::debug!("Read {} components from {format}", layout.len());
            Ok(Some(NormalizedPayload { layout, format }))
        }
        Value::Object(map) => Ok(Some(NormalizedPayload {
            layout: components_of(map)?,
            format: PayloadFormat::Envelope,
        })),
        Value::Array(_) => {
            let layout = parse_components(raw)?;
            log::debug!("Read {} components from {}", layout.len(), PayloadFormat::BareArray);
            Ok(Some(NormalizedPayload {
                layout,
                format: PayloadFormat::BareArray,
            }))
        }
        other => Err(EnvelopeError::UnsupportedShape(shape_name(other))),
    }
}

fn components_of(map: &Map<String, Value>) -> Result<Layout, EnvelopeError> {
    match map.get("components") {
        Some(components @ Value::Array(_)) => parse_components(components),
        _ => Err(EnvelopeError::MissingComponents),
    }
}

fn parse_components(array: &Value) -> Result<Layout, EnvelopeError> {
    let components = Vec::<PlacedComponent>::deserialize(array)
        .map_err(|e| EnvelopeError::InvalidComponents(e.to_string()))?;
    Ok(Layout::new(components)?)
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Canonical form ──────────────────────────────────────────────────

/// Serialize `value` with object keys sorted at every depth and no
/// insignificant whitespace. Equal JSON documents produce equal strings
/// regardless of key insertion order.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Canonical serialization of a layout's component list, used to tell a
/// store echo from a genuine external change.
pub fn canonical_components(layout: &Layout) -> String {
    let mut out = String::from("[");
    for (i, component) in layout.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(component.id.clone()));
        map.insert("name".to_string(), Value::String(component.name.clone()));
        map.insert("type".to_string(), Value::String(component.kind.tag().to_string()));
        write_canonical(&Value::Object(map), &mut out);
    }
    out.push(']');
    out
}

// ── Schema validation ───────────────────────────────────────────────

/// One reason a stored value does not match the current schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON path of the offending field, e.g. `components[2].type`.
    pub path: String,
    pub reason: String,
}

impl SchemaViolation {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Check `value` against the current envelope schema, collecting every
/// violation rather than stopping at the first.
pub fn validate_value(value: &Value) -> Vec<SchemaViolation> {
    let mut violations = Vec::new();
    let Value::Object(map) = value else {
        violations.push(SchemaViolation::new(
            "$",
            format!("expected an envelope object, found {}", shape_name(value)),
        ));
        return violations;
    };

    match map.get("components") {
        Some(Value::Array(components)) => validate_components(components, &mut violations),
        Some(other) => violations.push(SchemaViolation::new(
            "components",
            format!("expected an array, found {}", shape_name(other)),
        )),
        None => violations.push(SchemaViolation::new("components", "missing components array")),
    }

    match map.get("lastModified") {
        Some(Value::String(raw)) => {
            if DateTime::parse_from_rfc3339(raw).is_err() {
                violations.push(SchemaViolation::new(
                    "lastModified",
                    format!("not an ISO-8601 timestamp: {raw:?}"),
                ));
            }
        }
        Some(other) => violations.push(SchemaViolation::new(
            "lastModified",
            format!("expected a string, found {}", shape_name(other)),
        )),
        None => violations.push(SchemaViolation::new("lastModified", "missing lastModified")),
    }

    match map.get("version") {
        Some(Value::String(v)) if v == SCHEMA_VERSION => {}
        Some(other) => violations.push(SchemaViolation::new(
            "version",
            format!("expected \"{SCHEMA_VERSION}\", found {other}"),
        )),
        None => violations.push(SchemaViolation::new("version", "missing version")),
    }

    violations
}

fn validate_components(components: &[Value], violations: &mut Vec<SchemaViolation>) {
    let mut seen = HashSet::new();
    for (index, component) in components.iter().enumerate() {
        let path = format!("components[{index}]");
        let Value::Object(fields) = component else {
            violations.push(SchemaViolation::new(
                path,
                format!("expected an object, found {}", shape_name(component)),
            ));
            continue;
        };

        match fields.get("id") {
            Some(Value::String(id)) if !id.is_empty() => {
                if !seen.insert(id.as_str()) {
                    violations.push(SchemaViolation::new(
                        format!("{path}.id"),
                        format!("duplicate id {id:?}"),
                    ));
                }
            }
            _ => violations.push(SchemaViolation::new(
                format!("{path}.id"),
                "missing or empty id",
            )),
        }

        match fields.get("type") {
            Some(Value::String(tag)) if ComponentType::is_known_tag(tag) => {}
            Some(Value::String(tag)) => violations.push(SchemaViolation::new(
                format!("{path}.type"),
                format!("unknown component type {tag:?}"),
            )),
            _ => violations.push(SchemaViolation::new(
                format!("{path}.type"),
                "missing component type",
            )),
        }

        match fields.get("name") {
            Some(Value::String(name)) if !name.is_empty() => {}
            _ => violations.push(SchemaViolation::new(
                format!("{path}.name"),
                "missing or empty name",
            )),
        }
    }
}
