//! Record normalizer.
//!
//! Turns loosely typed backend project objects into canonical
//! [`ProjectRecord`]s. Field names are resolved through an alias table so
//! the estimated/allocated and approved/actual/consumed spellings all land
//! on the same canonical field.

use crate::error::{FieldWarning, RecordError};
use crate::models::ProjectRecord;
use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Backend key names per canonical field, first present key wins.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAliases {
    pub id: Vec<String>,
    pub name: Vec<String>,
    pub allocated_hours: Vec<String>,
    pub consumed_hours: Vec<String>,
    pub start_date: Vec<String>,
    pub end_date: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self::from(&crate::config::FieldsConfig::default())
    }
}

impl From<&crate::config::FieldsConfig> for FieldAliases {
    fn from(config: &crate::config::FieldsConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            allocated_hours: config.allocated_hours.clone(),
            consumed_hours: config.consumed_hours.clone(),
            start_date: config.start_date.clone(),
            end_date: config.end_date.clone(),
        }
    }
}

/// A successfully normalized record plus any recovered field problems.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub record: ProjectRecord,
    pub warnings: Vec<FieldWarning>,
}

/// Outcome of normalizing a whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedBatch {
    /// Accepted records, in input order.
    pub records: Vec<ProjectRecord>,
    /// Excluded records.
    pub rejected: Vec<RecordError>,
    /// Recovered field problems on accepted records.
    pub warnings: Vec<FieldWarning>,
}

/// Normalize one raw record.
///
/// `index` is the record's position in the payload and only feeds error
/// reporting.
pub fn normalize_record(
    raw: &Value,
    index: usize,
    aliases: &FieldAliases,
) -> Result<Normalized, RecordError> {
    let object = raw
        .as_object()
        .ok_or(RecordError::NotAnObject { index })?;

    let id = lookup(object, &aliases.id)
        .and_then(text_of)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(RecordError::MissingIdentifier { index })?;

    let name = lookup(object, &aliases.name)
        .and_then(text_of)
        .unwrap_or_default();

    let mut warnings = Vec::new();

    let allocated_hours = hours_field(object, &aliases.allocated_hours, &id, &mut warnings);
    let consumed_hours = round_to_cents(hours_field(
        object,
        &aliases.consumed_hours,
        &id,
        &mut warnings,
    ));

    let start_date = lookup(object, &aliases.start_date).and_then(date_of);
    let end_date = lookup(object, &aliases.end_date).and_then(date_of);

    Ok(Normalized {
        record: ProjectRecord {
            id,
            name,
            allocated_hours,
            consumed_hours,
            start_date,
            end_date,
        },
        warnings,
    })
}

/// Normalize every record of a payload, keeping input order.
///
/// Invalid records are excluded and reported; a repeated id keeps the
/// first occurrence.
pub fn normalize_batch(raw: &[Value], aliases: &FieldAliases) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, value) in raw.iter().enumerate() {
        match normalize_record(value, index, aliases) {
            Ok(normalized) => {
                if !seen.insert(normalized.record.id.clone()) {
                    let err = RecordError::DuplicateIdentifier {
                        index,
                        id: normalized.record.id,
                    };
                    warn!("Skipping record: {}", err);
                    batch.rejected.push(err);
                    continue;
                }

                for warning in &normalized.warnings {
                    debug!("{}", warning);
                }
                batch.warnings.extend(normalized.warnings);
                batch.records.push(normalized.record);
            }
            Err(err) => {
                warn!("Skipping record: {}", err);
                batch.rejected.push(err);
            }
        }
    }

    debug!(
        "Normalized {} records ({} rejected, {} warnings)",
        batch.records.len(),
        batch.rejected.len(),
        batch.warnings.len()
    );

    batch
}

/// Round to 2 decimal places, half away from zero.
///
/// Values too large to scale by 100 are returned unrounded; they have no
/// fractional part at that magnitude anyway.
pub fn round_to_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[String]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(key))
        .find(|value| !value.is_null())
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolve an hour field: absent means 0, malformed means 0 plus a warning,
/// negative is clamped to 0.
fn hours_field(
    object: &Map<String, Value>,
    keys: &[String],
    id: &str,
    warnings: &mut Vec<FieldWarning>,
) -> f64 {
    let Some(value) = lookup(object, keys) else {
        return 0.0;
    };

    match number_of(value) {
        // Comparison rather than `max` so `-0.0` also becomes `0.0`.
        Some(hours) if hours > 0.0 => hours,
        Some(_) => 0.0,
        None => {
            let field = keys
                .iter()
                .find(|key| object.get(*key).is_some_and(|v| !v.is_null()))
                .cloned()
                .unwrap_or_default();
            warnings.push(FieldWarning::MalformedNumeric {
                id: id.to_string(),
                field,
                raw: value.to_string(),
            });
            0.0
        }
    }
}

fn number_of(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
fn date_of(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}
