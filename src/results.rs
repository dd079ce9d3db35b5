//! Batch result aggregation.
//!
//! [`aggregate`] partitions classified outcomes into success and failure entries, optionally
//! flattening a nested list, removing null fields and sorting. It reads its input and never
//! mutates it, so aggregating the same outcomes twice gives equal [`Results`].

use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt::Write as _;
use tracing::{error, warn};

use crate::classify::{classify, ClassifiedOutcome};
use crate::response::RawOutcome;

/// Key stamped on every entry with the originating correlation id.
pub const REQUEST_ID_KEY: &str = "request_id";

pub type Entry = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `desc` in any case is descending; anything else is ascending.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOptions {
    pub data_key: Option<String>,
    pub cleanup: bool,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_sort_field(mut self, field: impl Into<String>) -> Self {
        self.sort_field = Some(field.into());
        self
    }

    pub fn with_sort_order(mut self, order: &str) -> Self {
        self.sort_order = Some(SortOrder::parse(order));
        self
    }
}

/// Per-call accounting. `succeeded + failed == calls` holds regardless of flattening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub calls: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Results {
    pub success: Vec<Entry>,
    pub failure: Vec<Entry>,
    /// Classified outcomes the entries came from; dropped by `cleanup`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<Vec<ClassifiedOutcome>>,
    pub summary: BatchSummary,
}

impl Results {
    /// Plain-text listing of both partitions, optionally only the first `top` of each.
    pub fn render(&self, top: Option<usize>) -> String {
        let mut out = String::new();
        let header = top.map(|n| format!("Top {} ", n)).unwrap_or_default();
        for (label, entries) in [("Success", &self.success), ("Failure", &self.failure)] {
            let plural = if entries.len() > 1 { "s" } else { "" };
            let _ = writeln!(out, "{}{} Result{}: {}", header, label, plural, entries.len());
            for entry in entries.iter().take(top.unwrap_or(usize::MAX)) {
                let _ = writeln!(out, "{}", Value::Object(entry.clone()));
            }
            out.push('\n');
        }
        out
    }
}

/// Classify raw outcomes, then [`aggregate`]. Every failure is logged with its debug dump.
pub fn process(outcomes: &[RawOutcome], options: &ProcessOptions) -> Results {
    let classified: Vec<ClassifiedOutcome> = outcomes
        .iter()
        .map(|raw| {
            let outcome = classify(raw);
            if !outcome.is_success() {
                error!(
                    request_id = %raw.correlation_id,
                    status = ?outcome.status,
                    attempts = raw.attempts,
                    "Call failed\n{}",
                    raw.debug_dump()
                );
            }
            outcome
        })
        .collect();
    aggregate(&classified, options)
}

pub fn aggregate(outcomes: &[ClassifiedOutcome], options: &ProcessOptions) -> Results {
    let mut success = Vec::new();
    let mut failure = Vec::new();
    let mut summary = BatchSummary {
        calls: outcomes.len(),
        ..BatchSummary::default()
    };

    for outcome in outcomes {
        if outcome.is_success() {
            summary.succeeded += 1;
            let entries = expand(&outcome.payload, options.data_key.as_deref(), &outcome.correlation_id);
            success.extend(
                entries
                    .into_iter()
                    .map(|e| stamp(e, &outcome.correlation_id)),
            );
        } else {
            summary.failed += 1;
            failure.push(stamp(to_entry(&outcome.payload), &outcome.correlation_id));
        }
    }

    if options.cleanup {
        for entry in success.iter_mut() {
            clean(entry);
        }
    }

    match (&options.sort_field, options.sort_order) {
        (Some(field), order) => {
            let order = order.unwrap_or_default();
            success.sort_by(|a, b| directed(cmp_field(a, b, field), order));
        }
        (None, Some(order)) => {
            success.sort_by(|a, b| directed(cmp_entries(a, b), order));
        }
        (None, None) => {}
    }

    Results {
        success,
        failure,
        outcomes: (!options.cleanup).then(|| outcomes.to_vec()),
        summary,
    }
}

/// Success payload to entries. Only a list under `data_key` is split, one entry per element;
/// anything else is one entry holding the whole payload, with a warning when `data_key` was
/// asked for but could not be used.
fn expand(payload: &Value, data_key: Option<&str>, request_id: &str) -> Vec<Entry> {
    if let Some(key) = data_key {
        match payload.get(key) {
            Some(Value::Array(items)) => return items.iter().map(to_entry).collect(),
            Some(other) => warn!(
                request_id = %request_id,
                data_key = %key,
                found = json_type(other),
                "data_key does not hold a list, keeping the whole payload"
            ),
            None => warn!(
                request_id = %request_id,
                data_key = %key,
                "data_key missing from payload, keeping the whole payload"
            ),
        }
    }
    vec![to_entry(payload)]
}

fn to_entry(value: &Value) -> Entry {
    match value {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    }
}

fn stamp(mut entry: Entry, request_id: &str) -> Entry {
    entry.insert(REQUEST_ID_KEY.to_string(), Value::String(request_id.to_string()));
    entry
}

/// Remove null fields and rebuild the map in key order.
fn clean(entry: &mut Entry) {
    let mut fields: Vec<(String, Value)> = std::mem::take(entry)
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    entry.extend(fields);
}

fn directed(ord: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

/// Entries lacking the field sort before every entry that has it.
fn cmp_field(a: &Entry, b: &Entry, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(x), Some(y)) => cmp_json(x, y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_entries(a: &Entry, b: &Entry) -> Ordering {
    let mut ka: Vec<(&String, &Value)> = a.iter().collect();
    let mut kb: Vec<(&String, &Value)> = b.iter().collect();
    ka.sort_by(|x, y| x.0.cmp(y.0));
    kb.sort_by(|x, y| x.0.cmp(y.0));
    for ((k1, v1), (k2, v2)) in ka.iter().zip(kb.iter()) {
        let ord = k1.cmp(k2).then_with(|| cmp_json(v1, v2));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ka.len().cmp(&kb.len())
}

/// Total order over JSON values: null < bool < number < string < array < object.
pub fn cmp_json(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i.cmp(&j),
            _ => {
                let fx = x.as_f64().unwrap_or(f64::NAN);
                let fy = y.as_f64().unwrap_or(f64::NAN);
                fx.total_cmp(&fy)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (i, j) in x.iter().zip(y.iter()) {
                let ord = cmp_json(i, j);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => cmp_entries(x, y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
