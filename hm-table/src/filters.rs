//! Filter form values → wire parameters

use crate::descriptor::{FilterDescriptor, FilterKind};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

pub const START_TIME: &str = "startTime";
pub const END_TIME: &str = "endTime";

/// Form value of a date-range filter
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Value {
    Value::Array(vec![
        Value::String(start.format("%Y-%m-%d").to_string()),
        Value::String(end.format("%Y-%m-%d").to_string()),
    ])
}

/// Day of a date-ish form value: `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or RFC 3339
fn day_of(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(at.date());
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|at| at.date_naive())
}

fn bound(value: Option<&Value>, time: &str) -> Value {
    match value.and_then(day_of) {
        Some(day) => Value::String(format!("{} {time}", day.format("%Y-%m-%d"))),
        None => Value::String(String::new()),
    }
}

/// Apply each filter's transform to the raw form values.
///
/// `normalize` wins; date ranges expand to `startTime` / `endTime` at day
/// granularity (empty strings for a missing end); everything else passes
/// through. Null results are dropped.
pub fn transform_filters(filters: &[FilterDescriptor], values: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for f in filters {
        let raw = values.get(&f.name).cloned().unwrap_or(Value::Null);
        if let Some(normalize) = &f.normalize {
            out.insert(f.name.clone(), normalize(&raw));
            continue;
        }
        if f.kind == FilterKind::DateRange {
            let range = raw.as_array();
            let start = range.and_then(|r| r.first());
            let end = range.and_then(|r| r.get(1));
            out.insert(START_TIME.into(), bound(start, "00:00:00"));
            out.insert(END_TIME.into(), bound(end, "23:59:59"));
            continue;
        }
        out.insert(f.name.clone(), raw);
    }
    out.retain(|_, v| !v.is_null());
    out
}
