// src/services/interpreter.rs

//! Availability interpreter.
//!
//! Turns a raw availability document into a single [`AvailabilityResult`].
//! Each permit category maps to a dialect parser; unknown categories are
//! always unavailable. Corrupt entries are skipped, never fatal.

use serde_json::Value;

use crate::models::{AvailabilityPayload, AvailabilityResult, PermitCategory, UNKNOWN_DATE};

/// Parser for one upstream response dialect.
type Dialect = fn(&AvailabilityPayload) -> AvailabilityResult;

/// Interpret `payload` according to the permit's category.
pub fn interpret(category: PermitCategory, payload: &AvailabilityPayload) -> AvailabilityResult {
    match dialect(category) {
        Some(parse) => parse(payload),
        None => AvailabilityResult::unavailable(),
    }
}

fn dialect(category: PermitCategory) -> Option<Dialect> {
    match category {
        PermitCategory::Enchantments => Some(first_open_entry),
        PermitCategory::MountWhitney => Some(first_open_entry),
        PermitCategory::Unknown => None,
    }
}

/// `{"availability": [{"date": ..., "remaining": n}, ...]}`: report the first
/// entry in payload order with `remaining > 0`.
fn first_open_entry(payload: &AvailabilityPayload) -> AvailabilityResult {
    let Some(entries) = payload.get("availability").and_then(Value::as_array) else {
        return AvailabilityResult::unavailable();
    };

    for entry in entries {
        let remaining = entry.get("remaining").map_or(0, remaining_count);
        if remaining == 0 {
            continue;
        }
        let date = entry
            .get("date")
            .and_then(date_text)
            .unwrap_or(UNKNOWN_DATE);
        return AvailabilityResult::open(date, remaining);
    }

    AvailabilityResult::unavailable()
}

/// Lenient count: integers, floats and numeric strings are accepted;
/// negatives and anything else count as zero.
fn remaining_count(value: &Value) -> u32 {
    let count = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| v.min(i64::MAX as u64) as i64))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    count.map_or(0, |c| c.clamp(0, u32::MAX as i64) as u32)
}

fn date_text(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}
