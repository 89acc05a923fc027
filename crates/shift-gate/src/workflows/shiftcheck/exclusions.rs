use super::dates::{iso_prefix, ymd_token, Ymd};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashSet, VecDeque};

/// One normalized exclusion-calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExclusionEntry {
    Single { date: Ymd },
    Range { from: Ymd, to: Ymd },
}

impl ExclusionEntry {
    fn covers(&self, date: &Ymd) -> bool {
        match self {
            ExclusionEntry::Single { date: excluded } => excluded == date,
            // Inclusive on both ends; an inverted range simply never matches.
            ExclusionEntry::Range { from, to } => from <= date && date <= to,
        }
    }
}

/// Deduplicated exclusion entries in first-appearance order. Built fresh per
/// request from the raw upstream payload; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionSet {
    entries: Vec<ExclusionEntry>,
}

impl ExclusionSet {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ExclusionEntry] {
        &self.entries
    }

    pub fn excludes(&self, date: &Ymd) -> bool {
        self.entries.iter().any(|entry| entry.covers(date))
    }
}

/// A date is working iff no exclusion entry covers it; an empty set means
/// every date is working. Pure, no side effects.
pub fn is_working_day(exclusions: &ExclusionSet, date: &Ymd) -> bool {
    !exclusions.excludes(date)
}

/// Flattens an arbitrarily-shaped exclusion payload into a canonical set of
/// single dates and date ranges. Total: malformed fragments contribute no
/// entries and nothing here errors, because partial or garbage calendar data
/// is expected from the upstream system and must not block the decision.
///
/// Runs as a worklist over the JSON tree so deeply wrapped payloads cannot
/// overflow the stack.
pub fn normalize_exclusions(raw: Value) -> ExclusionSet {
    let mut queue = VecDeque::from([raw]);
    let mut entries = Vec::new();

    while let Some(value) = queue.pop_front() {
        match value {
            Value::Array(items) => queue.extend(items),
            Value::String(text) => normalize_text(&text, &mut queue, &mut entries),
            Value::Object(map) => normalize_object(map, &mut queue, &mut entries),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    let mut seen = HashSet::new();
    entries.retain(|entry| seen.insert(entry.clone()));
    ExclusionSet { entries }
}

fn normalize_text(raw: &str, queue: &mut VecDeque<Value>, entries: &mut Vec<ExclusionEntry>) {
    let text = raw.trim();
    if text.is_empty() {
        return;
    }
    // JSON smuggled inside a string field; re-enqueue whatever it parses to.
    if text.starts_with('[') || text.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<Value>(text) {
            queue.push_back(parsed);
        }
        return;
    }
    if let Some((from, to)) = range_text(text) {
        entries.push(ExclusionEntry::Range { from, to });
        return;
    }
    if let Some(date) = ymd_token(text) {
        entries.push(ExclusionEntry::Single { date });
    }
}

fn range_text(text: &str) -> Option<(Ymd, Ymd)> {
    let from = iso_prefix(text)?;
    let rest = text[10..].trim_start();
    let rest = rest
        .strip_prefix("to")
        .or_else(|| rest.strip_prefix('-'))
        .or_else(|| rest.strip_prefix('\u{2014}'))?;
    let to = iso_prefix(rest.trim_start())?;
    Some((from, to))
}

fn normalize_object(
    mut map: Map<String, Value>,
    queue: &mut VecDeque<Value>,
    entries: &mut Vec<ExclusionEntry>,
) {
    if let Some(Value::String(raw)) = map.get("DATE") {
        if let Some(date) = ymd_token(raw) {
            entries.push(ExclusionEntry::Single { date });
        }
        return;
    }

    if let (Some(Value::String(from)), Some(Value::String(to))) =
        (map.get("DATE_FROM"), map.get("DATE_TO"))
    {
        // Either endpoint failing to parse drops the whole range.
        if let (Some(from), Some(to)) = (ymd_token(from), ymd_token(to)) {
            entries.push(ExclusionEntry::Range { from, to });
        }
        return;
    }

    if matches!(map.get("EXCLUSIONS"), Some(Value::Array(_))) {
        if let Some(exclusions) = map.remove("EXCLUSIONS") {
            queue.push_back(exclusions);
        }
        return;
    }

    if let Some(leaves) = calendar_leaves(&map) {
        entries.extend(leaves);
        return;
    }

    // Unknown wrapper shape: look inside every field.
    queue.extend(map.into_iter().map(|(_, value)| value));
}

/// Nested calendar map `{year: {month: {day: anything}}}` with stringified
/// numeric keys at all three levels. Every leaf counts as one excluded day
/// regardless of its value; detection is all-or-nothing, so any non-numeric
/// key or non-map level falls through to the generic wrapper handling.
fn calendar_leaves(map: &Map<String, Value>) -> Option<Vec<ExclusionEntry>> {
    let mut leaves = Vec::new();
    for (year_key, months) in map {
        let year: i32 = year_key.trim().parse().ok()?;
        let months = months.as_object()?;
        for (month_key, days) in months {
            let month: u32 = month_key.trim().parse().ok()?;
            let days = days.as_object()?;
            for day_key in days.keys() {
                let day: u32 = day_key.trim().parse().ok()?;
                leaves.push(ExclusionEntry::Single {
                    date: Ymd::from_parts(year, month, day),
                });
            }
        }
    }
    if leaves.is_empty() {
        None
    } else {
        Some(leaves)
    }
}
