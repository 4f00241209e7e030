// 📊 Aggregation Engine
// Scalar roll-ups, categorical distributions and monthly timelines.
//
// All functions are total: missing numbers count as 0, unparsable dates are
// skipped, empty input gives 0 / an empty vector.

use crate::temporal::YearMonth;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Default number of groups kept by a distribution
pub const DEFAULT_CHART_LIMIT: usize = 5;

/// Marker appended to truncated labels
pub const ELLIPSIS: &str = "...";

// ============================================================================
// SCALAR METRICS
// ============================================================================

/// Sum of a numeric field; None contributes 0
pub fn sum<T, F>(rows: &[T], value: F) -> f64
where
    F: Fn(&T) -> Option<f64>,
{
    rows.iter().map(|row| value(row).unwrap_or(0.0)).sum()
}

/// Rows satisfying `predicate`
pub fn count_where<T, F>(rows: &[T], predicate: F) -> usize
where
    F: Fn(&T) -> bool,
{
    rows.iter().filter(|row| predicate(*row)).count()
}

/// Number of distinct values of an identity field
pub fn distinct_count<T, F>(rows: &[T], key: F) -> usize
where
    F: Fn(&T) -> &str,
{
    rows.iter().map(|row| key(row)).collect::<HashSet<&str>>().len()
}

// ============================================================================
// DISTRIBUTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionEntry {
    pub name: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionOptions {
    /// Labels longer than this (in characters) are cut and get "..."
    pub max_label_len: Option<usize>,
    /// Keep only the first N groups after sorting
    pub limit: Option<usize>,
}

impl Default for DistributionOptions {
    fn default() -> Self {
        DistributionOptions {
            max_label_len: None,
            limit: Some(DEFAULT_CHART_LIMIT),
        }
    }
}

impl DistributionOptions {
    pub fn truncate_labels(mut self, max: usize) -> Self {
        self.max_label_len = Some(max);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn unlimited(mut self) -> Self {
        self.limit = None;
        self
    }
}

/// Cut `label` to `max` characters plus "..." when it is longer
pub fn truncate_label(label: &str, max: usize) -> String {
    if label.chars().count() > max {
        let mut short: String = label.chars().take(max).collect();
        short.push_str(ELLIPSIS);
        short
    } else {
        label.to_string()
    }
}

/// Group by (possibly truncated) label, sum `value` per group, sort
/// descending and keep the top N.
///
/// Truncation happens before grouping. Equal values keep the order in
/// which their groups were first seen.
pub fn distribution<T, L, V>(
    rows: &[T],
    label: L,
    value: V,
    options: DistributionOptions,
) -> Vec<DistributionEntry>
where
    L: Fn(&T) -> &str,
    V: Fn(&T) -> f64,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, f64)> = Vec::new();

    for row in rows {
        let name = match options.max_label_len {
            Some(max) => truncate_label(label(row), max),
            None => label(row).to_string(),
        };

        match index.get(&name) {
            Some(&idx) => groups[idx].1 += value(row),
            None => {
                index.insert(name.clone(), groups.len());
                groups.push((name, value(row)));
            }
        }
    }

    // sort_by is stable → first-seen order breaks ties
    groups.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    if let Some(limit) = options.limit {
        groups.truncate(limit);
    }

    groups
        .into_iter()
        .map(|(name, value)| DistributionEntry {
            name,
            value,
            color: None,
        })
        .collect()
}

/// Same as `distribution` with every row counting 1
pub fn count_distribution<T, L>(rows: &[T], label: L, options: DistributionOptions) -> Vec<DistributionEntry>
where
    L: Fn(&T) -> &str,
{
    distribution(rows, label, |_| 1.0, options)
}

/// Attach a fixed color per label, `fallback` for unknown labels
pub fn with_colors<P>(entries: Vec<DistributionEntry>, palette: P, fallback: &str) -> Vec<DistributionEntry>
where
    P: Fn(&str) -> Option<&'static str>,
{
    entries
        .into_iter()
        .map(|mut entry| {
            entry.color = Some(palette(&entry.name).unwrap_or(fallback).to_string());
            entry
        })
        .collect()
}

// ============================================================================
// TIMELINES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    /// "YYYY-MM"
    pub month: String,
    pub value: f64,
}

/// Monthly buckets of `value`, ascending by "YYYY-MM".
/// Rows without a parsable date are skipped, not bucketed.
pub fn timeline<T, D, V>(rows: &[T], date: D, value: V) -> Vec<TimelineEntry>
where
    D: Fn(&T) -> Option<NaiveDate>,
    V: Fn(&T) -> f64,
{
    let mut buckets: BTreeMap<YearMonth, f64> = BTreeMap::new();

    for row in rows {
        if let Some(d) = date(row) {
            *buckets.entry(YearMonth::from_date(d)).or_insert(0.0) += value(row);
        }
    }

    buckets
        .into_iter()
        .map(|(month, value)| TimelineEntry {
            month: month.key(),
            value,
        })
        .collect()
}

/// Monthly row counts
pub fn count_timeline<T, D>(rows: &[T], date: D) -> Vec<TimelineEntry>
where
    D: Fn(&T) -> Option<NaiveDate>,
{
    timeline(rows, date, |_| 1.0)
}
