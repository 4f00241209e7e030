// 🔎 Filter Engine
// Narrows row sequences by category / year / month / country and lists the
// values each filter can take.
//
// Every function here is pure: input slices are never touched, results are
// new vectors.

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Sentinel meaning "no constraint on this dimension"
pub const ALL: &str = "all";

/// Legacy spelling of the sentinel used by older dashboard links
pub const ALL_LEGACY: &str = "todos";

// ============================================================================
// SELECTOR
// ============================================================================

/// One filter dimension: either unconstrained or pinned to a value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    #[default]
    All,
    Only(String),
}

impl Selector {
    /// "all", "todos" and blank input mean All; anything else pins the value
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case(ALL)
            || trimmed.eq_ignore_ascii_case(ALL_LEGACY)
        {
            Selector::All
        } else {
            Selector::Only(trimmed.to_string())
        }
    }

    pub fn only(value: impl Into<String>) -> Self {
        Selector::Only(value.into())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selector::All)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Selector::All => None,
            Selector::Only(v) => Some(v),
        }
    }
}

impl From<Option<&str>> for Selector {
    fn from(raw: Option<&str>) -> Self {
        raw.map(Selector::parse).unwrap_or_default()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value().unwrap_or(ALL))
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// FILTERABLE ROWS
// ============================================================================

/// What the filter engine needs to know about a dataset row
pub trait Filterable {
    /// Parsed date of the row's designated date field
    fn date(&self) -> Option<NaiveDate>;

    /// Value of the row's designated category field
    fn category(&self) -> &str;

    /// Category predicate. Exact match unless a dataset overrides it.
    fn matches_category(&self, selected: &str) -> bool {
        self.category() == selected
    }

    /// Country, for datasets that carry one
    fn country(&self) -> Option<&str> {
        None
    }
}

// ============================================================================
// CRITERIA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterCriteria {
    pub category: Selector,
    pub year: Selector,
    pub month: Selector,
    pub country: Selector,
}

impl FilterCriteria {
    /// No constraint on any dimension
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: Selector) -> Self {
        self.category = category;
        self
    }

    pub fn with_year(mut self, year: Selector) -> Self {
        self.year = year;
        self
    }

    pub fn with_month(mut self, month: Selector) -> Self {
        self.month = month;
        self
    }

    pub fn with_country(mut self, country: Selector) -> Self {
        self.country = country;
        self
    }

    /// Conjunction of all active criteria, checked in the order
    /// category → year → month → country
    pub fn matches<T: Filterable>(&self, row: &T) -> bool {
        if let Some(category) = self.category.value() {
            if !row.matches_category(category) {
                return false;
            }
        }

        if let Some(year) = self.year.value() {
            if !matches_year(row.date(), year) {
                return false;
            }
        }

        if let Some(month) = self.month.value() {
            if !matches_month(row.date(), month) {
                return false;
            }
        }

        if let Some(country) = self.country.value() {
            // Datasets without a country ignore this dimension
            if let Some(row_country) = row.country() {
                if row_country != country {
                    return false;
                }
            }
        }

        true
    }
}

fn matches_year(date: Option<NaiveDate>, year: &str) -> bool {
    match date {
        Some(d) => d.year().to_string() == year.trim(),
        None => false,
    }
}

fn matches_month(date: Option<NaiveDate>, month: &str) -> bool {
    match (date, month.trim().parse::<u32>()) {
        (Some(d), Ok(m)) => d.month() == m,
        _ => false,
    }
}

/// Apply `criteria` to `rows`, keeping source order
pub fn filter<T: Filterable + Clone>(rows: &[T], criteria: &FilterCriteria) -> Vec<T> {
    rows.iter()
        .filter(|row| criteria.matches(*row))
        .cloned()
        .collect()
}

// ============================================================================
// AVAILABLE VALUES
// ============================================================================

/// Distinct non-empty values of a field, ascending
pub fn available_values<T, F>(rows: &[T], field: F) -> Vec<String>
where
    F: Fn(&T) -> &str,
{
    rows.iter()
        .map(|row| field(row))
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct years among rows with a parsable date, ascending
pub fn available_years<T: Filterable>(rows: &[T]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.date())
        .map(|d| d.year())
        .collect::<BTreeSet<i32>>()
        .into_iter()
        .map(|y| y.to_string())
        .collect()
}

/// Distinct months (1-12) among rows with a parsable date, restricted to
/// `year` when one is selected; ascending numeric order
pub fn available_months<T: Filterable>(rows: &[T], year: &Selector) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.date())
        .filter(|d| match year.value() {
            Some(y) => matches_year(Some(*d), y),
            None => true,
        })
        .map(|d| d.month())
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .map(|m| m.to_string())
        .collect()
}
