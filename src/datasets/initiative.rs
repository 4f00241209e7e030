// 🏗️ Initiatives
// Projects registered in the standard, with status, holder and developer.

use super::DatasetAdapter;
use crate::aggregation::{count_where, distinct_count};
use crate::filters::Filterable;
use crate::parser::Record;
use crate::schema::{DatasetSchema, INITIATIVES_SCHEMA, INITIATIVE_FIELDS};
use crate::temporal::parse_date;
use chrono::NaiveDate;
use serde::Serialize;

// Status values as exported by the registry
pub const STATUS_CERTIFIED: &str = "Certificado";
pub const STATUS_REGISTERED: &str = "Registrado";
pub const STATUS_IN_DEVELOPMENT: &str = "En Desarrollo";
pub const STATUS_IN_TRANSFER: &str = "En Traslado";
pub const STATUS_PRE_REGISTRATION: &str = "Pre-Registro";
pub const STATUS_WITHDRAWN: &str = "Proyecto Retirado";
pub const STATUS_IN_VALIDATION: &str = "En Validación";

/// Color for statuses without a fixed one
pub const FALLBACK_STATUS_COLOR: &str = "hsl(var(--muted))";

/// Fixed chart color per status
pub fn status_color(status: &str) -> Option<&'static str> {
    match status {
        STATUS_CERTIFIED => Some("hsl(142, 76%, 36%)"),
        STATUS_REGISTERED => Some("hsl(213, 94%, 68%)"),
        STATUS_IN_DEVELOPMENT => Some("hsl(45, 93%, 58%)"),
        STATUS_IN_TRANSFER => Some("hsl(262, 83%, 58%)"),
        STATUS_PRE_REGISTRATION => Some("hsl(25, 95%, 58%)"),
        STATUS_WITHDRAWN => Some("hsl(0, 84%, 60%)"),
        STATUS_IN_VALIDATION => Some("hsl(173, 58%, 39%)"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitiativeField {
    Code,
    Status,
    RegistrationDate,
    Name,
    Country,
    Holder,
    Developer,
}

impl InitiativeField {
    pub const ALL: [InitiativeField; 7] = [
        InitiativeField::Code,
        InitiativeField::Status,
        InitiativeField::RegistrationDate,
        InitiativeField::Name,
        InitiativeField::Country,
        InitiativeField::Holder,
        InitiativeField::Developer,
    ];

    pub fn header(self) -> &'static str {
        INITIATIVE_FIELDS[self as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Initiative {
    #[serde(rename = "cod_iniciativa")]
    pub code: String,

    #[serde(rename = "estado")]
    pub status: String,

    #[serde(rename = "fecha_registro")]
    pub registration_date: String,

    #[serde(skip)]
    pub date: Option<NaiveDate>,

    #[serde(rename = "nombre_iniciativa")]
    pub name: String,

    #[serde(rename = "pais")]
    pub country: String,

    #[serde(rename = "titular")]
    pub holder: String,

    #[serde(rename = "desarrollador")]
    pub developer: String,
}

impl Initiative {
    pub fn from_record(record: &Record) -> Self {
        let text = |field: InitiativeField| record.text(field.header());
        let registration_date = text(InitiativeField::RegistrationDate);

        Initiative {
            code: text(InitiativeField::Code),
            status: text(InitiativeField::Status),
            date: parse_date(&registration_date),
            registration_date,
            name: text(InitiativeField::Name),
            country: text(InitiativeField::Country),
            holder: text(InitiativeField::Holder),
            developer: text(InitiativeField::Developer),
        }
    }

    /// Registered or still in development
    pub fn is_in_development(&self) -> bool {
        self.status == STATUS_IN_DEVELOPMENT || self.status == STATUS_REGISTERED
    }
}

impl Filterable for Initiative {
    fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    fn category(&self) -> &str {
        &self.status
    }

    fn country(&self) -> Option<&str> {
        Some(&self.country)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitiativeMetrics {
    pub total_initiatives: usize,
    pub certified: usize,
    pub in_development: usize,
    pub withdrawn: usize,
    pub unique_holders: usize,
    pub unique_developers: usize,
    pub unique_countries: usize,
}

impl InitiativeMetrics {
    pub fn calculate(rows: &[Initiative]) -> Self {
        InitiativeMetrics {
            total_initiatives: rows.len(),
            certified: count_where(rows, |i| i.status == STATUS_CERTIFIED),
            in_development: count_where(rows, Initiative::is_in_development),
            withdrawn: count_where(rows, |i| i.status == STATUS_WITHDRAWN),
            unique_holders: distinct_count(rows, |i| i.holder.as_str()),
            unique_developers: distinct_count(rows, |i| i.developer.as_str()),
            unique_countries: distinct_count(rows, |i| i.country.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InitiativeAdapter;

impl InitiativeAdapter {
    pub fn new() -> Self {
        InitiativeAdapter
    }
}

impl DatasetAdapter for InitiativeAdapter {
    type Row = Initiative;

    fn schema(&self) -> &'static DatasetSchema {
        &INITIATIVES_SCHEMA
    }

    fn map_record(&self, record: &Record) -> Initiative {
        Initiative::from_record(record)
    }
}
