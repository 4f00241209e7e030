// 🌳 Withdrawals (retiros)
// Registry withdrawals of carbon credits, both tax-driven and voluntary.
//
// Destination policy: exactly "Compensacion voluntaria" is VOLUNTARY,
// every other destination value (including new ones) counts as TAX.

use super::DatasetAdapter;
use crate::aggregation::{distinct_count, sum};
use crate::filters::Filterable;
use crate::parser::Record;
use crate::schema::{DatasetSchema, WITHDRAWALS_SCHEMA, WITHDRAWAL_FIELDS};
use crate::temporal::parse_date;
use chrono::NaiveDate;
use serde::Serialize;

/// Destination value that marks a voluntary compensation
pub const VOLUNTARY_DESTINATION: &str = "Compensacion voluntaria";

// ============================================================================
// FIELDS
// ============================================================================

/// Columns of the withdrawals export, in declared order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WithdrawalField {
    WithdrawalDate,
    Initiative,
    SerialCode,
    VintageStart,
    VintageEnd,
    AbsorptionYear,
    DeliveredSerials,
    Destination,
    FinalUser,
    FinalUserNit,
    Taxpayer,
    TaxpayerNit,
    Tco2e,
}

impl WithdrawalField {
    pub const ALL: [WithdrawalField; 13] = [
        WithdrawalField::WithdrawalDate,
        WithdrawalField::Initiative,
        WithdrawalField::SerialCode,
        WithdrawalField::VintageStart,
        WithdrawalField::VintageEnd,
        WithdrawalField::AbsorptionYear,
        WithdrawalField::DeliveredSerials,
        WithdrawalField::Destination,
        WithdrawalField::FinalUser,
        WithdrawalField::FinalUserNit,
        WithdrawalField::Taxpayer,
        WithdrawalField::TaxpayerNit,
        WithdrawalField::Tco2e,
    ];

    /// Header name in the export
    pub fn header(self) -> &'static str {
        WITHDRAWAL_FIELDS[self as usize]
    }
}

// ============================================================================
// DESTINATION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    Voluntary,
    Tax,
}

impl DestinationType {
    /// Classify a raw destination value
    pub fn classify(destination: &str) -> Self {
        if destination == VOLUNTARY_DESTINATION {
            DestinationType::Voluntary
        } else {
            DestinationType::Tax
        }
    }

    /// Parse a selector value ("voluntary"/"voluntario", "tax"/"impuesto")
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "voluntary" | "voluntario" => Some(DestinationType::Voluntary),
            "tax" | "impuesto" => Some(DestinationType::Tax),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationType::Voluntary => "voluntary",
            DestinationType::Tax => "tax",
        }
    }
}

// ============================================================================
// ROW
// ============================================================================

/// One withdrawal row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Withdrawal {
    #[serde(rename = "Fecha Retiro")]
    pub withdrawal_date: String,

    /// Parsed `withdrawal_date` (None when unparsable)
    #[serde(skip)]
    pub date: Option<NaiveDate>,

    #[serde(rename = "Iniciativa")]
    pub initiative: String,

    #[serde(rename = "Cod. Serial")]
    pub serial_code: String,

    #[serde(rename = "Vintage Inicial")]
    pub vintage_start: String,

    #[serde(rename = "Vintage Final")]
    pub vintage_end: String,

    #[serde(rename = "Año absorción")]
    pub absorption_year: String,

    #[serde(rename = "Cod. Seriales Entregados")]
    pub delivered_serials: String,

    #[serde(rename = "Destinación")]
    pub destination: String,

    #[serde(rename = "Usuario Final")]
    pub final_user: String,

    #[serde(rename = "Nit Usuario Final")]
    pub final_user_nit: String,

    #[serde(rename = "Sujeto Pasivo")]
    pub taxpayer: String,

    #[serde(rename = "Nit Sujeto Pasivo")]
    pub taxpayer_nit: String,

    /// Delivered tonnes of CO2e; None when the cell was not numeric
    #[serde(rename = "TCO2e Entregadas")]
    pub tco2e: Option<f64>,
}

impl Withdrawal {
    pub fn from_record(record: &Record) -> Self {
        let text = |field: WithdrawalField| record.text(field.header());
        let withdrawal_date = text(WithdrawalField::WithdrawalDate);

        Withdrawal {
            date: parse_date(&withdrawal_date),
            withdrawal_date,
            initiative: text(WithdrawalField::Initiative),
            serial_code: text(WithdrawalField::SerialCode),
            vintage_start: text(WithdrawalField::VintageStart),
            vintage_end: text(WithdrawalField::VintageEnd),
            absorption_year: text(WithdrawalField::AbsorptionYear),
            delivered_serials: text(WithdrawalField::DeliveredSerials),
            destination: text(WithdrawalField::Destination),
            final_user: text(WithdrawalField::FinalUser),
            final_user_nit: text(WithdrawalField::FinalUserNit),
            taxpayer: text(WithdrawalField::Taxpayer),
            taxpayer_nit: text(WithdrawalField::TaxpayerNit),
            tco2e: record.number(WithdrawalField::Tco2e.header()),
        }
    }

    pub fn destination_type(&self) -> DestinationType {
        DestinationType::classify(&self.destination)
    }

    pub fn tco2e_or_zero(&self) -> f64 {
        self.tco2e.unwrap_or(0.0)
    }
}

impl Filterable for Withdrawal {
    fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    fn category(&self) -> &str {
        &self.destination
    }

    /// "voluntary"/"tax" select the binary partition; any other value is
    /// matched exactly against the destination
    fn matches_category(&self, selected: &str) -> bool {
        match DestinationType::parse(selected) {
            Some(wanted) => self.destination_type() == wanted,
            None => self.destination == selected,
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalMetrics {
    pub total_tco2e: f64,
    pub total_transactions: usize,
    pub unique_clients: usize,
    pub unique_initiatives: usize,
}

impl WithdrawalMetrics {
    pub fn calculate(rows: &[Withdrawal]) -> Self {
        WithdrawalMetrics {
            total_tco2e: sum(rows, |w| w.tco2e),
            total_transactions: rows.len(),
            unique_clients: distinct_count(rows, |w| w.final_user.as_str()),
            unique_initiatives: distinct_count(rows, |w| w.initiative.as_str()),
        }
    }
}

// ============================================================================
// ADAPTER
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct WithdrawalAdapter;

impl WithdrawalAdapter {
    pub fn new() -> Self {
        WithdrawalAdapter
    }
}

impl DatasetAdapter for WithdrawalAdapter {
    type Row = Withdrawal;

    fn schema(&self) -> &'static DatasetSchema {
        &WITHDRAWALS_SCHEMA
    }

    fn map_record(&self, record: &Record) -> Withdrawal {
        Withdrawal::from_record(record)
    }
}
