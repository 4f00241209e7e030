// Dataset Adapters
// One adapter per registry export: fixed schema + delimiter + typed row.
//
// Each adapter:
// - parses raw text with the generic parser
// - runs the advisory schema check
// - maps generic records into its typed row right away

pub mod certificate;
pub mod initiative;
pub mod withdrawal;

pub use certificate::{Certificate, CertificateAdapter, CertificateField, CertificateMetrics};
pub use initiative::{Initiative, InitiativeAdapter, InitiativeField, InitiativeMetrics};
pub use withdrawal::{DestinationType, Withdrawal, WithdrawalAdapter, WithdrawalField, WithdrawalMetrics};

use crate::parser::{self, Record};
use crate::schema::{
    DatasetSchema, SchemaCheck, CERTIFICATES_SCHEMA, INITIATIVES_SCHEMA, WITHDRAWALS_SCHEMA,
};
use serde::Serialize;
use std::fmt;

// ============================================================================
// DATASET KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Tax and voluntary withdrawals (retiros)
    Withdrawals,
    /// Emission certificates withdrawn voluntarily
    Certificates,
    /// Registered initiatives / projects
    Initiatives,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Withdrawals,
        DatasetKind::Certificates,
        DatasetKind::Initiatives,
    ];

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Withdrawals => "Retiros",
            DatasetKind::Certificates => "Certificados de emisión",
            DatasetKind::Initiatives => "Iniciativas",
        }
    }

    /// Slug used in URLs and on the command line
    pub fn code(&self) -> &'static str {
        match self {
            DatasetKind::Withdrawals => "withdrawals",
            DatasetKind::Certificates => "certificates",
            DatasetKind::Initiatives => "initiatives",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "withdrawals" | "retiros" => Some(DatasetKind::Withdrawals),
            "certificates" | "certificados" => Some(DatasetKind::Certificates),
            "initiatives" | "iniciativas" => Some(DatasetKind::Initiatives),
            _ => None,
        }
    }

    pub fn schema(&self) -> &'static DatasetSchema {
        match self {
            DatasetKind::Withdrawals => &WITHDRAWALS_SCHEMA,
            DatasetKind::Certificates => &CERTIFICATES_SCHEMA,
            DatasetKind::Initiatives => &INITIATIVES_SCHEMA,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// ADAPTER TRAIT
// ============================================================================

/// Output of an adapter parse: typed rows plus the advisory check
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDataset<T> {
    pub rows: Vec<T>,
    pub check: SchemaCheck,
}

/// DatasetAdapter - binds the generic parser to one export
pub trait DatasetAdapter: Send + Sync {
    type Row: Clone + Send + Sync + 'static;

    fn schema(&self) -> &'static DatasetSchema;

    /// Map one generic record into the typed row. Missing headers give
    /// empty values rather than failures.
    fn map_record(&self, record: &Record) -> Self::Row;

    fn kind(&self) -> DatasetKind {
        self.schema().kind
    }

    /// true iff records is non-empty and the first record has every required field
    fn validate(&self, records: &[Record]) -> bool {
        self.schema().validate(records)
    }

    fn parse(&self, text: &str) -> ParsedDataset<Self::Row> {
        let schema = self.schema();
        let records = parser::parse(text, schema.delimiter);
        let check = schema.check(&records);
        let rows = records.iter().map(|r| self.map_record(r)).collect();

        ParsedDataset { rows, check }
    }
}
