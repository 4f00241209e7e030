// 📐 Shape Layer - Dataset Schemas
// Declares what each registry export should look like and checks parsed
// records against it.
//
// The check is ADVISORY: a mismatch is reported (and logged by the store)
// but never blocks downstream filtering or aggregation.

use crate::datasets::DatasetKind;
use crate::parser::{Record, COMMA, SEMICOLON};
use serde::Serialize;
use std::fmt;

// ============================================================================
// FIELD LISTS (bit-exact header names)
// ============================================================================

pub const WITHDRAWAL_FIELDS: &[&str] = &[
    "Fecha Retiro",
    "Iniciativa",
    "Cod. Serial",
    "Vintage Inicial",
    "Vintage Final",
    "Año absorción",
    "Cod. Seriales Entregados",
    "Destinación",
    "Usuario Final",
    "Nit Usuario Final",
    "Sujeto Pasivo",
    "Nit Sujeto Pasivo",
    "TCO2e Entregadas",
];

pub const WITHDRAWAL_REQUIRED: &[&str] = &[
    "Fecha Retiro",
    "Iniciativa",
    "TCO2e Entregadas",
    "Destinación",
    "Usuario Final",
];

pub const CERTIFICATE_FIELDS: &[&str] = &[
    "Fecha de retiro",
    "Proyecto",
    "Año",
    "Cod. Vintage",
    "Cod. COLCERs retirados",
    "Propósito del retiro",
    "Usuario final",
    "Sujeto pasivo",
    "COLCERs retirados",
];

pub const CERTIFICATE_REQUIRED: &[&str] = &[
    "Fecha de retiro",
    "Proyecto",
    "Usuario final",
    "COLCERs retirados",
];

pub const INITIATIVE_FIELDS: &[&str] = &[
    "cod_iniciativa",
    "estado",
    "fecha_registro",
    "nombre_iniciativa",
    "pais",
    "titular",
    "desarrollador",
];

pub const INITIATIVE_REQUIRED: &[&str] = &[
    "cod_iniciativa",
    "estado",
    "nombre_iniciativa",
    "titular",
    "desarrollador",
];

// ============================================================================
// DATASET SCHEMA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSchema {
    pub kind: DatasetKind,
    /// Default resource path, relative to the public root
    pub default_path: &'static str,
    pub delimiter: u8,
    /// Every column the export is expected to carry, in declared order
    pub fields: &'static [&'static str],
    /// Columns the validator insists on
    pub required_fields: &'static [&'static str],
}

pub static WITHDRAWALS_SCHEMA: DatasetSchema = DatasetSchema {
    kind: DatasetKind::Withdrawals,
    default_path: "/data/retiros.csv",
    delimiter: COMMA,
    fields: WITHDRAWAL_FIELDS,
    required_fields: WITHDRAWAL_REQUIRED,
};

pub static CERTIFICATES_SCHEMA: DatasetSchema = DatasetSchema {
    kind: DatasetKind::Certificates,
    default_path: "/data/platform_emission_certificates.csv",
    delimiter: SEMICOLON,
    fields: CERTIFICATE_FIELDS,
    required_fields: CERTIFICATE_REQUIRED,
};

pub static INITIATIVES_SCHEMA: DatasetSchema = DatasetSchema {
    kind: DatasetKind::Initiatives,
    default_path: "/data/iniciativas_colcx.csv",
    delimiter: COMMA,
    fields: INITIATIVE_FIELDS,
    required_fields: INITIATIVE_REQUIRED,
};

impl DatasetSchema {
    pub fn delimiter_char(&self) -> char {
        self.delimiter as char
    }

    /// Required fields absent from `record`
    pub fn missing_fields(&self, record: &Record) -> Vec<String> {
        self.required_fields
            .iter()
            .filter(|field| !record.contains_key(field))
            .map(|field| field.to_string())
            .collect()
    }

    /// Check the first record for every required field
    pub fn check(&self, records: &[Record]) -> SchemaCheck {
        let first = match records.first() {
            Some(r) => r,
            None => return SchemaCheck::Empty,
        };

        let missing = self.missing_fields(first);
        if missing.is_empty() {
            SchemaCheck::Ok
        } else {
            SchemaCheck::Mismatch { missing }
        }
    }

    /// true iff records is non-empty and the first record has every required field
    pub fn validate(&self, records: &[Record]) -> bool {
        self.check(records).is_ok()
    }
}

// ============================================================================
// CHECK RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemaCheck {
    Ok,
    /// Nothing to check (no data rows)
    Empty,
    Mismatch { missing: Vec<String> },
}

impl SchemaCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, SchemaCheck::Ok)
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, SchemaCheck::Mismatch { .. })
    }
}

impl fmt::Display for SchemaCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaCheck::Ok => write!(f, "ok"),
            SchemaCheck::Empty => write!(f, "empty dataset"),
            SchemaCheck::Mismatch { missing } => {
                write!(f, "schema mismatch, missing: {}", missing.join(", "))
            }
        }
    }
}
