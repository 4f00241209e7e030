// 📜 Emission Certificates
// Voluntary withdrawals exported by the registry platform (semicolon-delimited).

use super::DatasetAdapter;
use crate::aggregation::{distinct_count, sum};
use crate::filters::Filterable;
use crate::parser::Record;
use crate::schema::{DatasetSchema, CERTIFICATES_SCHEMA, CERTIFICATE_FIELDS};
use crate::temporal::parse_date;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertificateField {
    WithdrawalDate,
    Project,
    Year,
    VintageCode,
    WithdrawnCodes,
    Purpose,
    FinalUser,
    Taxpayer,
    Colcers,
}

impl CertificateField {
    pub const ALL: [CertificateField; 9] = [
        CertificateField::WithdrawalDate,
        CertificateField::Project,
        CertificateField::Year,
        CertificateField::VintageCode,
        CertificateField::WithdrawnCodes,
        CertificateField::Purpose,
        CertificateField::FinalUser,
        CertificateField::Taxpayer,
        CertificateField::Colcers,
    ];

    pub fn header(self) -> &'static str {
        CERTIFICATE_FIELDS[self as usize]
    }
}

/// One certificate withdrawal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Certificate {
    #[serde(rename = "Fecha de retiro")]
    pub withdrawal_date: String,

    #[serde(skip)]
    pub date: Option<NaiveDate>,

    #[serde(rename = "Proyecto")]
    pub project: String,

    #[serde(rename = "Año")]
    pub year: String,

    #[serde(rename = "Cod. Vintage")]
    pub vintage_code: String,

    #[serde(rename = "Cod. COLCERs retirados")]
    pub withdrawn_codes: String,

    #[serde(rename = "Propósito del retiro")]
    pub purpose: String,

    #[serde(rename = "Usuario final")]
    pub final_user: String,

    #[serde(rename = "Sujeto pasivo")]
    pub taxpayer: String,

    /// Withdrawn COLCERs (1 COLCER = 1 tCO2e)
    #[serde(rename = "COLCERs retirados")]
    pub colcers: Option<f64>,
}

impl Certificate {
    pub fn from_record(record: &Record) -> Self {
        let text = |field: CertificateField| record.text(field.header());
        let withdrawal_date = text(CertificateField::WithdrawalDate);

        Certificate {
            date: parse_date(&withdrawal_date),
            withdrawal_date,
            project: text(CertificateField::Project),
            year: text(CertificateField::Year),
            vintage_code: text(CertificateField::VintageCode),
            withdrawn_codes: text(CertificateField::WithdrawnCodes),
            purpose: text(CertificateField::Purpose),
            final_user: text(CertificateField::FinalUser),
            taxpayer: text(CertificateField::Taxpayer),
            colcers: record.number(CertificateField::Colcers.header()),
        }
    }

    pub fn colcers_or_zero(&self) -> f64 {
        self.colcers.unwrap_or(0.0)
    }
}

impl Filterable for Certificate {
    fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    fn category(&self) -> &str {
        &self.purpose
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificateMetrics {
    pub total_colcers: f64,
    pub total_transactions: usize,
    pub unique_clients: usize,
    pub unique_projects: usize,
}

impl CertificateMetrics {
    pub fn calculate(rows: &[Certificate]) -> Self {
        CertificateMetrics {
            total_colcers: sum(rows, |c| c.colcers),
            total_transactions: rows.len(),
            unique_clients: distinct_count(rows, |c| c.final_user.as_str()),
            unique_projects: distinct_count(rows, |c| c.project.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateAdapter;

impl CertificateAdapter {
    pub fn new() -> Self {
        CertificateAdapter
    }
}

impl DatasetAdapter for CertificateAdapter {
    type Row = Certificate;

    fn schema(&self) -> &'static DatasetSchema {
        &CERTIFICATES_SCHEMA
    }

    fn map_record(&self, record: &Record) -> Certificate {
        Certificate::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{available_months, filter, FilterCriteria, Selector};
    use crate::schema::SchemaCheck;

    fn sample() -> String {
        [
            "\u{FEFF}Fecha de retiro;Proyecto;Año;Cod. Vintage;Cod. COLCERs retirados;Propósito del retiro;Usuario final;Sujeto pasivo;COLCERs retirados",
            "2023-05-04;Manglares del Pacífico;2023;V-2019;C-1-10;Compensación huella;Banco X;Banco X;10",
            "2023-05-20;\"Reforestación; Meta\";2023;V-2020;C-11-15;Evento carbono neutro;Hotel Y;Hotel Y;5",
            "2024-01-02;Manglares del Pacífico;2024;V-2019;C-16-40;Compensación huella;Banco X;Banco X;25",
            "2024-01-09;Manglares del Pacífico;2024;V-2019;sin datos",
        ]
        .join("\r\n")
    }

    #[test]
    fn test_field_headers_match_schema() {
        assert_eq!(CertificateField::ALL.len(), CERTIFICATE_FIELDS.len());
        assert_eq!(CertificateField::Colcers.header(), "COLCERs retirados");
        assert_eq!(CertificateField::Purpose.header(), "Propósito del retiro");
    }

    #[test]
    fn test_adapter_parse_semicolon_with_bom() {
        let parsed = CertificateAdapter::new().parse(&sample());

        assert_eq!(parsed.check, SchemaCheck::Ok);
        // Short last row is dropped
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.rows[1].project, "Reforestación; Meta");
        assert_eq!(parsed.rows[1].colcers, Some(5.0));
        assert_eq!(parsed.rows[0].year, "2023");
    }

    #[test]
    fn test_filter_by_month_and_available_months() {
        let rows = CertificateAdapter::new().parse(&sample()).rows;

        let may = filter(&rows, &FilterCriteria::all().with_month(Selector::only("5")));
        assert_eq!(may.len(), 2);

        assert_eq!(available_months(&rows, &Selector::All), vec!["1", "5"]);
        assert_eq!(available_months(&rows, &Selector::only("2024")), vec!["1"]);
    }

    #[test]
    fn test_filter_by_purpose() {
        let rows = CertificateAdapter::new().parse(&sample()).rows;
        let criteria = FilterCriteria::all().with_category(Selector::only("Compensación huella"));
        assert_eq!(filter(&rows, &criteria).len(), 2);
    }

    #[test]
    fn test_country_criterion_is_ignored() {
        let rows = CertificateAdapter::new().parse(&sample()).rows;
        let criteria = FilterCriteria::all().with_country(Selector::only("Colombia"));
        assert_eq!(filter(&rows, &criteria).len(), rows.len());
    }

    #[test]
    fn test_metrics() {
        let rows = CertificateAdapter::new().parse(&sample()).rows;
        let metrics = CertificateMetrics::calculate(&rows);

        assert_eq!(metrics.total_colcers, 40.0);
        assert_eq!(metrics.total_transactions, 3);
        assert_eq!(metrics.unique_clients, 2);
        assert_eq!(metrics.unique_projects, 2);
    }
}
