// 📈 Dashboard Views
// Filtered rows + metrics + charts for each dashboard tab, ready to serialize.
//
// Filter options (years, months, statuses, countries) always come from the
// full dataset so a selection never hides the other choices.

use crate::aggregation::{
    count_distribution, count_timeline, distribution, timeline, with_colors, DistributionEntry,
    DistributionOptions, TimelineEntry,
};
use crate::config::DashboardConfig;
use crate::datasets::initiative::{status_color, FALLBACK_STATUS_COLOR};
use crate::datasets::{
    Certificate, CertificateMetrics, DestinationType, Initiative, InitiativeMetrics, Withdrawal,
    WithdrawalMetrics,
};
use crate::filters::{
    available_months, available_values, available_years, filter, FilterCriteria, Filterable, Selector,
};
use serde::Serialize;

fn chart_options(config: &DashboardConfig, max_label_len: usize) -> DistributionOptions {
    DistributionOptions::default()
        .truncate_labels(max_label_len)
        .limit(config.default_chart_limit)
}

// ============================================================================
// TAX WITHDRAWALS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxWithdrawalsView {
    pub year: Selector,
    pub month: Selector,
    pub available_years: Vec<String>,
    pub available_months: Vec<String>,
    pub row_count: usize,
    pub metrics: WithdrawalMetrics,
    /// Delivered TCO2e per initiative, top N
    pub by_initiative: Vec<DistributionEntry>,
    /// Delivered TCO2e per month
    pub timeline: Vec<TimelineEntry>,
    #[serde(skip)]
    pub rows: Vec<Withdrawal>,
}

impl TaxWithdrawalsView {
    pub fn build(rows: &[Withdrawal], year: Selector, month: Selector, config: &DashboardConfig) -> Self {
        let criteria = FilterCriteria::all()
            .with_category(Selector::only(DestinationType::Tax.as_str()))
            .with_year(year.clone())
            .with_month(month.clone());
        let filtered = filter(rows, &criteria);

        TaxWithdrawalsView {
            available_years: available_years(rows),
            available_months: available_months(rows, &year),
            row_count: filtered.len(),
            metrics: WithdrawalMetrics::calculate(&filtered),
            by_initiative: distribution(
                &filtered,
                |w| w.initiative.as_str(),
                Withdrawal::tco2e_or_zero,
                chart_options(config, config.max_initiative_name_length),
            ),
            timeline: timeline(&filtered, Filterable::date, Withdrawal::tco2e_or_zero),
            year,
            month,
            rows: filtered,
        }
    }
}

// ============================================================================
// VOLUNTARY WITHDRAWALS (certificates)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoluntaryWithdrawalsView {
    pub year: Selector,
    pub month: Selector,
    pub available_years: Vec<String>,
    pub available_months: Vec<String>,
    pub row_count: usize,
    pub metrics: CertificateMetrics,
    /// Withdrawn COLCERs per project, top N
    pub by_project: Vec<DistributionEntry>,
    /// Withdrawn COLCERs per month
    pub timeline: Vec<TimelineEntry>,
    #[serde(skip)]
    pub rows: Vec<Certificate>,
}

impl VoluntaryWithdrawalsView {
    pub fn build(rows: &[Certificate], year: Selector, month: Selector, config: &DashboardConfig) -> Self {
        let criteria = FilterCriteria::all().with_year(year.clone()).with_month(month.clone());
        let filtered = filter(rows, &criteria);

        VoluntaryWithdrawalsView {
            available_years: available_years(rows),
            available_months: available_months(rows, &year),
            row_count: filtered.len(),
            metrics: CertificateMetrics::calculate(&filtered),
            by_project: distribution(
                &filtered,
                |c| c.project.as_str(),
                Certificate::colcers_or_zero,
                chart_options(config, config.max_initiative_name_length),
            ),
            timeline: timeline(&filtered, Filterable::date, Certificate::colcers_or_zero),
            year,
            month,
            rows: filtered,
        }
    }
}

// ============================================================================
// INITIATIVES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitiativesView {
    pub status: Selector,
    pub year: Selector,
    pub country: Selector,
    pub available_statuses: Vec<String>,
    pub available_years: Vec<String>,
    pub available_countries: Vec<String>,
    pub row_count: usize,
    pub metrics: InitiativeMetrics,
    /// Every status, colored
    pub by_status: Vec<DistributionEntry>,
    pub by_holder: Vec<DistributionEntry>,
    pub by_developer: Vec<DistributionEntry>,
    /// Registrations per month
    pub timeline: Vec<TimelineEntry>,
    #[serde(skip)]
    pub rows: Vec<Initiative>,
}

impl InitiativesView {
    pub fn build(
        rows: &[Initiative],
        status: Selector,
        year: Selector,
        country: Selector,
        config: &DashboardConfig,
    ) -> Self {
        let criteria = FilterCriteria::all()
            .with_category(status.clone())
            .with_year(year.clone())
            .with_country(country.clone());
        let filtered = filter(rows, &criteria);
        let parties = chart_options(config, config.max_party_name_length);

        let by_status = count_distribution(
            &filtered,
            |i| i.status.as_str(),
            DistributionOptions::default().unlimited(),
        );

        InitiativesView {
            available_statuses: available_values(rows, |i| i.status.as_str()),
            available_years: available_years(rows),
            available_countries: available_values(rows, |i| i.country.as_str()),
            row_count: filtered.len(),
            metrics: InitiativeMetrics::calculate(&filtered),
            by_status: with_colors(by_status, status_color, FALLBACK_STATUS_COLOR),
            by_holder: count_distribution(&filtered, |i| i.holder.as_str(), parties),
            by_developer: count_distribution(&filtered, |i| i.developer.as_str(), parties),
            timeline: count_timeline(&filtered, Filterable::date),
            status,
            year,
            country,
            rows: filtered,
        }
    }
}

// ============================================================================
// PAYLOAD
// ============================================================================

/// A view plus, on request, the filtered rows behind it
#[derive(Debug, Serialize)]
pub struct ViewPayload<'a, V, R> {
    #[serde(flatten)]
    pub view: &'a V,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<&'a [R]>,
}

impl<'a, V, R> ViewPayload<'a, V, R> {
    pub fn new(view: &'a V, rows: &'a [R], include_rows: bool) -> Self {
        ViewPayload {
            view,
            rows: include_rows.then_some(rows),
        }
    }
}

// ============================================================================
// INFORMATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLink {
    pub label: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InformationView {
    pub title: &'static str,
    pub description: &'static str,
    pub sources: Vec<SourceLink>,
    pub registry_url: &'static str,
}

impl InformationView {
    pub fn build() -> Self {
        InformationView {
            title: "Sistema de Registro del estándar COLCX",
            description: "Herramienta para registrar proyectos de mitigación de cambio climático. \
                          Gestionada con el operador XM, permite la consulta, administración y \
                          transacción de créditos de carbono (COLCERs).",
            sources: vec![
                SourceLink {
                    label: "Retiros",
                    url: "https://colcx.com/SistemaRegistro/Retiros",
                },
                SourceLink {
                    label: "Certificados de emisión",
                    url: "https://www.colcxregistry.com/withdraw",
                },
                SourceLink {
                    label: "Iniciativas",
                    url: "https://www.colcxregistry.com/projects",
                },
                SourceLink {
                    label: "Sistema de Registro",
                    url: "https://colcx.com/SistemaRegistro/",
                },
            ],
            registry_url: "https://www.colcxregistry.com/",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{CertificateAdapter, DatasetAdapter, InitiativeAdapter, WithdrawalAdapter};

    const WITHDRAWALS: &str = "Fecha Retiro,Iniciativa,Cod. Serial,Vintage Inicial,Vintage Final,Año absorción,Cod. Seriales Entregados,Destinación,Usuario Final,Nit Usuario Final,Sujeto Pasivo,Nit Sujeto Pasivo,TCO2e Entregadas\n\
        2023-11-20,Solar,S1,2020,2021,2022,A-1,Compensacion voluntaria,Cliente A,1,Cliente A,1,99\n\
        2024-01-05,Proyecto de Conservación de Bosques Húmedos Tropicales del Chocó,S2,2020,2021,2022,A-2,Impuesto al carbono,Cliente B,2,Cliente B,2,40\n\
        2024-01-28,Eólico Guajira,S3,2020,2021,2022,A-3,Impuesto al carbono,Cliente C,3,Cliente C,3,60\n\
        2024-03-02,Eólico Guajira,S4,2020,2021,2022,A-4,No causación,Cliente B,2,Cliente B,2,15";

    const CERTIFICATES: &str = "Fecha de retiro;Proyecto;Año;Cod. Vintage;Cod. COLCERs retirados;Propósito del retiro;Usuario final;Sujeto pasivo;COLCERs retirados\n\
        2024-02-01;Manglar;2024;V1;C1;Huella;U1;U1;7\n\
        2024-02-15;Páramo;2024;V1;C2;Huella;U2;U2;3\n\
        2023-07-15;Manglar;2023;V1;C3;Evento;U1;U1;10";

    const INITIATIVES: &str = "cod_iniciativa,estado,fecha_registro,nombre_iniciativa,pais,titular,desarrollador\n\
        A,Certificado,2022-01-10,Uno,Colombia,Titular Uno,Dev\n\
        B,Certificado,2022-01-20,Dos,Colombia,Titular Uno,Dev\n\
        C,En Revisión,2023-05-01,Tres,Perú,Titular Dos,Otro Dev";

    #[test]
    fn test_tax_view_excludes_voluntary() {
        let rows = WithdrawalAdapter::new().parse(WITHDRAWALS).rows;
        let view = TaxWithdrawalsView::build(&rows, Selector::All, Selector::All, &DashboardConfig::default());

        assert_eq!(view.row_count, 3);
        assert_eq!(view.metrics.total_tco2e, 115.0);
        assert_eq!(view.metrics.unique_clients, 2);
        assert_eq!(view.available_years, vec!["2023", "2024"]);

        assert_eq!(view.by_initiative[0].name, "Eólico Guajira");
        assert_eq!(view.by_initiative[0].value, 75.0);
        assert_eq!(
            view.by_initiative[1].name,
            "Proyecto de Conservación de Bosques Húmedos Tropic..."
        );

        let months: Vec<&str> = view.timeline.iter().map(|t| t.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-03"]);
        assert_eq!(view.timeline[0].value, 100.0);
    }

    #[test]
    fn test_tax_view_month_filter_keeps_options() {
        let rows = WithdrawalAdapter::new().parse(WITHDRAWALS).rows;
        let view = TaxWithdrawalsView::build(
            &rows,
            Selector::only("2024"),
            Selector::only("3"),
            &DashboardConfig::default(),
        );

        assert_eq!(view.row_count, 1);
        assert_eq!(view.rows[0].destination, "No causación");
        assert_eq!(view.available_months, vec!["1", "3"]);
        assert_eq!(view.available_years, vec!["2023", "2024"]);
    }

    #[test]
    fn test_voluntary_view() {
        let rows = CertificateAdapter::new().parse(CERTIFICATES).rows;
        let view = VoluntaryWithdrawalsView::build(
            &rows,
            Selector::only("2024"),
            Selector::All,
            &DashboardConfig::default(),
        );

        assert_eq!(view.row_count, 2);
        assert_eq!(view.metrics.total_colcers, 10.0);
        assert_eq!(view.by_project[0].name, "Manglar");
        assert_eq!(view.timeline.len(), 1);
        assert_eq!(view.timeline[0].value, 10.0);
        assert_eq!(view.available_months, vec!["2"]);
    }

    #[test]
    fn test_initiatives_view_colors_and_limits() {
        let rows = InitiativeAdapter::new().parse(INITIATIVES).rows;
        let mut config = DashboardConfig::default();
        config.default_chart_limit = 1;

        let view = InitiativesView::build(&rows, Selector::All, Selector::All, Selector::All, &config);

        assert_eq!(view.row_count, 3);
        assert_eq!(view.by_status.len(), 2);
        assert_eq!(view.by_status[0].color.as_deref(), Some("hsl(142, 76%, 36%)"));
        assert_eq!(view.by_status[1].color.as_deref(), Some(FALLBACK_STATUS_COLOR));
        assert_eq!(view.by_holder.len(), 1);
        assert_eq!(view.by_holder[0].value, 2.0);
        assert_eq!(view.available_countries, vec!["Colombia", "Perú"]);
        assert_eq!(view.timeline[0].month, "2022-01");
        assert_eq!(view.timeline[0].value, 2.0);
    }

    #[test]
    fn test_initiatives_view_country_filter() {
        let rows = InitiativeAdapter::new().parse(INITIATIVES).rows;
        let view = InitiativesView::build(
            &rows,
            Selector::All,
            Selector::All,
            Selector::only("Perú"),
            &DashboardConfig::default(),
        );

        assert_eq!(view.row_count, 1);
        assert_eq!(view.metrics.certified, 0);
        assert_eq!(view.available_statuses.len(), 2);
    }

    #[test]
    fn test_information_view_links() {
        let view = InformationView::build();
        assert_eq!(view.sources.len(), 4);
        assert!(view.sources.iter().all(|s| s.url.starts_with("https://")));
    }

    #[test]
    fn test_rows_are_not_serialized() {
        let rows = WithdrawalAdapter::new().parse(WITHDRAWALS).rows;
        let view = TaxWithdrawalsView::build(&rows, Selector::All, Selector::All, &DashboardConfig::default());
        let json = serde_json::to_value(&view).unwrap();

        assert!(json.get("rows").is_none());
        assert_eq!(json["year"], "all");
        assert_eq!(json["metrics"]["total_transactions"], 3);
    }

    #[test]
    fn test_payload_includes_rows_on_request() {
        let rows = WithdrawalAdapter::new().parse(WITHDRAWALS).rows;
        let view = TaxWithdrawalsView::build(&rows, Selector::All, Selector::All, &DashboardConfig::default());

        let without = serde_json::to_value(ViewPayload::new(&view, &view.rows, false)).unwrap();
        assert!(without.get("rows").is_none());
        assert_eq!(without["row_count"], 3);

        let with = serde_json::to_value(ViewPayload::new(&view, &view.rows, true)).unwrap();
        assert_eq!(with["rows"].as_array().map(Vec::len), Some(3));
        assert_eq!(with["rows"][0]["Destinación"], "Impuesto al carbono");
    }
}
