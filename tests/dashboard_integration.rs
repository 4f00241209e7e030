// Full pipeline over the sample exports in data/ and over in-memory text

use colcx_dashboard::{
    DashboardConfig, DatasetKind, DatasetPaths, DatasetStore, DirectorySource, InitiativesView,
    LoadPhase, MemorySource, SchemaCheck, Selector, TaxWithdrawalsView, TextSource,
    VoluntaryWithdrawalsView,
};
use std::sync::Arc;

fn sample_store() -> DatasetStore {
    let source = DirectorySource::new(env!("CARGO_MANIFEST_DIR"));
    DatasetStore::new(Arc::new(source), &DatasetPaths::default())
}

#[test]
fn test_sample_datasets_load_cleanly() {
    let store = sample_store();
    let statuses = store.preload();

    for status in &statuses {
        assert_eq!(status.state, LoadPhase::Loaded, "{} failed: {:?}", status.name, status.error);
        assert_eq!(status.check, Some(SchemaCheck::Ok));
    }

    // The truncated last withdrawal row is dropped by the parser
    assert_eq!(store.status(DatasetKind::Withdrawals).rows, Some(6));
    assert_eq!(store.status(DatasetKind::Certificates).rows, Some(4));
    assert_eq!(store.status(DatasetKind::Initiatives).rows, Some(7));
}

#[test]
fn test_tax_view_over_sample() {
    let store = sample_store();
    let rows = store.withdrawals().unwrap();
    let config = DashboardConfig::default();

    let view = TaxWithdrawalsView::build(&rows, Selector::All, Selector::All, &config);

    assert_eq!(view.row_count, 4);
    assert_eq!(view.metrics.total_tco2e, 1200.5);
    assert_eq!(view.metrics.unique_clients, 3);
    assert_eq!(view.metrics.unique_initiatives, 4);

    let names: Vec<&str> = view.by_initiative.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Conservación Bosque Seco, Tolima",
            "Manglares de Tumaco",
            "Proyecto de Restauración Ecológica de la Cuenca Al...",
            "Eólico Alta Guajira",
        ]
    );

    let months: Vec<(&str, f64)> = view.timeline.iter().map(|t| (t.month.as_str(), t.value)).collect();
    assert_eq!(months, vec![("2023-09", 500.0), ("2024-01", 550.5), ("2024-03", 150.0)]);
}

#[test]
fn test_tax_view_year_filter_over_sample() {
    let store = sample_store();
    let rows = store.withdrawals().unwrap();

    let view = TaxWithdrawalsView::build(
        &rows,
        Selector::parse("2024"),
        Selector::parse("todos"),
        &DashboardConfig::default(),
    );

    assert_eq!(view.row_count, 3);
    assert_eq!(view.metrics.total_tco2e, 700.5);
    assert_eq!(view.available_years, vec!["2023", "2024"]);
    assert_eq!(view.available_months, vec!["1", "3"]);
}

#[test]
fn test_voluntary_view_over_sample() {
    let store = sample_store();
    let rows = store.certificates().unwrap();

    let all = VoluntaryWithdrawalsView::build(&rows, Selector::All, Selector::All, &DashboardConfig::default());
    assert_eq!(all.metrics.total_colcers, 140.0);
    assert_eq!(all.metrics.unique_clients, 3);
    assert_eq!(all.metrics.unique_projects, 3);

    let year = VoluntaryWithdrawalsView::build(
        &rows,
        Selector::only("2024"),
        Selector::All,
        &DashboardConfig::default(),
    );
    assert_eq!(year.row_count, 3);
    assert_eq!(year.available_months, vec!["2", "4"]);
    assert_eq!(year.by_project[0].name, "Reforestación Meta; Fase II");
    assert_eq!(year.by_project[0].value, 60.0);
}

#[test]
fn test_initiatives_view_over_sample() {
    let store = sample_store();
    let rows = store.initiatives().unwrap();
    let config = DashboardConfig::default();

    let view = InitiativesView::build(&rows, Selector::All, Selector::All, Selector::All, &config);

    assert_eq!(view.metrics.total_initiatives, 7);
    assert_eq!(view.metrics.certified, 2);
    assert_eq!(view.metrics.in_development, 2);
    assert_eq!(view.metrics.withdrawn, 1);
    assert_eq!(view.metrics.unique_holders, 7);
    assert_eq!(view.metrics.unique_developers, 4);
    assert_eq!(view.metrics.unique_countries, 3);

    assert_eq!(view.by_status.len(), 6);
    assert_eq!(view.by_status[0].name, "Certificado");
    assert_eq!(view.by_status[1].name, "Registrado");
    assert!(view.by_status.iter().all(|e| e.color.is_some()));

    let colombia = InitiativesView::build(
        &rows,
        Selector::All,
        Selector::only("2022"),
        Selector::only("Colombia"),
        &config,
    );
    assert_eq!(colombia.row_count, 2);
    assert_eq!(colombia.by_developer[0].name, "Renovables Andinas");
    assert_eq!(colombia.by_developer[0].value, 2.0);
}

#[test]
fn test_failed_dataset_does_not_block_others() {
    let source = MemorySource::new().with_text(
        "/data/iniciativas_colcx.csv",
        "cod_iniciativa,estado,fecha_registro,nombre_iniciativa,pais,titular,desarrollador\n\
         A,Certificado,2024-01-01,Uno,Colombia,T,D",
    );
    source.fail_with("/data/retiros.csv", 404);

    let store = DatasetStore::new(Arc::new(source), &DatasetPaths::default());

    let err = store.withdrawals().unwrap_err();
    assert!(err.to_string().contains("404"));
    assert_eq!(store.initiatives().unwrap().len(), 1);
    assert_eq!(store.status(DatasetKind::Withdrawals).state, LoadPhase::Failed);
}

#[test]
fn test_config_source_reads_sample_directory() {
    let config = DashboardConfig::default().with_data_dir(Some(env!("CARGO_MANIFEST_DIR").into()));
    let source = config.source().unwrap();

    let text = source.fetch(&config.datasets.withdrawals).unwrap();
    assert!(text.starts_with("Fecha Retiro,"));
}
