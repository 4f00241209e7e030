use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colcx_dashboard::{
    write_rows, DashboardConfig, DatasetKind, DatasetStore, DistributionEntry, InformationView,
    InitiativesView, LoadPhase, Selector, TaxWithdrawalsView, TimelineEntry, ViewPayload,
    VoluntaryWithdrawalsView,
};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "colcx-dashboard",
    version,
    about = "COLCX registry dashboard - withdrawals, certificates and initiatives"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Root directory that dataset paths are resolved under
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Fetch datasets from this origin instead of the data directory
    #[arg(long = "base-url", value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Registry source links
    Info,

    /// Tax withdrawals (every destination except voluntary compensation)
    Tax(PeriodArgs),

    /// Voluntary withdrawals (emission certificates)
    Voluntary(PeriodArgs),

    /// Registered initiatives
    Initiatives(InitiativeArgs),

    /// Load every dataset and report row counts and schema checks
    Check,
}

#[derive(Args)]
struct PeriodArgs {
    /// Year, or "all"
    #[arg(long)]
    year: Option<String>,

    /// Month number 1-12, or "all"
    #[arg(long)]
    month: Option<String>,

    /// Include filtered rows in JSON output
    #[arg(long)]
    rows: bool,

    /// Print the filtered rows as delimited text instead of the summary
    #[arg(long, conflicts_with = "rows")]
    csv: bool,
}

#[derive(Args)]
struct InitiativeArgs {
    /// Status, or "all"
    #[arg(long)]
    status: Option<String>,

    /// Registration year, or "all"
    #[arg(long)]
    year: Option<String>,

    /// Country, or "all"
    #[arg(long)]
    country: Option<String>,

    /// Include filtered rows in JSON output
    #[arg(long)]
    rows: bool,

    /// Print the filtered rows as delimited text instead of the summary
    #[arg(long, conflicts_with = "rows")]
    csv: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(env).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let config = DashboardConfig::load(cli.config.as_deref())?
        .with_data_dir(cli.data_dir.clone())
        .with_base_url(cli.base_url.clone());

    let store = DatasetStore::from_config(&config)?;
    info!(source = %store.source().describe(), "dashboard ready");

    match &cli.command {
        Command::Info => run_info(cli.json),
        Command::Tax(args) => run_tax(&store, &config, args, cli.json),
        Command::Voluntary(args) => run_voluntary(&store, &config, args, cli.json),
        Command::Initiatives(args) => run_initiatives(&store, &config, args, cli.json),
        Command::Check => run_check(&store, cli.json),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Filtered rows in the dataset's own export format
fn print_rows<T: Serialize>(kind: DatasetKind, rows: &[T]) -> Result<()> {
    write_rows(rows, kind.schema().delimiter, io::stdout().lock())?;
    Ok(())
}

fn run_info(json: bool) -> Result<()> {
    let view = InformationView::build();
    if json {
        return print_json(&view);
    }

    println!("ℹ️  {}", view.title);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}\n", view.description);
    println!("📚 Fuentes de datos:");
    for link in &view.sources {
        println!("   • {:<26} {}", link.label, link.url);
    }
    println!("\nFuente: {}", view.registry_url);

    Ok(())
}

fn run_tax(store: &DatasetStore, config: &DashboardConfig, args: &PeriodArgs, json: bool) -> Result<()> {
    let rows = store.withdrawals()?;
    let view = TaxWithdrawalsView::build(
        &rows,
        Selector::from(args.year.as_deref()),
        Selector::from(args.month.as_deref()),
        config,
    );

    if args.csv {
        return print_rows(DatasetKind::Withdrawals, &view.rows);
    }
    if json {
        return print_json(&ViewPayload::new(&view, &view.rows, args.rows));
    }

    println!("🏛️  Retiros por impuesto (año: {}, mes: {})", view.year, view.month);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total TCO2e:          {:.2}", view.metrics.total_tco2e);
    println!("Transacciones:        {}", view.metrics.total_transactions);
    println!("Clientes únicos:      {}", view.metrics.unique_clients);
    println!("Iniciativas únicas:   {}", view.metrics.unique_initiatives);
    print_distribution("Top iniciativas (TCO2e)", &view.by_initiative);
    print_timeline("TCO2e por mes", &view.timeline);
    print_options(&view.available_years, &view.available_months);

    Ok(())
}

fn run_voluntary(
    store: &DatasetStore,
    config: &DashboardConfig,
    args: &PeriodArgs,
    json: bool,
) -> Result<()> {
    let rows = store.certificates()?;
    let view = VoluntaryWithdrawalsView::build(
        &rows,
        Selector::from(args.year.as_deref()),
        Selector::from(args.month.as_deref()),
        config,
    );

    if args.csv {
        return print_rows(DatasetKind::Certificates, &view.rows);
    }
    if json {
        return print_json(&ViewPayload::new(&view, &view.rows, args.rows));
    }

    println!("🌱 Retiros voluntarios (año: {}, mes: {})", view.year, view.month);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total COLCERs:        {:.2}", view.metrics.total_colcers);
    println!("Transacciones:        {}", view.metrics.total_transactions);
    println!("Clientes únicos:      {}", view.metrics.unique_clients);
    println!("Proyectos únicos:     {}", view.metrics.unique_projects);
    print_distribution("Top proyectos (COLCERs)", &view.by_project);
    print_timeline("COLCERs por mes", &view.timeline);
    print_options(&view.available_years, &view.available_months);

    Ok(())
}

fn run_initiatives(
    store: &DatasetStore,
    config: &DashboardConfig,
    args: &InitiativeArgs,
    json: bool,
) -> Result<()> {
    let rows = store.initiatives()?;
    let view = InitiativesView::build(
        &rows,
        Selector::from(args.status.as_deref()),
        Selector::from(args.year.as_deref()),
        Selector::from(args.country.as_deref()),
        config,
    );

    if args.csv {
        return print_rows(DatasetKind::Initiatives, &view.rows);
    }
    if json {
        return print_json(&ViewPayload::new(&view, &view.rows, args.rows));
    }

    println!(
        "🏗️  Iniciativas (estado: {}, año: {}, país: {})",
        view.status, view.year, view.country
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total:                {}", view.metrics.total_initiatives);
    println!("Certificadas:         {}", view.metrics.certified);
    println!("En desarrollo:        {}", view.metrics.in_development);
    println!("Retiradas:            {}", view.metrics.withdrawn);
    println!("Titulares únicos:     {}", view.metrics.unique_holders);
    println!("Desarrolladores:      {}", view.metrics.unique_developers);
    println!("Países:               {}", view.metrics.unique_countries);
    print_distribution("Por estado", &view.by_status);
    print_distribution("Top titulares", &view.by_holder);
    print_distribution("Top desarrolladores", &view.by_developer);
    print_timeline("Registros por mes", &view.timeline);

    Ok(())
}

fn run_check(store: &DatasetStore, json: bool) -> Result<()> {
    let statuses = store.preload();
    let failed = statuses.iter().filter(|s| s.state == LoadPhase::Failed).count();

    if json {
        print_json(&statuses)?;
    } else {
        println!("🔍 Datasets ({})", store.source().describe());
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        for status in &statuses {
            match (&status.error, status.rows, &status.check) {
                (Some(error), _, _) => println!("❌ {:<26} {}", status.name, error),
                (None, Some(rows), Some(check)) => {
                    let mark = if check.is_mismatch() { "⚠️ " } else { "✓" };
                    println!("{} {:<26} {} filas ({})", mark, status.name, rows, check);
                }
                _ => println!("… {:<26} sin cargar", status.name),
            }
        }
    }

    if failed > 0 {
        eprintln!("\n❌ {} dataset(s) failed to load", failed);
        std::process::exit(1);
    }

    Ok(())
}

fn print_distribution(title: &str, entries: &[DistributionEntry]) {
    println!("\n📊 {}:", title);
    if entries.is_empty() {
        println!("   (sin datos)");
    }
    for entry in entries {
        println!("   {:>12.2}  {}", entry.value, entry.name);
    }
}

fn print_timeline(title: &str, entries: &[TimelineEntry]) {
    println!("\n📅 {}:", title);
    if entries.is_empty() {
        println!("   (sin datos)");
    }
    for entry in entries {
        println!("   {}  {:>12.2}", entry.month, entry.value);
    }
}

fn print_options(years: &[String], months: &[String]) {
    println!("\nAños disponibles:  {}", years.join(", "));
    println!("Meses disponibles: {}", months.join(", "));
}
