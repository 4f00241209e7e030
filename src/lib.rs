// COLCX Registry Dashboard - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod parser;         // Delimited text → generic records
pub mod schema;         // Column lists + advisory checks per export
pub mod temporal;       // Date parsing + year/month keys
pub mod filters;        // Year / month / category / country filtering
pub mod aggregation;    // Sums, distributions, timelines
pub mod datasets;       // Typed adapters: withdrawals, certificates, initiatives
pub mod source;         // Where dataset text comes from
pub mod store;          // Load-once dataset cache
pub mod config;         // JSON configuration
pub mod dashboard;      // Composed views per tab

// Re-export commonly used types
pub use parser::{parse, write_rows, Record, Value};
pub use schema::{DatasetSchema, SchemaCheck};
pub use temporal::{parse_date, YearMonth};
pub use filters::{
    available_months, available_values, available_years, filter, FilterCriteria, Filterable,
    Selector,
};
pub use aggregation::{
    count_distribution, count_timeline, count_where, distinct_count, distribution, sum, timeline,
    truncate_label, with_colors, DistributionEntry, DistributionOptions, TimelineEntry,
};
pub use datasets::{
    Certificate, CertificateAdapter, CertificateMetrics, DatasetAdapter, DatasetKind,
    DestinationType, Initiative, InitiativeAdapter, InitiativeMetrics, ParsedDataset, Withdrawal,
    WithdrawalAdapter, WithdrawalMetrics,
};
pub use source::{DirectorySource, LoadError, MemorySource, TextSource};
#[cfg(feature = "remote")]
pub use source::HttpSource;
pub use store::{DatasetStatus, DatasetStore, DatasetUnavailable, LoadPhase, LoadState};
pub use config::{DashboardConfig, DatasetPaths};
pub use dashboard::{
    InformationView, InitiativesView, SourceLink, TaxWithdrawalsView, ViewPayload,
    VoluntaryWithdrawalsView,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
