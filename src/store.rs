// 🗃️ Dataset Store
// Lazy, load-once cache of the three datasets.
//
// Lifecycle per dataset:
//   Unloaded → (first access) → Loaded(rows) | Failed(message)
// Later accesses reuse the cached outcome until `invalidate` resets it.

use crate::config::{DashboardConfig, DatasetPaths};
use crate::datasets::{
    Certificate, CertificateAdapter, DatasetAdapter, DatasetKind, Initiative, InitiativeAdapter,
    Withdrawal, WithdrawalAdapter,
};
use crate::schema::SchemaCheck;
use crate::source::TextSource;
use anyhow::Result;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{error, info, warn};

// ============================================================================
// LOAD STATE
// ============================================================================

#[derive(Debug, Clone)]
pub enum LoadState<T> {
    Unloaded,
    Loaded(Arc<[T]>),
    Failed(String),
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        LoadState::Unloaded
    }
}

impl<T> LoadState<T> {
    /// Rows once loaded; empty while unloaded or after a failure
    pub fn records(&self) -> Arc<[T]> {
        match self {
            LoadState::Loaded(rows) => Arc::clone(rows),
            _ => Arc::from(Vec::new()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Unloaded)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        match self {
            LoadState::Unloaded => LoadPhase::Unloaded,
            LoadState::Loaded(_) => LoadPhase::Loaded,
            LoadState::Failed(_) => LoadPhase::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Unloaded,
    Loaded,
    Failed,
}

/// A dataset whose load failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} unavailable: {message}", kind.name())]
pub struct DatasetUnavailable {
    pub kind: DatasetKind,
    pub message: String,
}

/// Snapshot of one dataset slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStatus {
    pub kind: DatasetKind,
    pub name: &'static str,
    pub path: String,
    pub state: LoadPhase,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<SchemaCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// SLOT
// ============================================================================

struct SlotInner<T> {
    state: LoadState<T>,
    check: Option<SchemaCheck>,
}

struct Slot<A: DatasetAdapter> {
    adapter: A,
    path: String,
    inner: Mutex<SlotInner<A::Row>>,
}

impl<A: DatasetAdapter> Slot<A> {
    fn new(adapter: A, path: &str) -> Self {
        Slot {
            adapter,
            path: path.to_string(),
            inner: Mutex::new(SlotInner {
                state: LoadState::Unloaded,
                check: None,
            }),
        }
    }

    fn kind(&self) -> DatasetKind {
        self.adapter.kind()
    }

    /// Lock the slot, loading it first if nothing is cached yet.
    /// The lock is held across the fetch so concurrent callers wait for a
    /// single load instead of starting their own.
    fn loaded(&self, source: &dyn TextSource) -> MutexGuard<'_, SlotInner<A::Row>> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if inner.state.is_loading() {
            let (state, check) = self.load(source);
            inner.state = state;
            inner.check = check;
        }

        inner
    }

    /// Cached rows, loading them on first access
    fn get(&self, source: &dyn TextSource) -> Result<Arc<[A::Row]>, DatasetUnavailable> {
        let inner = self.loaded(source);

        match &inner.state {
            LoadState::Loaded(rows) => Ok(Arc::clone(rows)),
            LoadState::Failed(message) => Err(DatasetUnavailable {
                kind: self.kind(),
                message: message.clone(),
            }),
            LoadState::Unloaded => Err(DatasetUnavailable {
                kind: self.kind(),
                message: "not loaded".to_string(),
            }),
        }
    }

    /// Load if needed and report the outcome without handing out rows
    fn load_status(&self, source: &dyn TextSource) -> DatasetStatus {
        let inner = self.loaded(source);
        self.snapshot(&inner)
    }

    fn load(&self, source: &dyn TextSource) -> (LoadState<A::Row>, Option<SchemaCheck>) {
        let kind = self.kind();

        let text = match source.fetch(&self.path) {
            Ok(text) => text,
            Err(e) => {
                error!(dataset = %kind, source = %source.describe(), error = %e, "failed to load dataset");
                return (LoadState::Failed(e.to_string()), None);
            }
        };

        let parsed = self.adapter.parse(&text);

        // Advisory only: rows are kept even when columns are missing
        if let SchemaCheck::Mismatch { missing } = &parsed.check {
            warn!(dataset = %kind, missing = ?missing, "dataset is missing required columns");
        }

        info!(dataset = %kind, rows = parsed.rows.len(), "loaded dataset");

        (LoadState::Loaded(Arc::from(parsed.rows)), Some(parsed.check))
    }

    fn status(&self) -> DatasetStatus {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.snapshot(&inner)
    }

    fn snapshot(&self, inner: &SlotInner<A::Row>) -> DatasetStatus {
        let kind = self.kind();

        DatasetStatus {
            kind,
            name: kind.name(),
            path: self.path.clone(),
            state: inner.state.phase(),
            loading: inner.state.is_loading(),
            rows: match &inner.state {
                LoadState::Loaded(rows) => Some(rows.len()),
                _ => None,
            },
            check: inner.check.clone(),
            error: inner.state.error().map(str::to_string),
        }
    }

    fn state(&self) -> LoadState<A::Row> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).state.clone()
    }

    fn invalidate(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.state = LoadState::Unloaded;
        inner.check = None;
    }
}

// ============================================================================
// STORE
// ============================================================================

/// DatasetStore - one independent slot per dataset over a shared source
pub struct DatasetStore {
    source: Arc<dyn TextSource>,
    withdrawals: Slot<WithdrawalAdapter>,
    certificates: Slot<CertificateAdapter>,
    initiatives: Slot<InitiativeAdapter>,
}

impl DatasetStore {
    pub fn new(source: Arc<dyn TextSource>, paths: &DatasetPaths) -> Self {
        DatasetStore {
            source,
            withdrawals: Slot::new(WithdrawalAdapter::new(), &paths.withdrawals),
            certificates: Slot::new(CertificateAdapter::new(), &paths.certificates),
            initiatives: Slot::new(InitiativeAdapter::new(), &paths.initiatives),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Ok(Self::new(config.source()?, &config.datasets))
    }

    pub fn source(&self) -> &dyn TextSource {
        self.source.as_ref()
    }

    pub fn withdrawals(&self) -> Result<Arc<[Withdrawal]>, DatasetUnavailable> {
        self.withdrawals.get(self.source.as_ref())
    }

    pub fn certificates(&self) -> Result<Arc<[Certificate]>, DatasetUnavailable> {
        self.certificates.get(self.source.as_ref())
    }

    pub fn initiatives(&self) -> Result<Arc<[Initiative]>, DatasetUnavailable> {
        self.initiatives.get(self.source.as_ref())
    }

    pub fn withdrawals_state(&self) -> LoadState<Withdrawal> {
        self.withdrawals.state()
    }

    pub fn certificates_state(&self) -> LoadState<Certificate> {
        self.certificates.state()
    }

    pub fn initiatives_state(&self) -> LoadState<Initiative> {
        self.initiatives.state()
    }

    /// Current slot status; never triggers a load
    pub fn status(&self, kind: DatasetKind) -> DatasetStatus {
        match kind {
            DatasetKind::Withdrawals => self.withdrawals.status(),
            DatasetKind::Certificates => self.certificates.status(),
            DatasetKind::Initiatives => self.initiatives.status(),
        }
    }

    /// Load `kind` if needed, then report its status
    pub fn load(&self, kind: DatasetKind) -> DatasetStatus {
        let source = self.source.as_ref();
        match kind {
            DatasetKind::Withdrawals => self.withdrawals.load_status(source),
            DatasetKind::Certificates => self.certificates.load_status(source),
            DatasetKind::Initiatives => self.initiatives.load_status(source),
        }
    }

    /// Load every dataset; one failure does not stop the others
    pub fn preload(&self) -> Vec<DatasetStatus> {
        DatasetKind::ALL.iter().map(|&kind| self.load(kind)).collect()
    }

    /// Forget the cached outcome so the next access refetches
    pub fn invalidate(&self, kind: DatasetKind) {
        info!(dataset = %kind, "invalidating dataset");
        match kind {
            DatasetKind::Withdrawals => self.withdrawals.invalidate(),
            DatasetKind::Certificates => self.certificates.invalidate(),
            DatasetKind::Initiatives => self.initiatives.invalidate(),
        }
    }
}
