//! Session-scoped comparison state.
//!
//! Each session holds the latest run per backend for whatever document the
//! user is comparing. Nothing is persisted; sessions live as long as the
//! process.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::quality::{BackendId, ComparisonAggregator, ComparisonReport, QualityResult};

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// The document a run was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub sha256: String,
}

impl DocumentInfo {
    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self {
            name: name.into(),
            sha256: format!("{:x}", hasher.finalize()),
        }
    }
}

/// One backend's latest output and its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendRun {
    pub text: String,
    pub result: QualityResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentInfo>,
    pub evaluated_at: u64,
}

impl BackendRun {
    pub fn new(text: String, result: QualityResult, document: Option<DocumentInfo>) -> Self {
        Self {
            text,
            result,
            document,
            evaluated_at: unix_now(),
        }
    }
}

/// Explicit comparison context: results keyed by backend, one per backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSession {
    pub id: String,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentInfo>,
    pub results: BTreeMap<BackendId, BackendRun>,
}

impl ComparisonSession {
    pub fn new() -> Self {
        Self {
            id: format!("cmp_{}", Uuid::new_v4().simple()),
            created_at: unix_now(),
            document: None,
            results: BTreeMap::new(),
        }
    }

    /// Record a run, replacing any earlier run of the same backend.
    /// Returns the replaced run.
    pub fn record(&mut self, backend: BackendId, run: BackendRun) -> Option<BackendRun> {
        if run.document.is_some() {
            self.document = run.document.clone();
        }
        self.results.insert(backend, run)
    }

    pub fn results(&self) -> impl Iterator<Item = (&BackendId, &QualityResult)> {
        self.results.iter().map(|(backend, run)| (backend, &run.result))
    }

    pub fn report(&self, aggregator: &ComparisonAggregator<'_>) -> ComparisonReport {
        aggregator.aggregate(self.results())
    }
}

impl Default for ComparisonSession {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, ComparisonSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session and return a copy of it.
    pub fn create(&self) -> ComparisonSession {
        let session = ComparisonSession::new();
        let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session.id.clone(), session.clone());
        tracing::debug!("SessionStore: created '{}'", session.id);
        session
    }

    pub fn get(&self, id: &str) -> Option<ComparisonSession> {
        let sessions = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(id).cloned()
    }

    /// Record a run in session `id`. Returns `None` if the session is unknown.
    pub fn record(&self, id: &str, backend: BackendId, run: BackendRun) -> Option<ComparisonSession> {
        let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(id)?;
        if session.record(backend.clone(), run).is_some() {
            tracing::debug!("SessionStore: replaced '{}' result in '{}'", backend, id);
        }
        Some(session.clone())
    }

    /// Drop a session. Returns true if it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
