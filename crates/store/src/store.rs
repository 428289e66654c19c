//! Durable per-tenant storage with a write-through in-memory cache.
//!
//! Each tenant owns three independent JSON records under
//! `<data_dir>/tenants/<tenant_id>/`:
//!
//! - `config.json`     — channel/role wiring ([`TenantConfig`])
//! - `pending.json`    — tracked subjects awaiting introduction
//! - `introduced.json` — ids known to have introduced themselves
//!
//! A missing record is first-run state and loads as empty/default; any
//! other read or parse failure propagates as [`StoreError`]. Every save
//! fully overwrites its record via a temp-file-then-rename so a crash
//! mid-write leaves either the old or the new content, never a torn one.
//!
//! The cache is populated on first reference to a tenant id, written
//! through on every mutation, and never expires. Within a process
//! lifetime it is the single source of truth.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use introguard_core::{PendingSubject, SubjectId, TenantConfig, TenantId};

use crate::error::StoreError;

/// The three cached collections for one tenant.
#[derive(Debug, Default)]
struct TenantState {
    config: TenantConfig,
    pending: BTreeMap<SubjectId, PendingSubject>,
    introduced: BTreeSet<SubjectId>,
}

/// Process-wide tenant storage: lazy loads, caches, write-through saves.
pub struct TenantStore {
    data_dir: PathBuf,
    cache: HashMap<TenantId, TenantState>,
}

impl TenantStore {
    /// Open a store rooted at `data_dir` (created if absent).
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(data_dir.join("tenants"))?;
        Ok(Self {
            data_dir,
            cache: HashMap::new(),
        })
    }

    fn tenant_dir(&self, tenant: TenantId) -> PathBuf {
        self.data_dir.join("tenants").join(tenant.to_string())
    }

    /// Load the cache entry for a tenant, reading all three records from
    /// disk on first reference.
    fn state_mut(&mut self, tenant: TenantId) -> Result<&mut TenantState, StoreError> {
        if !self.cache.contains_key(&tenant) {
            let dir = self.tenant_dir(tenant);
            let state = TenantState {
                config: load_record(&dir.join("config.json"))?.unwrap_or_default(),
                pending: load_record(&dir.join("pending.json"))?.unwrap_or_default(),
                introduced: load_record(&dir.join("introduced.json"))?.unwrap_or_default(),
            };
            debug!(
                tenant,
                pending = state.pending.len(),
                introduced = state.introduced.len(),
                "tenant state loaded"
            );
            self.cache.insert(tenant, state);
        }
        Ok(self.cache.get_mut(&tenant).unwrap())
    }

    // ── Config ──────────────────────────────────────────────────────

    pub fn config(&mut self, tenant: TenantId) -> Result<&TenantConfig, StoreError> {
        Ok(&self.state_mut(tenant)?.config)
    }

    /// Replace the tenant's config and persist it immediately.
    pub fn save_config(
        &mut self,
        tenant: TenantId,
        config: TenantConfig,
    ) -> Result<(), StoreError> {
        let dir = self.tenant_dir(tenant);
        self.state_mut(tenant)?.config = config;
        let state = &self.cache[&tenant];
        write_record(&dir.join("config.json"), &state.config)
    }

    // ── Pending subjects ────────────────────────────────────────────

    pub fn pending(
        &mut self,
        tenant: TenantId,
    ) -> Result<&BTreeMap<SubjectId, PendingSubject>, StoreError> {
        Ok(&self.state_mut(tenant)?.pending)
    }

    /// Mutable access to the live pending collection. Callers must follow
    /// every mutation with [`save_pending`](Self::save_pending); the sweep
    /// batches its mutations into one save per tenant.
    pub fn pending_mut(
        &mut self,
        tenant: TenantId,
    ) -> Result<&mut BTreeMap<SubjectId, PendingSubject>, StoreError> {
        Ok(&mut self.state_mut(tenant)?.pending)
    }

    /// Persist the cached pending collection, fully overwriting the record.
    pub fn save_pending(&mut self, tenant: TenantId) -> Result<(), StoreError> {
        let dir = self.tenant_dir(tenant);
        self.state_mut(tenant)?;
        let state = &self.cache[&tenant];
        write_record(&dir.join("pending.json"), &state.pending)
    }

    // ── Introduced set ──────────────────────────────────────────────

    pub fn introduced(&mut self, tenant: TenantId) -> Result<&BTreeSet<SubjectId>, StoreError> {
        Ok(&self.state_mut(tenant)?.introduced)
    }

    pub fn introduced_mut(
        &mut self,
        tenant: TenantId,
    ) -> Result<&mut BTreeSet<SubjectId>, StoreError> {
        Ok(&mut self.state_mut(tenant)?.introduced)
    }

    /// Persist the cached introduced set, fully overwriting the record.
    pub fn save_introduced(&mut self, tenant: TenantId) -> Result<(), StoreError> {
        let dir = self.tenant_dir(tenant);
        self.state_mut(tenant)?;
        let state = &self.cache[&tenant];
        write_record(&dir.join("introduced.json"), &state.introduced)
    }

    // ── Discovery ───────────────────────────────────────────────────

    /// Tenant ids with on-disk state or a live cache entry.
    pub fn known_tenants(&self) -> Vec<TenantId> {
        let mut ids: BTreeSet<TenantId> = self.cache.keys().copied().collect();
        if let Ok(entries) = fs::read_dir(self.data_dir.join("tenants")) {
            for entry in entries.flatten() {
                if let Some(id) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
                    ids.insert(id);
                }
            }
        }
        ids.into_iter().collect()
    }
}

// ── Record I/O ──────────────────────────────────────────────────────

/// Read a JSON record. `Ok(None)` when the file does not exist (first-run);
/// parse failures are surfaced, never treated as data loss.
fn load_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Atomically replace `path` with the serialized value: write a sibling
/// temp file, then rename over the destination.
fn write_record<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
