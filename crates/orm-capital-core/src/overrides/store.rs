//! In-memory override store (§4.7).

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::model::{OverrideAuditLog, OverrideStatus, SupervisorOverride};

#[derive(Default)]
pub struct OverrideStore {
    overrides: RwLock<HashMap<String, SupervisorOverride>>,
    audit: RwLock<Vec<OverrideAuditLog>>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, override_: SupervisorOverride) {
        self.overrides.write().await.insert(override_.id.clone(), override_);
    }

    pub async fn get(&self, id: &str) -> Option<SupervisorOverride> {
        self.overrides.read().await.get(id).cloned()
    }

    pub(crate) async fn replace(&self, override_: SupervisorOverride) {
        self.overrides.write().await.insert(override_.id.clone(), override_);
    }

    pub async fn record_audit(&self, row: OverrideAuditLog) {
        self.audit.write().await.push(row);
    }

    pub async fn audit_for(&self, override_id: &str) -> Vec<OverrideAuditLog> {
        self.audit
            .read()
            .await
            .iter()
            .filter(|r| r.override_id == override_id)
            .cloned()
            .collect()
    }

    /// Overrides currently `applied` for an entity whose effective window
    /// covers `date`, optionally scoped to a specific run (§4.7 application).
    pub async fn active_for_entity(
        &self,
        entity_id: &str,
        date: chrono::NaiveDate,
        run_id: Option<&str>,
    ) -> Vec<SupervisorOverride> {
        self.overrides
            .read()
            .await
            .values()
            .filter(|o| {
                o.entity_id == entity_id
                    && o.status == OverrideStatus::Applied
                    && o.effective_from <= date
                    && o.effective_to.map_or(true, |to| date <= to)
                    && o.calculation_run_id.as_deref().map_or(true, |r| Some(r) == run_id)
            })
            .cloned()
            .collect()
    }
}
