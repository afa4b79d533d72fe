//! In-memory parameter store (§4.2). Backed by `tokio::sync::RwLock` so the
//! active pointer swap in [`super::workflow::activate`] is a single
//! linearizable transaction, matching §5's "no window with two actives".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::OrmError;
use crate::types::Methodology;

use super::defaults::seed_defaults;
use super::model::{
    ParameterConfiguration, ParameterStatus, ParameterType, ParameterVersion, ParameterWorkflowStep,
};

fn config_key(model: Methodology, parameter_name: &str) -> String {
    format!("{model}:{parameter_name}")
}

/// A point-in-time read of every active parameter for one methodology,
/// including the version ids observed — a calculation captures exactly this
/// snapshot so its lineage can cite the parameter versions used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub model_name: Methodology,
    pub values: HashMap<String, serde_json::Value>,
    pub version_ids: HashMap<String, String>,
}

impl ParameterSnapshot {
    pub fn decimal(&self, name: &str) -> Result<rust_decimal::Decimal, OrmError> {
        let v = self
            .values
            .get(name)
            .ok_or_else(|| OrmError::MissingRequiredField { field: name.to_string() })?;
        serde_json::from_value(v.clone()).map_err(|e| OrmError::InvalidInput {
            field: name.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn boolean(&self, name: &str) -> Result<bool, OrmError> {
        let v = self
            .values
            .get(name)
            .ok_or_else(|| OrmError::MissingRequiredField { field: name.to_string() })?;
        serde_json::from_value(v.clone()).map_err(|e| OrmError::InvalidInput {
            field: name.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn integer(&self, name: &str) -> Result<u32, OrmError> {
        let v = self
            .values
            .get(name)
            .ok_or_else(|| OrmError::MissingRequiredField { field: name.to_string() })?;
        serde_json::from_value(v.clone()).map_err(|e| OrmError::InvalidInput {
            field: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// A request to change a single parameter's value, the first step of the
/// maker-checker-approver-activator workflow (§4.6).
#[derive(Debug, Clone)]
pub struct ProposeChange {
    pub model_name: Methodology,
    pub parameter_name: String,
    pub parameter_type: ParameterType,
    pub new_value: serde_json::Value,
    pub created_by: String,
    pub justification: Option<String>,
}

pub struct ParameterStore {
    versions: RwLock<HashMap<String, ParameterVersion>>,
    config: RwLock<ParameterConfiguration>,
    steps: RwLock<Vec<ParameterWorkflowStep>>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        let mut versions = HashMap::new();
        let mut config = ParameterConfiguration::default();
        for v in seed_defaults() {
            let key = config_key(v.model_name, &v.parameter_name);
            config.active_version_id.insert(key, v.version_id.clone());
            versions.insert(v.version_id.clone(), v);
        }
        Self {
            versions: RwLock::new(versions),
            config: RwLock::new(config),
            steps: RwLock::new(Vec::new()),
        }
    }

    pub(crate) async fn record_step(&self, step: ParameterWorkflowStep) {
        self.steps.write().await.push(step);
    }

    pub async fn steps_for(&self, version_id: &str) -> Vec<ParameterWorkflowStep> {
        self.steps
            .read()
            .await
            .iter()
            .filter(|s| s.version_id == version_id)
            .cloned()
            .collect()
    }

    pub async fn get_active(&self, model_name: Methodology) -> ParameterSnapshot {
        let config = self.config.read().await;
        let versions = self.versions.read().await;
        let mut values = HashMap::new();
        let mut version_ids = HashMap::new();
        let prefix = format!("{model_name}:");
        for (key, version_id) in config.active_version_id.iter() {
            if !key.starts_with(&prefix) {
                continue;
            }
            if let Some(version) = versions.get(version_id) {
                let parameter_name = key.trim_start_matches(&prefix).to_string();
                values.insert(parameter_name.clone(), version.value.clone());
                version_ids.insert(parameter_name, version_id.clone());
            }
        }
        ParameterSnapshot {
            model_name,
            values,
            version_ids,
        }
    }

    pub async fn get_version(&self, version_id: &str) -> Option<ParameterVersion> {
        self.versions.read().await.get(version_id).cloned()
    }

    pub async fn history(&self, model_name: Methodology, parameter_name: &str) -> Vec<ParameterVersion> {
        let versions = self.versions.read().await;
        let mut rows: Vec<ParameterVersion> = versions
            .values()
            .filter(|v| v.model_name == model_name && v.parameter_name == parameter_name)
            .cloned()
            .collect();
        rows.sort_by_key(|v| v.version_number);
        rows
    }

    pub async fn active_version_id(&self, model_name: Methodology, parameter_name: &str) -> Option<String> {
        self.config
            .read()
            .await
            .active_version_id
            .get(&config_key(model_name, parameter_name))
            .cloned()
    }

    /// Create a new `draft` version parented on the current active one.
    pub async fn propose(&self, change: ProposeChange) -> Result<String, OrmError> {
        let history = self.history(change.model_name, &change.parameter_name).await;
        let next_number = history.iter().map(|v| v.version_number).max().unwrap_or(0) + 1;
        let parent = self
            .active_version_id(change.model_name, &change.parameter_name)
            .await;
        let previous_value = match &parent {
            Some(id) => self.get_version(id).await.map(|v| v.value),
            None => None,
        };
        let version_id = format!("{}:{}:v{}", change.model_name, change.parameter_name, next_number);
        let version = ParameterVersion {
            version_id: version_id.clone(),
            model_name: change.model_name,
            parameter_name: change.parameter_name,
            parameter_type: change.parameter_type,
            value: change.new_value,
            previous_value,
            version_number: next_number,
            parent_version_id: parent,
            status: ParameterStatus::Draft,
            effective_date: None,
            expiry_date: None,
            created_by: change.created_by,
            reviewed_by: None,
            approved_by: None,
            justification: change.justification,
            immutable_diff: None,
            requires_rbi_notification: false,
            rbi_notification_reference: None,
        };
        self.versions.write().await.insert(version_id.clone(), version);
        Ok(version_id)
    }

    pub(crate) async fn replace(&self, version: ParameterVersion) {
        self.versions.write().await.insert(version.version_id.clone(), version);
    }

    /// Atomically swap the active pointer, superseding the previous holder.
    pub(crate) async fn swap_active(
        &self,
        model_name: Methodology,
        parameter_name: &str,
        new_version_id: &str,
    ) -> Result<(), OrmError> {
        let key = config_key(model_name, parameter_name);
        let mut config = self.config.write().await;
        let mut versions = self.versions.write().await;
        if let Some(old_id) = config.active_version_id.get(&key).cloned() {
            if let Some(old) = versions.get_mut(&old_id) {
                old.status = ParameterStatus::Superseded;
            }
        }
        config.active_version_id.insert(key, new_version_id.to_string());
        Ok(())
    }
}
