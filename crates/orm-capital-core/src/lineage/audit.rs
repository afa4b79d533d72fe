//! Lineage and audit subsystem (§4.8, C9).

use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::OrmError;

use super::hash::{chain_hash, sha256_of, CHAIN_SEED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    CalculationStarted,
    DataInputTracked,
    ParameterVersionsRecorded,
    CalculationCompleted,
    CalculationFailed,
}

/// One hash-chained row (§3 `AuditTrail`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRow {
    pub run_id: String,
    pub operation: AuditOperation,
    pub initiator: String,
    pub timestamp: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_hash: Option<String>,
    pub environment_hash: String,
    pub parameter_versions: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub immutable_hash: String,
}

/// Content hashed into `immutable_hash`, excluding the hash field itself.
#[derive(Debug, Clone, Serialize)]
struct AuditRowContent<'a> {
    run_id: &'a str,
    operation: AuditOperation,
    initiator: &'a str,
    timestamp: NaiveDateTime,
    input_hash: &'a Option<String>,
    output_hash: &'a Option<String>,
    environment_hash: &'a str,
    parameter_versions: &'a HashMap<String, String>,
    model_version: &'a Option<String>,
}

/// `environment_hash = SHA256(code_version, parameter_snapshot_digest,
/// platform_identifier, library_versions)` (§4.8).
pub fn environment_hash(code_version: &str, parameter_snapshot_digest: &str, platform_identifier: &str, library_versions: &str) -> String {
    sha256_of(&(code_version, parameter_snapshot_digest, platform_identifier, library_versions)).expect("tuple serialization cannot fail")
}

/// A completed run's full lineage (§4.8 `LineageRecord`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageRecord {
    pub run_id: String,
    pub final_outputs: serde_json::Value,
    pub intermediates: serde_json::Value,
    pub parameter_versions: HashMap<String, String>,
    pub model_versions: Vec<String>,
    pub input_aggregates: serde_json::Value,
    pub included_loss_ids: Vec<String>,
    pub environment_hash: String,
}

impl LineageRecord {
    /// Reproducible iff all six required components are non-empty (§4.8).
    pub fn reproducible(&self) -> bool {
        self.reproducibility_score() == 1.0
    }

    pub fn reproducibility_score(&self) -> f64 {
        let components: [bool; 6] = [
            !self.final_outputs.is_null(),
            !self.intermediates.is_null(),
            !self.parameter_versions.is_empty(),
            !self.model_versions.is_empty(),
            !self.input_aggregates.is_null(),
            !self.environment_hash.is_empty(),
        ];
        components.iter().filter(|present| **present).count() as f64 / components.len() as f64
    }
}

/// Append-only per-`run_id` audit chain, guarded by a lock per run so the
/// previous-hash read and new-hash write are atomic (§9).
#[derive(Default)]
pub struct AuditLedger {
    chains: Mutex<HashMap<String, Vec<AuditRow>>>,
}

impl AuditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to `run_id`'s chain, computing its `immutable_hash`
    /// from the chain's current tip.
    pub async fn append(
        &self,
        run_id: &str,
        operation: AuditOperation,
        initiator: &str,
        input_hash: Option<String>,
        output_hash: Option<String>,
        environment_hash: String,
        parameter_versions: HashMap<String, String>,
        model_version: Option<String>,
    ) -> Result<AuditRow, OrmError> {
        let mut chains = self.chains.lock().await;
        let chain = chains.entry(run_id.to_string()).or_default();
        let prior_hash = chain.last().map(|r| r.immutable_hash.clone()).unwrap_or_else(|| CHAIN_SEED.to_string());
        let timestamp = Utc::now().naive_utc();

        let content = AuditRowContent {
            run_id,
            operation,
            initiator,
            timestamp,
            input_hash: &input_hash,
            output_hash: &output_hash,
            environment_hash: &environment_hash,
            parameter_versions: &parameter_versions,
            model_version: &model_version,
        };
        let immutable_hash = chain_hash(&prior_hash, &content)?;

        let row = AuditRow {
            run_id: run_id.to_string(),
            operation,
            initiator: initiator.to_string(),
            timestamp,
            input_hash,
            output_hash,
            environment_hash,
            parameter_versions,
            model_version,
            immutable_hash,
        };
        chain.push(row.clone());
        tracing::debug!("audit row appended to run {run_id}: {operation:?}");
        Ok(row)
    }

    pub async fn chain_for(&self, run_id: &str) -> Vec<AuditRow> {
        self.chains.lock().await.get(run_id).cloned().unwrap_or_default()
    }

    /// Recompute each row's `immutable_hash` from its content plus its
    /// predecessor; per-row validity plus the overall conjunction (§4.8).
    pub async fn verify_integrity(&self, run_id: &str) -> Result<(bool, Vec<bool>), OrmError> {
        let chain = self.chain_for(run_id).await;
        if chain.is_empty() {
            return Err(OrmError::LineageNotFound(run_id.to_string()));
        }
        let mut per_row = Vec::with_capacity(chain.len());
        let mut prior_hash = CHAIN_SEED.to_string();
        for row in &chain {
            let content = AuditRowContent {
                run_id: &row.run_id,
                operation: row.operation,
                initiator: &row.initiator,
                timestamp: row.timestamp,
                input_hash: &row.input_hash,
                output_hash: &row.output_hash,
                environment_hash: &row.environment_hash,
                parameter_versions: &row.parameter_versions,
                model_version: &row.model_version,
            };
            let recomputed = chain_hash(&prior_hash, &content)?;
            per_row.push(recomputed == row.immutable_hash);
            prior_hash = row.immutable_hash.clone();
        }
        let overall = per_row.iter().all(|valid| *valid);
        if !overall {
            tracing::warn!("audit chain for run {run_id} failed integrity verification");
        }
        Ok((overall, per_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chain_recomputation_matches_stored_hashes() {
        let ledger = AuditLedger::new();
        ledger
            .append(
                "RUN1",
                AuditOperation::CalculationStarted,
                "system",
                Some("inhash".to_string()),
                None,
                "envhash".to_string(),
                HashMap::new(),
                None,
            )
            .await
            .unwrap();
        ledger
            .append(
                "RUN1",
                AuditOperation::CalculationCompleted,
                "system",
                None,
                Some("outhash".to_string()),
                "envhash".to_string(),
                HashMap::new(),
                Some("v1".to_string()),
            )
            .await
            .unwrap();

        let (overall, per_row) = ledger.verify_integrity("RUN1").await.unwrap();
        assert!(overall);
        assert!(per_row.iter().all(|v| *v));
    }

    #[tokio::test]
    async fn tampered_row_fails_integrity() {
        let ledger = AuditLedger::new();
        ledger
            .append("RUN2", AuditOperation::CalculationStarted, "system", None, None, "envhash".to_string(), HashMap::new(), None)
            .await
            .unwrap();
        {
            let mut chains = ledger.chains.lock().await;
            let row = &mut chains.get_mut("RUN2").unwrap()[0];
            row.initiator = "tampered".to_string();
        }
        let (overall, _) = ledger.verify_integrity("RUN2").await.unwrap();
        assert!(!overall);
    }

    #[test]
    fn reproducibility_score_is_fraction_present() {
        let record = LineageRecord {
            run_id: "RUN1".to_string(),
            final_outputs: serde_json::json!({"orc": "100"}),
            intermediates: serde_json::Value::Null,
            parameter_versions: HashMap::new(),
            model_versions: vec!["sma-v1".to_string()],
            input_aggregates: serde_json::json!({"count": 5}),
            included_loss_ids: vec![],
            environment_hash: "abc".to_string(),
        };
        assert!(!record.reproducible());
        assert!((record.reproducibility_score() - (3.0 / 6.0)).abs() < 1e-9);
    }
}
