//! Parameter store and governance workflow (§4.2, §4.6, C2/C8).

pub mod defaults;
pub mod model;
pub mod store;
pub mod workflow;

pub use model::{
    ImpactAnalysis, ImpactMagnitude, ParameterConfiguration, ParameterStatus, ParameterType,
    ParameterVersion, ParameterWorkflowStep, WorkflowRole,
};
pub use store::{ParameterSnapshot, ParameterStore, ProposeChange};

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::types::Methodology;

    use super::*;

    #[tokio::test]
    async fn happy_path_activation_supersedes_previous() {
        let store = ParameterStore::new();
        let before = store.get_active(Methodology::Sma).await;
        assert_eq!(before.decimal("marginal_coefficient_bucket_1").unwrap(), rust_decimal_macros::dec!(0.12));

        let version_id = workflow::propose(
            &store,
            ProposeChange {
                model_name: Methodology::Sma,
                parameter_name: "marginal_coefficient_bucket_1".to_string(),
                parameter_type: ParameterType::Coefficient,
                new_value: serde_json::json!(rust_decimal_macros::dec!(0.13)),
                created_by: "maker1".to_string(),
                justification: Some("recalibration".to_string()),
            },
        )
        .await
        .unwrap();

        workflow::submit_for_review(&store, &version_id, "maker1").await.unwrap();
        workflow::checker_approve(&store, &version_id, "checker1", None).await.unwrap();
        workflow::submit_for_approval(&store, &version_id, "checker1").await.unwrap();
        workflow::approver_approve(&store, &version_id, "approver1", Some("RBI-REF-1".to_string()))
            .await
            .unwrap();
        let activated = workflow::activate(&store, &version_id, "activator1", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(activated.status, ParameterStatus::Active);

        let previous_id = activated.parent_version_id.clone().unwrap();
        let previous = store.get_version(&previous_id).await.unwrap();
        assert_eq!(previous.status, ParameterStatus::Superseded);

        let after = store.get_active(Methodology::Sma).await;
        assert_eq!(after.decimal("marginal_coefficient_bucket_1").unwrap(), rust_decimal_macros::dec!(0.13));

        let steps = store.steps_for(&version_id).await;
        assert_eq!(steps.len(), 6);

        let rollback_id = workflow::rollback(&store, &previous_id, "maker1").await.unwrap();
        let rollback_version = store.get_version(&rollback_id).await.unwrap();
        assert_eq!(rollback_version.value, previous.value);
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected() {
        let store = ParameterStore::new();
        let version_id = workflow::propose(
            &store,
            ProposeChange {
                model_name: Methodology::Bia,
                parameter_name: "alpha".to_string(),
                parameter_type: ParameterType::Coefficient,
                new_value: serde_json::json!(rust_decimal_macros::dec!(0.2)),
                created_by: "maker1".to_string(),
                justification: None,
            },
        )
        .await
        .unwrap();

        let err = workflow::checker_approve(&store, &version_id, "checker1", None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PARAMETER_WORKFLOW_INVALID_TRANSITION");
    }
}
