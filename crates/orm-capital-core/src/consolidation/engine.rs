//! Entity-hierarchy walk and corporate-action BI adjustment (§4.5, C6).

use std::collections::{HashMap, HashSet};

use chrono::{Months, NaiveDate};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::entities::{ConsolidationLevel, CorporateAction, CorporateActionStatus, CorporateActionType, Entity};
use crate::error::OrmError;
use crate::types::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationRequest {
    pub parent_entity_id: String,
    pub consolidation_level: ConsolidationLevel,
    pub calculation_date: NaiveDate,
    pub include_subsidiaries: bool,
    pub include_corporate_actions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityContribution {
    pub entity_id: String,
    pub business_indicator: Money,
    pub losses: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisclosureItem {
    pub corporate_action_id: String,
    pub action_type: CorporateActionType,
    pub effective_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationResult {
    pub parent_entity_id: String,
    pub consolidation_level: ConsolidationLevel,
    pub calculation_date: NaiveDate,
    pub included_entities: Vec<String>,
    pub excluded_entities: Vec<String>,
    pub corporate_actions_applied: Vec<String>,
    pub consolidated_bi: Money,
    pub consolidated_losses: Money,
    pub entity_contributions: Vec<EntityContribution>,
    pub disclosure_items: Vec<DisclosureItem>,
}

/// Enforce the "entity hierarchy is a DAG-free forest" invariant (§9):
/// walk from `new_child` up through `parent_of` and fail if `new_parent`
/// is ever reached.
pub fn would_create_cycle(parent_of: &HashMap<String, String>, new_parent: &str, new_child: &str) -> bool {
    let mut current = new_parent.to_string();
    let mut seen = HashSet::new();
    loop {
        if current == new_child {
            return true;
        }
        if !seen.insert(current.clone()) {
            return true;
        }
        match parent_of.get(&current) {
            Some(next) => current = next.clone(),
            None => return false,
        }
    }
}

fn children_of<'a>(entities: &'a [Entity], parent_id: &str) -> Vec<&'a Entity> {
    entities
        .iter()
        .filter(|e| e.parent_entity_id.as_deref() == Some(parent_id))
        .collect()
}

fn descendants_of<'a>(entities: &'a [Entity], root_id: &str) -> Vec<&'a Entity> {
    let mut result = Vec::new();
    let mut frontier = vec![root_id.to_string()];
    let mut visited = HashSet::new();
    while let Some(id) = frontier.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        for child in children_of(entities, &id) {
            result.push(child);
            frontier.push(child.id.clone());
        }
    }
    result
}

/// Walk the tree rooted at `request.parent_entity_id`, decide per-node
/// inclusion by `(consolidation_level, hierarchy_depth, active_flag)`, apply
/// corporate-action BI adjustments, and emit the disclosure list (§4.5).
pub fn calculate_consolidated(
    entities: &[Entity],
    corporate_actions: &[CorporateAction],
    bi_by_entity: &HashMap<String, Money>,
    losses_by_entity: &HashMap<String, Money>,
    request: &ConsolidationRequest,
) -> Result<ConsolidationResult, OrmError> {
    let root = entities
        .iter()
        .find(|e| e.id == request.parent_entity_id)
        .ok_or_else(|| OrmError::InvalidInput {
            field: "parent_entity_id".to_string(),
            reason: format!("no such entity: {}", request.parent_entity_id),
        })?;

    let candidates: Vec<&Entity> = match request.consolidation_level {
        ConsolidationLevel::Subsidiary => vec![root],
        ConsolidationLevel::SubConsolidated => {
            let mut v = vec![root];
            if request.include_subsidiaries {
                v.extend(children_of(entities, &root.id));
            }
            v
        }
        ConsolidationLevel::Consolidated => {
            let mut v = vec![root];
            if request.include_subsidiaries {
                v.extend(descendants_of(entities, &root.id));
            }
            v
        }
    };

    let mut included_entities = Vec::new();
    let mut excluded_entities = Vec::new();
    let mut entity_contributions = Vec::new();
    let mut consolidated_bi = Money::ZERO;
    let mut consolidated_losses = Money::ZERO;

    for entity in candidates {
        if !entity.is_active {
            excluded_entities.push(entity.id.clone());
            continue;
        }
        included_entities.push(entity.id.clone());
        let bi = bi_by_entity.get(&entity.id).copied().unwrap_or(Money::ZERO);
        let losses = losses_by_entity.get(&entity.id).copied().unwrap_or(Money::ZERO);
        consolidated_bi += bi;
        consolidated_losses += losses;
        entity_contributions.push(EntityContribution {
            entity_id: entity.id.clone(),
            business_indicator: bi,
            losses,
        });
    }

    let mut corporate_actions_applied = Vec::new();
    let mut disclosure_items = Vec::new();

    if request.include_corporate_actions {
        for action in corporate_actions {
            if !included_entities.contains(&action.target_entity_id)
                && action.acquirer_entity_id.as_deref() != Some(root.id.as_str())
            {
                continue;
            }
            if action.status != CorporateActionStatus::Completed && action.status != CorporateActionStatus::RbiApproved {
                continue;
            }
            if action.effective_date > request.calculation_date {
                continue;
            }

            let target_bi = bi_by_entity.get(&action.target_entity_id).copied().unwrap_or(Money::ZERO);
            match action.action_type {
                CorporateActionType::Acquisition if action.prior_bi_inclusion_required => {
                    consolidated_bi += target_bi;
                    corporate_actions_applied.push(action.id.clone());
                }
                CorporateActionType::Divestiture if action.bi_exclusion_required => {
                    consolidated_bi -= action.ownership_percentage / dec!(100) * target_bi;
                    corporate_actions_applied.push(action.id.clone());
                }
                _ => {}
            }

            if let Some(window_start) = request
                .calculation_date
                .checked_sub_months(Months::new(action.disclosure_period_months))
            {
                if action.effective_date >= window_start {
                    disclosure_items.push(DisclosureItem {
                        corporate_action_id: action.id.clone(),
                        action_type: action.action_type,
                        effective_date: action.effective_date,
                    });
                }
            }
        }
    }

    Ok(ConsolidationResult {
        parent_entity_id: request.parent_entity_id.clone(),
        consolidation_level: request.consolidation_level,
        calculation_date: request.calculation_date,
        included_entities,
        excluded_entities,
        corporate_actions_applied,
        consolidated_bi,
        consolidated_losses,
        entity_contributions,
        disclosure_items,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn entity(id: &str, parent: Option<&str>, active: bool) -> Entity {
        Entity {
            id: id.to_string(),
            name: id.to_string(),
            entity_type: "bank".to_string(),
            parent_entity_id: parent.map(|p| p.to_string()),
            consolidation_level: ConsolidationLevel::Subsidiary,
            rbi_entity_code: None,
            lei_code: None,
            is_active: active,
            incorporation_date: None,
            regulatory_approval_date: None,
        }
    }

    #[test]
    fn detects_cycle_before_insertion() {
        let mut parent_of = HashMap::new();
        parent_of.insert("B".to_string(), "A".to_string());
        parent_of.insert("C".to_string(), "B".to_string());
        assert!(would_create_cycle(&parent_of, "C", "A"));
        assert!(!would_create_cycle(&parent_of, "A", "D"));
    }

    #[test]
    fn subsidiary_level_includes_only_root() {
        let entities = vec![entity("P", None, true), entity("C1", Some("P"), true)];
        let mut bi = HashMap::new();
        bi.insert("P".to_string(), dec!(100));
        bi.insert("C1".to_string(), dec!(50));
        let request = ConsolidationRequest {
            parent_entity_id: "P".to_string(),
            consolidation_level: ConsolidationLevel::Subsidiary,
            calculation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            include_subsidiaries: true,
            include_corporate_actions: false,
        };
        let result = calculate_consolidated(&entities, &[], &bi, &HashMap::new(), &request).unwrap();
        assert_eq!(result.included_entities, vec!["P".to_string()]);
        assert_eq!(result.consolidated_bi, dec!(100));
    }

    #[test]
    fn inactive_entities_are_always_excluded() {
        let entities = vec![entity("P", None, true), entity("C1", Some("P"), false)];
        let mut bi = HashMap::new();
        bi.insert("P".to_string(), dec!(100));
        bi.insert("C1".to_string(), dec!(50));
        let request = ConsolidationRequest {
            parent_entity_id: "P".to_string(),
            consolidation_level: ConsolidationLevel::Consolidated,
            calculation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            include_subsidiaries: true,
            include_corporate_actions: false,
        };
        let result = calculate_consolidated(&entities, &[], &bi, &HashMap::new(), &request).unwrap();
        assert_eq!(result.included_entities, vec!["P".to_string()]);
        assert_eq!(result.excluded_entities, vec!["C1".to_string()]);
        assert_eq!(result.consolidated_bi, dec!(100));
    }
}
