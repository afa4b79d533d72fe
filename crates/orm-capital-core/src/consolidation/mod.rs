//! Consolidation engine (§4.5, C6).

pub mod engine;

pub use engine::{
    calculate_consolidated, would_create_cycle, ConsolidationRequest, ConsolidationResult, DisclosureItem,
    EntityContribution,
};
