//! RBI Basel III operational-risk capital engine: SMA, BIA and TSA
//! calculation, loss-data governance, parameter governance, supervisor
//! overrides, consolidation, lineage/audit and the analytics engine.

pub mod analytics;
pub mod calculation;
pub mod consolidation;
pub mod decimal;
pub mod entities;
pub mod error;
pub mod jobs;
pub mod lineage;
pub mod loss_data;
pub mod overrides;
pub mod parameters;
pub mod types;

pub use error::OrmError;
pub use types::*;

/// Standard result type for every operational-risk-capital operation.
pub type OrmResult<T> = Result<T, OrmError>;
