//! Loss-data governance (§4.3, C3).

pub mod model;
pub mod service;

pub use model::{BusinessIndicator, ExclusionReason, LossEvent, Recovery, RbiApprovalMetadata};
pub use service::LossDataStore;
