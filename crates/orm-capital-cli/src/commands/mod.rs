pub mod analytics;
pub mod calculation;
pub mod consolidation;
pub mod jobs;
pub mod lineage;
pub mod loss_data;
pub mod overrides;
pub mod parameters;
