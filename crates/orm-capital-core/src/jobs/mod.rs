//! Job scheduling subsystem (§4.9, C10).

pub mod model;
pub mod scheduler;
pub mod webhook;

pub use model::{CalculationRequest, ExecutionMode, Job, JobStatus};
pub use scheduler::{CalculationWorker, JobOutcome, JobScheduler, SchedulerConfig};
pub use webhook::{deliver, WebhookSender};
