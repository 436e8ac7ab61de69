//! Workflow registry, intent classification, the concurrent worker pool,
//! and the finalizer/notifier that closes out a task.

mod classifier;
mod config;
mod error;
mod exec;
mod finalize;
mod ids;
mod intake;
mod pool;
mod registry;

pub use classifier::classify;
pub use config::WorkflowConfig;
pub use error::{IntakeError, WorkflowError};
pub use exec::{run_workflow, trim_output, ExecOutcome};
pub use finalize::{FinalizeRequest, Finalizer};
pub use ids::mint_task_id;
pub use intake::{Intake, IntakeRequest, IntakeResult};
pub use pool::WorkerPool;
pub use registry::{WorkflowDefinition, WorkflowRegistry};
