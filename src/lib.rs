//! Role-gated approval workflows: HR staffing requests, budget negotiations, event
//! application reviews and department tasks, each with an append-only audit history.

pub mod budget;
pub mod config;
pub mod error;
pub mod event;
pub mod history;
pub mod hr;
pub mod registry;
pub mod role;
pub mod service;
pub mod task;

pub use config::EngineConfig;
pub use error::{ValidationError, WorkflowError};
pub use registry::{Summary, Workflow, WorkflowKind};
pub use service::WorkflowService;
