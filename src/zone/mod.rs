//! Zone isolation: the registry of the active zone, the per-zone behavior
//! (error handling, stack cleaning) and the task-interception policy.
//!
//! # Submodules
//!
//! - [`registry`]: id allocation and the single active-zone pointer
//! - [`spec`]: [`ZoneSpec`], the behavior shared by every zone a plugin forks
//! - [`interceptor`]: the hook consulted before every task invocation
//! - [`stack`]: backtrace cleaning

pub mod interceptor;
pub mod registry;
pub mod spec;
pub mod stack;

pub use interceptor::{
    InvokeTaskContext, LateTaskPolicy, LateTaskViolation, OnInvokeTask, RejectLateTasks,
    WarnLateTasks,
};
pub use registry::ZoneRegistry;
pub use spec::ZoneSpec;
pub use stack::StackCleaner;
