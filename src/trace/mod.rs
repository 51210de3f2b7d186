//! Causal tracing for zone diagnostics.
//!
//! Every task carries a bounded [`CausalTrace`]: the chain of task
//! invocations that led to it being scheduled. When a task is rejected for
//! running outside its zone, the trace is rendered together with the owning
//! test's completion marker so the report points back at where the stray work
//! came from.
//!
//! # Submodules
//!
//! - [`causal`]: the bounded trace and its entries

pub mod causal;

pub use causal::{CausalTrace, TraceEntry, DEFAULT_TRACE_LIMIT};
