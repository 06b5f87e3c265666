/// Workflow Definition Layer
///
/// This module holds everything a successful load produces and the machinery
/// that validates it:
/// - Immutable definition types (Workflow, Schedule, SchedulingStrategy,
///   Trigger, ExternalService, Configuration)
/// - Scheduled-time helpers (slot alignment, time-token substitution)
/// - The definition builder (raw record -> validated Workflow)
/// - DSL re-serialization (Workflow -> addWorkflow call)
/// - Lock-free hot-reload registry using ArcSwap

// Core workflow definition types
pub mod types;

// Scheduled-time helpers
pub mod time;

// Raw record validation into frozen definitions
pub mod builder;

// Re-serialization of definitions back to the DSL
pub mod dsl;

// Hot-reload registry using ArcSwap for zero-downtime updates
pub mod registry;

// Re-export commonly used types
pub use builder::{build_workflow, Field, RawWorkflow};
pub use registry::WorkflowRegistry;
pub use types::{
    Configuration, ExternalService, Schedule, SchedulingStrategy, Trigger, Workflow,
};
