/// Gantry: Lua-configured batch workflow scheduling core
///
/// This library is the workflow definition loader of a batch scheduling
/// system: it evaluates sandboxed Lua configuration scripts, resolves a fixed
/// catalog of builder primitives into closed polymorphic types, validates the
/// declared records into immutable workflow definitions, and publishes them
/// through a lock-free hot-reload registry for the scheduler to consume.

// Loader configuration
pub mod config;

// Structured configuration errors
pub mod error;

// Load orchestration: collect-then-validate per source, directory loading
pub mod loader;

// Sandboxed Lua evaluation and the primitive builder registry
pub mod script;

// Workflow definition model, validation, and hot-reload registry
pub mod workflow;

// Re-export commonly used types for external consumers
pub use config::LoaderConfig;
pub use error::{ConfigError, SourceError, UNKNOWN_WORKFLOW_ID};
pub use loader::{DirectoryLoad, Loader};
pub use script::PrimitiveRegistry;
pub use workflow::{
    Configuration, ExternalService, Schedule, SchedulingStrategy, Trigger, Workflow,
    WorkflowRegistry,
};
