/// Configuration Script Layer
///
/// Sandboxed Lua evaluation of workflow configuration sources:
/// - The primitive builder registry (fixed catalog + defaults presets)
/// - The script evaluator (isolated per-source execution, ordered record
///   collection, structured error mapping)

// Primitive builder registry and defaults presets
pub mod builders;

// Sandboxed per-source evaluation
pub mod engine;

// Re-export commonly used types
pub use builders::{BuilderSpec, Preset, PrimitiveKind, PrimitiveRegistry, BUILDERS, PRESETS};
pub use engine::evaluate_source;
