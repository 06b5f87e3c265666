/// Structured configuration errors for the workflow definition loader
///
/// Every failure during script evaluation or definition validation maps to one
/// of these kinds. Nothing is silently coerced or dropped: the caller receives
/// the offending workflow id (or the explicit `unknown` marker), the violated
/// rule, and enough context to display the error without further lookup.

use thiserror::Error;

/// Marker used in place of a workflow id when a record carries no usable id.
pub const UNKNOWN_WORKFLOW_ID: &str = "unknown";

/// One configuration defect found while loading a source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Malformed Lua source. The message carries the chunk name and line
    /// as reported by the Lua parser.
    #[error("syntax error: {message}")]
    Syntax { message: String },

    /// Uncaught evaluation-time error that is not one of the structured kinds.
    #[error("script error: {message}")]
    Script { message: String },

    /// A script referenced a builder (or any global) the registry does not
    /// provide. Also raised for namespaced builders used without the
    /// corresponding importDefaults call.
    #[error("unknown builder `{name}`")]
    UnknownBuilder { name: String },

    /// importDefaults was called with a preset name outside the enumerable
    /// preset list.
    #[error("unknown defaults preset `{name}`")]
    UnknownPreset { name: String },

    /// A builder was called with bad arity, a wrongly typed argument, or an
    /// argument violating a builder-specific constraint.
    #[error("builder `{builder}`: {reason}")]
    BuilderArgument { builder: &'static str, reason: String },

    /// A required workflow record field is absent.
    #[error("workflow `{workflow_id}`: missing required field `{field}`")]
    MissingField {
        workflow_id: String,
        field: &'static str,
    },

    /// A workflow record field is present but of the wrong kind.
    #[error("workflow `{workflow_id}`: field `{field}` must be {expected}, got {actual}")]
    InvalidFieldType {
        workflow_id: String,
        field: &'static str,
        expected: &'static str,
        actual: String,
    },

    /// maxRetryCount is present but not a non-negative integer in range.
    #[error("workflow `{workflow_id}`: invalid maxRetryCount {value} (must be a non-negative integer)")]
    InvalidRetryCount { workflow_id: String, value: i64 },

    /// A workflow id collides with one accepted earlier in the load pass or
    /// with the caller-provided pre-existing id set.
    #[error("duplicate workflow id `{id}`")]
    DuplicateId { id: String },

    /// A workflow source file could not be read during a directory load.
    #[error("io error reading `{path}`: {message}")]
    Io { path: String, message: String },
}

/// Everything that went wrong in one configuration source.
///
/// A failing source registers zero workflows; the errors are reported together
/// so a single fix-review cycle can address all of them.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("configuration source `{source_id}`: {}", join_errors(.errors))]
pub struct SourceError {
    /// Identifier of the failing source (typically its file name).
    pub source_id: String,
    /// Every defect found in the source, in validation order.
    pub errors: Vec<ConfigError>,
}

impl SourceError {
    pub fn new(source_id: impl Into<String>, errors: Vec<ConfigError>) -> Self {
        Self {
            source_id: source_id.into(),
            errors,
        }
    }

    /// Convenience for the common single-error case.
    pub fn single(source_id: impl Into<String>, error: ConfigError) -> Self {
        Self::new(source_id, vec![error])
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
