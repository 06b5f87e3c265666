/// Definition builder: raw record validation
///
/// The script evaluator collects each `addWorkflow` payload as a `RawWorkflow`
/// of field slots without judging it; this module turns one raw record into a
/// frozen `Workflow` or the complete list of its defects. All violations of a
/// record are reported in one pass, so a config author fixes everything in
/// one round trip instead of replaying the load per field.

use crate::error::{ConfigError, UNKNOWN_WORKFLOW_ID};
use crate::workflow::time::parse_scheduled_time;
use crate::workflow::types::{ExternalService, Schedule, SchedulingStrategy, Trigger, Workflow};
use std::collections::HashSet;

/// One field slot of a raw record.
///
/// `WrongKind` keeps the Lua-side description of what was actually there so
/// the resulting error message reads like the script.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Missing,
    Present(T),
    WrongKind { actual: String },
}

impl<T> Field<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }
}

/// The unvalidated payload of one `addWorkflow` call, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RawWorkflow {
    pub id: Field<String>,
    pub max_retry_count: Field<i64>,
    pub start_time: Field<String>,
    pub wait_timeout_seconds: Field<i64>,
    pub schedule: Field<Schedule>,
    pub scheduling_strategy: Field<SchedulingStrategy>,
    pub trigger: Field<Trigger>,
    pub external_service: Field<ExternalService>,
    /// Record keys outside the recognized set; warned about, never fatal.
    pub unknown_keys: Vec<String>,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Missing
    }
}

/// Validate one raw record into a frozen `Workflow`.
///
/// `accepted_ids` is the uniqueness scope: ids accepted earlier in the current
/// load pass plus any pre-existing ids the caller brings. On failure, every
/// defect found is returned, in validation order (presence, shape, ranges,
/// uniqueness).
pub fn build_workflow(
    raw: RawWorkflow,
    accepted_ids: &HashSet<String>,
) -> Result<Workflow, Vec<ConfigError>> {
    let mut errors = Vec::new();

    let workflow_id = match &raw.id {
        Field::Present(id) if !id.is_empty() => id.clone(),
        _ => UNKNOWN_WORKFLOW_ID.to_string(),
    };

    match &raw.id {
        Field::Missing => errors.push(ConfigError::MissingField {
            workflow_id: workflow_id.clone(),
            field: "id",
        }),
        Field::WrongKind { actual } => errors.push(ConfigError::InvalidFieldType {
            workflow_id: workflow_id.clone(),
            field: "id",
            expected: "a string",
            actual: actual.clone(),
        }),
        Field::Present(id) if id.is_empty() => errors.push(ConfigError::InvalidFieldType {
            workflow_id: workflow_id.clone(),
            field: "id",
            expected: "a non-empty string",
            actual: "an empty string".to_string(),
        }),
        Field::Present(_) => {}
    }

    for key in &raw.unknown_keys {
        tracing::warn!(
            "⚠️ Ignoring unknown field '{}' in workflow '{}'",
            key,
            workflow_id
        );
    }

    let schedule = take_required(
        raw.schedule,
        "schedule",
        "a schedule object",
        &workflow_id,
        &mut errors,
    );
    let scheduling_strategy = take_required(
        raw.scheduling_strategy,
        "schedulingStrategy",
        "a scheduling strategy object",
        &workflow_id,
        &mut errors,
    );
    let trigger = take_required(
        raw.trigger,
        "trigger",
        "a trigger object",
        &workflow_id,
        &mut errors,
    );
    let external_service = take_required(
        raw.external_service,
        "externalService",
        "an external service object",
        &workflow_id,
        &mut errors,
    );

    let max_retry_count = match raw.max_retry_count {
        Field::Missing => 0,
        Field::WrongKind { actual } => {
            errors.push(ConfigError::InvalidFieldType {
                workflow_id: workflow_id.clone(),
                field: "maxRetryCount",
                expected: "an integer",
                actual,
            });
            0
        }
        Field::Present(value) => match u32::try_from(value) {
            Ok(count) => count,
            Err(_) => {
                errors.push(ConfigError::InvalidRetryCount {
                    workflow_id: workflow_id.clone(),
                    value,
                });
                0
            }
        },
    };

    let start_time = match raw.start_time {
        Field::Missing => Workflow::default_start_time(),
        Field::WrongKind { actual } => {
            errors.push(ConfigError::InvalidFieldType {
                workflow_id: workflow_id.clone(),
                field: "startTime",
                expected: "a timestamp string",
                actual,
            });
            Workflow::default_start_time()
        }
        Field::Present(raw_time) => match parse_scheduled_time(&raw_time) {
            Some(t) => t,
            None => {
                errors.push(ConfigError::InvalidFieldType {
                    workflow_id: workflow_id.clone(),
                    field: "startTime",
                    expected: "an ISO-8601 UTC timestamp",
                    actual: format!("`{raw_time}`"),
                });
                Workflow::default_start_time()
            }
        },
    };

    let wait_timeout_seconds = match raw.wait_timeout_seconds {
        Field::Missing => None,
        Field::WrongKind { actual } => {
            errors.push(ConfigError::InvalidFieldType {
                workflow_id: workflow_id.clone(),
                field: "waitTimeoutSeconds",
                expected: "an integer",
                actual,
            });
            None
        }
        Field::Present(value) if value < 0 => {
            errors.push(ConfigError::InvalidFieldType {
                workflow_id: workflow_id.clone(),
                field: "waitTimeoutSeconds",
                expected: "a non-negative integer",
                actual: value.to_string(),
            });
            None
        }
        Field::Present(value) => Some(value),
    };

    if workflow_id != UNKNOWN_WORKFLOW_ID && accepted_ids.contains(&workflow_id) {
        errors.push(ConfigError::DuplicateId {
            id: workflow_id.clone(),
        });
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let (Some(schedule), Some(scheduling_strategy), Some(trigger), Some(external_service)) =
        (schedule, scheduling_strategy, trigger, external_service)
    else {
        // Unreachable: take_required records an error whenever it yields None.
        return Err(errors);
    };

    Ok(Workflow {
        id: workflow_id,
        schedule,
        scheduling_strategy,
        trigger,
        external_service,
        max_retry_count,
        start_time,
        wait_timeout_seconds,
    })
}

fn take_required<T>(
    field: Field<T>,
    name: &'static str,
    expected: &'static str,
    workflow_id: &str,
    errors: &mut Vec<ConfigError>,
) -> Option<T> {
    match field {
        Field::Present(value) => Some(value),
        Field::Missing => {
            errors.push(ConfigError::MissingField {
                workflow_id: workflow_id.to_string(),
                field: name,
            });
            None
        }
        Field::WrongKind { actual } => {
            errors.push(ConfigError::InvalidFieldType {
                workflow_id: workflow_id.to_string(),
                field: name,
                expected,
                actual,
            });
            None
        }
    }
}
