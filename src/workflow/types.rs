/// Core workflow definition types
///
/// Defines the immutable result of a successful configuration load: the
/// `Workflow` definition plus the closed polymorphic kinds it references
/// (Schedule, SchedulingStrategy, Trigger, ExternalService). Each kind is a
/// tagged enum selected by builder name; the loader never dispatches through
/// reflection or trait objects. All types serialize to JSON with the same
/// camelCase keys the configuration DSL uses.

use crate::error::ConfigError;
use crate::workflow::time::{full_hour, full_minute, replace_time_tokens};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// A validated, frozen workflow definition.
///
/// Produced once per `addWorkflow` record by the definition builder and never
/// mutated afterwards. Ownership transfers to the consuming scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique workflow identifier (e.g., "file-copy-with-bad-output").
    pub id: String,
    /// Temporal cadence at which the workflow becomes due.
    pub schedule: Schedule,
    /// Policy governing concurrent execution of due slots.
    pub scheduling_strategy: SchedulingStrategy,
    /// Readiness predicate checked before a due slot may run.
    pub trigger: Trigger,
    /// Remote system that performs the work once triggered.
    pub external_service: ExternalService,
    /// How many times a failed slot may be retried. Defaults to 0.
    pub max_retry_count: u32,
    /// Earliest slot time the scheduler will consider. Defaults to the epoch.
    pub start_time: DateTime<Utc>,
    /// How long a slot may wait for its trigger before timing out.
    /// None means wait forever.
    pub wait_timeout_seconds: Option<i64>,
}

impl Workflow {
    /// Default for `startTime` when a record omits it: consider all slots.
    pub fn default_start_time() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }
}

/// The temporal cadence of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Schedule {
    /// A slot at every full hour.
    Hourly,
    /// A slot at every full minute.
    Minutely,
    /// Slots described by a cron expression (seconds-resolution grammar).
    Cron { expression: String },
}

impl Schedule {
    pub fn hourly() -> Self {
        Schedule::Hourly
    }

    pub fn minutely() -> Self {
        Schedule::Minutely
    }

    /// Build a cron schedule, validating the expression at construction time.
    pub fn cron(expression: &str) -> Result<Self, ConfigError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(ConfigError::BuilderArgument {
                builder: "cronSchedule",
                reason: "cron expression must be non-empty".to_string(),
            });
        }
        cron::Schedule::from_str(expression).map_err(|e| ConfigError::BuilderArgument {
            builder: "cronSchedule",
            reason: format!("invalid cron expression `{expression}`: {e}"),
        })?;
        Ok(Schedule::Cron {
            expression: expression.to_string(),
        })
    }

    /// The slot times of this schedule within `[start, end)`, in order.
    ///
    /// Pure time arithmetic; the scheduler decides what to do with the slots.
    pub fn times_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        match self {
            Schedule::Hourly => aligned_times(start, end, full_hour, Duration::hours(1)),
            Schedule::Minutely => aligned_times(start, end, full_minute, Duration::minutes(1)),
            Schedule::Cron { expression } => {
                // The expression was validated at construction; an unparseable
                // one here can only mean the value was deserialized from an
                // untrusted document, so yield no slots rather than guess.
                let Ok(parsed) = cron::Schedule::from_str(expression) else {
                    return Vec::new();
                };
                parsed
                    .after(&(start - Duration::seconds(1)))
                    .take_while(|t| *t < end)
                    .collect()
            }
        }
    }
}

fn aligned_times(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    align: fn(DateTime<Utc>) -> DateTime<Utc>,
    step: Duration,
) -> Vec<DateTime<Utc>> {
    let mut t = align(start);
    if t < start {
        t += step;
    }
    let mut times = Vec::new();
    while t < end {
        times.push(t);
        t += step;
    }
    times
}

/// Whether multiple due slots of one workflow may run simultaneously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SchedulingStrategy {
    /// At most one slot of the workflow runs at a time, oldest first.
    Serial,
    /// All ready slots may run simultaneously.
    Concurrent,
}

/// The readiness predicate of a slot.
///
/// The loader only constructs and validates triggers; polling them against
/// external systems is the scheduler's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Trigger {
    /// Always ready.
    Always,
    /// Ready when a path (rendered per slot time) exists on a filesystem.
    HdfsCheck { path: String, fs: String },
    /// Ready when all nested triggers are ready.
    And { triggers: Vec<Trigger> },
    /// Ready when at least one nested trigger is ready.
    Or { triggers: Vec<Trigger> },
    /// Ready when the nested trigger is not ready.
    Not { trigger: Box<Trigger> },
    /// Ready once the slot time lies the given number of seconds in the past.
    Delay { seconds: i64 },
    /// Evaluates the nested trigger at the slot time shifted by an offset.
    Offset { seconds: i64, trigger: Box<Trigger> },
    /// Ready when the slot of another workflow at the same time succeeded.
    Success { workflow_id: String },
}

impl Trigger {
    pub fn always() -> Self {
        Trigger::Always
    }

    /// Path-existence trigger against a target filesystem. The path template
    /// may contain `${year}`-style time tokens.
    pub fn hdfs_check(path: &str, fs: &str) -> Result<Self, ConfigError> {
        if path.is_empty() {
            return Err(ConfigError::BuilderArgument {
                builder: "hdfsCheckTrigger",
                reason: "path template must be non-empty".to_string(),
            });
        }
        if fs.is_empty() {
            return Err(ConfigError::BuilderArgument {
                builder: "hdfsCheckTrigger",
                reason: "filesystem address must be non-empty".to_string(),
            });
        }
        Ok(Trigger::HdfsCheck {
            path: path.to_string(),
            fs: fs.to_string(),
        })
    }

    pub fn and(triggers: Vec<Trigger>) -> Result<Self, ConfigError> {
        if triggers.is_empty() {
            return Err(ConfigError::BuilderArgument {
                builder: "andTrigger",
                reason: "requires at least one nested trigger".to_string(),
            });
        }
        Ok(Trigger::And { triggers })
    }

    pub fn or(triggers: Vec<Trigger>) -> Result<Self, ConfigError> {
        if triggers.is_empty() {
            return Err(ConfigError::BuilderArgument {
                builder: "orTrigger",
                reason: "requires at least one nested trigger".to_string(),
            });
        }
        Ok(Trigger::Or { triggers })
    }

    pub fn not(trigger: Trigger) -> Self {
        Trigger::Not {
            trigger: Box::new(trigger),
        }
    }

    pub fn delay(seconds: i64) -> Result<Self, ConfigError> {
        if seconds < 0 {
            return Err(ConfigError::BuilderArgument {
                builder: "delayTrigger",
                reason: format!("delay must be non-negative, got {seconds}"),
            });
        }
        Ok(Trigger::Delay { seconds })
    }

    pub fn offset(seconds: i64, trigger: Trigger) -> Self {
        Trigger::Offset {
            seconds,
            trigger: Box::new(trigger),
        }
    }

    pub fn success(workflow_id: &str) -> Result<Self, ConfigError> {
        if workflow_id.is_empty() {
            return Err(ConfigError::BuilderArgument {
                builder: "successTrigger",
                reason: "workflow id must be non-empty".to_string(),
            });
        }
        Ok(Trigger::Success {
            workflow_id: workflow_id.to_string(),
        })
    }

    /// Render the path template of a path-based trigger for slot time `t`.
    /// Returns None for trigger kinds without a path.
    pub fn rendered_path(&self, t: DateTime<Utc>) -> Option<String> {
        match self {
            Trigger::HdfsCheck { path, .. } => Some(replace_time_tokens(path, t)),
            _ => None,
        }
    }
}

/// The remote system that executes a ready slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ExternalService {
    /// A remote job-orchestration service reached over HTTP, parameterized by
    /// a string property mapping (e.g. "user.name", application paths).
    Oozie {
        properties: BTreeMap<String, String>,
        api_url: String,
    },
}

impl ExternalService {
    pub fn oozie(properties: BTreeMap<String, String>, api_url: &str) -> Result<Self, ConfigError> {
        if api_url.is_empty() {
            return Err(ConfigError::BuilderArgument {
                builder: "oozieExternalService",
                reason: "endpoint address must be non-empty".to_string(),
            });
        }
        Ok(ExternalService::Oozie {
            properties,
            api_url: api_url.to_string(),
        })
    }
}

/// The ordered result of a load pass: every successfully built workflow, in
/// registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Configuration {
    workflows: Vec<Workflow>,
}

impl Configuration {
    pub(crate) fn add(&mut self, workflow: Workflow) {
        self.workflows.push(workflow);
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    pub fn get(&self, id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.workflows.iter().map(|w| w.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 12, 2, h, mi, 0).unwrap()
    }

    #[test]
    fn hourly_schedule_yields_full_hours() {
        let times = Schedule::hourly().times_within(at(13, 30), at(17, 0));
        assert_eq!(times, vec![at(14, 0), at(15, 0), at(16, 0)]);
    }

    #[test]
    fn hourly_schedule_includes_aligned_start() {
        let times = Schedule::hourly().times_within(at(13, 0), at(15, 0));
        assert_eq!(times, vec![at(13, 0), at(14, 0)]);
    }

    #[test]
    fn minutely_schedule_counts_minutes() {
        let times = Schedule::minutely().times_within(at(13, 0), at(13, 5));
        assert_eq!(times.len(), 5);
        assert_eq!(times[0], at(13, 0));
    }

    #[test]
    fn cron_schedule_rejects_garbage() {
        assert!(matches!(
            Schedule::cron("definitely not cron"),
            Err(ConfigError::BuilderArgument {
                builder: "cronSchedule",
                ..
            })
        ));
        assert!(matches!(
            Schedule::cron("   "),
            Err(ConfigError::BuilderArgument {
                builder: "cronSchedule",
                ..
            })
        ));
    }

    #[test]
    fn cron_schedule_enumerates_slots() {
        // Every full hour, in the seconds-resolution grammar.
        let schedule = Schedule::cron("0 0 * * * *").unwrap();
        let times = schedule.times_within(at(13, 30), at(16, 0));
        assert_eq!(times, vec![at(14, 0), at(15, 0)]);
    }

    #[test]
    fn hdfs_trigger_renders_slot_path() {
        let trigger =
            Trigger::hdfs_check("/logs/${year}-${month}-${day}/${hour}.done", "hdfs://nn").unwrap();
        assert_eq!(
            trigger.rendered_path(at(5, 0)).unwrap(),
            "/logs/2013-12-02/05.done"
        );
        assert_eq!(Trigger::always().rendered_path(at(5, 0)), None);
    }

    #[test]
    fn empty_builder_arguments_are_rejected() {
        assert!(Trigger::hdfs_check("", "hdfs://nn").is_err());
        assert!(Trigger::hdfs_check("/x", "").is_err());
        assert!(Trigger::and(Vec::new()).is_err());
        assert!(Trigger::delay(-1).is_err());
        assert!(Trigger::success("").is_err());
        assert!(ExternalService::oozie(BTreeMap::new(), "").is_err());
    }

    #[test]
    fn workflow_serializes_with_dsl_field_names() {
        let wf = Workflow {
            id: "wf-json".to_string(),
            schedule: Schedule::hourly(),
            scheduling_strategy: SchedulingStrategy::Serial,
            trigger: Trigger::hdfs_check("/in/${year}", "hdfs://nn").unwrap(),
            external_service: ExternalService::oozie(
                [("user.name".to_string(), "celos".to_string())].into(),
                "http://nn:11000/oozie",
            )
            .unwrap(),
            max_retry_count: 2,
            start_time: Workflow::default_start_time(),
            wait_timeout_seconds: Some(3600),
        };
        let json = serde_json::to_value(&wf).unwrap();
        assert_eq!(json["maxRetryCount"], 2);
        assert_eq!(json["waitTimeoutSeconds"], 3600);
        assert_eq!(json["schedule"]["type"], "hourly");
        assert_eq!(json["trigger"]["type"], "hdfsCheck");
        assert_eq!(json["externalService"]["apiUrl"], "http://nn:11000/oozie");

        let back: Workflow = serde_json::from_value(json).unwrap();
        assert_eq!(back, wf);
    }

    #[test]
    fn configuration_preserves_registration_order() {
        let mut cfg = Configuration::default();
        for id in ["c", "a", "b"] {
            cfg.add(Workflow {
                id: id.to_string(),
                schedule: Schedule::hourly(),
                scheduling_strategy: SchedulingStrategy::Serial,
                trigger: Trigger::always(),
                external_service: ExternalService::oozie(BTreeMap::new(), "http://nn:11000/oozie")
                    .unwrap(),
                max_retry_count: 0,
                start_time: Workflow::default_start_time(),
                wait_timeout_seconds: None,
            });
        }
        let ids: Vec<&str> = cfg.ids().collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(cfg.get("a").is_some());
        assert!(cfg.get("missing").is_none());
    }
}
