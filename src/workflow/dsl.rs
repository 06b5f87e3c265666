/// Re-serialization of workflow definitions to the configuration DSL
///
/// A loaded definition can be rendered back to an equivalent `addWorkflow`
/// call; loading the rendered script reproduces a semantically equal
/// definition. Keys with dots use bracket notation so the output is always
/// valid Lua.

use crate::workflow::types::{ExternalService, Schedule, SchedulingStrategy, Trigger, Workflow};
use chrono::SecondsFormat;
use std::fmt::Write;

impl Workflow {
    /// Render this definition as an `addWorkflow { ... }` call.
    pub fn to_script(&self) -> String {
        let mut out = String::new();
        // Infallible: writing to a String cannot fail.
        let _ = writeln!(out, "addWorkflow {{");
        let _ = writeln!(out, "    id = {},", lua_quote(&self.id));
        let _ = writeln!(out, "    maxRetryCount = {},", self.max_retry_count);
        let _ = writeln!(
            out,
            "    startTime = {},",
            lua_quote(&self.start_time.to_rfc3339_opts(SecondsFormat::Secs, true))
        );
        if let Some(seconds) = self.wait_timeout_seconds {
            let _ = writeln!(out, "    waitTimeoutSeconds = {seconds},");
        }
        let _ = writeln!(out, "    schedule = {},", self.schedule.builder_call());
        let _ = writeln!(
            out,
            "    schedulingStrategy = {},",
            self.scheduling_strategy.builder_call()
        );
        let _ = writeln!(out, "    trigger = {},", self.trigger.builder_call());
        let _ = writeln!(
            out,
            "    externalService = {},",
            self.external_service.builder_call()
        );
        out.push('}');
        out
    }
}

impl Schedule {
    pub fn builder_call(&self) -> String {
        match self {
            Schedule::Hourly => "hourlySchedule()".to_string(),
            Schedule::Minutely => "minutelySchedule()".to_string(),
            Schedule::Cron { expression } => format!("cronSchedule({})", lua_quote(expression)),
        }
    }
}

impl SchedulingStrategy {
    pub fn builder_call(&self) -> String {
        match self {
            SchedulingStrategy::Serial => "serialSchedulingStrategy()".to_string(),
            SchedulingStrategy::Concurrent => "concurrentSchedulingStrategy()".to_string(),
        }
    }
}

impl Trigger {
    pub fn builder_call(&self) -> String {
        match self {
            Trigger::Always => "alwaysTrigger()".to_string(),
            Trigger::HdfsCheck { path, fs } => {
                format!("hdfsCheckTrigger({}, {})", lua_quote(path), lua_quote(fs))
            }
            Trigger::And { triggers } => format!("andTrigger({})", nested_calls(triggers)),
            Trigger::Or { triggers } => format!("orTrigger({})", nested_calls(triggers)),
            Trigger::Not { trigger } => format!("notTrigger({})", trigger.builder_call()),
            Trigger::Delay { seconds } => format!("delayTrigger({seconds})"),
            Trigger::Offset { seconds, trigger } => {
                format!("offsetTrigger({seconds}, {})", trigger.builder_call())
            }
            Trigger::Success { workflow_id } => {
                format!("successTrigger({})", lua_quote(workflow_id))
            }
        }
    }
}

impl ExternalService {
    pub fn builder_call(&self) -> String {
        match self {
            ExternalService::Oozie {
                properties,
                api_url,
            } => {
                let props = properties
                    .iter()
                    .map(|(k, v)| format!("[{}] = {}", lua_quote(k), lua_quote(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "oozieExternalService({{ {} }}, {})",
                    props,
                    lua_quote(api_url)
                )
            }
        }
    }
}

fn nested_calls(triggers: &[Trigger]) -> String {
    triggers
        .iter()
        .map(Trigger::builder_call)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quote a string as a Lua string literal.
fn lua_quote(s: &str) -> String {
    format!(
        "\"{}\"",
        s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
    )
}
