/// Primitive builder registry
///
/// The fixed catalog of builder names a configuration script may call, the
/// argument rules for each, and the enumerable defaults presets. The registry
/// is constructed once per loader and passed by reference into every
/// evaluation, never a process-wide singleton. Builders are pure: they
/// construct and validate model objects, and never contact an external system.

use crate::error::ConfigError;
use crate::workflow::builder::{Field, RawWorkflow};
use crate::workflow::types::{ExternalService, Schedule, SchedulingStrategy, Trigger};
use mlua::{Function, Lua, Table, UserData, Value, Variadic};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Ordered sink the evaluator drains after a source runs to completion.
pub(crate) type RecordSink = Rc<RefCell<Vec<RawWorkflow>>>;

/// Which polymorphic kind a builder constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Schedule,
    SchedulingStrategy,
    Trigger,
    ExternalService,
}

/// One entry of the builder catalog.
#[derive(Debug, Clone, Copy)]
pub struct BuilderSpec {
    pub name: &'static str,
    pub kind: PrimitiveKind,
}

/// The complete builder catalog. Scripts can call exactly these names (plus
/// the `addWorkflow` and `importDefaults` entry points).
pub const BUILDERS: &[BuilderSpec] = &[
    BuilderSpec { name: "hourlySchedule", kind: PrimitiveKind::Schedule },
    BuilderSpec { name: "minutelySchedule", kind: PrimitiveKind::Schedule },
    BuilderSpec { name: "cronSchedule", kind: PrimitiveKind::Schedule },
    BuilderSpec { name: "serialSchedulingStrategy", kind: PrimitiveKind::SchedulingStrategy },
    BuilderSpec { name: "concurrentSchedulingStrategy", kind: PrimitiveKind::SchedulingStrategy },
    BuilderSpec { name: "alwaysTrigger", kind: PrimitiveKind::Trigger },
    BuilderSpec { name: "hdfsCheckTrigger", kind: PrimitiveKind::Trigger },
    BuilderSpec { name: "andTrigger", kind: PrimitiveKind::Trigger },
    BuilderSpec { name: "orTrigger", kind: PrimitiveKind::Trigger },
    BuilderSpec { name: "notTrigger", kind: PrimitiveKind::Trigger },
    BuilderSpec { name: "delayTrigger", kind: PrimitiveKind::Trigger },
    BuilderSpec { name: "offsetTrigger", kind: PrimitiveKind::Trigger },
    BuilderSpec { name: "successTrigger", kind: PrimitiveKind::Trigger },
    BuilderSpec { name: "oozieExternalService", kind: PrimitiveKind::ExternalService },
];

/// A named bundle of builder bindings installable via `importDefaults`.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    /// The name scripts pass to `importDefaults`.
    pub name: &'static str,
    /// The global namespace table the preset installs.
    pub namespace: &'static str,
}

/// The enumerable preset list. Dynamic namespace injection is deliberately
/// not supported.
pub const PRESETS: &[Preset] = &[Preset {
    name: "collective",
    namespace: "celos",
}];

/// The builder catalog plus the loader-level options builders may consult
/// (currently only the default filesystem address for the one-argument
/// `hdfsCheckTrigger` form).
#[derive(Debug, Clone)]
pub struct PrimitiveRegistry {
    default_fs: Option<String>,
}

impl PrimitiveRegistry {
    pub fn new(default_fs: Option<String>) -> Self {
        Self { default_fs }
    }

    pub fn builders(&self) -> &'static [BuilderSpec] {
        BUILDERS
    }

    pub fn lookup(&self, name: &str) -> Option<&'static BuilderSpec> {
        BUILDERS.iter().find(|b| b.name == name)
    }

    pub fn presets(&self) -> &'static [Preset] {
        PRESETS
    }

    pub fn preset(&self, name: &str) -> Option<&'static Preset> {
        PRESETS.iter().find(|p| p.name == name)
    }

    /// Install every builder plus the `addWorkflow` entry point into `target`
    /// (the evaluation globals, or a preset's namespace table).
    pub(crate) fn install_scope(
        &self,
        lua: &Lua,
        target: &Table,
        sink: &RecordSink,
    ) -> mlua::Result<()> {
        for spec in BUILDERS {
            target.set(spec.name, self.make_builder(lua, spec.name)?)?;
        }

        let sink = sink.clone();
        let add_workflow = lua.create_function(move |_, args: Variadic<Value>| {
            let Some(Value::Table(record)) = args.first() else {
                return Err(builder_error(
                    "addWorkflow",
                    "expected a workflow record table".to_string(),
                ));
            };
            let raw = extract_raw_workflow(record)?;
            sink.borrow_mut().push(raw);
            Ok(())
        })?;
        target.set("addWorkflow", add_workflow)?;

        Ok(())
    }

    /// Construct the Lua function for one builder name.
    fn make_builder(&self, lua: &Lua, name: &'static str) -> mlua::Result<Function> {
        match name {
            "hourlySchedule" => {
                lua.create_function(|_, ()| Ok(ScheduleHandle(Schedule::hourly())))
            }
            "minutelySchedule" => {
                lua.create_function(|_, ()| Ok(ScheduleHandle(Schedule::minutely())))
            }
            "cronSchedule" => lua.create_function(|_, args: Variadic<Value>| {
                check_arity("cronSchedule", &args, 1, 1)?;
                let expression = string_arg("cronSchedule", &args, 0)?;
                Schedule::cron(&expression)
                    .map(ScheduleHandle)
                    .map_err(mlua::Error::external)
            }),
            "serialSchedulingStrategy" => {
                lua.create_function(|_, ()| Ok(StrategyHandle(SchedulingStrategy::Serial)))
            }
            "concurrentSchedulingStrategy" => {
                lua.create_function(|_, ()| Ok(StrategyHandle(SchedulingStrategy::Concurrent)))
            }
            "alwaysTrigger" => lua.create_function(|_, ()| Ok(TriggerHandle(Trigger::always()))),
            "hdfsCheckTrigger" => {
                let default_fs = self.default_fs.clone();
                lua.create_function(move |_, args: Variadic<Value>| {
                    check_arity("hdfsCheckTrigger", &args, 1, 2)?;
                    let path = string_arg("hdfsCheckTrigger", &args, 0)?;
                    let fs = if args.len() == 2 {
                        string_arg("hdfsCheckTrigger", &args, 1)?
                    } else {
                        default_fs.clone().ok_or_else(|| {
                            builder_error(
                                "hdfsCheckTrigger",
                                "no filesystem address given and no default filesystem configured"
                                    .to_string(),
                            )
                        })?
                    };
                    Trigger::hdfs_check(&path, &fs)
                        .map(TriggerHandle)
                        .map_err(mlua::Error::external)
                })
            }
            "andTrigger" => lua.create_function(|_, args: Variadic<Value>| {
                let triggers = trigger_args("andTrigger", &args)?;
                Trigger::and(triggers)
                    .map(TriggerHandle)
                    .map_err(mlua::Error::external)
            }),
            "orTrigger" => lua.create_function(|_, args: Variadic<Value>| {
                let triggers = trigger_args("orTrigger", &args)?;
                Trigger::or(triggers)
                    .map(TriggerHandle)
                    .map_err(mlua::Error::external)
            }),
            "notTrigger" => lua.create_function(|_, args: Variadic<Value>| {
                check_arity("notTrigger", &args, 1, 1)?;
                let inner = trigger_arg("notTrigger", &args, 0)?;
                Ok(TriggerHandle(Trigger::not(inner)))
            }),
            "delayTrigger" => lua.create_function(|_, args: Variadic<Value>| {
                check_arity("delayTrigger", &args, 1, 1)?;
                let seconds = integer_arg("delayTrigger", &args, 0)?;
                Trigger::delay(seconds)
                    .map(TriggerHandle)
                    .map_err(mlua::Error::external)
            }),
            "offsetTrigger" => lua.create_function(|_, args: Variadic<Value>| {
                check_arity("offsetTrigger", &args, 2, 2)?;
                let seconds = integer_arg("offsetTrigger", &args, 0)?;
                let inner = trigger_arg("offsetTrigger", &args, 1)?;
                Ok(TriggerHandle(Trigger::offset(seconds, inner)))
            }),
            "successTrigger" => lua.create_function(|_, args: Variadic<Value>| {
                check_arity("successTrigger", &args, 1, 1)?;
                let workflow_id = string_arg("successTrigger", &args, 0)?;
                Trigger::success(&workflow_id)
                    .map(TriggerHandle)
                    .map_err(mlua::Error::external)
            }),
            "oozieExternalService" => lua.create_function(|_, args: Variadic<Value>| {
                check_arity("oozieExternalService", &args, 2, 2)?;
                let properties = properties_arg("oozieExternalService", &args, 0)?;
                let api_url = string_arg("oozieExternalService", &args, 1)?;
                ExternalService::oozie(properties, &api_url)
                    .map(ServiceHandle)
                    .map_err(mlua::Error::external)
            }),
            other => Err(mlua::Error::external(ConfigError::UnknownBuilder {
                name: other.to_string(),
            })),
        }
    }
}

// Userdata wrappers carrying constructed primitives through the script until
// addWorkflow collects them.

#[derive(Debug, Clone)]
pub(crate) struct ScheduleHandle(pub(crate) Schedule);

#[derive(Debug, Clone)]
pub(crate) struct StrategyHandle(pub(crate) SchedulingStrategy);

#[derive(Debug, Clone)]
pub(crate) struct TriggerHandle(pub(crate) Trigger);

#[derive(Debug, Clone)]
pub(crate) struct ServiceHandle(pub(crate) ExternalService);

impl UserData for ScheduleHandle {}
impl UserData for StrategyHandle {}
impl UserData for TriggerHandle {}
impl UserData for ServiceHandle {}

/// Convert one `addWorkflow` payload table into an unvalidated record.
///
/// Field kinds are recorded, never judged here; validation is the definition
/// builder's job, after the whole source has run.
fn extract_raw_workflow(record: &Table) -> mlua::Result<RawWorkflow> {
    let mut raw = RawWorkflow::default();
    for pair in record.pairs::<Value, Value>() {
        let (key, value) = pair?;
        let key = match &key {
            Value::String(s) => match s.to_str() {
                Ok(s) => s.to_string(),
                Err(_) => {
                    raw.unknown_keys.push("<non-utf8 key>".to_string());
                    continue;
                }
            },
            other => {
                raw.unknown_keys.push(other.type_name().to_string());
                continue;
            }
        };
        match key.as_str() {
            "id" => raw.id = string_field(&value),
            "maxRetryCount" => raw.max_retry_count = integer_field(&value),
            "startTime" => raw.start_time = string_field(&value),
            "waitTimeoutSeconds" => raw.wait_timeout_seconds = integer_field(&value),
            "schedule" => raw.schedule = schedule_field(&value),
            "schedulingStrategy" => raw.scheduling_strategy = strategy_field(&value),
            "trigger" => raw.trigger = trigger_field(&value),
            "externalService" => raw.external_service = service_field(&value),
            _ => raw.unknown_keys.push(key),
        }
    }
    Ok(raw)
}

fn string_field(value: &Value) -> Field<String> {
    match value {
        Value::String(s) => match s.to_str() {
            Ok(s) => Field::Present(s.to_string()),
            Err(_) => Field::WrongKind {
                actual: "a non-UTF-8 string".to_string(),
            },
        },
        other => Field::WrongKind {
            actual: describe_value(other),
        },
    }
}

fn integer_field(value: &Value) -> Field<i64> {
    match value {
        Value::Integer(i) => Field::Present(*i),
        Value::Number(f) if f.fract() == 0.0 => Field::Present(*f as i64),
        other => Field::WrongKind {
            actual: describe_value(other),
        },
    }
}

fn schedule_field(value: &Value) -> Field<Schedule> {
    if let Value::UserData(ud) = value {
        if let Ok(handle) = ud.borrow::<ScheduleHandle>() {
            return Field::Present(handle.0.clone());
        }
    }
    Field::WrongKind {
        actual: describe_value(value),
    }
}

fn strategy_field(value: &Value) -> Field<SchedulingStrategy> {
    if let Value::UserData(ud) = value {
        if let Ok(handle) = ud.borrow::<StrategyHandle>() {
            return Field::Present(handle.0.clone());
        }
    }
    Field::WrongKind {
        actual: describe_value(value),
    }
}

fn trigger_field(value: &Value) -> Field<Trigger> {
    if let Value::UserData(ud) = value {
        if let Ok(handle) = ud.borrow::<TriggerHandle>() {
            return Field::Present(handle.0.clone());
        }
    }
    Field::WrongKind {
        actual: describe_value(value),
    }
}

fn service_field(value: &Value) -> Field<ExternalService> {
    if let Value::UserData(ud) = value {
        if let Ok(handle) = ud.borrow::<ServiceHandle>() {
            return Field::Present(handle.0.clone());
        }
    }
    Field::WrongKind {
        actual: describe_value(value),
    }
}

/// Human-readable kind of a Lua value, naming our primitive objects.
pub(crate) fn describe_value(value: &Value) -> String {
    if let Value::UserData(ud) = value {
        if ud.borrow::<ScheduleHandle>().is_ok() {
            return "a schedule object".to_string();
        }
        if ud.borrow::<StrategyHandle>().is_ok() {
            return "a scheduling strategy object".to_string();
        }
        if ud.borrow::<TriggerHandle>().is_ok() {
            return "a trigger object".to_string();
        }
        if ud.borrow::<ServiceHandle>().is_ok() {
            return "an external service object".to_string();
        }
    }
    value.type_name().to_string()
}

fn builder_error(builder: &'static str, reason: String) -> mlua::Error {
    mlua::Error::external(ConfigError::BuilderArgument { builder, reason })
}

fn check_arity(
    builder: &'static str,
    args: &[Value],
    min: usize,
    max: usize,
) -> mlua::Result<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{min}")
        } else {
            format!("{min} to {max}")
        };
        return Err(builder_error(
            builder,
            format!("expected {expected} argument(s), got {}", args.len()),
        ));
    }
    Ok(())
}

fn string_arg(builder: &'static str, args: &[Value], index: usize) -> mlua::Result<String> {
    match args.get(index) {
        Some(Value::String(s)) => match s.to_str() {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(builder_error(
                builder,
                format!("argument {} is not valid UTF-8", index + 1),
            )),
        },
        Some(other) => Err(builder_error(
            builder,
            format!(
                "argument {} must be a string, got {}",
                index + 1,
                describe_value(other)
            ),
        )),
        None => Err(builder_error(
            builder,
            format!("argument {} must be a string", index + 1),
        )),
    }
}

fn integer_arg(builder: &'static str, args: &[Value], index: usize) -> mlua::Result<i64> {
    match args.get(index) {
        Some(Value::Integer(i)) => Ok(*i),
        Some(Value::Number(f)) if f.fract() == 0.0 => Ok(*f as i64),
        Some(other) => Err(builder_error(
            builder,
            format!(
                "argument {} must be an integer, got {}",
                index + 1,
                describe_value(other)
            ),
        )),
        None => Err(builder_error(
            builder,
            format!("argument {} must be an integer", index + 1),
        )),
    }
}

fn trigger_value(builder: &'static str, value: &Value, index: usize) -> mlua::Result<Trigger> {
    if let Value::UserData(ud) = value {
        if let Ok(handle) = ud.borrow::<TriggerHandle>() {
            return Ok(handle.0.clone());
        }
    }
    Err(builder_error(
        builder,
        format!(
            "argument {} must be a trigger, got {}",
            index + 1,
            describe_value(value)
        ),
    ))
}

fn trigger_arg(builder: &'static str, args: &[Value], index: usize) -> mlua::Result<Trigger> {
    match args.get(index) {
        Some(value) => trigger_value(builder, value, index),
        None => Err(builder_error(
            builder,
            format!("argument {} must be a trigger", index + 1),
        )),
    }
}

fn trigger_args(builder: &'static str, args: &[Value]) -> mlua::Result<Vec<Trigger>> {
    args.iter()
        .enumerate()
        .map(|(index, value)| trigger_value(builder, value, index))
        .collect()
}

fn properties_arg(
    builder: &'static str,
    args: &[Value],
    index: usize,
) -> mlua::Result<BTreeMap<String, String>> {
    let Some(Value::Table(table)) = args.get(index) else {
        return Err(builder_error(
            builder,
            format!("argument {} must be a property table", index + 1),
        ));
    };
    let mut properties = BTreeMap::new();
    for pair in table.pairs::<Value, Value>() {
        let (key, value) = pair?;
        let (Value::String(k), Value::String(v)) = (&key, &value) else {
            return Err(builder_error(
                builder,
                format!(
                    "properties must map strings to strings, got {} = {}",
                    describe_value(&key),
                    describe_value(&value)
                ),
            ));
        };
        properties.insert(k.to_str()?.to_string(), v.to_str()?.to_string());
    }
    Ok(properties)
}
