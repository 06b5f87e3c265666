/// Script evaluator: sandboxed Lua evaluation of configuration sources
///
/// Each source runs in its own fresh Lua state so one workflow's configuration
/// cannot mutate state visible to another's. The evaluation environment
/// exposes exactly the primitive builders, `addWorkflow`, and
/// `importDefaults`; dangerous stdlib entry points are removed and any read of
/// an unknown global is reported as an unknown builder. Evaluation is
/// synchronous: the whole source runs to completion or fails atomically, and
/// no partial record list escapes a failed source.

use crate::error::ConfigError;
use crate::script::builders::{PrimitiveRegistry, RecordSink};
use crate::workflow::builder::RawWorkflow;
use mlua::{Lua, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Globals removed from every evaluation sandbox. A configuration script
/// describes workflows; it has no business touching the host.
const BLOCKED_GLOBALS: &[&str] = &[
    "os",
    "io",
    "debug",
    "package",
    "require",
    "load",
    "loadfile",
    "dofile",
    "collectgarbage",
];

/// Evaluate one configuration source to its ordered list of raw workflow
/// records. Any failure is a single structured error; the sink of a failing
/// source is discarded.
pub fn evaluate_source(
    registry: &PrimitiveRegistry,
    source_id: &str,
    source: &str,
) -> Result<Vec<RawWorkflow>, ConfigError> {
    let lua = Lua::new();
    let sink: RecordSink = Rc::new(RefCell::new(Vec::new()));

    install_environment(&lua, registry, &sink).map_err(to_config_error)?;

    tracing::debug!("🏃 Evaluating configuration source '{}'", source_id);
    lua.load(source)
        .set_name(source_id)
        .exec()
        .map_err(to_config_error)?;

    let records = sink.take();
    tracing::debug!(
        "📋 Source '{}' declared {} workflow record(s)",
        source_id,
        records.len()
    );
    Ok(records)
}

fn install_environment(
    lua: &Lua,
    registry: &PrimitiveRegistry,
    sink: &RecordSink,
) -> mlua::Result<()> {
    let globals = lua.globals();
    for name in BLOCKED_GLOBALS {
        globals.set(*name, Value::Nil)?;
    }

    registry.install_scope(lua, &globals, sink)?;

    let import_registry = registry.clone();
    let import_sink = sink.clone();
    let import_defaults = lua.create_function(move |lua, name: String| {
        let Some(preset) = import_registry.preset(&name) else {
            return Err(mlua::Error::external(ConfigError::UnknownPreset { name }));
        };
        let namespace = lua.create_table()?;
        import_registry.install_scope(lua, &namespace, &import_sink)?;
        lua.globals().set(preset.namespace, namespace)?;
        tracing::debug!(
            "📦 Imported defaults preset '{}' as namespace '{}'",
            preset.name,
            preset.namespace
        );
        Ok(())
    })?;
    globals.set("importDefaults", import_defaults)?;

    // Reads of globals the registry does not provide become UnknownBuilder
    // errors instead of Lua's generic "attempt to call a nil value".
    let unknown_global = lua.create_function(
        |_, (_table, key): (mlua::Table, Value)| -> mlua::Result<Value> {
            let name = match &key {
                Value::String(s) => s
                    .to_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| "<non-utf8>".to_string()),
                other => other.type_name().to_string(),
            };
            Err(mlua::Error::external(ConfigError::UnknownBuilder { name }))
        },
    )?;
    let strict = lua.create_table()?;
    strict.set("__index", unknown_global)?;
    lua.load("local mt = ...; setmetatable(_G, mt)")
        .set_name("sandbox")
        .call::<()>(strict)?;

    Ok(())
}

/// Map an mlua error to the structured configuration error it carries, or to
/// the syntax/script kinds when it is Lua's own.
fn to_config_error(err: mlua::Error) -> ConfigError {
    if let Some(config) = find_config_error(&err) {
        return config;
    }
    match err {
        mlua::Error::SyntaxError { message, .. } => ConfigError::Syntax { message },
        other => ConfigError::Script {
            message: other.to_string(),
        },
    }
}

fn find_config_error(err: &mlua::Error) -> Option<ConfigError> {
    match err {
        mlua::Error::CallbackError { cause, .. } => find_config_error(cause),
        mlua::Error::WithContext { cause, .. } => find_config_error(cause),
        mlua::Error::ExternalError(external) => external.downcast_ref::<ConfigError>().cloned(),
        _ => None,
    }
}
