//! Integration tests for the workflow definition loader: DSL evaluation,
//! validation diagnostics, and round-trip re-serialization.

use gantry::{ConfigError, Loader, LoaderConfig, Schedule, SchedulingStrategy, Trigger};
use gantry::{ExternalService, UNKNOWN_WORKFLOW_ID};

fn loader() -> Loader {
    Loader::new(LoaderConfig {
        workflows_dir: "workflows".into(),
        default_fs: Some("hdfs://nameservice1".to_string()),
    })
}

const FILE_COPY_SOURCE: &str = r#"
addWorkflow {

    id = "file-copy-with-bad-output",

    maxRetryCount = 0,

    schedule = hourlySchedule(),

    schedulingStrategy = serialSchedulingStrategy(),

    trigger = hdfsCheckTrigger(
        "/user/celos/samples/file-copy-with-bad-output/input/${year}-${month}-${day}T${hour}00.txt",
        "hdfs://nn"
    ),

    externalService = oozieExternalService({
        ["user.name"] = "celos",
        ["oozie.wf.application.path"] = "/user/celos/samples/file-copy-with-bad-output/workflow/workflow.xml",
        ["inputDir"] = "hdfs:/user/celos/samples/file-copy-with-bad-output/input",
        ["outputDir"] = "hdfs:/user/celos/samples/file-copy-with-bad-output/output",
    }, "http://nn:11000/oozie"),

}
"#;

#[test]
fn loads_the_file_copy_fixture_exactly() {
    let workflows = loader()
        .load("file-copy-with-bad-output.lua", FILE_COPY_SOURCE)
        .expect("fixture should load");
    assert_eq!(workflows.len(), 1);

    let wf = &workflows[0];
    assert_eq!(wf.id, "file-copy-with-bad-output");
    assert_eq!(wf.max_retry_count, 0);
    assert_eq!(wf.schedule, Schedule::Hourly);
    assert_eq!(wf.scheduling_strategy, SchedulingStrategy::Serial);
    assert_eq!(
        wf.trigger,
        Trigger::HdfsCheck {
            path: "/user/celos/samples/file-copy-with-bad-output/input/${year}-${month}-${day}T${hour}00.txt"
                .to_string(),
            fs: "hdfs://nn".to_string(),
        }
    );
    let ExternalService::Oozie {
        properties,
        api_url,
    } = &wf.external_service;
    assert_eq!(api_url, "http://nn:11000/oozie");
    assert_eq!(properties.get("user.name"), Some(&"celos".to_string()));
    assert_eq!(properties.len(), 4);
}

#[test]
fn returns_workflows_in_call_order_with_defaults() {
    let source = r#"
        addWorkflow {
            id = "first",
            schedule = hourlySchedule(),
            schedulingStrategy = serialSchedulingStrategy(),
            trigger = alwaysTrigger(),
            externalService = oozieExternalService({}, "http://nn:11000/oozie"),
        }
        addWorkflow {
            id = "second",
            maxRetryCount = 3,
            schedule = minutelySchedule(),
            schedulingStrategy = concurrentSchedulingStrategy(),
            trigger = delayTrigger(60),
            externalService = oozieExternalService({}, "http://nn:11000/oozie"),
        }
        addWorkflow {
            id = "third",
            schedule = cronSchedule("0 0 12 * * *"),
            schedulingStrategy = serialSchedulingStrategy(),
            trigger = successTrigger("second"),
            externalService = oozieExternalService({}, "http://nn:11000/oozie"),
        }
    "#;
    let workflows = loader().load("three.lua", source).expect("should load");
    let ids: Vec<&str> = workflows.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
    assert_eq!(workflows[0].max_retry_count, 0);
    assert_eq!(workflows[1].max_retry_count, 3);
    assert_eq!(
        workflows[2].schedule,
        Schedule::Cron {
            expression: "0 0 12 * * *".to_string()
        }
    );
}

#[test]
fn missing_id_fails_the_whole_source() {
    let source = r#"
        addWorkflow {
            maxRetryCount = 0,
            schedule = hourlySchedule(),
            schedulingStrategy = serialSchedulingStrategy(),
            trigger = alwaysTrigger(),
            externalService = oozieExternalService({}, "http://nn:11000/oozie"),
        }
    "#;
    let err = loader().load("workflow-1.lua", source).unwrap_err();
    assert_eq!(err.source_id, "workflow-1.lua");
    assert_eq!(
        err.errors,
        vec![ConfigError::MissingField {
            workflow_id: UNKNOWN_WORKFLOW_ID.to_string(),
            field: "id",
        }]
    );
}

#[test]
fn all_missing_fields_are_reported_together() {
    let err = loader().load("empty.lua", "addWorkflow {}").unwrap_err();
    let fields: Vec<&str> = err
        .errors
        .iter()
        .filter_map(|e| match e {
            ConfigError::MissingField { field, .. } => Some(*field),
            _ => None,
        })
        .collect();
    assert_eq!(
        fields,
        vec![
            "id",
            "schedule",
            "schedulingStrategy",
            "trigger",
            "externalService"
        ]
    );
}

#[test]
fn duplicate_ids_fail_regardless_of_order() {
    let source = format!("{}\n{}", minimal_workflow("dup"), minimal_workflow("dup"));
    let err = loader().load("dup.lua", &source).unwrap_err();
    assert!(err.errors.contains(&ConfigError::DuplicateId {
        id: "dup".to_string()
    }));
}

#[test]
fn negative_retry_count_is_rejected_zero_and_positive_accepted() {
    let bad = r#"
        addWorkflow {
            id = "wf",
            maxRetryCount = -1,
            schedule = hourlySchedule(),
            schedulingStrategy = serialSchedulingStrategy(),
            trigger = alwaysTrigger(),
            externalService = oozieExternalService({}, "http://nn:11000/oozie"),
        }
    "#;
    let err = loader().load("bad-retry.lua", bad).unwrap_err();
    assert_eq!(
        err.errors,
        vec![ConfigError::InvalidRetryCount {
            workflow_id: "wf".to_string(),
            value: -1,
        }]
    );

    for count in [0, 7] {
        let source = minimal_workflow("wf").replace(
            "id = \"wf\",",
            &format!("id = \"wf\",\n    maxRetryCount = {count},"),
        );
        let workflows = loader().load("ok-retry.lua", &source).expect("should load");
        assert_eq!(workflows[0].max_retry_count, count);
    }
}

#[test]
fn import_defaults_enables_the_celos_namespace() {
    let source = r#"
        importDefaults("collective")

        celos.addWorkflow {
            id = "file-copy-with-missing-output",
            maxRetryCount = 0,
            schedule = celos.hourlySchedule(),
            schedulingStrategy = celos.serialSchedulingStrategy(),
            trigger = celos.hdfsCheckTrigger(
                "/user/celos/samples/file-copy-with-missing-output/input/${year}-${month}-${day}T${hour}00.txt"
            ),
            externalService = celos.oozieExternalService({
                ["user.name"] = "celos",
            }, "http://nn:11000/oozie"),
        }
    "#;
    let workflows = loader().load("missing-output.lua", source).expect("should load");
    assert_eq!(workflows.len(), 1);
    // The one-argument trigger form picks up the configured default filesystem.
    assert_eq!(
        workflows[0].trigger,
        Trigger::HdfsCheck {
            path: "/user/celos/samples/file-copy-with-missing-output/input/${year}-${month}-${day}T${hour}00.txt"
                .to_string(),
            fs: "hdfs://nameservice1".to_string(),
        }
    );
}

#[test]
fn namespaced_builder_without_import_is_unknown() {
    let err = loader()
        .load("no-import.lua", "local s = celos.hourlySchedule()")
        .unwrap_err();
    assert_eq!(
        err.errors,
        vec![ConfigError::UnknownBuilder {
            name: "celos".to_string()
        }]
    );
}

#[test]
fn unknown_preset_is_rejected() {
    let err = loader()
        .load("acme.lua", r#"importDefaults("acme")"#)
        .unwrap_err();
    assert_eq!(
        err.errors,
        vec![ConfigError::UnknownPreset {
            name: "acme".to_string()
        }]
    );
}

#[test]
fn one_arg_hdfs_trigger_without_default_fs_fails() {
    let bare = Loader::new(LoaderConfig {
        workflows_dir: "workflows".into(),
        default_fs: None,
    });
    let err = bare
        .load("t.lua", r#"local t = hdfsCheckTrigger("/in/${year}")"#)
        .unwrap_err();
    assert!(matches!(
        err.errors[0],
        ConfigError::BuilderArgument {
            builder: "hdfsCheckTrigger",
            ..
        }
    ));
}

#[test]
fn builder_constraint_violations_carry_the_builder_name() {
    let cases = [
        (r#"local t = hdfsCheckTrigger("", "hdfs://nn")"#, "hdfsCheckTrigger"),
        (r#"local s = cronSchedule("not a cron expression")"#, "cronSchedule"),
        (r#"local t = delayTrigger(-5)"#, "delayTrigger"),
        (r#"local t = andTrigger(hourlySchedule())"#, "andTrigger"),
        (r#"local e = oozieExternalService("props", "http://nn:11000/oozie")"#, "oozieExternalService"),
        (r#"local t = notTrigger()"#, "notTrigger"),
    ];
    for (source, expected_builder) in cases {
        let err = loader().load("builder.lua", source).unwrap_err();
        match &err.errors[0] {
            ConfigError::BuilderArgument { builder, .. } => assert_eq!(
                *builder, expected_builder,
                "wrong builder reported for `{source}`"
            ),
            other => panic!("expected BuilderArgument for `{source}`, got {other:?}"),
        }
    }
}

#[test]
fn wrong_field_kind_is_distinct_from_missing() {
    let source = r#"
        addWorkflow {
            id = "wf",
            schedule = serialSchedulingStrategy(),
            schedulingStrategy = serialSchedulingStrategy(),
            trigger = "not a trigger",
            externalService = oozieExternalService({}, "http://nn:11000/oozie"),
        }
    "#;
    let err = loader().load("kinds.lua", source).unwrap_err();
    assert_eq!(
        err.errors,
        vec![
            ConfigError::InvalidFieldType {
                workflow_id: "wf".to_string(),
                field: "schedule",
                expected: "a schedule object",
                actual: "a scheduling strategy object".to_string(),
            },
            ConfigError::InvalidFieldType {
                workflow_id: "wf".to_string(),
                field: "trigger",
                expected: "a trigger object",
                actual: "string".to_string(),
            },
        ]
    );
}

#[test]
fn evaluation_failure_registers_nothing() {
    let source = format!("{}\nerror(\"boom\")", minimal_workflow("good"));
    let err = loader().load("boom.lua", &source).unwrap_err();
    assert!(matches!(err.errors[0], ConfigError::Script { .. }));
}

#[test]
fn syntax_errors_are_reported_with_location() {
    let err = loader().load("broken.lua", "addWorkflow {").unwrap_err();
    match &err.errors[0] {
        ConfigError::Syntax { message } => assert!(message.contains("broken.lua")),
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn start_time_and_wait_timeout_are_parsed() {
    let source = r#"
        addWorkflow {
            id = "windowed",
            startTime = "2014-03-10T12:00Z",
            waitTimeoutSeconds = 7200,
            schedule = hourlySchedule(),
            schedulingStrategy = serialSchedulingStrategy(),
            trigger = alwaysTrigger(),
            externalService = oozieExternalService({}, "http://nn:11000/oozie"),
        }
    "#;
    let workflows = loader().load("windowed.lua", source).expect("should load");
    assert_eq!(
        workflows[0].start_time.to_rfc3339(),
        "2014-03-10T12:00:00+00:00"
    );
    assert_eq!(workflows[0].wait_timeout_seconds, Some(7200));

    let bad = source.replace("7200", "-1");
    let err = loader().load("windowed.lua", &bad).unwrap_err();
    assert!(matches!(
        err.errors[0],
        ConfigError::InvalidFieldType {
            field: "waitTimeoutSeconds",
            ..
        }
    ));
}

#[test]
fn round_trips_through_the_dsl() {
    let source = r#"
        addWorkflow {
            id = "round-trip",
            maxRetryCount = 2,
            startTime = "2015-09-01T00:00Z",
            waitTimeoutSeconds = 3600,
            schedule = cronSchedule("0 0 */6 * * *"),
            schedulingStrategy = concurrentSchedulingStrategy(),
            trigger = andTrigger(
                hdfsCheckTrigger("/in/${year}-${month}-${day}T${hour}00.txt", "hdfs://nn"),
                offsetTrigger(-3600, notTrigger(alwaysTrigger())),
                orTrigger(delayTrigger(900), successTrigger("upstream"))
            ),
            externalService = oozieExternalService({
                ["user.name"] = "celos",
                ["oozie.wf.application.path"] = "/app/workflow.xml",
            }, "http://nn:11000/oozie"),
        }
    "#;
    let workflows = loader().load("original.lua", source).expect("should load");
    let rendered = workflows[0].to_script();
    let reloaded = loader()
        .load("rendered.lua", &rendered)
        .expect("rendered script should load");
    assert_eq!(reloaded, workflows);
}

#[test]
fn unknown_record_keys_are_ignored() {
    let source = minimal_workflow("wf").replace(
        "id = \"wf\",",
        "id = \"wf\",\n    flavour = \"vanilla\",",
    );
    let workflows = loader().load("extra.lua", &source).expect("should load");
    assert_eq!(workflows.len(), 1);
}

fn minimal_workflow(id: &str) -> String {
    format!(
        r#"addWorkflow {{
    id = "{id}",
    schedule = hourlySchedule(),
    schedulingStrategy = serialSchedulingStrategy(),
    trigger = alwaysTrigger(),
    externalService = oozieExternalService({{}}, "http://nn:11000/oozie"),
}}"#
    )
}
