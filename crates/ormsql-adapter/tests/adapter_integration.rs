//! End-to-end adapter behavior against a recording gateway.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ormsql_adapter::{
    Adapter, AdapterError, AdapterSettings, ExecInfo, GatewayError, QueryOutput,
    RecordingGateway,
};
use ormsql_core::{
    Error, Filter, IdMode, IndexDef, ModelSchema, PlanKind, PropertyDef, PropertyType,
    UpdateSpec, Value,
};
use serde_json::json;

fn person() -> ModelSchema {
    ModelSchema::new("person")
        .with_property(PropertyDef::new("name", PropertyType::String).with_index())
        .with_property(PropertyDef::new("age", PropertyType::Number))
        .with_property(PropertyDef::new("born", PropertyType::Date))
}

fn text_row(pairs: &[(&str, &str)]) -> Vec<(String, Value)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

/// Introspection answers describing `person` exactly as declared.
fn live_person(sql: &str) -> Result<QueryOutput, GatewayError> {
    if sql.starts_with("SHOW FIELDS") {
        Ok(QueryOutput::Rows(vec![
            text_row(&[("Field", "id"), ("Type", "int(11)"), ("Null", "NO")]),
            text_row(&[("Field", "name"), ("Type", "varchar(255)"), ("Null", "YES")]),
            text_row(&[("Field", "age"), ("Type", "int(11)"), ("Null", "YES")]),
            text_row(&[("Field", "born"), ("Type", "datetime"), ("Null", "YES")]),
        ]))
    } else if sql.starts_with("SHOW INDEXES") {
        Ok(QueryOutput::Rows(vec![
            text_row(&[("Key_name", "PRIMARY"), ("Column_name", "id"), ("Seq_in_index", "1")]),
            text_row(&[("Key_name", "name"), ("Column_name", "name"), ("Seq_in_index", "1")]),
        ]))
    } else {
        Ok(QueryOutput::Affected(ExecInfo::default()))
    }
}

#[tokio::test]
async fn test_bulk_update_keeps_positions() {
    let gateway = RecordingGateway::with_responder(|sql| {
        if sql.contains("'boom'") {
            Err(GatewayError::Server {
                code: 1406,
                message: "Data too long".into(),
            })
        } else {
            Ok(QueryOutput::Affected(ExecInfo::affected(1)))
        }
    });
    let adapter = Adapter::new(gateway, AdapterSettings::new("test"));
    adapter.define(person()).unwrap();

    let specs = vec![
        UpdateSpec::from_json(&json!({"where": {"id": 1}, "update": {"name": "A"}})).unwrap(),
        UpdateSpec::from_json(&json!({"where": {}, "update": null})).unwrap(),
        UpdateSpec::from_json(&json!({"where": {"id": 3}, "update": {"name": "boom"}})).unwrap(),
        UpdateSpec::from_json(&json!({"where": {"id": 4}, "update": {"age": null}})).unwrap(),
    ];

    let err = adapter.update("person", &specs).await.unwrap_err();
    assert_eq!(err.errors.len(), 4);
    assert_eq!(err.results.len(), 4);

    assert!(err.errors[0].is_none());
    assert_eq!(err.results[0], Some(ExecInfo::affected(1)));

    assert_eq!(
        err.errors[1],
        Some(AdapterError::Core(Error::MissingWhereOrUpdate))
    );
    assert_eq!(
        err.errors[1].as_ref().unwrap().to_string(),
        "Where or Update fields are missing"
    );
    assert!(err.results[1].is_none());

    assert!(matches!(
        err.errors[2],
        Some(AdapterError::Execution(GatewayError::Server { code: 1406, .. }))
    ));
    assert!(err.results[2].is_none());

    assert!(err.errors[3].is_none());
    assert_eq!(err.failed(), 2);

    // The item that failed to compile never reached the gateway.
    assert_eq!(
        adapter.gateway().executed(),
        vec![
            "UPDATE `person` SET `name` = 'A' WHERE `id` = 1",
            "UPDATE `person` SET `name` = 'boom' WHERE `id` = 3",
            "UPDATE `person` SET `age` = NULL WHERE `id` = 4",
        ]
    );
}

#[tokio::test]
async fn test_bulk_update_success_returns_results_in_order() {
    let counter = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&counter);
    let gateway = RecordingGateway::with_responder(move |_| {
        let n = seen.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(QueryOutput::Affected(ExecInfo::affected(n)))
    });
    let adapter = Adapter::new(gateway, AdapterSettings::new("test"));
    adapter.define(person()).unwrap();

    let specs: Vec<UpdateSpec> = (0..5)
        .map(|i| {
            UpdateSpec::from_json(&json!({"where": {"id": i}, "update": {"age": i * 10}})).unwrap()
        })
        .collect();
    let results = adapter.update("person", &specs).await.unwrap();

    assert_eq!(results.len(), 5);
    assert_eq!(counter.load(Ordering::SeqCst), 5);
    let executed = adapter.gateway().executed();
    for (i, sql) in executed.iter().enumerate() {
        assert!(sql.ends_with(&format!("WHERE `id` = {i}")), "{sql}");
    }
}

#[tokio::test]
async fn test_autoupdate_creates_missing_tables() {
    let gateway = RecordingGateway::with_responder(|sql| {
        if sql.starts_with("SHOW") {
            Err(GatewayError::NoSuchTable("person".into()))
        } else {
            Ok(QueryOutput::Affected(ExecInfo::default()))
        }
    });
    let adapter = Adapter::new(gateway, AdapterSettings::new("test").with_engine("InnoDB"));
    adapter.define(person()).unwrap();

    assert!(!adapter.is_actual().await.unwrap());
    adapter.gateway().clear();

    let applied = adapter.autoupdate().await.unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].kind, PlanKind::Create);

    let executed = adapter.gateway().executed();
    assert_eq!(executed[0], "SHOW FIELDS FROM `person`");
    assert!(executed[1].starts_with("CREATE TABLE `person` ("));
    assert!(executed[1].ends_with(") ENGINE InnoDB"));
    assert_eq!(executed.len(), 2);
}

#[tokio::test]
async fn test_reconciled_schema_is_actual() {
    let adapter = Adapter::new(
        RecordingGateway::with_responder(live_person),
        AdapterSettings::new("test"),
    );
    adapter.define(person()).unwrap();

    assert!(adapter.is_actual().await.unwrap());
    assert!(!adapter.check_migration("person").await.unwrap().needs_changes());

    adapter.gateway().clear();
    assert!(adapter.autoupdate().await.unwrap().is_empty());
    assert_eq!(
        adapter.gateway().executed(),
        vec!["SHOW FIELDS FROM `person`", "SHOW INDEXES FROM `person`"]
    );
}

#[tokio::test]
async fn test_drifted_schema_is_altered() {
    let adapter = Adapter::new(
        RecordingGateway::with_responder(live_person),
        AdapterSettings::new("test"),
    );
    adapter
        .define(
            person()
                .with_property(PropertyDef::new("email", PropertyType::String))
                .with_index(IndexDef::new("name_age", ["name", "age"])),
        )
        .unwrap();

    let plan = adapter.check_migration("person").await.unwrap();
    assert_eq!(plan.kind, PlanKind::Alter);
    assert_eq!(
        plan.statements,
        vec![
            "ADD COLUMN `email` VARCHAR(255) NULL",
            "ADD INDEX `name_age` (`name`, `age`)",
        ]
    );
    assert!(!adapter.is_actual().await.unwrap());

    adapter.gateway().clear();
    adapter.autoupdate().await.unwrap();
    assert_eq!(
        adapter.gateway().executed().last().unwrap(),
        "ALTER TABLE `person` ADD COLUMN `email` VARCHAR(255) NULL,\nADD INDEX `name_age` (`name`, `age`)"
    );
}

#[tokio::test]
async fn test_autoupdate_reports_failure_after_trying_every_model() {
    let gateway = RecordingGateway::with_responder(|sql| {
        if sql.contains("`broken`") {
            Err(GatewayError::Connection("gone".into()))
        } else if sql.starts_with("SHOW") {
            Err(GatewayError::NoSuchTable("x".into()))
        } else {
            Ok(QueryOutput::Affected(ExecInfo::default()))
        }
    });
    let adapter = Adapter::new(gateway, AdapterSettings::new("test"));
    adapter.define(ModelSchema::new("broken")).unwrap();
    adapter.define(person()).unwrap();

    let err = adapter.autoupdate().await.unwrap_err();
    assert_eq!(
        err,
        AdapterError::Execution(GatewayError::Connection("gone".into()))
    );
    assert!(adapter
        .gateway()
        .executed()
        .iter()
        .any(|sql| sql.starts_with("CREATE TABLE `person`")));
}

#[tokio::test]
async fn test_find_round_trips_dates() {
    let gateway = RecordingGateway::with_responder(|_| {
        Ok(QueryOutput::Rows(vec![text_row(&[
            ("id", "1"),
            ("name", "Ann"),
            ("born", "2020-01-02 03:04:05.000"),
        ])]))
    });
    let adapter = Adapter::new(gateway, AdapterSettings::new("test"));
    adapter.define(person().with_id_mode(IdMode::None)).unwrap();

    let filter = Filter::from_json(&json!({
        "where": {"born": {"gt": "2019-12-31T00:00:00Z"}},
        "order": "name",
        "limit": 1
    }))
    .unwrap();
    let rows = adapter.find("person", &filter).await.unwrap();

    let born = rows[0].iter().find(|(k, _)| k == "born").map(|(_, v)| v);
    assert!(matches!(born, Some(Value::Date(_))));
    assert_eq!(
        adapter.gateway().executed(),
        vec!["SELECT * FROM `person` WHERE `born` > '2019-12-31 00:00:00.000' ORDER BY `name` LIMIT 1"]
    );
}
