use std::sync::Arc;

use serde_json::{Value, json};
use storefront::engine::sqlite::SqliteEngine;
use storefront::{
    BatchReport, Config, Connection, FailureReason, IndexSchema, Keys, Pagination,
    RangeDescriptor, RemoveTarget, Status, Store, TableSchema, UsageError,
};

async fn open_shop() -> Connection {
    let store = Store::new(Arc::new(SqliteEngine::in_memory()), Config::default());
    store
        .open(
            "shop",
            Some(1),
            |_| {},
            |_, schema| {
                schema.create_table("orders", TableSchema::key_path("id"))?;
                schema.create_index("orders", IndexSchema::new("by_email", "email", true))?;
                schema.create_index("orders", IndexSchema::new("by_city", "address.city", false))
            },
            |envelope| panic!("open failed: {:#}", envelope.data),
        )
        .await
        .unwrap()
        .unwrap()
}

async fn upsert(connection: &Connection, records: Value) -> BatchReport {
    let mut calls = 0;
    let mut report = None;
    connection
        .upsert("orders", records, |envelope| {
            assert_eq!(envelope.status, Status::Success);
            assert_eq!(envelope.description, "add/update complete");
            calls += 1;
            report = Some(envelope.data);
        })
        .await
        .unwrap();
    assert_eq!(calls, 1);
    report.unwrap()
}

async fn remove(connection: &Connection, target: impl Into<RemoveTarget>) -> BatchReport {
    let mut report = None;
    connection
        .remove("orders", target, |envelope| report = Some(envelope.data))
        .await
        .unwrap();
    report.unwrap()
}

async fn lookup(connection: &Connection, values: impl Into<Keys>) -> BatchReport {
    let mut calls = 0;
    let mut report = None;
    connection
        .get_by_index("orders", "by_email", values, |envelope| {
            calls += 1;
            report = Some(envelope.data);
        })
        .await
        .unwrap();
    assert_eq!(calls, 1);
    report.unwrap()
}

async fn ids(connection: &Connection) -> Vec<Value> {
    let mut values = Vec::new();
    connection
        .scan_all(
            "orders",
            Pagination::All,
            |envelope| values = envelope.data,
            |envelope| panic!("scan failed: {:#}", envelope.data),
        )
        .await
        .unwrap();
    values.into_iter().map(|record| record["id"].clone()).collect()
}

fn orders(ids: impl IntoIterator<Item = i64>) -> Value {
    ids.into_iter()
        .map(|id| json!({"id": id, "email": format!("{id}@example.com")}))
        .collect()
}

#[tokio::test]
async fn upsert_reports_every_key_written() {
    let connection = open_shop().await;

    let report = upsert(&connection, orders([3, 1, 2])).await;

    assert_eq!(report.count, 3);
    assert_eq!(report.successfully, 3);
    assert_eq!(report.failed, 0);
    assert!(report.is_complete());
    assert_eq!(report.successfully_info, vec![json!(3), json!(1), json!(2)]);
    assert_eq!(ids(&connection).await, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn single_record_matches_one_element_array() {
    let single = open_shop().await;
    let array = open_shop().await;
    let record = json!({"id": 1, "email": "a@example.com"});

    let from_single = upsert(&single, record.clone()).await;
    let from_array = upsert(&array, json!([record])).await;

    assert_eq!(from_single, from_array);
    assert_eq!(from_single.count, 1);
}

#[tokio::test]
async fn upsert_replaces_existing_records() {
    let connection = open_shop().await;
    upsert(&connection, json!({"id": 1, "email": "old@example.com"})).await;
    upsert(&connection, json!({"id": 1, "email": "new@example.com"})).await;

    let mut found = None;
    connection
        .get_by_key("orders", 1i64, |envelope| found = envelope.data, |_| {
            panic!("lookup failed")
        })
        .await
        .unwrap();
    assert_eq!(found.unwrap()["email"], json!("new@example.com"));
}

#[tokio::test]
async fn partial_failure_keeps_the_successes() {
    let connection = open_shop().await;
    let missing_key = json!({"email": "nokey@example.com"});

    let report = upsert(
        &connection,
        json!([
            {"id": 1, "email": "a@example.com"},
            missing_key,
            {"id": 2, "email": "b@example.com"},
        ]),
    )
    .await;

    assert_eq!(report.count, 3);
    assert_eq!(report.successfully, 2);
    assert_eq!(report.failed, 1);
    let failure = &report.failed_info[0];
    assert_eq!(failure.reason, FailureReason::TransactionFailed);
    assert_eq!(failure.info, "transaction failed");
    assert_eq!(failure.item.as_ref(), Some(&missing_key));
    assert!(failure.error.as_deref().unwrap().contains("key path"));
    assert_eq!(ids(&connection).await, vec![json!(1), json!(2)]);
}

#[tokio::test]
async fn unique_index_rejects_duplicates() {
    let connection = open_shop().await;

    let report = upsert(
        &connection,
        json!([
            {"id": 1, "email": "same@example.com"},
            {"id": 2, "email": "same@example.com"},
        ]),
    )
    .await;

    assert_eq!(report.successfully, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(ids(&connection).await, vec![json!(1)]);
}

#[tokio::test]
async fn unknown_table_fails_every_item_once() {
    let connection = open_shop().await;
    let mut calls = 0;
    let mut report = None;

    connection
        .upsert("missing", orders([1, 2]), |envelope| {
            calls += 1;
            report = Some(envelope.data);
        })
        .await
        .unwrap();

    let report = report.unwrap();
    assert_eq!(calls, 1);
    assert_eq!(report.count, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.successfully, 0);
    assert!(
        report
            .failed_info
            .iter()
            .all(|failure| failure.error.as_deref().unwrap().contains("not found"))
    );
}

#[tokio::test]
async fn malformed_records_are_rejected() {
    let connection = open_shop().await;

    let result = connection
        .upsert("orders", json!(42), |_| panic!("no callback expected"))
        .await;
    assert_eq!(result, Err(UsageError::InvalidInput("records")));

    let result = connection
        .upsert("orders", Vec::<Value>::new(), |_| {
            panic!("no callback expected")
        })
        .await;
    assert_eq!(result, Err(UsageError::InvalidInput("records")));
}

#[tokio::test]
async fn remove_by_keys() {
    let connection = open_shop().await;
    upsert(&connection, orders(1..=5)).await;

    let report = remove(&connection, vec![1i64, 2, 99]).await;

    assert_eq!(report.count, 3);
    assert_eq!(report.successfully, 3);
    assert_eq!(
        report.successfully_info,
        vec![json!(1), json!(2), json!(99)]
    );
    assert_eq!(ids(&connection).await, vec![json!(3), json!(4), json!(5)]);
}

#[tokio::test]
async fn remove_single_key() {
    let connection = open_shop().await;
    upsert(&connection, orders(1..=2)).await;

    let report = remove(&connection, 2i64).await;

    assert_eq!(report.count, 1);
    assert_eq!(ids(&connection).await, vec![json!(1)]);
}

#[tokio::test]
async fn remove_by_range_counts_one_item() {
    let connection = open_shop().await;
    upsert(&connection, orders(1..=5)).await;

    let report = remove(&connection, RangeDescriptor::between(2, 4).with_min_open(true)).await;

    assert_eq!(report.count, 1);
    assert_eq!(report.successfully, 1);
    assert_eq!(report.prompt, "delete complete");
    assert_eq!(
        report.successfully_info[0],
        json!({"kind": "bound", "lower": 2, "upper": 4, "lower_open": true, "upper_open": false})
    );
    assert_eq!(ids(&connection).await, vec![json!(1), json!(2), json!(5)]);
}

#[tokio::test]
async fn zero_is_a_usable_range_bound() {
    let connection = open_shop().await;
    upsert(&connection, orders(0..3)).await;

    remove(&connection, RangeDescriptor::at_most(0)).await;

    assert_eq!(ids(&connection).await, vec![json!(1), json!(2)]);
}

#[tokio::test]
async fn range_without_bounds_fails_fast() {
    let connection = open_shop().await;
    upsert(&connection, orders(1..=3)).await;

    let result = connection
        .remove("orders", RangeDescriptor::default(), |_| {
            panic!("no callback expected")
        })
        .await;
    assert_eq!(result, Err(UsageError::EmptyRange));

    let result = connection
        .remove("orders", RangeDescriptor::between(3, 1), |_| {
            panic!("no callback expected")
        })
        .await;
    assert_eq!(result, Err(UsageError::EmptyRange));

    assert_eq!(ids(&connection).await.len(), 3);
}

#[tokio::test]
async fn range_wins_over_keys() {
    let connection = open_shop().await;
    upsert(&connection, orders(1..=5)).await;

    let target = RemoveTarget::resolve(
        Some(RangeDescriptor::at_least(4)),
        Some(Keys::from(1i64)),
    )
    .unwrap();
    remove(&connection, target).await;

    assert_eq!(ids(&connection).await, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn empty_key_list_is_rejected() {
    let connection = open_shop().await;

    let result = connection
        .remove("orders", Vec::<i64>::new(), |_| panic!("no callback expected"))
        .await;
    assert_eq!(result, Err(UsageError::InvalidInput("keys")));
}

#[tokio::test]
async fn get_by_key_reports_absence_as_success() {
    let connection = open_shop().await;
    let mut envelope = None;

    connection
        .get_by_key(
            "orders",
            404i64,
            |found| envelope = Some(found),
            |_| panic!("absence is not an error"),
        )
        .await
        .unwrap();

    let envelope = envelope.unwrap();
    assert_eq!(envelope.status, Status::Success);
    assert_eq!(envelope.data, None);
    assert_eq!(envelope.description, "no matching record");
}

#[tokio::test]
async fn get_by_key_finds_record() {
    let connection = open_shop().await;
    upsert(&connection, orders([7])).await;
    let mut envelope = None;

    connection
        .get_by_key(
            "orders",
            7i64,
            |found| envelope = Some(found),
            |_| panic!("lookup should succeed"),
        )
        .await
        .unwrap();

    let envelope = envelope.unwrap();
    assert_eq!(envelope.description, "query succeeded");
    assert_eq!(envelope.data, Some(json!({"id": 7, "email": "7@example.com"})));
}

#[tokio::test]
async fn get_by_key_on_unknown_table_reports_error() {
    let connection = open_shop().await;
    let mut failure = None;

    connection
        .get_by_key(
            "missing",
            1i64,
            |_| panic!("lookup should fail"),
            |envelope| failure = Some(envelope),
        )
        .await
        .unwrap();

    let failure = failure.unwrap();
    assert_eq!(failure.status, Status::Failure);
    assert_eq!(failure.description, "query failed");
}

#[tokio::test]
async fn index_lookup_splits_found_and_missing() {
    let connection = open_shop().await;
    upsert(&connection, json!({"id": 1, "email": "x"})).await;

    let report = lookup(&connection, vec!["x", "y"]).await;

    assert_eq!(report.successfully, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.count, 2);
    assert_eq!(report.prompt, "index lookup complete");
    assert_eq!(report.successfully_info, vec![json!({"id": 1, "email": "x"})]);
    let failure = &report.failed_info[0];
    assert_eq!(failure.reason, FailureReason::NotFound);
    assert_eq!(failure.info, "no data found");
    assert_eq!(failure.item, Some(json!("y")));
}

#[tokio::test]
async fn non_unique_index_returns_lowest_key() {
    let connection = open_shop().await;
    upsert(
        &connection,
        json!([
            {"id": 2, "email": "b", "address": {"city": "Haifa"}},
            {"id": 1, "email": "a", "address": {"city": "Haifa"}},
        ]),
    )
    .await;

    let mut report = None;
    connection
        .get_by_index("orders", "by_city", "Haifa", |envelope| {
            report = Some(envelope.data)
        })
        .await
        .unwrap();

    let report = report.unwrap();
    assert_eq!(report.successfully, 1);
    assert_eq!(report.successfully_info[0]["id"], json!(1));
}

#[tokio::test]
async fn unknown_index_fails_every_value() {
    let connection = open_shop().await;
    let mut report = None;

    connection
        .get_by_index("orders", "by_phone", vec!["1", "2"], |envelope| {
            report = Some(envelope.data)
        })
        .await
        .unwrap();

    let report = report.unwrap();
    assert_eq!(report.failed, 2);
    assert!(
        report
            .failed_info
            .iter()
            .all(|failure| failure.reason == FailureReason::TransactionFailed)
    );
}

#[tokio::test]
async fn index_lookup_requires_index_name_and_values() {
    let connection = open_shop().await;

    let result = connection
        .get_by_index("orders", "", "x", |_| panic!("no callback expected"))
        .await;
    assert_eq!(result, Err(UsageError::MissingName("index name")));

    let result = connection
        .get_by_index("orders", "by_email", Vec::<&str>::new(), |_| {
            panic!("no callback expected")
        })
        .await;
    assert_eq!(result, Err(UsageError::InvalidInput("index values")));
}

#[tokio::test]
async fn index_lookup_rejects_empty_text_values() {
    let connection = open_shop().await;

    let result = connection
        .get_by_index("orders", "by_email", "", |_| panic!("no callback expected"))
        .await;
    assert_eq!(result, Err(UsageError::InvalidInput("index values")));

    let result = connection
        .get_by_index("orders", "by_email", vec!["x", ""], |_| {
            panic!("no callback expected")
        })
        .await;
    assert_eq!(result, Err(UsageError::InvalidInput("index values")));
}
