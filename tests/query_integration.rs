use std::collections::BTreeMap;

use ir_query::api::MockRepositoryApi;
use ir_query::config::CollectionCatalog;
use ir_query::error::QueryError;
use ir_query::pagination::WindowingMode;
use ir_query::query::{RepositoryQuery, RetrievalState};
use mockall::Sequence;
use serde_json::json;

fn catalog() -> CollectionCatalog {
    let mut collections = BTreeMap::new();
    collections.insert("Test Collection".to_string(), "5".to_string());
    collections.insert("Other Collection".to_string(), "8".to_string());
    CollectionCatalog::new(collections, "all")
}

fn default_fields() -> Vec<String> {
    vec![
        "PID".to_string(),
        "mods.title".to_string(),
        "mods.related_series".to_string(),
    ]
}

fn query_with(api: MockRepositoryApi) -> RepositoryQuery<MockRepositoryApi> {
    RepositoryQuery::new(api, catalog(), default_fields())
}

/// A total below the page cap results in exactly one window request whose
/// docs array lands unchanged in the raw record collection.
#[tokio::test]
async fn single_window_end_to_end() {
    let mut api = MockRepositoryApi::new();
    api.expect_fetch_total()
        .withf(|pid, filter| pid == "5" && filter.is_none())
        .times(1)
        .returning(|_, _| Ok(3000));
    api.expect_fetch_window()
        .withf(|pid, window, _| pid == "5" && window.rows == 3000 && window.start == 0)
        .times(1)
        .returning(|_, _, _| {
            Ok(json!({"response": {"docs": [
                {"PID": "noaa:1", "mods.title": "First"},
                {"PID": "noaa:2", "mods.title": "Second"},
            ]}}))
        });

    let mut query = query_with(api);
    let count = query.retrieve_collection("5").await.expect("retrieval succeeds");

    assert_eq!(count, 2);
    assert_eq!(query.state(), RetrievalState::Ready);
    assert_eq!(query.selected_pid(), Some("5"));
    assert_eq!(query.raw_docs().len(), 2);
    assert_eq!(query.raw_docs()[0]["PID"], json!("noaa:1"));
    assert_eq!(query.raw_docs()[1]["mods.title"], json!("Second"));
}

/// Windows are fetched sequentially in ascending offset order, and the
/// truncating plan never requests the remainder.
#[tokio::test]
async fn windows_fetched_in_ascending_order() {
    let mut api = MockRepositoryApi::new();
    let mut seq = Sequence::new();

    api.expect_fetch_total()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(12000));
    api.expect_fetch_window()
        .withf(|_, window, _| window.rows == 5000 && window.start == 0)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(json!({"response": {"docs": [{"PID": "noaa:1"}]}})));
    api.expect_fetch_window()
        .withf(|_, window, _| window.rows == 5000 && window.start == 5000)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(json!({"response": {"docs": [{"PID": "noaa:2"}]}})));

    let mut query = query_with(api);
    let count = query.retrieve_collection("5").await.expect("retrieval succeeds");

    assert_eq!(count, 2);
}

#[tokio::test]
async fn exhaustive_mode_requests_the_remainder_window() {
    let mut api = MockRepositoryApi::new();
    api.expect_fetch_total().returning(|_, _| Ok(12000));
    api.expect_fetch_window()
        .times(3)
        .returning(|_, window, _| {
            // Echo the window so coverage is checkable from the docs.
            Ok(json!({"response": {"docs": [{"PID": window.start.to_string()}]}}))
        });

    let mut query = query_with(api);
    query.set_windowing_mode(WindowingMode::Exhaustive);
    let count = query.retrieve_collection("5").await.expect("retrieval succeeds");

    assert_eq!(count, 3);
    let starts: Vec<&str> = query
        .raw_docs()
        .iter()
        .map(|doc| doc["PID"].as_str().unwrap())
        .collect();
    assert_eq!(starts, vec!["0", "5000", "10000"]);
}

#[tokio::test]
async fn unknown_pid_fails_before_any_request() {
    // No expectations: any API call would panic the mock.
    let api = MockRepositoryApi::new();
    let mut query = query_with(api);

    let err = query.retrieve_collection("999").await.unwrap_err();

    assert!(matches!(err, QueryError::UnknownCollection { ref pid } if pid == "999"));
    assert_eq!(query.state(), RetrievalState::Idle);
}

#[tokio::test]
async fn retrieve_all_uses_the_configured_all_items_pid() {
    let mut api = MockRepositoryApi::new();
    api.expect_fetch_total()
        .withf(|pid, _| pid == "all")
        .times(1)
        .returning(|_, _| Ok(1));
    api.expect_fetch_window()
        .withf(|pid, _, _| pid == "all")
        .times(1)
        .returning(|_, _, _| Ok(json!({"response": {"docs": [{"PID": "noaa:1"}]}})));

    let mut query = query_with(api);
    let count = query.retrieve_all().await.expect("retrieval succeeds");

    assert_eq!(count, 1);
}

#[tokio::test]
async fn failed_retrieval_resets_to_idle_and_clears_data() {
    let mut api = MockRepositoryApi::new();
    api.expect_fetch_total()
        .withf(|pid, _| pid == "5")
        .times(1)
        .returning(|_, _| Ok(1));
    api.expect_fetch_window()
        .withf(|pid, _, _| pid == "5")
        .times(1)
        .returning(|_, _, _| Ok(json!({"response": {"docs": [{"PID": "noaa:1"}]}})));
    // The retrieval of the second collection fails at the count probe.
    api.expect_fetch_total()
        .withf(|pid, _| pid == "8")
        .returning(|_, _| {
            Err(QueryError::Transport {
                url: "http://repository.test/8".to_string(),
                status: 500,
            })
        });

    let mut query = query_with(api);
    query.retrieve_collection("5").await.expect("first retrieval succeeds");
    assert_eq!(query.state(), RetrievalState::Ready);

    let err = query.retrieve_collection("8").await.unwrap_err();

    assert!(matches!(err, QueryError::Transport { status: 500, .. }));
    assert_eq!(query.state(), RetrievalState::Idle);
    assert!(query.raw_docs().is_empty());
    assert!(query.records().is_empty());
}

#[tokio::test]
async fn projection_replaces_raw_docs_with_records() {
    let mut api = MockRepositoryApi::new();
    api.expect_fetch_total().returning(|_, _| Ok(1));
    api.expect_fetch_window().returning(|_, _, _| {
        Ok(json!({"response": {"docs": [
            {"PID": "noaa:1", "mods.title": "Annual Report",
             "mods.related_series": ["Series A", "Series B"], "extra": "dropped"},
        ]}}))
    });

    let mut query = query_with(api);
    query.retrieve_collection("5").await.expect("retrieval succeeds");
    query.apply_field_projection().expect("projection succeeds");

    assert!(query.raw_docs().is_empty());
    assert_eq!(query.records().len(), 1);
    let record = &query.records()[0];
    let keys: Vec<&str> = record.fields().collect();
    assert_eq!(keys, vec!["PID", "mods.title", "mods.related_series"]);
    assert_eq!(record.get("mods.related_series"), Some("Series A~Series B"));

    // Re-running projection is a no-op, not a wipe.
    query.apply_field_projection().expect("second projection succeeds");
    assert_eq!(query.records().len(), 1);
}

#[tokio::test]
async fn projection_before_retrieval_is_a_state_error() {
    let api = MockRepositoryApi::new();
    let mut query = query_with(api);

    assert!(matches!(
        query.apply_field_projection().unwrap_err(),
        QueryError::NoData
    ));
}

async fn ready_query() -> RepositoryQuery<MockRepositoryApi> {
    let mut api = MockRepositoryApi::new();
    api.expect_fetch_total().returning(|_, _| Ok(2));
    api.expect_fetch_window().returning(|_, _, _| {
        Ok(json!({"response": {"docs": [
            {"PID": "noaa:1", "mods.title": "Annual Report", "mods.related_series": "A"},
            {"PID": "noaa:2", "mods.title": "Tide Tables", "mods.related_series": "B"},
        ]}}))
    });

    let mut query = query_with(api);
    query.retrieve_collection("5").await.expect("retrieval succeeds");
    query.apply_field_projection().expect("projection succeeds");
    query
}

#[tokio::test]
async fn search_is_case_insensitive() {
    let query = ready_query().await;

    let matches = query.search("mods.title", "report").expect("search succeeds");

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].get("PID"), Some("noaa:1"));
}

#[tokio::test]
async fn search_without_loaded_records_is_a_state_error() {
    let api = MockRepositoryApi::new();
    let query = query_with(api);

    assert!(matches!(
        query.search("mods.title", "report").unwrap_err(),
        QueryError::NoData
    ));
}

#[tokio::test]
async fn search_aborts_on_first_missing_field() {
    let query = ready_query().await;

    let err = query.search("mods.nonexistent", "x").unwrap_err();

    assert!(matches!(
        err,
        QueryError::MissingField { ref field } if field == "mods.nonexistent"
    ));
}

#[tokio::test]
async fn explode_after_projection_rekeys_records() {
    let mut api = MockRepositoryApi::new();
    api.expect_fetch_total().returning(|_, _| Ok(1));
    api.expect_fetch_window().returning(|_, _, _| {
        Ok(json!({"response": {"docs": [
            {"PID": "noaa:1", "mods.title": "Annual Report",
             "mods.related_series": ["Series A", "Series B"]},
        ]}}))
    });

    let mut query = query_with(api);
    query.retrieve_collection("5").await.expect("retrieval succeeds");
    query.apply_field_projection().expect("projection succeeds");
    query
        .explode_field("mods.related_series", '~')
        .expect("explode succeeds");

    assert_eq!(query.records().len(), 2);
    let keys: Vec<&str> = query.records()[0].fields().collect();
    assert_eq!(keys, vec!["PID", "mods.related_series"]);
}

#[tokio::test]
async fn new_retrieval_discards_prior_results() {
    let mut api = MockRepositoryApi::new();
    api.expect_fetch_total()
        .withf(|pid, _| pid == "5")
        .times(1)
        .returning(|_, _| Ok(2));
    api.expect_fetch_window()
        .withf(|pid, _, _| pid == "5")
        .times(1)
        .returning(|_, _, _| {
            Ok(json!({"response": {"docs": [{"PID": "noaa:1"}, {"PID": "noaa:2"}]}}))
        });
    api.expect_fetch_total()
        .withf(|pid, _| pid == "8")
        .times(1)
        .returning(|_, _| Ok(1));
    api.expect_fetch_window()
        .withf(|pid, _, _| pid == "8")
        .times(1)
        .returning(|_, _, _| Ok(json!({"response": {"docs": [{"PID": "noaa:9"}]}})));

    let mut query = query_with(api);
    query.retrieve_collection("5").await.expect("first retrieval");
    assert_eq!(query.raw_docs().len(), 2);

    query.retrieve_collection("8").await.expect("second retrieval");
    assert_eq!(query.raw_docs().len(), 1);
    assert_eq!(query.raw_docs()[0]["PID"], json!("noaa:9"));
}
