//! One server's `/results/` listing used as the index of another loader.

use runview::api::{router, state::AppState};
use runview::compare::CompareOptions;
use runview::config::ResultsConfig;
use runview::model::{ErrorType, ResultRecord, RunMapping, Status};
use runview::store::ResultStore;
use std::io::Write;

async fn spawn_server(store: ResultStore) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(store, CompareOptions::default()), None);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn index_of(addr: std::net::SocketAddr) -> ResultsConfig {
    ResultsConfig {
        index_url: Some(format!("http://{addr}/results/")),
        fetch_timeout_sec: 5,
        ..ResultsConfig::default()
    }
}

#[tokio::test]
async fn test_load_runs_through_http_listing() {
    let mut store = ResultStore::new();
    store.insert(RunMapping::new(
        "engine-2024-01",
        vec![
            ResultRecord::new("t1", Status::Passed).with_group("bind"),
            ResultRecord::new("t2", Status::Failed).with_error_type(ErrorType::QueryException),
        ],
    ));
    store.insert(RunMapping::new(
        "engine-2024-02",
        vec![ResultRecord::new("t1", Status::Intended).with_type_name("QueryEvaluationTest")],
    ));

    let addr = spawn_server(store).await;
    let (loaded, report) = runview::load_results(&index_of(addr)).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(loaded.list_run_names(), vec!["engine-2024-01", "engine-2024-02"]);

    let first = loaded.get("engine-2024-01").unwrap();
    assert_eq!(first.info.tests, 2);
    assert_eq!(first.get("t2").unwrap().error_type, ErrorType::QueryException);
    let second = loaded.get("engine-2024-02").unwrap();
    assert_eq!(second.get("t1").unwrap().status, Some(Status::Intended));
    assert_eq!(second.get("t1").unwrap().type_name, "QueryEvaluationTest");
}

#[tokio::test]
async fn test_missing_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let results = ResultsConfig {
        dir: dir.path().join("absent"),
        ..ResultsConfig::default()
    };
    assert!(runview::load_results(&results).await.is_err());
}

#[tokio::test]
async fn test_listed_names_with_spaces_load_under_their_own_name() {
    let mut store = ResultStore::new();
    store.insert(RunMapping::new(
        "nightly build",
        vec![ResultRecord::new("t1", Status::Failed)],
    ));
    let addr = spawn_server(store).await;

    let (loaded, report) = runview::load_results(&index_of(addr)).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(loaded.list_run_names(), vec!["nightly build"]);
    assert_eq!(loaded.get("nightly build").unwrap().info.failed, 1);
}

#[tokio::test]
async fn test_directory_with_compressed_runs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("plain.json"),
        r#"{"t1": {"status": "Passed", "errorType": ""}}"#,
    )
    .unwrap();

    let mut encoder =
        bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder
        .write_all(br#"{"packed": {"t1": {"status": "Failed", "errorType": "SERVER ERROR"}}}"#)
        .unwrap();
    std::fs::write(dir.path().join("packed.json.bz2"), encoder.finish().unwrap()).unwrap();

    let results = ResultsConfig {
        dir: dir.path().to_path_buf(),
        ..ResultsConfig::default()
    };
    let (loaded, report) = runview::load_results(&results).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(loaded.list_run_names(), vec!["packed", "plain"]);
    let packed = loaded.get("packed").unwrap();
    assert_eq!(packed.get("t1").unwrap().error_type, ErrorType::ServerError);
}
