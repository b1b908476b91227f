use owm_ingest::error::AppError;
use owm_ingest::storage::{FsObjectStore, HttpObjectStore, ObjectStore, StorageCredentials};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> StorageCredentials {
    StorageCredentials {
        access_key: "test-access".to_string(),
        secret_key: "test-secret".to_string(),
        session_token: None,
    }
}

/// Test the write lands as a PUT under the bucket with basic auth and a
/// CSV content type
#[tokio::test]
async fn test_http_store_puts_object_with_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/weather-archive/report.csv"))
        .and(header(
            "authorization",
            "Basic dGVzdC1hY2Nlc3M6dGVzdC1zZWNyZXQ=",
        ))
        .and(header("content-type", "text/csv"))
        .and(body_string("City,Description\nLisbon,clear sky\n"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = HttpObjectStore::new(&mock_server.uri(), "weather-archive")
        .expect("Failed to build store");
    store
        .put(
            "report.csv",
            b"City,Description\nLisbon,clear sky\n",
            &credentials(),
        )
        .await
        .expect("Write failed");
}

/// Test a session token travels in its own header when present
#[tokio::test]
async fn test_http_store_sends_session_token_when_present() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(header("x-amz-security-token", "sts-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = HttpObjectStore::new(&mock_server.uri(), "weather-archive")
        .expect("Failed to build store");
    let creds = StorageCredentials {
        session_token: Some("sts-token".to_string()),
        ..credentials()
    };
    store.put("report.csv", b"data", &creds).await.expect("Write failed");
}

/// Test no token header leaks when the credential triple has none
#[tokio::test]
async fn test_http_store_omits_token_header_when_absent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let store = HttpObjectStore::new(&mock_server.uri(), "weather-archive")
        .expect("Failed to build store");
    store.put("report.csv", b"data", &credentials()).await.expect("Write failed");

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("x-amz-security-token"));
}

/// Test a rejected write turns into a storage error with the status
#[tokio::test]
async fn test_http_store_reports_rejected_write() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503).set_body_string("slow down"))
        .mount(&mock_server)
        .await;

    let store = HttpObjectStore::new(&mock_server.uri(), "weather-archive")
        .expect("Failed to build store");
    let result = store.put("report.csv", b"data", &credentials()).await;

    match result.unwrap_err() {
        AppError::StorageWrite(msg) => {
            assert!(msg.contains("503"), "message was: {}", msg);
            assert!(msg.contains("slow down"), "message was: {}", msg);
        }
        e => panic!("Expected StorageWrite error, got: {:?}", e),
    }
}

/// Test the filesystem sink writes the object under its root, creating
/// missing directories
#[tokio::test]
async fn test_fs_store_writes_object_under_root() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = dir.path().join("archive").join("weather");

    let store = FsObjectStore::new(&root);
    store
        .put("report.csv", b"City\nLisbon\n", &StorageCredentials::anonymous())
        .await
        .expect("Write failed");

    let written = std::fs::read_to_string(root.join("report.csv")).expect("Missing object file");
    assert_eq!(written, "City\nLisbon\n");
}

/// Test an unusable root surfaces as a storage error
#[tokio::test]
async fn test_fs_store_reports_unusable_root() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let blocking_file = dir.path().join("occupied");
    std::fs::write(&blocking_file, b"not a directory").expect("Failed to seed file");

    let store = FsObjectStore::new(&blocking_file);
    let result = store
        .put("report.csv", b"data", &StorageCredentials::anonymous())
        .await;

    match result.unwrap_err() {
        AppError::StorageWrite(_) => {}
        e => panic!("Expected StorageWrite error, got: {:?}", e),
    }
}

/// Test a write that cannot complete leaves nothing at the object key
#[tokio::test]
async fn test_fs_store_failed_write_leaves_no_object() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    // Occupy the staging name with a directory so the body write fails
    std::fs::create_dir(dir.path().join("report.csv.tmp")).expect("Failed to seed dir");

    let store = FsObjectStore::new(dir.path());
    let result = store
        .put("report.csv", b"City\nLisbon\n", &StorageCredentials::anonymous())
        .await;

    match result.unwrap_err() {
        AppError::StorageWrite(_) => {}
        e => panic!("Expected StorageWrite error, got: {:?}", e),
    }
    assert!(
        !dir.path().join("report.csv").exists(),
        "failed write must not surface an object at the key"
    );
}

/// Test a completed write leaves only the object behind, no staging
/// residue
#[tokio::test]
async fn test_fs_store_leaves_only_the_object() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let store = FsObjectStore::new(dir.path());
    store
        .put("report.csv", b"City\nLisbon\n", &StorageCredentials::anonymous())
        .await
        .expect("Write failed");

    let mut entries: Vec<String> = std::fs::read_dir(dir.path())
        .expect("Failed to list root")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, vec!["report.csv"]);
}
