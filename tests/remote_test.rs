use assert2::{check, let_assert};
use mansearch::config::RemoteConfig;
use mansearch::{
    HttpSearchBackend, RemoteError, ResultSource, SearchBackend, SearchClient, SearchQuery,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Serves one canned HTTP response per connection and reports each request head.
async fn serve(status: &'static str, body: &'static str) -> (String, mpsc::UnboundedReceiver<String>) {
    mansearch::tracing::init();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let _ = tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), rx)
}

fn backend(base_url: &str) -> HttpSearchBackend {
    HttpSearchBackend::new(base_url, &RemoteConfig::default()).expect("backend")
}

/// Test: Search requests carry the query string and a request id.
#[tokio::test]
async fn search_sends_parameters_and_request_id() {
    let (url, mut requests) = serve("200 OK", r#"{"results": [], "total": 0}"#).await;
    let backend = backend(&url);

    let_assert!(Ok(response) = backend.search(&SearchQuery::new("ls").section(1).limit(5)).await);
    check!(response.total == 0);

    let_assert!(Some(request) = requests.recv().await);
    check!(request.starts_with("GET /api/search?q=ls&section=1&limit=5&fuzzy=true&threshold=0.3 "));
    check!(request.to_lowercase().contains("x-request-id: 1"));

    let _ = backend.search(&SearchQuery::new("cp")).await;
    let_assert!(Some(second) = requests.recv().await);
    check!(second.to_lowercase().contains("x-request-id: 2"));
}

/// Test: Remote results decode into documents.
#[tokio::test]
async fn search_decodes_results() {
    let body = r#"{
        "results": [{
            "id": "ls.1", "name": "ls", "section": 1, "title": "list directory contents",
            "description": "", "category": "files", "keywords": ["ls"], "content": "",
            "isCommon": true, "examples": [], "score": 0.9
        }],
        "total": 1
    }"#;
    let (url, _requests) = serve("200 OK", body).await;

    let_assert!(Ok(response) = backend(&url).search(&SearchQuery::new("ls")).await);
    check!(response.results.len() == 1);
    check!(response.results[0].document.id == "ls.1");
    check!(response.results[0].score == 0.9);
}

/// Test: Non-success statuses and bad bodies map to typed errors.
#[tokio::test]
async fn search_maps_failures() {
    let (url, _requests) = serve("503 Service Unavailable", "{}").await;
    let result = backend(&url).search(&SearchQuery::new("ls")).await;
    check!(result == Err(RemoteError::Status(503)));

    let (url, _requests) = serve("200 OK", "not json").await;
    let_assert!(Err(RemoteError::Decode(_)) = backend(&url).search(&SearchQuery::new("ls")).await);
}

/// Test: Suggestions keep string entries and reject non-array bodies.
#[tokio::test]
async fn suggestions_decode() {
    let (url, mut requests) = serve("200 OK", r#"["git", 7, "github"]"#).await;
    let_assert!(Ok(suggestions) = backend(&url).suggestions("gi", 5).await);
    check!(suggestions == vec!["git", "github"]);
    let_assert!(Some(request) = requests.recv().await);
    check!(request.starts_with("GET /api/search/suggestions?prefix=gi&limit=5 "));

    let (url, _requests) = serve("200 OK", r#"{"items": []}"#).await;
    let_assert!(Err(RemoteError::Decode(_)) = backend(&url).suggestions("gi", 5).await);
}

/// Test: A client wired from config talks to the remote and tags the source.
#[tokio::test]
async fn client_from_config_uses_remote() {
    let body = r#"{"results": [{"id": "tar.1", "name": "tar", "section": 1, "title": "",
        "description": "", "category": "archive", "keywords": [], "content": "",
        "isCommon": false, "examples": [], "score": 0.7}], "total": 1}"#;
    let (url, _requests) = serve("200 OK", body).await;

    let mut config = mansearch::Config::default();
    config.remote.base_url = Some(url);
    let client = SearchClient::from_config(&config).expect("client");

    let_assert!(Ok(response) = client.search(SearchQuery::new("tar")).await);
    check!(response.source == ResultSource::Remote);
    check!(response.results[0].document.name == "tar");
}
