//! Integration tests against a local HTTP stub of the storage service.
//!
//! The stub speaks just enough of the service contract (status codes, JSON
//! bodies, the `AccessKey` header) to exercise the client end to end
//! without the real endpoint.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use sha2::{Digest, Sha256};

use bunny_storage::storage::{Region, StorageClient, StorageError};

const ACCESS_KEY: &str = "test-access-key";
const ZONE: &str = "zone";

type Handler = Arc<dyn Fn(&Parts, &Bytes) -> (StatusCode, String) + Send + Sync>;

/// Spawn a stub server; requests are answered by `handler`
async fn spawn_stub(handler: Handler) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let handler = handler.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let handler = handler.clone();
                    async move {
                        let (parts, body) = req.into_parts();
                        let body = body.collect().await.unwrap().to_bytes();
                        let (status, response) = handler(&parts, &body);
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(status)
                                .body(Full::new(Bytes::from(response)))
                                .unwrap(),
                        )
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

fn client_for(addr: SocketAddr) -> StorageClient {
    StorageClient::new(ACCESS_KEY, ZONE, Region::Falkenstein)
        .with_endpoint(&format!("http://{addr}"))
}

fn authed(parts: &Parts) -> bool {
    parts
        .headers
        .get("AccessKey")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == ACCESS_KEY)
        .unwrap_or(false)
}

#[tokio::test]
async fn test_list_parses_metadata() {
    let listing = r#"[
        {
            "Guid": "2c1ee245-0f9a-4e3c-8545-e596d149ad44",
            "Path": "/zone/docs/",
            "ObjectName": "a.txt",
            "Length": 11,
            "IsDirectory": false,
            "Checksum": "ABCDEF0123",
            "DateCreated": "2024-03-01T09:15:00.000",
            "LastChanged": "2024-03-02T18:30:45.123"
        },
        {
            "Guid": "91f9f27c-9564-4c94-85cc-e22cc5a4b65a",
            "Path": "/zone/docs/",
            "ObjectName": "sub",
            "Length": 0,
            "IsDirectory": true,
            "Checksum": null,
            "DateCreated": "2024-01-15T00:00:00.000",
            "LastChanged": "2024-01-15T00:00:00.000"
        }
    ]"#
    .to_string();

    let addr = spawn_stub(Arc::new(move |parts: &Parts, _body: &Bytes| {
        if !authed(parts) {
            return (StatusCode::UNAUTHORIZED, String::new());
        }
        assert_eq!(parts.method, hyper::Method::GET);
        // Listing requests are directory-normalized with a trailing slash
        assert_eq!(parts.uri.path(), "/zone/docs/");
        (StatusCode::OK, listing.clone())
    }))
    .await;

    let files = client_for(addr).list("/zone/docs").await.unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "a.txt");
    assert_eq!(files[0].size, 11);
    assert_eq!(files[0].checksum, "abcdef0123");
    assert!(!files[0].is_directory);
    assert!(files[1].is_directory);
    assert_eq!(files[1].checksum, "");
}

#[tokio::test]
async fn test_list_empty_directory() {
    let addr = spawn_stub(Arc::new(|_: &Parts, _: &Bytes| {
        (StatusCode::OK, "[]".to_string())
    }))
    .await;

    let files = client_for(addr).list("empty/").await.unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_bad_access_key_is_authentication_failure() {
    let addr = spawn_stub(Arc::new(|_: &Parts, _: &Bytes| {
        (StatusCode::UNAUTHORIZED, String::new())
    }))
    .await;

    let client = StorageClient::new("wrong-key", ZONE, Region::Falkenstein)
        .with_endpoint(&format!("http://{addr}"));

    let err = client.list("/").await.unwrap_err();
    match err {
        StorageError::AuthenticationFailed { zone, access_key } => {
            assert_eq!(zone, ZONE);
            assert_eq!(access_key, "wrong-key");
        }
        other => panic!("expected AuthenticationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_contents_and_not_found() {
    let addr = spawn_stub(Arc::new(|parts: &Parts, _: &Bytes| {
        match parts.uri.path() {
            "/zone/a.txt" => (StatusCode::OK, "hello world".to_string()),
            _ => (StatusCode::NOT_FOUND, String::new()),
        }
    }))
    .await;

    let client = client_for(addr);

    let data = client.get_contents("a.txt").await.unwrap();
    assert_eq!(&data[..], b"hello world");

    let err = client.get_contents("missing.txt").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
    assert_eq!(
        err.to_string(),
        "Could not find part of the object path: missing.txt"
    );
}

#[tokio::test]
async fn test_download_file_streams_to_disk() {
    let addr = spawn_stub(Arc::new(|_: &Parts, _: &Bytes| {
        (StatusCode::OK, "streamed contents".to_string())
    }))
    .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("out.txt");

    let written = client_for(addr)
        .download_file("a.txt", &local)
        .await
        .unwrap();

    assert_eq!(written, 17);
    assert_eq!(std::fs::read_to_string(&local).unwrap(), "streamed contents");
}

#[tokio::test]
async fn test_put_contents_requires_201() {
    let addr = spawn_stub(Arc::new(|parts: &Parts, body: &Bytes| {
        assert_eq!(parts.method, hyper::Method::PUT);
        assert_eq!(&body[..], b"payload");
        (StatusCode::CREATED, String::new())
    }))
    .await;

    client_for(addr)
        .put_contents("new.txt", Bytes::from_static(b"payload"))
        .await
        .unwrap();

    // A 200 acknowledgement is not a valid upload response
    let addr = spawn_stub(Arc::new(|_: &Parts, _: &Bytes| {
        (StatusCode::OK, String::new())
    }))
    .await;

    let err = client_for(addr)
        .put_contents("new.txt", Bytes::from_static(b"payload"))
        .await
        .unwrap_err();
    match err {
        StorageError::UnexpectedStatus { status, .. } => assert_eq!(status, 200),
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_file_sends_checksum_header() {
    let contents = b"checksum me";
    let expected = hex::encode_upper(Sha256::digest(contents));

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("in.txt");
    std::fs::write(&local, contents).unwrap();

    let expected_header = expected.clone();
    let addr = spawn_stub(Arc::new(move |parts: &Parts, body: &Bytes| {
        assert_eq!(parts.method, hyper::Method::PUT);
        assert_eq!(&body[..], contents);
        let header = parts
            .headers
            .get("Checksum")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert_eq!(header, expected_header);
        (StatusCode::CREATED, String::new())
    }))
    .await;

    client_for(addr)
        .upload_file(&local, "uploads/in.txt", true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_prefers_body_message() {
    let addr = spawn_stub(Arc::new(|_: &Parts, _: &Bytes| {
        (
            StatusCode::NOT_FOUND,
            r#"{"HttpCode":404,"Message":"File not found"}"#.to_string(),
        )
    }))
    .await;

    let err = client_for(addr).delete("gone.txt").await.unwrap_err();
    assert_eq!(err.to_string(), "File not found");
}

#[tokio::test]
async fn test_exists_guid_heuristic() {
    let addr = spawn_stub(Arc::new(|parts: &Parts, _: &Bytes| {
        assert_eq!(parts.method.as_str(), "DESCRIBE");
        match parts.uri.path() {
            "/zone/real.txt" => (
                StatusCode::OK,
                r#"{"Guid":"2c1ee245-0f9a-4e3c-8545-e596d149ad44"}"#.to_string(),
            ),
            "/zone/odd.txt" => (StatusCode::OK, r#"{"Guid":"short"}"#.to_string()),
            "/zone/noguid.txt" => (StatusCode::OK, r#"{"Ok":true}"#.to_string()),
            "/zone/forbidden.txt" => (StatusCode::UNAUTHORIZED, String::new()),
            _ => (StatusCode::NOT_FOUND, String::new()),
        }
    }))
    .await;

    let client = client_for(addr);

    assert!(client.exists("real.txt").await.unwrap());
    // A 200 without a canonical 36-character Guid is "does not exist"
    assert!(!client.exists("odd.txt").await.unwrap());
    assert!(!client.exists("noguid.txt").await.unwrap());
    // 404 is an answer here, not an error
    assert!(!client.exists("missing.txt").await.unwrap());

    let err = client.exists("forbidden.txt").await.unwrap_err();
    assert!(matches!(err, StorageError::AuthenticationFailed { .. }));
}

/// Batch delete: one success, one 404 with a body message, one connection
/// drop. The coordinator must settle all three, report only the failures,
/// and hold the requests in flight concurrently.
#[tokio::test]
async fn test_delete_multiple_settles_all_concurrently() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let current = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    {
        let current = current.clone();
        let max_seen = max_seen.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let current = current.clone();
                let max_seen = max_seen.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let current = current.clone();
                        let max_seen = max_seen.clone();
                        async move {
                            let inflight = current.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(inflight, Ordering::SeqCst);
                            // Hold every request open so the in-flight
                            // windows of a concurrent batch overlap
                            tokio::time::sleep(Duration::from_millis(150)).await;
                            current.fetch_sub(1, Ordering::SeqCst);

                            match req.uri().path() {
                                "/zone/a.txt" => Ok(Response::builder()
                                    .status(StatusCode::OK)
                                    .body(Full::new(Bytes::new()))
                                    .unwrap()),
                                "/zone/b.txt" => Ok(Response::builder()
                                    .status(StatusCode::NOT_FOUND)
                                    .body(Full::new(Bytes::from_static(
                                        br#"{"Message":"File not found"}"#,
                                    )))
                                    .unwrap()),
                                // Simulate a transport-level failure by
                                // aborting the connection mid-request
                                _ => Err(std::io::Error::new(
                                    std::io::ErrorKind::ConnectionReset,
                                    "dropped",
                                )),
                            }
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
    }

    let client = client_for(addr);
    let paths = vec![
        "a.txt".to_string(),
        "b.txt".to_string(),
        "c.txt".to_string(),
    ];

    let failures = client.delete_multiple(&paths).await;

    // Only the failing paths appear in the map
    assert!(!failures.contains_key("a.txt"));
    assert_eq!(failures.get("b.txt").map(String::as_str), Some("File not found"));
    assert!(failures
        .get("c.txt")
        .is_some_and(|msg| msg.starts_with("transport failure")));

    // All three requests were in flight at the same time
    assert!(
        max_seen.load(Ordering::SeqCst) >= 2,
        "expected overlapping in-flight windows, max was {}",
        max_seen.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn test_invalid_path_fails_before_any_request() {
    // No server at all: input validation must reject the path first
    let client = StorageClient::new(ACCESS_KEY, ZONE, Region::Falkenstein)
        .with_endpoint("http://127.0.0.1:1");

    let err = client.get_contents("zone/dir/").await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidPath { .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_failure() {
    // Nothing listens on this port
    let client = client_for("127.0.0.1:1".parse().unwrap());

    let err = client.delete("a.txt").await.unwrap_err();
    assert!(matches!(err, StorageError::Transport(_)));
}
