//! Storage client implementation with the core operations
//!
//! Built on:
//! - hyper with a pooled connection pool and TCP_NODELAY
//! - native-tls (OpenSSL) for TLS
//! - Zero-copy Bytes for get/put operations
//! - Streaming bodies for file upload/download (bounded memory)
//!
//! hyper performs no automatic redirects and raises no errors on 4xx/5xx
//! status codes, so every response status is inspected manually. No
//! operation is retried inside this layer.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures::future;
use futures::{StreamExt, TryStreamExt};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, BodyStream, Empty, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::{Method, Request, Response, StatusCode};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use native_tls::TlsConnector;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

use crate::storage::error::{classify_failure, StorageError};
use crate::storage::metadata::FileMetadata;
use crate::storage::path::normalize_path;
use crate::storage::region::Region;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Request body type: either a buffered payload or a file stream
type OutBody = BoxBody<Bytes, std::io::Error>;

/// Read buffer size for the upload checksum pass
const CHECKSUM_BUF_SIZE: usize = 64 * 1024;

/// Async client for one storage zone.
///
/// Clone is cheap - the underlying HTTP client uses Arc internally and
/// clones share the same connection pool.
#[derive(Clone)]
pub struct StorageClient {
    /// Hyper HTTP client with pooled connections
    client: HyperClient<HttpsConnector<HttpConnector>, OutBody>,
    /// Storage zone the client is bound to
    zone: String,
    /// API access key sent in the `AccessKey` header
    access_key: String,
    /// Base endpoint URL, always with a trailing slash
    base_url: String,
}

impl StorageClient {
    /// Create a new client bound to a storage zone and region.
    ///
    /// The region is a static base-URL choice made here once; there is no
    /// failover between regions.
    pub fn new(
        access_key: impl Into<String>,
        zone: impl Into<String>,
        region: Region,
    ) -> Self {
        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(10)));
        http.set_keepalive(Some(Duration::from_secs(90)));

        let tls = TlsConnector::new().expect("Failed to build TLS connector");
        let https = HttpsConnector::from((http, tls.into()));

        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .set_host(true)
            .build(https);

        Self {
            client,
            zone: zone.into(),
            access_key: access_key.into(),
            base_url: region.base_url(),
        }
    }

    /// Override the base endpoint URL (test stubs, self-hosted replicas)
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        let trimmed = endpoint.trim_end_matches('/');
        self.base_url = format!("{trimmed}/");
        self
    }

    /// The storage zone this client is bound to
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// List the objects in a directory.
    ///
    /// The path is directory-normalized (a trailing slash is appended if
    /// missing). An empty directory yields an empty vector, not an error.
    pub async fn list(&self, path: &str) -> Result<Vec<FileMetadata>> {
        let wire = normalize_path(path, &self.zone, Some(true))?;
        let (status, body) = self.request(Method::GET, &wire, &[], empty_body()).await?;

        if status != StatusCode::OK {
            return Err(self.failure(status, &body, path));
        }

        let records: Vec<Value> = serde_json::from_slice(&body).map_err(|e| {
            StorageError::metadata(format!("listing body is not a JSON array: {e}"))
        })?;
        records.iter().map(FileMetadata::from_value).collect()
    }

    /// Download an object into memory.
    ///
    /// Convenience accessor for small objects; use [`download_file`] to
    /// stream large objects to disk without buffering them wholesale.
    ///
    /// [`download_file`]: StorageClient::download_file
    pub async fn get_contents(&self, path: &str) -> Result<Bytes> {
        let wire = normalize_path(path, &self.zone, Some(false))?;
        let (status, body) = self.request(Method::GET, &wire, &[], empty_body()).await?;

        if status != StatusCode::OK {
            return Err(self.failure(status, &body, path));
        }

        Ok(body)
    }

    /// Download an object directly to a local file (streaming).
    ///
    /// Response chunks are written through a BufWriter so peak memory stays
    /// bounded regardless of object size. Returns the number of bytes
    /// written.
    pub async fn download_file(&self, path: &str, local: &Path) -> Result<u64> {
        let wire = normalize_path(path, &self.zone, Some(false))?;
        let response = self.send(Method::GET, &wire, &[], empty_body()).await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = collect_body(response).await?;
            return Err(self.failure(status, &body, path));
        }

        use std::io::Write;

        let file = std::fs::File::create(local)?;
        let mut writer = std::io::BufWriter::with_capacity(256 * 1024, file);
        let mut body = BodyStream::new(response.into_body());
        let mut total_bytes = 0u64;

        while let Some(frame) = body.next().await {
            let frame = frame.map_err(StorageError::transport)?;
            if let Some(chunk) = frame.data_ref() {
                writer.write_all(chunk)?;
                total_bytes += chunk.len() as u64;
            }
        }

        writer.flush()?;
        tracing::debug!(path, bytes = total_bytes, "download complete");
        Ok(total_bytes)
    }

    /// Upload an in-memory buffer to the given remote path.
    ///
    /// The service acknowledges uploads with 201 Created.
    pub async fn put_contents(&self, path: &str, data: Bytes) -> Result<()> {
        self.put_inner(path, None, data.len() as u64, full_body(data))
            .await
    }

    /// Upload an in-memory buffer with a `Checksum` header.
    ///
    /// The checksum is the upper-case hex SHA-256 of the body; the service
    /// verifies it and rejects corrupted uploads.
    pub async fn put_contents_with_checksum(&self, path: &str, data: Bytes) -> Result<()> {
        let checksum = hex::encode_upper(Sha256::digest(&data));
        self.put_inner(path, Some(checksum), data.len() as u64, full_body(data))
            .await
    }

    /// Upload a local file to the given remote path (streaming).
    ///
    /// The file body is streamed chunk by chunk rather than read into
    /// memory. When `with_checksum` is set the file is hashed in a
    /// streaming first pass and the SHA-256 sent in the `Checksum` header.
    pub async fn upload_file(&self, local: &Path, path: &str, with_checksum: bool) -> Result<()> {
        let size = tokio::fs::metadata(local).await?.len();

        let checksum = if with_checksum {
            Some(hash_file(local).await?)
        } else {
            None
        };

        let file = tokio::fs::File::open(local).await?;
        let stream = ReaderStream::new(file).map_ok(Frame::data);
        let body = BodyExt::boxed(StreamBody::new(stream));

        self.put_inner(path, checksum, size, body).await
    }

    async fn put_inner(
        &self,
        path: &str,
        checksum: Option<String>,
        size: u64,
        body: OutBody,
    ) -> Result<()> {
        let wire = normalize_path(path, &self.zone, Some(false))?;

        let mut headers = vec![
            ("content-type", "application/octet-stream".to_string()),
            ("content-length", size.to_string()),
        ];
        if let Some(checksum) = checksum {
            headers.push(("Checksum", checksum));
        }

        let (status, response_body) = self.request(Method::PUT, &wire, &headers, body).await?;

        // Object storage convention: a successful upload is 201, not 200
        if status != StatusCode::CREATED {
            return Err(self.failure(status, &response_body, path));
        }

        tracing::debug!(path, bytes = size, "upload complete");
        Ok(())
    }

    /// Delete an object or directory.
    ///
    /// Directory deletes remove their contents recursively on the service
    /// side; the client issues a single request either way.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let wire = normalize_path(path, &self.zone, None)?;
        let (status, body) = self
            .request(Method::DELETE, &wire, &[], empty_body())
            .await?;

        if status != StatusCode::OK {
            return Err(self.failure(status, &body, path));
        }

        Ok(())
    }

    /// Delete many objects concurrently, settling every request.
    ///
    /// One delete request is issued per input path, all in flight at once,
    /// and the call returns only after every request has completed or
    /// failed on its own. A failure of one path never cancels the others.
    /// The returned map holds only the failing paths with their error
    /// messages; an absent key means the delete succeeded. Duplicate input
    /// paths are each dispatched independently (last write wins in the
    /// map).
    pub async fn delete_multiple(&self, paths: &[String]) -> HashMap<String, String> {
        let deletions = paths
            .iter()
            .map(|path| async move { (path.clone(), self.delete(path).await) });

        let mut failures = HashMap::new();
        for (path, outcome) in future::join_all(deletions).await {
            if let Err(err) = outcome {
                tracing::debug!(path = %path, error = %err, "delete failed");
                failures.insert(path, err.to_string());
            }
        }
        failures
    }

    /// Check whether an object exists.
    ///
    /// Uses the service's `DESCRIBE` method token. 404 means the object
    /// does not exist and is not an error here. A 200 response counts as
    /// "exists" only when its JSON body carries a `Guid` of exactly 36
    /// characters (canonical UUID length); any other 200 shape is treated
    /// as "does not exist". This is a heuristic against the observed
    /// service behavior, not a documented guarantee.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        let wire = normalize_path(path, &self.zone, Some(false))?;
        let describe = Method::from_bytes(b"DESCRIBE").expect("static method token");
        let (status, body) = self.request(describe, &wire, &[], empty_body()).await?;

        match status {
            StatusCode::NOT_FOUND => Ok(false),
            StatusCode::OK => {
                let metadata: Value = match serde_json::from_slice(&body) {
                    Ok(value) => value,
                    Err(_) => return Ok(false),
                };
                Ok(metadata
                    .get("Guid")
                    .and_then(Value::as_str)
                    .map(|guid| guid.len() == 36)
                    .unwrap_or(false))
            }
            other => Err(self.failure(other, &body, path)),
        }
    }

    /// Send a request and collect the full response body
    async fn request(
        &self,
        method: Method,
        wire_path: &str,
        headers: &[(&str, String)],
        body: OutBody,
    ) -> Result<(StatusCode, Bytes)> {
        let response = self.send(method, wire_path, headers, body).await?;
        let status = response.status();
        let body = collect_body(response).await?;
        Ok((status, body))
    }

    /// Send a single authenticated request, returning the raw response
    async fn send(
        &self,
        method: Method,
        wire_path: &str,
        headers: &[(&str, String)],
        body: OutBody,
    ) -> Result<Response<Incoming>> {
        let url = self.build_url(wire_path);

        let mut req = Request::builder()
            .method(method)
            .uri(&url)
            .header("AccessKey", &self.access_key);
        for (name, value) in headers {
            req = req.header(*name, value);
        }

        let request = req.body(body).map_err(StorageError::transport)?;
        self.client
            .request(request)
            .await
            .map_err(StorageError::transport)
    }

    /// Build the full request URL with pre-allocated capacity
    fn build_url(&self, wire_path: &str) -> String {
        let mut url = String::with_capacity(self.base_url.len() + wire_path.len());
        url.push_str(&self.base_url);
        url.push_str(wire_path);
        url
    }

    fn failure(&self, status: StatusCode, body: &[u8], path: &str) -> StorageError {
        classify_failure(status, body, path, &self.zone, &self.access_key)
    }
}

fn full_body(data: Bytes) -> OutBody {
    Full::new(data).map_err(|never| match never {}).boxed()
}

fn empty_body() -> OutBody {
    Empty::new().map_err(|never| match never {}).boxed()
}

async fn collect_body(response: Response<Incoming>) -> Result<Bytes> {
    Ok(response
        .collect()
        .await
        .map_err(StorageError::transport)?
        .to_bytes())
}

/// Hash a file's contents with SHA-256, reading in bounded chunks.
///
/// Returns the upper-case hex digest expected by the `Checksum` header.
async fn hash_file(local: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(local).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHECKSUM_BUF_SIZE];

    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode_upper(hasher.finalize()))
}
