//! Error taxonomy and HTTP response classification

use hyper::StatusCode;
use thiserror::Error;

/// Maximum number of body bytes carried in an `UnexpectedStatus` error
const BODY_EXCERPT_LIMIT: usize = 512;

/// Storage client errors
///
/// Every operation fails with exactly one of these kinds; none are retried
/// internally. `InvalidPath` and `InvalidRegion` are raised before any
/// network call.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The service rejected the access key (HTTP 401)
    #[error("authentication failed for storage zone '{zone}' with access key '{access_key}'")]
    AuthenticationFailed { zone: String, access_key: String },

    /// The object or directory does not exist (HTTP 404)
    #[error("{detail}")]
    NotFound { path: String, detail: String },

    /// The logical path could not be normalized into a wire path
    #[error("the requested path is invalid: {path}")]
    InvalidPath { path: String },

    /// The region code is not a member of the known region set
    #[error("unknown storage region code: '{code}'")]
    InvalidRegion { code: String },

    /// The underlying HTTP transport failed (connect, DNS, timeout)
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The service answered with a status outside the expected set
    #[error("unexpected status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// A listing record did not match the metadata contract
    #[error("metadata parse failure: {detail}")]
    MetadataParse { detail: String },

    /// Local file I/O failed (upload source, download target)
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn transport<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageError::Transport(Box::new(source))
    }

    pub(crate) fn metadata(detail: impl Into<String>) -> Self {
        StorageError::MetadataParse {
            detail: detail.into(),
        }
    }
}

/// Classify a non-success HTTP response into a domain error.
///
/// Rules, in order: 401 is an authentication failure carrying the zone name
/// and key for diagnostics; 404 is a not-found for the offending path,
/// preferring the response body's JSON `Message` field over the generic
/// fallback when one is present; everything else surfaces the raw status
/// plus a bounded body excerpt.
pub(crate) fn classify_failure(
    status: StatusCode,
    body: &[u8],
    path: &str,
    zone: &str,
    access_key: &str,
) -> StorageError {
    match status {
        StatusCode::UNAUTHORIZED => StorageError::AuthenticationFailed {
            zone: zone.to_string(),
            access_key: access_key.to_string(),
        },
        StatusCode::NOT_FOUND => StorageError::NotFound {
            path: path.to_string(),
            detail: body_message(body)
                .unwrap_or_else(|| format!("Could not find part of the object path: {path}")),
        },
        other => StorageError::UnexpectedStatus {
            status: other.as_u16(),
            body: body_excerpt(body),
        },
    }
}

/// Extract the `Message` field from a JSON error body, if well-formed
pub(crate) fn body_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("Message")
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
}

fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let mut excerpt = String::with_capacity(text.len().min(BODY_EXCERPT_LIMIT));
    for ch in text.chars() {
        if excerpt.len() + ch.len_utf8() > BODY_EXCERPT_LIMIT {
            break;
        }
        excerpt.push(ch);
    }
    excerpt
}
