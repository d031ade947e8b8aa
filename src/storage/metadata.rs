//! Typed metadata records parsed from listing responses

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::storage::error::StorageError;

/// Wire timestamp format, millisecond precision
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// One object or directory entry from a listing response.
///
/// Immutable snapshot of what the service reported; no ordering between
/// `date_created` and `date_modified` is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    /// Opaque unique id of the object
    pub guid: String,
    /// Full remote path
    pub path: String,
    /// Leaf object name
    pub name: String,
    /// Object size in bytes
    pub size: u64,
    /// Whether the entry is a directory
    pub is_directory: bool,
    /// Lower-cased hex checksum, empty when the service reports none
    pub checksum: String,
    /// Creation timestamp
    pub date_created: NaiveDateTime,
    /// Last modification timestamp
    pub date_modified: NaiveDateTime,
}

impl FileMetadata {
    /// Parse one JSON record from a listing or describe response.
    ///
    /// Every required key must be present and well-typed or the whole
    /// record is rejected with `MetadataParse`. The checksum is lower-cased
    /// on parse for canonical comparison; the service reports `null` for
    /// directory checksums, which parses as the empty string.
    pub fn from_value(record: &Value) -> Result<Self, StorageError> {
        let obj = record
            .as_object()
            .ok_or_else(|| StorageError::metadata("record is not a JSON object"))?;

        let guid = required_str(obj, "Guid")?;
        let path = required_str(obj, "Path")?;
        let name = required_str(obj, "ObjectName")?;

        let length = obj
            .get("Length")
            .ok_or_else(|| StorageError::metadata("missing field `Length`"))?;
        let size = length
            .as_u64()
            .ok_or_else(|| StorageError::metadata(format!("invalid `Length` value: {length}")))?;

        let is_directory = obj
            .get("IsDirectory")
            .and_then(Value::as_bool)
            .ok_or_else(|| StorageError::metadata("missing or non-boolean field `IsDirectory`"))?;

        let checksum = match obj.get("Checksum") {
            Some(Value::String(s)) => s.to_lowercase(),
            Some(Value::Null) => String::new(),
            Some(other) => {
                return Err(StorageError::metadata(format!(
                    "invalid `Checksum` value: {other}"
                )))
            }
            None => return Err(StorageError::metadata("missing field `Checksum`")),
        };

        let date_created = required_date(obj, "DateCreated", &path)?;
        let date_modified = required_date(obj, "LastChanged", &path)?;

        Ok(Self {
            guid,
            path,
            name,
            size,
            is_directory,
            checksum,
            date_created,
            date_modified,
        })
    }
}

fn required_str(
    obj: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<String, StorageError> {
    obj.get(key)
        .ok_or_else(|| StorageError::metadata(format!("missing field `{key}`")))?
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| StorageError::metadata(format!("field `{key}` is not a string")))
}

fn required_date(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<NaiveDateTime, StorageError> {
    let raw = obj
        .get(key)
        .ok_or_else(|| StorageError::metadata(format!("missing field `{key}`")))?
        .as_str()
        .ok_or_else(|| StorageError::metadata(format!("field `{key}` is not a string")))?;

    NaiveDateTime::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
        StorageError::metadata(format!("invalid `{key}` timestamp '{raw}' for file {path}"))
    })
}
