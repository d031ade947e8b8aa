//! Logical path normalization into zone-scoped wire paths

use crate::storage::error::StorageError;

/// Normalize a caller-supplied logical path into the path string sent on
/// the wire.
///
/// The result is always prefixed with the storage zone name, contains no
/// doubled slashes, carries no leading slash, and ends with a slash exactly
/// when the operation is directory-shaped or the input denoted the root.
///
/// A path that does not already start with `<zone>/` or `/<zone>/` is
/// silently zone-prefixed (the prefix check is case-sensitive, matching the
/// service). `directory_hint` disambiguates trailing slashes:
/// `Some(true)` appends one if missing, `Some(false)` rejects a trailing
/// slash with `InvalidPath` (except for the root path `/`), and `None`
/// leaves it untouched.
pub fn normalize_path(
    path: &str,
    zone: &str,
    directory_hint: Option<bool>,
) -> Result<String, StorageError> {
    let is_root = path == "/";

    let mut path = if path.starts_with(&format!("{zone}/")) || path.starts_with(&format!("/{zone}/"))
    {
        path.to_string()
    } else {
        format!("{zone}/{path}")
    };

    // Defend against platform path separators
    path = path.replace('\\', "/");

    match directory_hint {
        Some(true) => {
            if !path.ends_with('/') {
                path.push('/');
            }
        }
        Some(false) => {
            if path.ends_with('/') && !is_root {
                return Err(StorageError::InvalidPath {
                    path: path.to_string(),
                });
            }
        }
        None => {}
    }

    // Collapse doubled slashes
    while path.contains("//") {
        path = path.replace("//", "/");
    }

    // Strip the leading slash
    if let Some(stripped) = path.strip_prefix('/') {
        path = stripped.to_string();
    }

    Ok(path)
}
