//! Key validation for backends that map keys onto paths.

use crate::error::{Result, StoreError};

/// Validate a key for use as a relative filesystem path.
///
/// `/` separates path components. Rejects empty keys, absolute keys,
/// empty, `.` or `..` components, NUL bytes and backslashes.
pub fn validate_key(key: &str) -> Result<()> {
    let invalid = |reason: &str| StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }

    if key.starts_with('/') {
        return Err(invalid("key must be relative"));
    }

    if key.contains('\0') {
        return Err(invalid("key contains a NUL byte"));
    }

    if key.contains('\\') {
        return Err(invalid("key contains a backslash"));
    }

    for component in key.split('/') {
        match component {
            "" => return Err(invalid("key contains an empty path component")),
            "." | ".." => return Err(invalid("key contains a relative path component")),
            _ => {}
        }
    }

    Ok(())
}
