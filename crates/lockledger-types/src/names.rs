//! Container and object naming rules, and the ledger object's well-known name.
//!
//! Valid container names:
//! - Must be non-empty and at most 222 bytes
//! - Must not contain `/` or whitespace
//!
//! Valid object names:
//! - Must be non-empty and at most 1024 bytes
//! - Must not contain carriage returns or line feeds

use crate::error::TypeError;

/// Suffix appended to a container's name to form its ledger object name.
pub const LEDGER_OBJECT_SUFFIX: &str = "_locked_objects.json";

const MAX_CONTAINER_NAME_LEN: usize = 222;
const MAX_OBJECT_NAME_LEN: usize = 1024;

/// The name of the object holding `container`'s ledger.
///
/// ```
/// use lockledger_types::ledger_object_name;
///
/// assert_eq!(ledger_object_name("archive"), "archive_locked_objects.json");
/// ```
pub fn ledger_object_name(container: &str) -> String {
    format!("{container}{LEDGER_OBJECT_SUFFIX}")
}

/// Returns `true` if `name` is `container`'s own ledger object.
pub fn is_ledger_object(container: &str, name: &str) -> bool {
    name.strip_suffix(LEDGER_OBJECT_SUFFIX) == Some(container)
}

/// Validate a container name, returning `Ok(())` if valid.
pub fn validate_container_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidContainerName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("container name must not be empty"));
    }
    if name.len() > MAX_CONTAINER_NAME_LEN {
        return Err(invalid("container name is longer than 222 bytes"));
    }
    if name.contains('/') {
        return Err(invalid("must not contain '/'"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }
    Ok(())
}

/// Validate an object name, returning `Ok(())` if valid.
pub fn validate_object_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidObjectName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("object name must not be empty"));
    }
    if name.len() > MAX_OBJECT_NAME_LEN {
        return Err(invalid("object name is longer than 1024 bytes"));
    }
    if name.contains(['\r', '\n']) {
        return Err(invalid("must not contain line breaks"));
    }
    Ok(())
}
