//! Shared types for the job store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{StorageError, StorageResult};

/// Field compared by `compare_and_set_status`
pub const STATUS_FIELD: &str = "status";

/// Health status of a storage backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend_type: String,
    pub documents: usize,
    pub errors: Vec<String>,
}

/// Split a `namespace/id` key, rejecting anything that could escape a
/// backend's root directory.
pub fn split_key(key: &str) -> StorageResult<(&str, &str)> {
    let (namespace, id) = key
        .split_once('/')
        .ok_or_else(|| StorageError::invalid_key(key))?;

    let valid = |part: &str| {
        !part.is_empty()
            && part != "."
            && part != ".."
            && !part.contains(['/', '\\'])
    };

    if valid(namespace) && valid(id) {
        Ok((namespace, id))
    } else {
        Err(StorageError::invalid_key(key))
    }
}

/// Shallow-merge `fields` into `target`; both must be JSON objects.
pub fn merge_fields(target: &mut Value, fields: Value) -> StorageResult<()> {
    let Value::Object(fields) = fields else {
        return Err(StorageError::serialization(
            "update fields must be a JSON object",
        ));
    };
    let target = as_object_mut(target)?;

    for (name, value) in fields {
        target.insert(name, value);
    }
    Ok(())
}

/// Apply a status compare-and-set to an in-memory document.
///
/// Returns `true` and rewrites the field only when the current status equals
/// `expected`.
pub fn swap_status(document: &mut Value, expected: &str, new: &str) -> StorageResult<bool> {
    let object = as_object_mut(document)?;
    let matches = object
        .get(STATUS_FIELD)
        .and_then(Value::as_str)
        .is_some_and(|current| current == expected);

    if matches {
        object.insert(STATUS_FIELD.to_string(), Value::String(new.to_string()));
    }
    Ok(matches)
}

fn as_object_mut(value: &mut Value) -> StorageResult<&mut Map<String, Value>> {
    value
        .as_object_mut()
        .ok_or_else(|| StorageError::serialization("stored document is not a JSON object"))
}
