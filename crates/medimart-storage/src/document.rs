//! Helpers every backend uses to stamp storage-managed fields.

use medimart_core::time::format_timestamp;
use medimart_core::{Collection, generate_id, validate_id};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::StorageResult;
use crate::error::StorageError;

/// Fields owned by storage. Clients cannot set them through updates.
pub const MANAGED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Current instant truncated to the microsecond precision storage keeps.
pub fn storage_now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_microsecond(now.microsecond()).unwrap_or(now)
}

fn as_object(collection: Collection, doc: &mut Value) -> StorageResult<&mut Map<String, Value>> {
    doc.as_object_mut().ok_or_else(|| {
        StorageError::invalid_document(format!("{} must be a JSON object", collection.label()))
    })
}

/// Assigns an id (unless the caller supplied a valid one) and both
/// timestamps to a new document.
pub fn prepare_new(
    collection: Collection,
    mut doc: Value,
    now: OffsetDateTime,
) -> StorageResult<(String, Value)> {
    let obj = as_object(collection, &mut doc)?;
    let id = match obj.get("id") {
        None | Some(Value::Null) => generate_id(),
        Some(Value::String(s)) if s.is_empty() => generate_id(),
        Some(Value::String(s)) => {
            validate_id(s)?;
            s.clone()
        }
        Some(_) => return Err(StorageError::invalid_document("id must be a string")),
    };
    let ts = Value::String(format_timestamp(now));
    obj.insert("id".into(), Value::String(id.clone()));
    obj.insert("createdAt".into(), ts.clone());
    obj.insert("updatedAt".into(), ts);
    Ok((id, doc))
}

/// Stamps a full replacement, keeping the original creation time.
pub fn prepare_replacement(
    collection: Collection,
    id: &str,
    mut doc: Value,
    created_at: OffsetDateTime,
    now: OffsetDateTime,
) -> StorageResult<Value> {
    let obj = as_object(collection, &mut doc)?;
    obj.insert("id".into(), Value::String(id.to_string()));
    obj.insert("createdAt".into(), Value::String(format_timestamp(created_at)));
    obj.insert("updatedAt".into(), Value::String(format_timestamp(now)));
    Ok(doc)
}

/// Shallow merge of `fields` into `existing`. A `null` field removes the key.
/// Storage-managed fields in `fields` are ignored.
pub fn merge_fields(collection: Collection, existing: &Value, fields: Value) -> StorageResult<Value> {
    let Value::Object(patch) = fields else {
        return Err(StorageError::invalid_document(format!(
            "{} update must be a JSON object",
            collection.label()
        )));
    };
    let mut merged = existing.clone();
    let obj = as_object(collection, &mut merged)?;
    for (key, value) in patch {
        if MANAGED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if value.is_null() {
            obj.remove(&key);
        } else {
            obj.insert(key, value);
        }
    }
    Ok(merged)
}

/// Removes storage-managed fields from a client payload.
pub fn strip_managed(mut doc: Value) -> Value {
    if let Some(obj) = doc.as_object_mut() {
        for key in MANAGED_FIELDS {
            obj.remove(key);
        }
    }
    doc
}
