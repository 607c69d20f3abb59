//! JSON helpers on top of the byte-oriented store.

use crate::KeyValueStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tollgate_error::{StorageError, StorageErrorKind, TollgateResult};

/// Read and decode a JSON value.
///
/// # Errors
///
/// Returns an error if the backend fails or the stored bytes are not valid
/// JSON for `T`.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> TollgateResult<Option<T>> {
    let Some(bytes) = store.get(key).await? else {
        return Ok(None);
    };

    let value = serde_json::from_slice(&bytes).map_err(|e| {
        StorageError::new(StorageErrorKind::Serialization(format!("{}: {}", key, e)))
    })?;
    Ok(Some(value))
}

/// Encode a value as JSON and store it.
///
/// # Errors
///
/// Returns an error if encoding or the backend write fails.
pub async fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> TollgateResult<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| {
        StorageError::new(StorageErrorKind::Serialization(format!("{}: {}", key, e)))
    })?;
    store.set(key, &bytes).await
}
