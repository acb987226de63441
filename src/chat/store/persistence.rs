//! Whole-value JSON persistence on top of [`LocalStorage`].
//!
//! Every write replaces the full value under its key; there are no deltas.
//! Reads never fail: a missing, unreadable or unparsable value loads as the
//! type's default so a damaged store degrades to "no data".

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::chat::core::errors::ChatResult;
use crate::chat::storage::LocalStorage;

/// Load the JSON value under `key`, falling back to `T::default()`.
#[must_use]
pub fn load_or_default<T, S>(storage: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: LocalStorage + ?Sized,
{
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No persisted value under {key}; starting empty");
            return T::default();
        }
        Err(err) => {
            warn!("Failed to read {key} from storage, starting empty: {err}");
            return T::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!("Discarding corrupt value under {key}: {err}");
        T::default()
    })
}

/// Serialize `value` and store it under `key`.
///
/// # Errors
/// Returns an error if serialization or the storage write fails.
pub fn save<T, S>(storage: &mut S, key: &str, value: &T) -> ChatResult<()>
where
    T: Serialize + ?Sized,
    S: LocalStorage + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    storage.set_item(key, &raw)?;
    Ok(())
}
