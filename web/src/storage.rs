use dbank_common::store::{KeyValueStore, StoreError};
use web_sys::Storage;

/// `window.localStorage`, looked up on every call so a page that disables
/// storage mid-session degrades to failed writes instead of a panic.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    fn storage() -> Result<Storage, StoreError> {
        let window =
            web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StoreError::Backend(format!("{e:?}")))?
            .ok_or_else(|| StoreError::Unavailable("localStorage unavailable".to_string()))
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StoreError::Backend(format!("{e:?}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // Throws QuotaExceededError when full.
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StoreError::Backend(format!("{e:?}")))
    }
}
