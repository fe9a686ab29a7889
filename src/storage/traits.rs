use crate::error::StoreError;

/// Durable key-value slot used for consent and persisted metrics.
///
/// Mirrors browser local storage: string keys, string values, no
/// atomicity across writers. Implementations must be cheap to call from
/// the tracking path.
pub trait DurableStore: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Keys end up as file names, so keep them to a portable charset.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
