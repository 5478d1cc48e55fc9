use super::BookmarkStore;
use crate::error::StoreError;
use crate::platform::core_foundation;

/// The current application's preference domain.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreferencesStore;

impl PreferencesStore {
    pub fn new() -> Self {
        Self
    }
}

fn preferences_error(key: &str, reason: String) -> StoreError {
    StoreError::Preferences {
        key: key.to_string(),
        reason,
    }
}

impl BookmarkStore for PreferencesStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        core_foundation::preferences_data(key).map_err(|reason| preferences_error(key, reason))
    }

    fn save(&self, key: &str, bookmark: &[u8]) -> Result<(), StoreError> {
        core_foundation::set_preferences_data(key, Some(bookmark))
            .map_err(|reason| preferences_error(key, reason))
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let existed = self.load(key)?.is_some();
        if existed {
            core_foundation::set_preferences_data(key, None)
                .map_err(|reason| preferences_error(key, reason))?;
        }
        Ok(existed)
    }
}
