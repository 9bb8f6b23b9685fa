use crate::utils;
use web_sys::Storage;

pub const TUTORIAL_FLAG_KEY: &str = "portfolio-terminal.tutorial-shown";

/// Durable "tutorial already played" marker.
pub trait TutorialFlag {
    fn is_set(&self) -> bool;
    fn set(&self);
}

/// Backed by `window.localStorage`. When storage is unavailable (private
/// browsing, blocked cookies) the flag reads as unset and writes are dropped.
pub struct LocalStorageFlag {
    key: &'static str,
}

impl LocalStorageFlag {
    pub fn new() -> Self {
        Self {
            key: TUTORIAL_FLAG_KEY,
        }
    }

    fn storage(&self) -> Option<Storage> {
        utils::window().and_then(|win| win.local_storage().ok().flatten())
    }
}

impl Default for LocalStorageFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl TutorialFlag for LocalStorageFlag {
    fn is_set(&self) -> bool {
        self.storage()
            .and_then(|storage| storage.get_item(self.key).ok().flatten())
            .is_some_and(|value| value == "true")
    }

    fn set(&self) {
        let Some(storage) = self.storage() else {
            utils::log("localStorage unavailable; tutorial will replay on next visit");
            return;
        };
        if let Err(err) = storage.set_item(self.key, "true") {
            utils::log(&format!("Failed to persist tutorial flag: {:?}", err));
        }
    }
}
