use crate::api::FolderSelection;
use serde::{Deserialize, Serialize};

pub(crate) const GEMINI_API_KEY: &str = "gemini_api_key";
pub(crate) const GOOGLE_CLIENT_ID_KEY: &str = "google_client_id";
pub(crate) const DRIVE_FOLDER_ID_KEY: &str = "gem_drive_folder_id";
pub(crate) const DRIVE_FOLDER_NAME_KEY: &str = "gem_drive_folder_name";

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(crate) fn load_string(key: &str) -> Option<String> {
    local_storage()?
        .get_item(key)
        .ok()
        .flatten()
        .filter(|v| !v.trim().is_empty())
}

/// Writes `value`, or removes the key when it is `None` or blank.
pub(crate) fn save_string(key: &str, value: Option<&str>) {
    if let Some(storage) = local_storage() {
        let _ = match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => storage.set_item(key, v),
            None => storage.remove_item(key),
        };
    }
}

/// User-supplied credentials, kept in `localStorage`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Settings {
    pub gemini_api_key: Option<String>,
    pub google_client_id: Option<String>,
}

impl Settings {
    pub fn load() -> Self {
        Self {
            gemini_api_key: load_string(GEMINI_API_KEY),
            google_client_id: load_string(GOOGLE_CLIENT_ID_KEY),
        }
    }

    pub fn save(&self) {
        save_string(GEMINI_API_KEY, self.gemini_api_key.as_deref());
        save_string(GOOGLE_CLIENT_ID_KEY, self.google_client_id.as_deref());
    }
}

pub(crate) fn load_folder_selection() -> FolderSelection {
    match load_string(DRIVE_FOLDER_NAME_KEY) {
        Some(name) => FolderSelection {
            id: load_string(DRIVE_FOLDER_ID_KEY),
            name,
        },
        None => FolderSelection::default(),
    }
}

pub(crate) fn save_folder_selection(folder: &FolderSelection) {
    save_string(DRIVE_FOLDER_ID_KEY, folder.id.as_deref());
    save_string(DRIVE_FOLDER_NAME_KEY, Some(&folder.name));
}

// Browser-only: run with wasm-bindgen-test-runner.
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn settings_round_trip_through_local_storage() {
        let settings = Settings {
            gemini_api_key: Some("key-123".to_string()),
            google_client_id: None,
        };
        settings.save();
        assert_eq!(Settings::load(), settings);

        Settings::default().save();
        assert_eq!(Settings::load(), Settings::default());
    }

    #[wasm_bindgen_test]
    fn folder_selection_round_trip() {
        let folder = FolderSelection {
            id: Some("f1".to_string()),
            name: "Prompts".to_string(),
        };
        save_folder_selection(&folder);
        assert_eq!(load_folder_selection(), folder);

        save_folder_selection(&FolderSelection::default());
        assert_eq!(load_folder_selection(), FolderSelection::default());
    }
}
