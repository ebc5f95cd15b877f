//! Browser side effects: localStorage, blocking dialogs, file download and upload.

use gloo::file::{Blob, File, ObjectUrl};
use gloo::storage::{LocalStorage, Storage};
use shared::transfer::IMPORT_FAILED_MESSAGE;
use shared::{AppConfig, KeyValueStore, TaskError, TaskResult, UserPrompt};
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlAnchorElement, HtmlInputElement, UrlSearchParams};

const STORAGE_UNAVAILABLE: &str = "Could not access browser storage.";

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> TaskResult<Option<String>> {
        LocalStorage::raw().get_item(key).map_err(storage_error)
    }

    fn set(&self, key: &str, value: &str) -> TaskResult<()> {
        LocalStorage::raw().set_item(key, value).map_err(storage_error)
    }
}

fn storage_error(err: JsValue) -> TaskError {
    warn!(error = ?err, "localStorage call failed");
    TaskError::storage(STORAGE_UNAVAILABLE)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserPrompt;

impl UserPrompt for BrowserPrompt {
    fn confirm(&self, message: &str) -> bool {
        gloo::dialogs::confirm(message)
    }

    fn notify(&self, message: &str) {
        gloo::dialogs::alert(message)
    }
}

const CONFIG_KEYS: [&str; 3] = ["storage", "api", "samples"];

/// Settings from the page query string, e.g. `?storage=local&api=http%3A%2F%2Fhost%3A3000`.
pub fn app_config() -> AppConfig {
    let search = web_sys::window()
        .and_then(|window| window.location().search().ok())
        .unwrap_or_default();
    match UrlSearchParams::new_with_str(&search) {
        Ok(params) => AppConfig::from_params(
            CONFIG_KEYS
                .into_iter()
                .filter_map(|key| params.get(key).map(|value| (key, value))),
        ),
        Err(err) => {
            warn!(error = ?err, "unreadable query string, using defaults");
            AppConfig::default()
        }
    }
}

/// Saves `contents` as a JSON file through a temporary download link.
pub fn download_json(file_name: &str, contents: &str) -> TaskResult<()> {
    let url = ObjectUrl::from(Blob::new_with_options(contents, Some("application/json")));
    let anchor = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.create_element("a").ok())
        .and_then(|element| element.dyn_into::<HtmlAnchorElement>().ok())
        .ok_or_else(|| TaskError::storage("Could not export tasks."))?;
    anchor.set_href(&url);
    anchor.set_download(file_name);
    anchor.click();
    Ok(())
}

/// Reads the first file picked in the `<input type="file">` with `input_id`, then
/// clears the input so the same file can be picked again. `None` when nothing was picked.
pub async fn read_picked_file(input_id: &str) -> Option<TaskResult<String>> {
    let input = web_sys::window()?
        .document()?
        .get_element_by_id(input_id)?
        .dyn_into::<HtmlInputElement>()
        .ok()?;
    let file = File::from(input.files()?.get(0)?);
    input.set_value("");

    let read = gloo::file::futures::read_as_text(&file).await.map_err(|err| {
        warn!(error = %err, name = %file.name(), "failed to read import file");
        TaskError::storage(IMPORT_FAILED_MESSAGE)
    });
    Some(read)
}
