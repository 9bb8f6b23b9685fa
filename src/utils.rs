use serde::de::DeserializeOwned;
use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
#[cfg(target_arch = "wasm32")]
use web_sys::console;
use web_sys::{Document, Request, RequestInit, RequestMode, Response};

pub fn document() -> Result<Document, JsValue> {
    window()
        .and_then(|win| win.document())
        .ok_or_else(|| JsValue::from_str("Document unavailable"))
}

pub fn window() -> Option<web_sys::Window> {
    web_sys::window()
}

pub fn log(message: &str) {
    #[cfg(target_arch = "wasm32")]
    console::log_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("{message}");
}

/// Milliseconds since the epoch, from the browser clock.
pub fn now_millis() -> i64 {
    js_sys::Date::now() as i64
}

pub fn location_hash() -> Option<String> {
    window()
        .and_then(|win| win.location().hash().ok())
        .filter(|hash| !hash.is_empty())
}

pub async fn fetch_json<T>(path: &str) -> Result<T, JsValue>
where
    T: DeserializeOwned,
{
    let window = window().ok_or_else(|| JsValue::from_str("Window unavailable"))?;

    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::SameOrigin);

    let request = Request::new_with_str_and_init(path, &opts)?;
    let response_value = JsFuture::from(window.fetch_with_request(&request)).await?;
    let response: Response = response_value.dyn_into()?;

    if !response.ok() {
        let status = response.status();
        return Err(JsValue::from_str(&format!(
            "Failed to fetch {path} (status {status})"
        )));
    }

    let json = JsFuture::from(response.json()?).await?;
    from_value(json).map_err(|e| JsValue::from_str(&format!("JSON error for {path}: {e}")))
}

pub fn format_js_error(context: &str, err: JsValue) -> String {
    if let Some(value) = err.as_string() {
        format!("{context}: {value}")
    } else {
        format!("{context}: {:?}", err)
    }
}
