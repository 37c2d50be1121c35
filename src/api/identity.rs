use super::drive::DRIVE_SCOPE;
use crate::error::{RemoteError, RemoteResult};
use js_sys::{Function, Object, Promise, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

fn prop(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &key.into())
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

fn not_loaded() -> RemoteError {
    RemoteError::Configuration("Google Identity Services is not loaded".to_string())
}

/// Requests a Drive access token through the Google Identity Services token
/// client (`google.accounts.oauth2`). Resolves when the consent popup
/// completes or is dismissed.
pub(crate) async fn request_access_token(client_id: &str) -> RemoteResult<String> {
    let client_id = client_id.trim().to_string();
    if client_id.is_empty() {
        return Err(RemoteError::Configuration(
            "set your Google client ID in Settings".to_string(),
        ));
    }

    let window: JsValue = web_sys::window().ok_or_else(not_loaded)?.into();
    let oauth2 = prop(&window, "google")
        .and_then(|g| prop(&g, "accounts"))
        .and_then(|a| prop(&a, "oauth2"))
        .ok_or_else(not_loaded)?;
    let init: Function = prop(&oauth2, "initTokenClient")
        .and_then(|f| f.dyn_into().ok())
        .ok_or_else(not_loaded)?;

    let promise = Promise::new(&mut |resolve, reject| {
        let on_token = {
            let resolve = resolve.clone();
            Closure::once_into_js(move |resp: JsValue| {
                let _ = resolve.call1(&JsValue::NULL, &resp);
            })
        };
        // Popup closed or blocked: resolve with the error object.
        let on_error = Closure::once_into_js(move |err: JsValue| {
            let _ = resolve.call1(&JsValue::NULL, &err);
        });

        let requested = (|| -> Result<JsValue, JsValue> {
            let config = Object::new();
            Reflect::set(&config, &"client_id".into(), &client_id.as_str().into())?;
            Reflect::set(&config, &"scope".into(), &DRIVE_SCOPE.into())?;
            Reflect::set(&config, &"callback".into(), &on_token)?;
            Reflect::set(&config, &"error_callback".into(), &on_error)?;

            let client = init.call1(&oauth2, &config)?;
            let request: Function = Reflect::get(&client, &"requestAccessToken".into())?.dyn_into()?;
            let options = Object::new();
            Reflect::set(&options, &"prompt".into(), &"".into())?;
            request.call1(&client, &options)
        })();

        if let Err(e) = requested {
            let _ = reject.call1(&JsValue::NULL, &e);
        }
    });

    let resp = JsFuture::from(promise)
        .await
        .map_err(|e| RemoteError::Configuration(format!("{e:?}")))?;

    if let Some(error) = prop(&resp, "error").or_else(|| prop(&resp, "type")) {
        log::warn!("access token request failed: {error:?}");
        return Err(RemoteError::Unauthenticated);
    }
    prop(&resp, "access_token")
        .and_then(|t| t.as_string())
        .filter(|t| !t.is_empty())
        .ok_or(RemoteError::Unauthenticated)
}
