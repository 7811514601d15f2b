//! Browser geolocation with a fixed fallback position.

use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::PositionOptions;
use wte_api_types::Location;
use wte_core::{Change, DEFAULT_LOCATION, Page};

use crate::dom;
use crate::map_view;
use crate::state::App;

const TIMEOUT_MS: u32 = 10_000;
const PERMISSION_DENIED: f64 = 1.0;

const LOCATING_TEXT: &str = "正在取得您的位置...";
const LOCATED_TEXT: &str = "拖曳圓心或手把調整範圍";
const DENIED_TEXT: &str = "無法取得位置，請允許定位權限";
const UNAVAILABLE_TEXT: &str = "無法取得位置，將使用預設地點";

/// Asks the browser for the user's position and centers the radius editor
/// on it, or on [`DEFAULT_LOCATION`] when that fails.
pub fn locate(app: &App) {
    dom::set_text(&app.els.location_status, LOCATING_TEXT);

    let geolocation = match dom::window().navigator().geolocation() {
        Ok(g) => g,
        Err(_) => {
            settle(app, DEFAULT_LOCATION, UNAVAILABLE_TEXT);
            return;
        }
    };

    let on_success = {
        let app = app.clone();
        Closure::once(move |position: JsValue| match read_position(&position) {
            Some(at) => settle(&app, at, LOCATED_TEXT),
            None => settle(&app, DEFAULT_LOCATION, UNAVAILABLE_TEXT),
        })
    };
    let on_error = {
        let app = app.clone();
        Closure::once(move |error: JsValue| {
            let code = Reflect::get(&error, &"code".into())
                .ok()
                .and_then(|c| c.as_f64());
            gloo_console::warn!(format!("geolocation failed, code {code:?}"));
            let text = if code == Some(PERMISSION_DENIED) {
                DENIED_TEXT
            } else {
                UNAVAILABLE_TEXT
            };
            settle(&app, DEFAULT_LOCATION, text);
        })
    };

    let options = PositionOptions::new();
    options.set_enable_high_accuracy(true);
    options.set_timeout(TIMEOUT_MS);

    let requested = geolocation.get_current_position_with_error_callback_and_options(
        on_success.as_ref().unchecked_ref(),
        Some(on_error.as_ref().unchecked_ref()),
        &options,
    );
    if requested.is_err() {
        settle(app, DEFAULT_LOCATION, UNAVAILABLE_TEXT);
        return;
    }
    on_success.forget();
    on_error.forget();
}

fn read_position(position: &JsValue) -> Option<Location> {
    let coords = Reflect::get(position, &"coords".into()).ok()?;
    let lat = Reflect::get(&coords, &"latitude".into()).ok()?.as_f64()?;
    let lon = Reflect::get(&coords, &"longitude".into()).ok()?.as_f64()?;
    Some(Location::new(lat, lon)).filter(Location::is_valid)
}

fn settle(app: &App, at: Location, status: &str) {
    app.store.update(Change::Location, |s| s.user_location = Some(at));
    dom::set_text(&app.els.location_status, status);

    // The user may have left the page while the browser was deciding.
    if app.store.read(|s| s.page) == Page::RadiusMap {
        map_view::show_radius_editor(app, at);
    }
}
