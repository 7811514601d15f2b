//! What-To-Eat browser frontend.
//!
//! Rust + WASM views over `wte-core`: each page or widget lives in its own
//! module and redraws itself from the shared [`state::App`] context.

pub mod api;
pub mod candidates_view;
pub mod categories;
pub mod details;
pub mod dom;
pub mod events;
pub mod filters_panel;
pub mod geolocation;
pub mod leaflet;
pub mod location_search;
pub mod map_decision;
pub mod map_view;
pub mod navigation;
pub mod overlay;
pub mod state;
pub mod wheel;

use wasm_bindgen::prelude::*;

/// WASM entry point, called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    init()
}

fn init() -> Result<(), JsValue> {
    let app = state::App::new(dom::Elements::bind()?);

    {
        let listener = app.clone();
        app.store
            .subscribe(move |change| events::on_store_change(&listener, change));
    }

    events::bind_events(&app)?;
    filters_panel::render(&app);
    candidates_view::render_badges(&app);

    gloo_console::log!(format!("wte-wasm ready, api at {}", api::base_url()));
    Ok(())
}
