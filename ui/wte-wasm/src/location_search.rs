//! Address search for moving the map, debounced while typing.

use std::cell::{Cell, RefCell};

use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use wte_api_types::{GeocodeCandidate, Location};
use wte_core::Page;

use crate::dom;
use crate::map_view;
use crate::state::App;

pub const DEBOUNCE_MS: u32 = 300;

thread_local! {
    static PENDING: RefCell<Option<Timeout>> = const { RefCell::new(None) };
    static LATEST: Cell<u64> = const { Cell::new(0) };
}

pub fn set_active(app: &App, active: bool) {
    dom::toggle_class(&app.els.location_search_container, "active", active);
    if active {
        let _ = app.els.location_search_input.focus();
    } else {
        app.els.location_search_input.set_value("");
        let _ = app.els.location_search_input.blur();
        clear_results(app);
    }
}

pub fn toggle(app: &App) {
    let active = app.els.location_search_container.class_list().contains("active");
    set_active(app, !active);
}

/// Restarts the debounce timer. A newer keystroke drops the pending one.
pub fn on_input(app: &App) {
    let query = app.els.location_search_input.value().trim().to_owned();
    PENDING.with(|p| drop(p.borrow_mut().take()));
    if query.is_empty() {
        LATEST.with(|l| l.set(l.get() + 1));
        clear_results(app);
        return;
    }

    let app = app.clone();
    let timer = Timeout::new(DEBOUNCE_MS, move || {
        wasm_bindgen_futures::spawn_local(async move {
            search(&app, &query).await;
        });
    });
    PENDING.with(|p| *p.borrow_mut() = Some(timer));
}

async fn search(app: &App, query: &str) {
    let ticket = LATEST.with(|l| {
        l.set(l.get() + 1);
        l.get()
    });
    show_searching(app);

    let results = match app.search.geocode(query).await {
        Ok(results) => results,
        Err(err) => {
            gloo_console::warn!(format!("geocode failed: {err}"));
            Vec::new()
        }
    };
    // Only the newest query may paint.
    if LATEST.with(Cell::get) != ticket {
        return;
    }
    if let Err(err) = render_results(app, &results) {
        gloo_console::error!(err);
    }
}

fn show_searching(app: &App) {
    let list = &app.els.location_search_results;
    list.set_inner_html("");
    if let Ok(li) = dom::create_with("li", "loading", "搜尋中...") {
        let _ = list.append_child(&li);
    }
    dom::add_class(list, "visible");
}

fn render_results(app: &App, results: &[GeocodeCandidate]) -> Result<(), JsValue> {
    let list = &app.els.location_search_results;
    list.set_inner_html("");
    if results.is_empty() {
        dom::append_with(list, "li", "loading", "找不到結果")?;
    }
    for result in results {
        let li = dom::create_with("li", "", &result.address)?;
        li.set_attribute("data-lat", &result.lat.to_string())?;
        li.set_attribute("data-lon", &result.lon.to_string())?;
        list.append_child(&li)?;
    }
    dom::add_class(list, "visible");
    Ok(())
}

pub fn clear_results(app: &App) {
    app.els.location_search_results.set_inner_html("");
    dom::remove_class(&app.els.location_search_results, "visible");
}

pub fn on_result_click(app: &App, event: &web_sys::Event) {
    let Some(li) = dom::closest_target(event, "li[data-lat]") else {
        return;
    };
    let coord = |attr: &str| li.get_attribute(attr).and_then(|v| v.parse::<f64>().ok());
    let (Some(lat), Some(lon)) = (coord("data-lat"), coord("data-lon")) else {
        return;
    };
    let target = Location::new(lat, lon);
    if !target.is_valid() {
        return;
    }

    set_active(app, false);
    match app.store.read(|s| s.page) {
        Page::RadiusMap => map_view::recenter_radius_editor(app, target),
        Page::Categories => map_view::fly_to(target),
        _ => {}
    }
}
