//! Event listener wiring.
//!
//! Lists are rendered with plain markup and handled by one delegated
//! listener per container.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wte_api_types::RestaurantKey;
use wte_core::{Change, Page};

use crate::dom;
use crate::filters_panel::{self, FilterField};
use crate::{
    candidates_view, categories, details, location_search, map_decision, map_view, navigation,
    overlay, wheel,
};
use crate::state::App;

/// Bind a click handler that spawns an async fn taking `&App`.
macro_rules! on_click_async {
    ($el:expr, $app:expr, $handler:expr) => {{
        let app = $app.clone();
        let cb = Closure::wrap(Box::new(move |_: web_sys::MouseEvent| {
            let app2 = app.clone();
            wasm_bindgen_futures::spawn_local(async move {
                $handler(&app2).await;
            });
        }) as Box<dyn FnMut(_)>);
        $el.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref())?;
        cb.forget();
    }};
}

/// Bind a synchronous listener for `$event`.
macro_rules! on_event {
    ($el:expr, $event:expr, $cb:expr) => {{
        let cb = Closure::wrap(Box::new($cb) as Box<dyn FnMut(web_sys::Event)>);
        $el.add_event_listener_with_callback($event, cb.as_ref().unchecked_ref())?;
        cb.forget();
    }};
}

macro_rules! on_click {
    ($el:expr, $cb:expr) => {
        on_event!($el, "click", $cb)
    };
}

/// Bind all UI event listeners. Call once after init.
pub fn bind_events(app: &App) -> Result<(), JsValue> {
    // ── Navigation ──
    {
        let app2 = app.clone();
        on_click!(app.els.start_btn, move |_| navigation::navigate_to(&app2, Page::RadiusMap));
    }
    for btn in &app.els.back_btns {
        let app2 = app.clone();
        on_click!(btn, move |_| navigation::navigate_back(&app2));
    }

    // ── Radius page ──
    {
        let app2 = app.clone();
        on_click!(app.els.recenter_btn, move |_| {
            match app2.store.read(|s| s.user_location) {
                Some(at) if map_view::has_radius_editor() => {
                    map_view::recenter_radius_editor(&app2, at)
                }
                _ => crate::geolocation::locate(&app2),
            }
        });
    }
    on_click_async!(app.els.confirm_radius_btn, app, categories::search_and_categorize);

    // ── Categories page ──
    {
        let app2 = app.clone();
        on_click!(app.els.category_list, move |e: web_sys::Event| {
            if let Some(item) = dom::closest_target(&e, ".category-list-item") {
                categories::on_category_click(&app2, &item);
            }
        });
    }
    on_click_async!(app.els.retry_categorize_btn, app, categories::retry);
    {
        let app2 = app.clone();
        on_click!(app.els.restaurant_preview_list, move |e: web_sys::Event| {
            categories::on_preview_click(&app2, &e);
        });
    }

    // ── Filters ──
    {
        let app2 = app.clone();
        on_click!(app.els.filter_btn, move |e: web_sys::Event| {
            e.stop_propagation();
            if app2.els.filter_panel.class_list().contains("visible") {
                filters_panel::close(&app2);
            } else {
                filters_panel::open(&app2);
            }
        });
    }
    {
        let app2 = app.clone();
        on_click!(app.els.close_filter_btn, move |_| filters_panel::close(&app2));
    }
    {
        let app2 = app.clone();
        on_event!(app.els.open_now_toggle, "change", move |_| {
            filters_panel::on_open_now(&app2, app2.els.open_now_toggle.checked());
        });
    }
    for group in [&app.els.price_filter_buttons, &app.els.rating_filter_buttons] {
        let field = group
            .get_attribute("data-filter")
            .as_deref()
            .and_then(FilterField::from_attr);
        let Some(field) = field else {
            continue;
        };
        let app2 = app.clone();
        on_click!(group, move |e: web_sys::Event| {
            e.stop_propagation();
            if let Some(btn) = dom::closest_target(&e, "button") {
                filters_panel::on_button(&app2, field, filters_panel::button_value(&btn));
            }
        });
    }

    // ── Candidates ──
    {
        let app2 = app.clone();
        on_click!(app.els.show_candidates_btn, move |_| candidates_view::show_list(&app2));
    }
    {
        let app2 = app.clone();
        on_click!(app.els.close_candidates_btn, move |_| candidates_view::hide_list(&app2));
    }
    {
        let app2 = app.clone();
        on_click!(app.els.candidate_list_content, move |e: web_sys::Event| {
            if let Some(btn) = dom::closest_target(&e, ".remove-candidate-btn") {
                if let Some(key) = btn.get_attribute("data-key") {
                    candidates_view::remove(&app2, &RestaurantKey(key));
                }
            }
        });
    }
    {
        let app2 = app.clone();
        on_click!(app.els.random_decision_btn, move |_| map_decision::decide(&app2));
    }
    {
        let app2 = app.clone();
        on_click!(app.els.view_wheel_btn, move |_| {
            candidates_view::hide_list(&app2);
            navigation::navigate_to(&app2, Page::Wheel);
        });
    }

    // ── Wheel and result ──
    {
        let app2 = app.clone();
        on_click!(app.els.spin_btn, move |_| wheel::spin(&app2));
    }
    {
        let app2 = app.clone();
        on_click!(app.els.close_result_btn, move |_| close_result(&app2));
    }

    // ── Details ──
    {
        let app2 = app.clone();
        on_click!(app.els.add_to_wheel_details_btn, move |_| details::on_add(&app2));
    }
    {
        let app2 = app.clone();
        on_click!(app.els.call_btn, move |_| details::on_call(&app2));
    }
    {
        let app2 = app.clone();
        on_click!(app.els.website_btn, move |_| details::on_website(&app2));
    }

    // ── Location search ──
    {
        let app2 = app.clone();
        on_click!(app.els.location_search_toggle, move |_| location_search::toggle(&app2));
    }
    {
        let app2 = app.clone();
        on_event!(app.els.location_search_input, "input", move |_| location_search::on_input(&app2));
    }
    {
        let app2 = app.clone();
        on_click!(app.els.location_search_results, move |e: web_sys::Event| {
            location_search::on_result_click(&app2, &e);
        });
    }

    Ok(())
}

/// Closes the result overlay and clears the winner highlight.
pub fn close_result(app: &App) {
    overlay::hide_result(app);
    let Some(winner) = app.with_engine(|e| e.dismiss()) else {
        return;
    };
    match app.store.read(|s| s.page) {
        Page::Wheel => {
            if let Err(err) = wheel::render(app) {
                gloo_console::error!(err);
            }
        }
        Page::Categories => {
            map_view::clear_winner(&winner.key);
            categories::render(app);
        }
        _ => {}
    }
}

/// Redraws the views that depend on `change`.
pub fn on_store_change(app: &App, change: Change) {
    let page = app.store.read(|s| s.page);
    match change {
        Change::Restaurants | Change::Categorization | Change::Focus => {
            if page == Page::Categories {
                categories::render(app);
            }
        }
        Change::Filters => {
            filters_panel::render(app);
            if page == Page::Categories {
                categories::render(app);
            }
        }
        Change::Candidates => {
            candidates_view::render_badges(app);
            if candidates_view::is_list_visible(app) {
                if let Err(err) = candidates_view::render_list(app) {
                    gloo_console::error!(err);
                }
            }
            match page {
                Page::Categories => categories::render_candidate_marks(app),
                Page::Wheel => {
                    if let Err(err) = wheel::render(app) {
                        gloo_console::error!(err);
                    }
                }
                Page::Details => details::render_add_button(app),
                _ => {}
            }
        }
        Change::Navigation | Change::Location | Change::Details => {}
    }
}
