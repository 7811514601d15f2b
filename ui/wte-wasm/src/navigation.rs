//! Page switching with a back stack, plus the enter/leave effects of each
//! page.

use wte_core::{Change, Page};

use crate::dom;
use crate::state::App;
use crate::{
    candidates_view, categories, details, filters_panel, geolocation, location_search, map_view,
    overlay, wheel,
};

pub fn navigate_to(app: &App, page: Page) {
    let moved = app.store.update(Change::Navigation, |s| s.navigate_to(page));
    if moved {
        show(app, page);
    }
}

pub fn navigate_back(app: &App) {
    if let Some(page) = app.store.update(Change::Navigation, |s| s.navigate_back()) {
        show(app, page);
    }
}

fn show(app: &App, page: Page) {
    stop_decision(app);

    for el in &app.els.pages {
        dom::toggle_class(el, "active", el.id() == page.dom_id());
    }

    if page != Page::RadiusMap {
        map_view::destroy_radius_editor();
    }
    if page != Page::Categories {
        filters_panel::close(app);
        candidates_view::hide_list(app);
    }
    location_search::set_active(app, false);

    match page {
        Page::Splash => {}
        Page::RadiusMap => geolocation::locate(app),
        Page::Categories => {
            candidates_view::hide_list(app);
            categories::render(app);
        }
        Page::Wheel => {
            if let Err(err) = wheel::render(app) {
                gloo_console::error!(err);
            }
        }
        Page::Details => details::render(app),
    }
}

/// Leaving a page ends any decision running or revealing on it.
fn stop_decision(app: &App) {
    let winner = app.with_engine(|e| {
        if !e.is_deciding() {
            return None;
        }
        let winner = e.last_winner().cloned();
        e.abort();
        Some(winner)
    });
    let Some(winner) = winner else {
        return;
    };
    overlay::hide_result(app);
    if let Some(winner) = winner {
        map_view::clear_winner(&winner.key);
    }
}
