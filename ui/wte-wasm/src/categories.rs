//! Categories page: the category list, the preview drawer and the
//! search → categorize flow that feeds them.

use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlElement};
use wte_api_types::RestaurantKey;
use wte_core::search::CategorizeOutcome;
use wte_core::state::FocusOutcome;
use wte_core::{AppState, Change, Page, RestaurantData, SearchError};

use crate::dom;
use crate::state::App;
use crate::{candidates_view, map_view, navigation, overlay};

const SEARCHING_TEXT: &str = "正在大海撈針，尋找美食...";
const INVALID_CENTER_TEXT: &str = "無法獲取有效的地理位置，請重試。";
const NO_RESULTS_TEXT: &str = "哎呀！這個範圍內似乎沒有找到任何餐廳，試著擴大搜索圈吧！";
const NOTHING_MATCHES_TEXT: &str = "找不到符合條件的餐廳耶，試著放寬篩選看看？";
const EMPTY_AREA_TEXT: &str = "此區域似乎沒有餐廳喔！";

// ── Search flow ──

/// Searches around the chosen center, shows the raw results at once and
/// then waits for categorization.
pub async fn search_and_categorize(app: &App) {
    let store = app.store.clone();
    let orchestrator = app.search.clone();
    let (center, radius) = store.read(|s| (s.search_center.or(s.user_location), s.search_radius));

    overlay::show_loading(app, SEARCHING_TEXT);
    let started = match orchestrator.perform_search(&store, center, radius).await {
        Ok(started) => started,
        Err(SearchError::InvalidCenter) => {
            overlay::hide_loading(app);
            dom::alert(INVALID_CENTER_TEXT);
            return;
        }
        Err(SearchError::NoResults) => {
            overlay::hide_loading(app);
            dom::alert(NO_RESULTS_TEXT);
            return;
        }
        Err(SearchError::Backend(err)) => {
            gloo_console::error!(format!("search failed: {err}"));
            overlay::flash_error(app, &format!("搜尋失敗: {err}，請稍後再試"));
            return;
        }
    };

    overlay::hide_loading(app);
    // Already on the page: the store listener has redrawn it.
    navigation::navigate_to(app, Page::Categories);
    if let Some(center) = store.read(|s| s.search_center) {
        map_view::fit_to_search_radius(center, radius);
    }

    report(orchestrator.run_categorization(&store, started.job).await);
}

/// Re-issues categorization after a failure. Ignored while one is running.
pub async fn retry(app: &App) {
    let store = app.store.clone();
    let orchestrator = app.search.clone();
    let Some(job) = orchestrator.retry_categorization(&store) else {
        dom::shake(&app.els.retry_categorize_btn);
        return;
    };
    report(orchestrator.run_categorization(&store, job).await);
}

fn report(outcome: CategorizeOutcome) {
    match outcome {
        CategorizeOutcome::Applied { categories } => {
            gloo_console::log!(format!("categorized into {categories} groups"));
        }
        CategorizeOutcome::Stale => {}
        CategorizeOutcome::Failed(message) => {
            gloo_console::warn!(format!("categorization failed: {message}"));
        }
    }
}

// ── Interaction ──

pub fn on_category_click(app: &App, item: &Element) {
    let Some(label) = item.get_attribute("data-category") else {
        return;
    };
    let outcome = app.store.update(Change::Focus, |s| s.toggle_category_focus(&label));
    if outcome == FocusOutcome::Rejected {
        if let Ok(el) = item.clone().dyn_into::<HtmlElement>() {
            dom::shake(&el);
        }
        overlay::flash_error(app, "分類魔法進行中...");
    }
}

pub fn on_preview_click(app: &App, event: &web_sys::Event) {
    let Some(card) = dom::closest_target(event, ".restaurant-preview-card") else {
        return;
    };
    let Some(key) = card.get_attribute("data-key").map(RestaurantKey) else {
        return;
    };

    if dom::closest_target(event, ".preview-add-btn").is_some() {
        if let Some(restaurant) = app.store.read(|s| s.restaurant(&key).cloned()) {
            candidates_view::toggle(app, &restaurant);
        }
        return;
    }
    map_view::focus_marker(&key);
}

// ── Rendering ──

/// Full redraw of the page from the current state.
pub fn render(app: &App) {
    let s = app.store.snapshot();
    let filtered = s.filtered_restaurants();
    map_view::render_restaurants(app, &s, &filtered);
    if let Err(err) = render_list(app, &s, &filtered).and_then(|_| render_preview(app, &s, &filtered)) {
        gloo_console::error!(err);
    }
}

/// Redraws only what depends on the candidate set.
pub fn render_candidate_marks(app: &App) {
    let s = app.store.snapshot();
    let filtered = s.filtered_restaurants();
    if let Err(err) = render_preview(app, &s, &filtered) {
        gloo_console::error!(err);
    }
}

fn render_list(app: &App, s: &AppState, filtered: &RestaurantData) -> Result<(), JsValue> {
    let list = &app.els.category_list;
    list.set_inner_html("");

    app.els.retry_categorize_btn.set_hidden(s.categorization_error.is_none());
    app.els.retry_categorize_btn.set_disabled(!s.can_retry_categorization());

    if s.is_categorizing {
        let text = format!("找到了 {} 家潛力店家，正請 AI 大廚協助分類...", s.restaurants.len());
        dom::append_with(list, "p", "categorizing-placeholder", &text)?;
        return Ok(());
    }
    if let Some(message) = &s.categorization_error {
        let text = format!("分類失敗：{message}");
        dom::append_with(list, "p", "empty-state-message", &text)?;
        return Ok(());
    }
    if s.restaurants.is_empty() {
        dom::append_with(list, "p", "empty-state-message", EMPTY_AREA_TEXT)?;
        return Ok(());
    }
    if filtered.is_empty() {
        dom::append_with(list, "p", "empty-state-message", NOTHING_MATCHES_TEXT)?;
        return Ok(());
    }

    let focus_mode = !s.focused_categories.is_empty();
    for label in filtered.categories() {
        let item = dom::create_with("div", "category-list-item", label)?;
        item.set_attribute("data-category", label)?;
        if s.focused_categories.contains(label) {
            dom::add_class(&item, "active");
        } else if focus_mode {
            dom::add_class(&item, "unfocused");
        }
        list.append_child(&item)?;
    }
    Ok(())
}

fn render_preview(app: &App, s: &AppState, filtered: &RestaurantData) -> Result<(), JsValue> {
    let drawer = &app.els.restaurant_preview_list;
    drawer.set_inner_html("");

    let restaurants = s
        .active_category
        .as_deref()
        .and_then(|label| filtered.category(label));
    let Some(restaurants) = restaurants else {
        dom::remove_class(drawer, "visible");
        return Ok(());
    };

    for restaurant in restaurants {
        let key = restaurant.key();
        let card = dom::create_with("div", "restaurant-preview-card", "")?;
        card.set_attribute("data-key", &key.0)?;
        dom::append_with(&card, "h5", "", &restaurant.name)?;
        let meta = format!(
            "⭐ {} · {}",
            restaurant.rating,
            "$".repeat(usize::from(restaurant.price_level))
        );
        dom::append_with(&card, "span", "preview-meta", &meta)?;

        let added = s.candidates.contains(&key);
        let add_btn = dom::create_with("button", "preview-add-btn", if added { "✓" } else { "+" })?;
        dom::toggle_class(&add_btn, "added", added);
        card.append_child(&add_btn)?;
        drawer.append_child(&card)?;
    }
    dom::add_class(drawer, "visible");
    Ok(())
}
