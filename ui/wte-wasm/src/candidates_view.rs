//! Candidate badges, the candidate list overlay and add/remove actions.

use wasm_bindgen::prelude::*;
use wte_api_types::{Restaurant, RestaurantKey};
use wte_core::state::CandidateToggle;
use wte_core::{Change, DEFAULT_MAX_CANDIDATES};

use crate::dom;
use crate::state::App;

/// Adds or removes `restaurant`. Returns whether it is a candidate afterwards.
pub fn toggle(app: &App, restaurant: &Restaurant) -> bool {
    let outcome = app.store.update(Change::Candidates, |s| s.toggle_candidate(restaurant));
    match outcome {
        CandidateToggle::Added => true,
        CandidateToggle::Removed => false,
        CandidateToggle::Full => {
            dom::alert(&format!("候選清單最多{DEFAULT_MAX_CANDIDATES}個選項喔！"));
            dom::shake(&app.els.categories_page);
            false
        }
    }
}

pub fn remove(app: &App, key: &RestaurantKey) {
    app.store.update(Change::Candidates, |s| s.candidates.remove(key));
}

pub fn render_badges(app: &App) {
    let count = app.store.read(|s| s.candidates.len());
    for badge in &app.els.wheel_count_badges {
        dom::set_text(badge, &count.to_string());
        dom::toggle_class(badge, "visible", count > 0);
    }
}

pub fn render_list(app: &App) -> Result<(), JsValue> {
    let candidates = app.store.read(|s| s.candidates.to_vec());
    let content = &app.els.candidate_list_content;
    content.set_inner_html("");

    if candidates.is_empty() {
        dom::append_with(
            content,
            "p",
            "candidate-list-placeholder",
            "尚未加入任何候選店家",
        )?;
    }
    for candidate in &candidates {
        let item = dom::create_with("div", "candidate-item", "")?;
        dom::append_with(&item, "span", "", &candidate.name)?;
        let remove_btn = dom::create_with("button", "remove-candidate-btn", "×")?;
        remove_btn.set_attribute("data-key", &candidate.key.0)?;
        item.append_child(&remove_btn)?;
        content.append_child(&item)?;
    }

    app.els.random_decision_btn.set_disabled(candidates.len() < 2);
    Ok(())
}

pub fn show_list(app: &App) {
    if let Err(err) = render_list(app) {
        gloo_console::error!(err);
    }
    dom::add_class(&app.els.candidate_list_overlay, "visible");
}

pub fn hide_list(app: &App) {
    dom::remove_class(&app.els.candidate_list_overlay, "visible");
}

pub fn is_list_visible(app: &App) -> bool {
    app.els.candidate_list_overlay.class_list().contains("visible")
}
