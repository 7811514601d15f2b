//! DOM element bindings and small helpers.
//!
//! Every element the UI touches is resolved once at startup by
//! [`Elements::bind`]; a missing id aborts startup with a readable error.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlButtonElement, HtmlElement, HtmlInputElement, Node};

// ── Helpers ──

pub fn window() -> web_sys::Window {
    web_sys::window().expect("wte-wasm runs inside a browser window")
}

fn doc() -> Document {
    window()
        .document()
        .expect("wte-wasm runs inside a document")
}

pub fn by_id(id: &str) -> Option<Element> {
    doc().get_element_by_id(id)
}

pub fn by_id_typed<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn query(selector: &str) -> Option<Element> {
    doc().query_selector(selector).ok()?
}

pub fn query_typed<T: JsCast>(selector: &str) -> Option<T> {
    query(selector).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn query_all(selector: &str) -> Vec<Element> {
    collect(doc().query_selector_all(selector).ok())
}

pub fn query_all_within(parent: &Element, selector: &str) -> Vec<Element> {
    collect(parent.query_selector_all(selector).ok())
}

fn collect(list: Option<web_sys::NodeList>) -> Vec<Element> {
    let Some(nl) = list else {
        return Vec::new();
    };
    (0..nl.length())
        .filter_map(|i| nl.item(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
        .collect()
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn add_class(el: &Element, cls: &str) {
    let _ = el.class_list().add_1(cls);
}

pub fn remove_class(el: &Element, cls: &str) {
    let _ = el.class_list().remove_1(cls);
}

pub fn toggle_class(el: &Element, cls: &str, force: bool) {
    let _ = el.class_list().toggle_with_force(cls, force);
}

pub fn set_style(el: &HtmlElement, prop: &str, value: &str) {
    let _ = el.style().set_property(prop, value);
}

pub fn set_display(el: &HtmlElement, value: &str) {
    set_style(el, "display", value);
}

pub fn create_element(tag: &str) -> Result<Element, JsValue> {
    doc().create_element(tag)
}

pub fn create_html(tag: &str) -> Result<HtmlElement, JsValue> {
    create_element(tag)?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("<{tag}> is not an HtmlElement")))
}

/// Creates `<tag class=...>text</tag>`.
pub fn create_with(tag: &str, class: &str, text: &str) -> Result<Element, JsValue> {
    let el = create_element(tag)?;
    if !class.is_empty() {
        el.set_class_name(class);
    }
    if !text.is_empty() {
        set_text(&el, text);
    }
    Ok(el)
}

/// Creates `<tag class=...>text</tag>` as the last child of `parent`.
pub fn append_with(parent: &Node, tag: &str, class: &str, text: &str) -> Result<Element, JsValue> {
    let el = create_with(tag, class, text)?;
    parent.append_child(&el)?;
    Ok(el)
}

/// Nearest ancestor (or self) of the event target matching `selector`.
pub fn closest_target(event: &web_sys::Event, selector: &str) -> Option<Element> {
    event
        .target()?
        .dyn_into::<Element>()
        .ok()?
        .closest(selector)
        .ok()?
}

pub fn alert(message: &str) {
    let _ = window().alert_with_message(message);
}

/// Replays a CSS shake animation on `el`.
pub fn shake(el: &HtmlElement) {
    remove_class(el, "shake");
    // Reading layout restarts the animation when the class is re-added.
    let _ = el.offset_width();
    add_class(el, "shake");
}

// ── Elements struct ──

/// Element references used by the views. Clone-friendly: every field is a
/// handle onto a JS object.
#[derive(Clone)]
pub struct Elements {
    pub pages: Vec<Element>,
    pub back_btns: Vec<Element>,
    pub start_btn: Element,

    // Radius page
    pub location_status: Element,
    pub recenter_btn: Element,
    pub radius_label: HtmlElement,
    pub confirm_radius_btn: Element,

    // Categories page
    pub categories_page: HtmlElement,
    pub category_list: Element,
    pub retry_categorize_btn: HtmlButtonElement,
    pub restaurant_preview_list: Element,
    pub filter_btn: Element,
    pub filter_panel: Element,
    pub close_filter_btn: Element,
    pub open_now_toggle: HtmlInputElement,
    pub price_filter_buttons: Element,
    pub rating_filter_buttons: Element,

    // Candidates
    pub wheel_count_badges: Vec<Element>,
    pub show_candidates_btn: Element,
    pub candidate_list_overlay: Element,
    pub candidate_list_content: Element,
    pub close_candidates_btn: Element,
    pub random_decision_btn: HtmlButtonElement,
    pub view_wheel_btn: Element,

    // Wheel page
    pub wheel_container: HtmlElement,
    pub wheel_placeholder: HtmlElement,
    pub spin_btn: HtmlButtonElement,

    // Overlays
    pub loading_overlay: Element,
    pub loading_text: Element,
    pub result_overlay: Element,
    pub result_text: Element,
    pub close_result_btn: Element,

    // Details page
    pub details_header_image: HtmlElement,
    pub details_title: Element,
    pub details_rating: Element,
    pub details_price: Element,
    pub details_status: Element,
    pub details_hours_list: Element,
    pub details_reviews_list: Element,
    pub call_btn: Element,
    pub website_btn: Element,
    pub add_to_wheel_details_btn: Element,

    // Location search
    pub location_search_container: Element,
    pub location_search_toggle: Element,
    pub location_search_input: HtmlInputElement,
    pub location_search_results: Element,
}

macro_rules! get_el {
    ($id:expr) => {
        by_id($id).ok_or_else(|| JsValue::from_str(&format!("missing element #{}", $id)))?
    };
}

macro_rules! get_input {
    ($id:expr) => {
        by_id_typed::<HtmlInputElement>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing input #{}", $id)))?
    };
}

macro_rules! get_button {
    ($id:expr) => {
        by_id_typed::<HtmlButtonElement>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing button #{}", $id)))?
    };
}

macro_rules! get_html {
    ($id:expr) => {
        by_id_typed::<HtmlElement>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing html element #{}", $id)))?
    };
}

macro_rules! get_query {
    ($sel:expr) => {
        query($sel).ok_or_else(|| JsValue::from_str(&format!("missing {}", $sel)))?
    };
}

impl Elements {
    /// Resolve all DOM references. Call once after the document has loaded.
    pub fn bind() -> Result<Elements, JsValue> {
        Ok(Elements {
            pages: query_all(".page"),
            back_btns: query_all(".back-btn"),
            start_btn: get_el!("start-btn"),

            location_status: get_el!("location-status"),
            recenter_btn: get_el!("recenter-btn"),
            radius_label: get_html!("radius-label"),
            confirm_radius_btn: get_el!("confirm-radius-btn"),

            categories_page: get_html!("categories-page"),
            category_list: get_el!("category-list"),
            retry_categorize_btn: get_button!("retry-categorize-btn"),
            restaurant_preview_list: get_el!("restaurant-preview-list"),
            filter_btn: get_el!("filter-btn"),
            filter_panel: get_el!("filter-panel"),
            close_filter_btn: get_el!("close-filter-btn"),
            open_now_toggle: get_input!("open-now-toggle"),
            price_filter_buttons: get_query!(".filter-buttons[data-filter=\"priceLevel\"]"),
            rating_filter_buttons: get_query!(".filter-buttons[data-filter=\"rating\"]"),

            wheel_count_badges: query_all(".wheel-count-badge"),
            show_candidates_btn: get_el!("show-candidates-btn"),
            candidate_list_overlay: get_el!("candidate-list-overlay"),
            candidate_list_content: get_el!("candidate-list-content"),
            close_candidates_btn: get_el!("close-candidates-btn"),
            random_decision_btn: get_button!("random-decision-btn"),
            view_wheel_btn: get_el!("view-wheel-btn"),

            wheel_container: get_html!("wheel-container"),
            wheel_placeholder: get_html!("wheel-placeholder"),
            spin_btn: get_button!("spin-btn"),

            loading_overlay: get_el!("loading-overlay"),
            loading_text: get_el!("loading-text"),
            result_overlay: get_el!("result-overlay"),
            result_text: get_el!("result-text"),
            close_result_btn: get_el!("close-result-btn"),

            details_header_image: query_typed::<HtmlElement>(".details-header-image")
                .ok_or_else(|| JsValue::from_str("missing .details-header-image"))?,
            details_title: get_query!(".details-title"),
            details_rating: get_query!(".details-rating"),
            details_price: get_query!(".details-price"),
            details_status: get_query!(".details-status"),
            details_hours_list: get_query!(".details-hours-list"),
            details_reviews_list: get_query!(".details-reviews-list"),
            call_btn: get_el!("call-btn"),
            website_btn: get_el!("website-btn"),
            add_to_wheel_details_btn: get_el!("add-to-wheel-details-btn"),

            location_search_container: get_el!("location-search-container"),
            location_search_toggle: get_el!("location-search-toggle"),
            location_search_input: get_input!("location-search-input"),
            location_search_results: get_el!("location-search-results"),
        })
    }
}
