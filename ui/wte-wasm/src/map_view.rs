//! Leaflet map adapter: the radius editor and the restaurant map.
//!
//! Markers are keyed by [`RestaurantKey`] so the decision animation and the
//! preview list can address them without knowing Leaflet.

use std::cell::RefCell;
use std::collections::HashMap;

use gloo_timers::callback::Timeout;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;
use wte_api_types::{Location, Restaurant, RestaurantKey};
use wte_core::geo::{haversine_distance_m, radius_bounds, radius_handle_position};
use wte_core::model::category_icon;
use wte_core::{AppState, Change, RestaurantData, SearchRadius};

use crate::dom;
use crate::leaflet::{self, Circle, CircleOptions, DivIconOptions, FitOptions, Map, Marker};
use crate::state::App;
use crate::{candidates_view, details};

const RADIUS_MAP_ID: &str = "radius-map";
const CATEGORIES_MAP_ID: &str = "leaflet-map";
const DEFAULT_ZOOM: f64 = 16.0;
const UNCLASSIFIED_ICON: &str = "✨";
const FALLBACK_ICON: &str = "📍";
const DIMMED_OPACITY: f64 = 0.35;
const ACTIVE_MARKER_MS: u32 = 800;

struct RadiusEditor {
    map: Map,
    circle: Circle,
    center_marker: Marker,
    handle: Marker,
    _listeners: Vec<Closure<dyn FnMut(JsValue)>>,
}

type ClickListener = Closure<dyn FnMut(web_sys::MouseEvent)>;

struct RestaurantMap {
    map: Map,
    markers: HashMap<RestaurantKey, Marker>,
    center_marker: Option<Marker>,
    popups: Vec<Closure<dyn FnMut(JsValue) -> JsValue>>,
    popup_listeners: PopupListeners<ClickListener>,
}

/// Button listeners of the most recent popup built for each marker. Leaflet
/// rebuilds the content on every open, which retires the previous buttons.
struct PopupListeners<L> {
    by_key: HashMap<RestaurantKey, Vec<L>>,
}

impl<L> PopupListeners<L> {
    fn new() -> Self {
        Self {
            by_key: HashMap::new(),
        }
    }

    fn keep(&mut self, key: RestaurantKey, listeners: Vec<L>) {
        let previous = self.by_key.insert(key, listeners);
        drop(previous);
    }

    fn clear(&mut self) {
        self.by_key.clear();
    }

    fn len(&self) -> usize {
        self.by_key.values().map(Vec::len).sum()
    }
}

thread_local! {
    static RADIUS_EDITOR: RefCell<Option<RadiusEditor>> = const { RefCell::new(None) };
    static RESTAURANT_MAP: RefCell<Option<RestaurantMap>> = const { RefCell::new(None) };
}

// ── Radius editor ──

/// Creates the radius editor around `center`, or moves the existing one.
pub fn show_radius_editor(app: &App, center: Location) {
    let exists = RADIUS_EDITOR.with(|r| r.borrow().is_some());
    if exists {
        recenter_radius_editor(app, center);
        return;
    }

    let radius = app.store.read(|s| s.search_radius.meters());
    let map = leaflet::new_map(RADIUS_MAP_ID, center, DEFAULT_ZOOM, leaflet::VOYAGER_TILES);

    let circle = leaflet::circle(
        &leaflet::lat_lng(center),
        &leaflet::options(&CircleOptions {
            radius,
            color: "#FF7A59",
            fill_color: "#FF7A59",
            fill_opacity: 0.15,
            weight: 2,
        }),
    );
    circle.add_to(&map);

    let center_marker = leaflet::div_marker(
        center,
        DivIconOptions {
            html: "<div class=\"radius-center-marker\"></div>".into(),
            class_name: "radius-center-marker-container".into(),
            icon_size: [24, 24],
            icon_anchor: [12, 12],
        },
        true,
    );
    center_marker.add_to(&map);

    let handle = leaflet::div_marker(
        radius_handle_position(center, radius),
        DivIconOptions {
            html: "<div class=\"radius-drag-handle\"></div>".into(),
            class_name: "radius-drag-handle-container".into(),
            icon_size: [24, 24],
            icon_anchor: [12, 12],
        },
        true,
    );
    handle.add_to(&map);

    let on_handle_drag = {
        let (circle, center_marker, handle) = (circle.clone(), center_marker.clone(), handle.clone());
        let label = app.els.radius_label.clone();
        let store = app.store.clone();
        Closure::wrap(Box::new(move |_: JsValue| {
            let center = center_marker.get_lat_lng().to_location();
            let edge = handle.get_lat_lng().to_location();
            let radius = SearchRadius::new(haversine_distance_m(center, edge));
            circle.set_radius(radius.meters());
            set_radius_label(&label, radius);
            store.update(Change::Location, |s| s.search_radius = radius);
        }) as Box<dyn FnMut(JsValue)>)
    };
    handle.on("drag", on_handle_drag.as_ref().unchecked_ref());

    let on_center_drag = {
        let (circle, center_marker, handle) = (circle.clone(), center_marker.clone(), handle.clone());
        let store = app.store.clone();
        Closure::wrap(Box::new(move |_: JsValue| {
            let center = center_marker.get_lat_lng().to_location();
            let radius = store.read(|s| s.search_radius);
            circle.set_circle_lat_lng(&leaflet::lat_lng(center));
            handle.set_lat_lng(&leaflet::lat_lng(radius_handle_position(center, radius.meters())));
            store.update(Change::Location, |s| s.search_center = Some(center));
        }) as Box<dyn FnMut(JsValue)>)
    };
    center_marker.on("drag", on_center_drag.as_ref().unchecked_ref());

    set_radius_label(&app.els.radius_label, SearchRadius::new(radius));
    map.invalidate_size();
    app.store.update(Change::Location, |s| s.search_center = Some(center));

    RADIUS_EDITOR.with(|r| {
        *r.borrow_mut() = Some(RadiusEditor {
            map,
            circle,
            center_marker,
            handle,
            _listeners: vec![on_handle_drag, on_center_drag],
        })
    });
}

/// Moves the circle, both markers and the view to `center`.
pub fn recenter_radius_editor(app: &App, center: Location) {
    let radius = app.store.read(|s| s.search_radius.meters());
    RADIUS_EDITOR.with(|r| {
        if let Some(editor) = r.borrow().as_ref() {
            let at = leaflet::lat_lng(center);
            editor.circle.set_circle_lat_lng(&at);
            editor.center_marker.set_lat_lng(&at);
            editor
                .handle
                .set_lat_lng(&leaflet::lat_lng(radius_handle_position(center, radius)));
            editor.map.set_view(&at, editor.map.get_zoom());
        }
    });
    app.store.update(Change::Location, |s| s.search_center = Some(center));
}

pub fn has_radius_editor() -> bool {
    RADIUS_EDITOR.with(|r| r.borrow().is_some())
}

pub fn destroy_radius_editor() {
    if let Some(editor) = RADIUS_EDITOR.with(|r| r.borrow_mut().take()) {
        editor.map.remove();
    }
}

fn set_radius_label(label: &web_sys::HtmlElement, radius: SearchRadius) {
    dom::set_text(label, &format!("{} 公尺", radius.meters()));
    dom::add_class(label, "visible");
}

// ── Restaurant map ──

fn ensure_restaurant_map(center: Location) {
    RESTAURANT_MAP.with(|m| {
        let mut slot = m.borrow_mut();
        if let Some(existing) = slot.as_ref() {
            existing.map.invalidate_size();
            return;
        }
        let map = leaflet::new_map(
            CATEGORIES_MAP_ID,
            center,
            DEFAULT_ZOOM,
            leaflet::VOYAGER_LABELS_UNDER_TILES,
        );
        *slot = Some(RestaurantMap {
            map,
            markers: HashMap::new(),
            center_marker: None,
            popups: Vec::new(),
            popup_listeners: PopupListeners::new(),
        });
    });
}

/// Redraws every marker for the filtered data and fits the view.
pub fn render_restaurants(app: &App, s: &AppState, filtered: &RestaurantData) {
    let center = s
        .search_center
        .or(s.user_location)
        .unwrap_or(wte_core::DEFAULT_LOCATION);
    ensure_restaurant_map(center);

    let mut fit_points = Vec::new();
    let mut active_points = Vec::new();

    RESTAURANT_MAP.with(|m| {
        let mut slot = m.borrow_mut();
        let Some(rm) = slot.as_mut() else {
            return;
        };

        for marker in rm.markers.values() {
            rm.map.remove_layer(marker);
        }
        rm.markers.clear();
        rm.popups.clear();
        rm.popup_listeners.clear();
        if let Some(old) = rm.center_marker.take() {
            rm.map.remove_layer(&old);
        }

        if let Some(c) = s.search_center {
            let marker = leaflet::div_marker(
                c,
                DivIconOptions {
                    html: "<div class=\"radius-center-marker\"></div>".into(),
                    class_name: "radius-center-marker-container".into(),
                    icon_size: [16, 16],
                    icon_anchor: [8, 8],
                },
                false,
            );
            marker.add_to(&rm.map);
            rm.center_marker = Some(marker);
            fit_points.push(c);
        }

        let focus_mode = !s.focused_categories.is_empty();
        for (label, restaurant) in labelled(filtered) {
            let in_active = match (&s.active_category, label) {
                (Some(active), Some(label)) => active == label,
                (Some(_), None) => false,
                (None, _) => true,
            };
            let icon = match label {
                None => UNCLASSIFIED_ICON.to_owned(),
                Some(l) => category_icon(l)
                    .map(String::from)
                    .unwrap_or_else(|| FALLBACK_ICON.to_owned()),
            };
            let highlighted = s.active_category.is_some() && in_active;
            let marker = leaflet::div_marker(
                restaurant.location(),
                DivIconOptions {
                    html: format!("<div class=\"map-category-icon\">{icon}</div>"),
                    class_name: if highlighted {
                        "map-category-icon-container marker-highlight".into()
                    } else {
                        "map-category-icon-container".into()
                    },
                    icon_size: [36, 36],
                    icon_anchor: [18, 18],
                },
                false,
            );
            if !in_active {
                marker.set_opacity(DIMMED_OPACITY);
            }

            let popup = popup_builder(app, restaurant.key());
            marker.bind_popup(popup.as_ref().unchecked_ref());
            marker.add_to(&rm.map);
            rm.popups.push(popup);

            let considered = !focus_mode || label.is_some_and(|l| s.focused_categories.contains(l));
            if considered {
                fit_points.push(restaurant.location());
            }
            if highlighted {
                active_points.push(restaurant.location());
            }
            rm.markers.insert(restaurant.key(), marker);
        }
    });

    if focus_mode_active(s) && !active_points.is_empty() {
        fit_points_view(&active_points);
    } else if !fit_points.is_empty() {
        fit_points_view(&fit_points);
    }
}

fn focus_mode_active(s: &AppState) -> bool {
    !s.focused_categories.is_empty() && s.active_category.is_some()
}

fn labelled(data: &RestaurantData) -> Vec<(Option<&str>, &Restaurant)> {
    match data {
        RestaurantData::Unclassified(list) => list.iter().map(|r| (None, r)).collect(),
        RestaurantData::Classified(map) => map
            .iter()
            .flat_map(|(label, list)| list.iter().map(move |r| (Some(label.as_str()), r)))
            .collect(),
    }
}

fn fit_points_view(points: &[Location]) {
    with_map(|map| {
        map.fit_bounds(
            &leaflet::bounds(points.iter().copied()),
            &leaflet::options(&FitOptions {
                padding_top_left: [20, 100],
                padding_bottom_right: [20, 200],
                max_zoom: Some(17),
                duration: None,
            }),
        );
    });
}

/// Frames the whole search circle.
pub fn fit_to_search_radius(center: Location, radius: SearchRadius) {
    let (ne, sw) = radius_bounds(center, radius.meters());
    with_map(|map| {
        map.fly_to_bounds(
            &leaflet::bounds([ne, sw]),
            &leaflet::options(&FitOptions {
                padding_top_left: [20, 100],
                padding_bottom_right: [20, 220],
                max_zoom: Some(16),
                duration: Some(1.0),
            }),
        );
    });
}

pub fn fly_to(center: Location) {
    with_map(|map| map.fly_to(&leaflet::lat_lng(center), DEFAULT_ZOOM));
}

// Both release the thread-local before calling `f`: opening a popup runs
// `popup_content`, which writes back into the map state.
fn with_map(f: impl FnOnce(&Map)) {
    let map = RESTAURANT_MAP.with(|m| m.borrow().as_ref().map(|rm| rm.map.clone()));
    if let Some(map) = map {
        f(&map);
    }
}

fn with_marker(key: &RestaurantKey, f: impl FnOnce(&Marker)) {
    let marker = RESTAURANT_MAP.with(|m| {
        m.borrow()
            .as_ref()
            .and_then(|rm| rm.markers.get(key).cloned())
    });
    if let Some(marker) = marker {
        f(&marker);
    }
}

pub fn has_marker(key: &RestaurantKey) -> bool {
    RESTAURANT_MAP.with(|m| {
        m.borrow()
            .as_ref()
            .is_some_and(|rm| rm.markers.contains_key(key))
    })
}

/// Adds or removes a class on the marker's icon element.
pub fn set_marker_class(key: &RestaurantKey, class: &str, on: bool) {
    with_marker(key, |marker| {
        if let Some(el) = marker.get_element() {
            dom::toggle_class(&el, class, on);
        }
    });
}

pub fn open_popup(key: &RestaurantKey) {
    with_marker(key, Marker::open_popup);
}

/// Opens the popup and pulses the marker.
pub fn focus_marker(key: &RestaurantKey) {
    open_popup(key);
    set_marker_class(key, "marker-active", true);
    let key = key.clone();
    Timeout::new(ACTIVE_MARKER_MS, move || set_marker_class(&key, "marker-active", false)).forget();
}

/// Fully shows candidate markers and hides the rest.
pub fn show_only(keys: &[RestaurantKey]) {
    RESTAURANT_MAP.with(|m| {
        if let Some(rm) = m.borrow().as_ref() {
            for (key, marker) in &rm.markers {
                marker.set_opacity(if keys.contains(key) { 1.0 } else { 0.0 });
            }
        }
    });
}

pub fn clear_winner(key: &RestaurantKey) {
    set_marker_class(key, "marker-winner", false);
    with_marker(key, Marker::close_popup);
}

// ── Popups ──

/// Leaflet calls this each time the popup opens, so the content always
/// reflects the current candidate set.
fn popup_builder(app: &App, key: RestaurantKey) -> Closure<dyn FnMut(JsValue) -> JsValue> {
    let app = app.clone();
    Closure::wrap(Box::new(move |_: JsValue| match popup_content(&app, &key) {
        Ok(el) => el.into(),
        Err(err) => {
            gloo_console::error!(err.clone());
            JsValue::from_str("")
        }
    }) as Box<dyn FnMut(JsValue) -> JsValue>)
}

fn popup_content(app: &App, key: &RestaurantKey) -> Result<Element, JsValue> {
    let (restaurant, is_added, categorizing) = app.store.read(|s| {
        (
            s.restaurant(key).cloned(),
            s.candidates.contains(key),
            s.is_categorizing,
        )
    });
    let restaurant =
        restaurant.ok_or_else(|| JsValue::from_str(&format!("unknown restaurant {key}")))?;

    let root = dom::create_with("div", "popup-content", "")?;
    dom::append_with(&root, "h4", "", &restaurant.name)?;

    let info = dom::create_with("div", "popup-info", "")?;
    let info_text = if categorizing {
        "分類魔法進行中..."
    } else {
        "按 '+' 加入候選清單！"
    };
    dom::append_with(&info, "span", "", info_text)?;
    root.append_child(&info)?;

    let actions = dom::create_with("div", "popup-actions", "")?;
    let details_btn = dom::create_with("button", "btn-secondary details-btn", "更多")?;
    let add_btn = dom::create_with("button", "btn-primary add-to-wheel-btn", "")?;
    set_add_button(&add_btn, is_added);
    actions.append_child(&details_btn)?;
    actions.append_child(&add_btn)?;
    root.append_child(&actions)?;

    let on_details = {
        let app = app.clone();
        let key = key.clone();
        Closure::wrap(Box::new(move |_: web_sys::MouseEvent| {
            let app = app.clone();
            let key = key.clone();
            wasm_bindgen_futures::spawn_local(async move {
                details::open(&app, &key).await;
            });
        }) as Box<dyn FnMut(_)>)
    };
    details_btn.add_event_listener_with_callback("click", on_details.as_ref().unchecked_ref())?;

    let on_add = {
        let app = app.clone();
        let button = add_btn.clone();
        Closure::wrap(Box::new(move |_: web_sys::MouseEvent| {
            let added = candidates_view::toggle(&app, &restaurant);
            set_add_button(&button, added);
        }) as Box<dyn FnMut(_)>)
    };
    add_btn.add_event_listener_with_callback("click", on_add.as_ref().unchecked_ref())?;

    RESTAURANT_MAP.with(|m| {
        if let Some(rm) = m.borrow_mut().as_mut() {
            rm.popup_listeners.keep(key.clone(), vec![on_details, on_add]);
        }
    });
    Ok(root)
}

fn set_add_button(button: &Element, added: bool) {
    dom::toggle_class(button, "added", added);
    dom::set_text(button, if added { "✓" } else { "+" });
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn reopening_a_popup_retires_its_old_listeners() {
        let mut listeners = PopupListeners::new();
        let key = RestaurantKey("p1".into());
        let first = Rc::new(());

        listeners.keep(key.clone(), vec![Rc::clone(&first), Rc::clone(&first)]);
        for _ in 0..5 {
            listeners.keep(key.clone(), vec![Rc::new(()), Rc::new(())]);
        }
        listeners.keep(RestaurantKey("p2".into()), vec![Rc::new(())]);

        assert_eq!(Rc::strong_count(&first), 1);
        assert_eq!(listeners.len(), 3);

        listeners.clear();
        assert_eq!(listeners.len(), 0);
    }
}
