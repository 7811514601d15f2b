//! Bindings for the subset of the Leaflet global `L` the views use.

use js_sys::{Array, Function};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;
use wte_api_types::Location;

#[wasm_bindgen]
extern "C" {
    #[derive(Debug, Clone)]
    pub type Map;

    #[wasm_bindgen(js_namespace = L, js_name = map)]
    pub fn map(container_id: &str, options: &JsValue) -> Map;

    #[wasm_bindgen(method, js_name = setView)]
    pub fn set_view(this: &Map, center: &JsValue, zoom: f64) -> Map;

    #[wasm_bindgen(method, js_name = flyTo)]
    pub fn fly_to(this: &Map, center: &JsValue, zoom: f64);

    #[wasm_bindgen(method, js_name = getZoom)]
    pub fn get_zoom(this: &Map) -> f64;

    #[wasm_bindgen(method, js_name = fitBounds)]
    pub fn fit_bounds(this: &Map, bounds: &JsValue, options: &JsValue);

    #[wasm_bindgen(method, js_name = flyToBounds)]
    pub fn fly_to_bounds(this: &Map, bounds: &JsValue, options: &JsValue);

    #[wasm_bindgen(method, js_name = invalidateSize)]
    pub fn invalidate_size(this: &Map);

    #[wasm_bindgen(method, js_name = removeLayer)]
    pub fn remove_layer(this: &Map, layer: &Layer);

    #[wasm_bindgen(method, js_name = remove)]
    pub fn remove(this: &Map);

    #[wasm_bindgen(method, js_name = closePopup)]
    pub fn close_popup(this: &Map);

    #[derive(Debug, Clone)]
    pub type Layer;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &Layer, map: &Map) -> Layer;

    #[wasm_bindgen(method)]
    pub fn on(this: &Layer, event: &str, handler: &Function) -> Layer;

    #[wasm_bindgen(js_namespace = L, js_name = tileLayer)]
    pub fn tile_layer(url_template: &str, options: &JsValue) -> Layer;

    #[wasm_bindgen(extends = Layer)]
    #[derive(Debug, Clone)]
    pub type Circle;

    #[wasm_bindgen(js_namespace = L, js_name = circle)]
    pub fn circle(center: &JsValue, options: &JsValue) -> Circle;

    #[wasm_bindgen(method, js_name = setRadius)]
    pub fn set_radius(this: &Circle, meters: f64);

    #[wasm_bindgen(method, js_name = setLatLng)]
    pub fn set_circle_lat_lng(this: &Circle, at: &JsValue);

    #[wasm_bindgen(extends = Layer)]
    #[derive(Debug, Clone)]
    pub type Marker;

    #[wasm_bindgen(js_namespace = L, js_name = marker)]
    pub fn marker(at: &JsValue, options: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = setLatLng)]
    pub fn set_lat_lng(this: &Marker, at: &JsValue);

    #[wasm_bindgen(method, js_name = getLatLng)]
    pub fn get_lat_lng(this: &Marker) -> LatLng;

    #[wasm_bindgen(method, js_name = setOpacity)]
    pub fn set_opacity(this: &Marker, opacity: f64);

    #[wasm_bindgen(method, js_name = bindPopup)]
    pub fn bind_popup(this: &Marker, content: &Function) -> Marker;

    #[wasm_bindgen(method, js_name = openPopup)]
    pub fn open_popup(this: &Marker);

    #[wasm_bindgen(method, js_name = closePopup)]
    pub fn close_popup(this: &Marker);

    #[wasm_bindgen(method, js_name = isPopupOpen)]
    pub fn is_popup_open(this: &Marker) -> bool;

    #[wasm_bindgen(method, js_name = getElement)]
    pub fn get_element(this: &Marker) -> Option<HtmlElement>;

    #[derive(Debug, Clone)]
    pub type LatLng;

    #[wasm_bindgen(method, getter)]
    pub fn lat(this: &LatLng) -> f64;

    #[wasm_bindgen(method, getter)]
    pub fn lng(this: &LatLng) -> f64;

    #[wasm_bindgen(js_namespace = L, js_name = divIcon)]
    pub fn div_icon(options: &JsValue) -> JsValue;
}

impl LatLng {
    pub fn to_location(&self) -> Location {
        Location::new(self.lat(), self.lng())
    }
}

/// `[lat, lng]`, which Leaflet accepts wherever it wants a `LatLng`.
pub fn lat_lng(at: Location) -> JsValue {
    Array::of2(&at.lat.into(), &at.lon.into()).into()
}

/// `[[lat, lng], ...]` bounds.
pub fn bounds(points: impl IntoIterator<Item = Location>) -> JsValue {
    points.into_iter().map(lat_lng).collect::<Array>().into()
}

/// Serializes an options struct to a plain JS object.
pub fn options<T: Serialize>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::UNDEFINED)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOptions {
    pub zoom_control: bool,
    pub attribution_control: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileOptions {
    pub max_zoom: u8,
    pub subdomains: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleOptions {
    pub radius: f64,
    pub color: &'static str,
    pub fill_color: &'static str,
    pub fill_opacity: f64,
    pub weight: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivIconOptions {
    pub html: String,
    pub class_name: String,
    pub icon_size: [u16; 2],
    pub icon_anchor: [u16; 2],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitOptions {
    pub padding_top_left: [u16; 2],
    pub padding_bottom_right: [u16; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

pub const VOYAGER_TILES: &str =
    "https://{s}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}{r}.png";
pub const VOYAGER_LABELS_UNDER_TILES: &str =
    "https://{s}.basemaps.cartocdn.com/rastertiles/voyager_labels_under/{z}/{x}/{y}{r}.png";

/// Creates a map in `container_id` with the given tile layer.
pub fn new_map(container_id: &str, center: Location, zoom: f64, tiles: &str) -> Map {
    let map = map(
        container_id,
        &options(&MapOptions {
            zoom_control: false,
            attribution_control: false,
        }),
    );
    map.set_view(&lat_lng(center), zoom);
    tile_layer(
        tiles,
        &options(&TileOptions {
            max_zoom: 20,
            subdomains: "abcd",
        }),
    )
    .add_to(&map);
    map
}

/// A marker with a `divIcon`.
pub fn div_marker(at: Location, icon: DivIconOptions, draggable: bool) -> Marker {
    let opts = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&opts, &"icon".into(), &div_icon(&options(&icon)));
    let _ = js_sys::Reflect::set(&opts, &"draggable".into(), &draggable.into());
    marker(&lat_lng(at), &opts)
}
