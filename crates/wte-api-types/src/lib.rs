use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display text the service puts in `hours` for a place that is open now.
pub const HOURS_OPEN: &str = "Open now";
pub const HOURS_CLOSED: &str = "Closed";
pub const HOURS_UNKNOWN: &str = "Hours unavailable";
/// Older backends only sent a localized label instead of `is_open`.
pub const LEGACY_HOURS_OPEN: &str = "營業中";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Stable identity of a restaurant. Opaque; never shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RestaurantKey(pub String);

impl std::fmt::Display for RestaurantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Restaurant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub price_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<PlaceDetails>,
}

impl Restaurant {
    /// `place_id` when present, the name for legacy payloads without one.
    pub fn key(&self) -> RestaurantKey {
        match &self.place_id {
            Some(id) if !id.is_empty() => RestaurantKey(id.clone()),
            _ => RestaurantKey(self.name.clone()),
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lon)
    }

    pub fn is_open_now(&self) -> bool {
        match self.is_open {
            Some(open) => open,
            None => matches!(self.hours.as_deref(), Some(HOURS_OPEN) | Some(LEGACY_HOURS_OPEN)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlaceDetails {
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub opening_hours: OpeningHours,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OpeningHours {
    #[serde(default)]
    pub weekday_text: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Review {
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub relative_time_description: String,
    #[serde(default)]
    pub text: String,
}

/// Body of `POST /api/find_places`. Coordinates are optional on the wire so
/// the service can answer a missing field with a 400 instead of a 422.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindPlacesRequest {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
}

impl FindPlacesRequest {
    pub fn new(center: Location, radius_meters: f64) -> Self {
        Self {
            lat: Some(center.lat),
            lon: Some(center.lon),
            radius: Some(radius_meters),
        }
    }
}

/// A flat list of places, or the older shape keyed by display name.
///
/// Returned by `find_places` and sent back verbatim to `categorize_places`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PlaceList {
    List(Vec<Restaurant>),
    ByName(BTreeMap<String, Restaurant>),
}

impl PlaceList {
    pub fn len(&self) -> usize {
        match self {
            PlaceList::List(list) => list.len(),
            PlaceList::ByName(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_restaurants(self) -> Vec<Restaurant> {
        match self {
            PlaceList::List(list) => list,
            PlaceList::ByName(map) => map.into_values().collect(),
        }
    }
}

impl Default for PlaceList {
    fn default() -> Self {
        PlaceList::List(Vec::new())
    }
}

/// Category label (emoji-suffixed text) to the restaurants in it.
pub type CategorizedPlaces = BTreeMap<String, Vec<Restaurant>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeocodeCandidate {
    pub address: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(place_id: Option<&str>, name: &str) -> Restaurant {
        Restaurant {
            place_id: place_id.map(str::to_owned),
            name: name.to_owned(),
            lat: 25.03,
            lon: 121.56,
            rating: 4.2,
            price_level: 2,
            hours: None,
            is_open: None,
            types: Vec::new(),
            details: None,
        }
    }

    #[test]
    fn key_prefers_place_id_over_name() {
        assert_eq!(place(Some("abc"), "Noodles").key(), RestaurantKey("abc".into()));
        assert_eq!(place(None, "Noodles").key(), RestaurantKey("Noodles".into()));
        assert_eq!(place(Some(""), "Noodles").key(), RestaurantKey("Noodles".into()));
    }

    #[test]
    fn open_state_falls_back_to_hours_label() {
        let mut r = place(Some("a"), "A");
        assert!(!r.is_open_now());
        r.hours = Some(LEGACY_HOURS_OPEN.into());
        assert!(r.is_open_now());
        r.is_open = Some(false);
        assert!(!r.is_open_now());
    }

    #[test]
    fn place_list_accepts_both_shapes() {
        let list: PlaceList = serde_json::from_str(
            r#"[{"place_id":"p1","name":"A","lat":1.0,"lon":2.0,"is_open":true}]"#,
        )
        .unwrap();
        assert!(matches!(list, PlaceList::List(ref v) if v.len() == 1));

        let by_name: PlaceList = serde_json::from_str(
            r#"{"A":{"name":"A","lat":1.0,"lon":2.0,"rating":4.5,"price_level":1}}"#,
        )
        .unwrap();
        let restaurants = by_name.into_restaurants();
        assert_eq!(restaurants.len(), 1);
        assert_eq!(restaurants[0].price_level, 1);
    }

    #[test]
    fn empty_object_is_an_empty_place_list() {
        let list: PlaceList = serde_json::from_str("{}").unwrap();
        assert!(list.is_empty());
    }
}
