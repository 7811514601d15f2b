use std::collections::BTreeMap;

use wte_api_types::{CategorizedPlaces, Location, Restaurant, RestaurantKey};

pub const MIN_RADIUS_METERS: f64 = 50.0;
pub const DEFAULT_RADIUS_METERS: f64 = 500.0;

/// Used when geolocation is denied or times out.
pub const DEFAULT_LOCATION: Location = Location {
    lat: 24.975,
    lon: 121.538,
};

/// Restaurants as fetched (raw list) or after categorization.
#[derive(Debug, Clone, PartialEq)]
pub enum RestaurantData {
    Unclassified(Vec<Restaurant>),
    Classified(CategorizedPlaces),
}

impl Default for RestaurantData {
    fn default() -> Self {
        RestaurantData::Unclassified(Vec::new())
    }
}

impl RestaurantData {
    pub fn is_classified(&self) -> bool {
        matches!(self, RestaurantData::Classified(_))
    }

    /// Every restaurant, category order first. A restaurant listed under two
    /// categories is yielded twice.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Restaurant> + '_> {
        match self {
            RestaurantData::Unclassified(list) => Box::new(list.iter()),
            RestaurantData::Classified(map) => Box::new(map.values().flatten()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RestaurantData::Unclassified(list) => list.len(),
            RestaurantData::Classified(map) => map.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, key: &RestaurantKey) -> Option<&Restaurant> {
        self.iter().find(|r| &r.key() == key)
    }

    pub fn categories(&self) -> Vec<&str> {
        match self {
            RestaurantData::Unclassified(_) => Vec::new(),
            RestaurantData::Classified(map) => map.keys().map(String::as_str).collect(),
        }
    }

    pub fn category(&self, label: &str) -> Option<&[Restaurant]> {
        match self {
            RestaurantData::Unclassified(_) => None,
            RestaurantData::Classified(map) => map.get(label).map(Vec::as_slice),
        }
    }

    /// Category a restaurant belongs to (the first one when listed twice).
    pub fn category_of(&self, key: &RestaurantKey) -> Option<&str> {
        match self {
            RestaurantData::Unclassified(_) => None,
            RestaurantData::Classified(map) => map
                .iter()
                .find(|(_, list)| list.iter().any(|r| &r.key() == key))
                .map(|(label, _)| label.as_str()),
        }
    }

    pub(crate) fn from_categories(map: BTreeMap<String, Vec<Restaurant>>) -> Self {
        RestaurantData::Classified(map)
    }
}

/// Search radius in meters, never below its minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRadius(f64);

impl SearchRadius {
    pub fn new(meters: f64) -> Self {
        Self::with_min(meters, MIN_RADIUS_METERS)
    }

    pub fn with_min(meters: f64, min: f64) -> Self {
        if meters.is_finite() {
            Self(meters.round().max(min))
        } else {
            Self(min)
        }
    }

    pub fn meters(self) -> f64 {
        self.0
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self(DEFAULT_RADIUS_METERS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Splash,
    RadiusMap,
    Categories,
    Wheel,
    Details,
}

impl Page {
    /// DOM id of the page container.
    pub fn dom_id(self) -> &'static str {
        match self {
            Page::Splash => "splash-page",
            Page::RadiusMap => "map-page",
            Page::Categories => "categories-page",
            Page::Wheel => "wheel-page",
            Page::Details => "details-page",
        }
    }
}

/// First emoji-looking character of a category label, for map markers.
pub fn category_icon(label: &str) -> Option<char> {
    label.chars().find(|c| {
        let cp = *c as u32;
        (0x1F300..=0x1FAFF).contains(&cp) || (0x2600..=0x27BF).contains(&cp)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_is_clamped_and_rounded() {
        assert_eq!(SearchRadius::new(12.0).meters(), 50.0);
        assert_eq!(SearchRadius::new(640.4).meters(), 640.0);
        assert_eq!(SearchRadius::new(f64::NAN).meters(), 50.0);
        assert_eq!(SearchRadius::with_min(80.0, 100.0).meters(), 100.0);
    }

    #[test]
    fn category_icon_picks_the_emoji() {
        assert_eq!(category_icon("牛肉麵 🍜"), Some('🍜'));
        assert_eq!(category_icon("咖啡廳 ☕️"), Some('☕'));
        assert_eq!(category_icon("plain"), None);
    }
}
