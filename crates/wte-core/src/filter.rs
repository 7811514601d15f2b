//! Derives the filtered view of restaurant data from the user's filter settings.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use wte_api_types::{Restaurant, RestaurantKey};

use crate::model::RestaurantData;

/// `false` / `0` means "no constraint" for each field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    pub open_now: bool,
    /// 0 = any, otherwise an exact price level 1..=4.
    pub price_level: u8,
    /// 0 = any, otherwise a minimum rating.
    pub min_rating: f32,
}

impl Filters {
    pub fn is_unconstrained(&self) -> bool {
        *self == Filters::default()
    }

    pub fn matches(&self, restaurant: &Restaurant) -> bool {
        (!self.open_now || restaurant.is_open_now())
            && (self.price_level == 0 || restaurant.price_level == self.price_level)
            && (self.min_rating == 0.0 || restaurant.rating >= self.min_rating)
    }
}

/// Keeps restaurants passing every filter. Categories are rebuilt from the
/// surviving identities and dropped when nothing in them survives.
pub fn apply_filters(data: &RestaurantData, filters: &Filters) -> RestaurantData {
    match data {
        RestaurantData::Unclassified(list) => RestaurantData::Unclassified(
            list.iter().filter(|r| filters.matches(r)).cloned().collect(),
        ),
        RestaurantData::Classified(map) => {
            let kept: HashSet<RestaurantKey> = map
                .values()
                .flatten()
                .filter(|r| filters.matches(r))
                .map(Restaurant::key)
                .collect();

            let rebuilt: BTreeMap<String, Vec<Restaurant>> = map
                .iter()
                .filter_map(|(label, list)| {
                    let survivors: Vec<Restaurant> = list
                        .iter()
                        .filter(|r| kept.contains(&r.key()))
                        .cloned()
                        .collect();
                    (!survivors.is_empty()).then(|| (label.clone(), survivors))
                })
                .collect();

            RestaurantData::from_categories(rebuilt)
        }
    }
}
