//! Application state and the store that owns it.
//!
//! All client code reaches state through a [`Store`] handed down explicitly.
//! A mutation runs to completion before any subscriber is told about it, so
//! a render pass never sees a half-applied update.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use wte_api_types::{Location, Restaurant, RestaurantKey};

use crate::candidates::{Candidate, CandidateSet};
use crate::filter::{Filters, apply_filters};
use crate::model::{Page, RestaurantData, SearchRadius};

#[derive(Debug, Clone)]
pub struct AppState {
    pub page: Page,
    pub nav_stack: Vec<Page>,
    pub restaurants: RestaurantData,
    pub filters: Filters,
    pub candidates: CandidateSet,
    pub focused_categories: BTreeSet<String>,
    pub active_category: Option<String>,
    pub is_categorizing: bool,
    pub categorization_error: Option<String>,
    pub retry_in_flight: bool,
    pub search_generation: u64,
    pub user_location: Option<Location>,
    pub search_center: Option<Location>,
    pub search_radius: SearchRadius,
    pub current_details: Option<Restaurant>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    Focused,
    Unfocused,
    /// Categories are still being computed; the UI should signal the refusal.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateToggle {
    Added,
    Removed,
    Full,
}

impl AppState {
    /// Fresh session: splash page, open-now filter on, nothing fetched.
    pub fn new() -> Self {
        Self {
            page: Page::Splash,
            nav_stack: Vec::new(),
            restaurants: RestaurantData::default(),
            filters: Filters {
                open_now: true,
                ..Filters::default()
            },
            candidates: CandidateSet::new(),
            focused_categories: BTreeSet::new(),
            active_category: None,
            is_categorizing: false,
            categorization_error: None,
            retry_in_flight: false,
            search_generation: 0,
            user_location: None,
            search_center: None,
            search_radius: SearchRadius::default(),
            current_details: None,
        }
    }

    pub fn filtered_restaurants(&self) -> RestaurantData {
        apply_filters(&self.restaurants, &self.filters)
    }

    pub fn can_retry_categorization(&self) -> bool {
        self.categorization_error.is_some()
            && !self.restaurants.is_classified()
            && !self.retry_in_flight
            && !self.is_categorizing
    }

    /// Pushes the current page. Returns `false` when already on `page`.
    pub fn navigate_to(&mut self, page: Page) -> bool {
        if self.page == page {
            return false;
        }
        self.nav_stack.push(self.page);
        self.page = page;
        true
    }

    pub fn navigate_back(&mut self) -> Option<Page> {
        let previous = self.nav_stack.pop()?;
        self.page = previous;
        Some(previous)
    }

    pub fn toggle_category_focus(&mut self, label: &str) -> FocusOutcome {
        if self.is_categorizing {
            return FocusOutcome::Rejected;
        }
        if self.focused_categories.remove(label) {
            if self.active_category.as_deref() == Some(label) {
                self.active_category = None;
            }
            FocusOutcome::Unfocused
        } else {
            self.focused_categories.insert(label.to_owned());
            self.active_category = Some(label.to_owned());
            FocusOutcome::Focused
        }
    }

    pub fn reset_focus(&mut self) {
        self.focused_categories.clear();
        self.active_category = None;
    }

    pub fn toggle_candidate(&mut self, restaurant: &Restaurant) -> CandidateToggle {
        let key = restaurant.key();
        if self.candidates.contains(&key) {
            self.candidates.remove(&key);
            CandidateToggle::Removed
        } else if self.candidates.add(Candidate::from(restaurant)) {
            CandidateToggle::Added
        } else {
            CandidateToggle::Full
        }
    }

    /// Looks a restaurant up in the fetched data, falling back to the
    /// details record (which may belong to a place no longer listed).
    pub fn restaurant(&self, key: &RestaurantKey) -> Option<&Restaurant> {
        self.restaurants.find(key).or_else(|| {
            self.current_details
                .as_ref()
                .filter(|details| &details.key() == key)
        })
    }
}

/// What part of the state a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Restaurants,
    Categorization,
    Filters,
    Candidates,
    Focus,
    Navigation,
    Location,
    Details,
}

type Listener = Rc<dyn Fn(Change)>;

#[derive(Default)]
pub struct Store {
    state: RefCell<AppState>,
    listeners: RefCell<Vec<Listener>>,
}

impl Store {
    pub fn new(state: AppState) -> Self {
        Self {
            state: RefCell::new(state),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Applies `f` and then notifies subscribers with `change`. No borrow is
    /// held while listeners run, so they may read or update the store.
    pub fn update<R>(&self, change: Change, f: impl FnOnce(&mut AppState) -> R) -> R {
        let out = f(&mut self.state.borrow_mut());
        self.notify(change);
        out
    }

    pub fn subscribe(&self, listener: impl Fn(Change) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn notify(&self, change: Change) {
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(id: &str) -> Restaurant {
        Restaurant {
            place_id: Some(id.to_owned()),
            name: id.to_uppercase(),
            lat: 25.0,
            lon: 121.5,
            rating: 4.0,
            price_level: 1,
            hours: None,
            is_open: Some(true),
            types: Vec::new(),
            details: None,
        }
    }

    #[test]
    fn fresh_session_filters_open_places() {
        let state = AppState::new();
        assert!(state.filters.open_now);
        assert_eq!(state.page, Page::Splash);
        assert_eq!(state.search_radius.meters(), 500.0);
    }

    #[test]
    fn navigation_is_a_stack() {
        let mut state = AppState::new();
        assert!(state.navigate_to(Page::RadiusMap));
        assert!(!state.navigate_to(Page::RadiusMap));
        assert!(state.navigate_to(Page::Categories));
        assert_eq!(state.navigate_back(), Some(Page::RadiusMap));
        assert_eq!(state.navigate_back(), Some(Page::Splash));
        assert_eq!(state.navigate_back(), None);
        assert_eq!(state.page, Page::Splash);
    }

    #[test]
    fn focus_is_rejected_while_categorizing() {
        let mut state = AppState::new();
        state.is_categorizing = true;
        assert_eq!(state.toggle_category_focus("麵 🍜"), FocusOutcome::Rejected);
        assert!(state.focused_categories.is_empty());

        state.is_categorizing = false;
        assert_eq!(state.toggle_category_focus("麵 🍜"), FocusOutcome::Focused);
        assert_eq!(state.active_category.as_deref(), Some("麵 🍜"));
        assert_eq!(state.toggle_category_focus("麵 🍜"), FocusOutcome::Unfocused);
        assert!(state.active_category.is_none());
    }

    #[test]
    fn candidate_toggle_reports_capacity() {
        let mut state = AppState::new();
        for i in 0..8 {
            assert_eq!(
                state.toggle_candidate(&restaurant(&format!("r{i}"))),
                CandidateToggle::Added
            );
        }
        assert_eq!(state.toggle_candidate(&restaurant("r8")), CandidateToggle::Full);
        assert_eq!(state.toggle_candidate(&restaurant("r0")), CandidateToggle::Removed);
        assert_eq!(state.candidates.len(), 7);
    }

    #[test]
    fn listeners_run_after_the_whole_update() {
        let store = Rc::new(Store::new(AppState::new()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let store_ref = Rc::clone(&store);
            let seen = Rc::clone(&seen);
            store.subscribe(move |change| {
                let snapshot = store_ref.read(|s| (s.is_categorizing, s.restaurants.len()));
                seen.borrow_mut().push((change, snapshot));
            });
        }
        store.update(Change::Restaurants, |s| {
            s.restaurants = RestaurantData::Unclassified(vec![restaurant("a")]);
            s.is_categorizing = true;
        });
        assert_eq!(*seen.borrow(), vec![(Change::Restaurants, (true, 1))]);
    }

    #[test]
    fn listener_may_update_the_store() {
        let store = Rc::new(Store::new(AppState::new()));
        {
            let store_ref = Rc::clone(&store);
            store.subscribe(move |change| {
                if change == Change::Navigation {
                    store_ref.update(Change::Focus, AppState::reset_focus);
                }
            });
        }
        store.update(Change::Navigation, |s| s.navigate_to(Page::Categories));
        assert_eq!(store.read(|s| s.page), Page::Categories);
    }
}
