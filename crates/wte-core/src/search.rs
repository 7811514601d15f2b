//! Search and categorization flow over a [`PlacesBackend`].

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};
use wte_api_types::{
    CategorizedPlaces, ErrorResponse, FindPlacesRequest, GeocodeCandidate, Location, PlaceList,
    Restaurant, RestaurantKey,
};

use crate::model::{RestaurantData, SearchRadius};
use crate::state::{Change, Store};

/// Failure talking to the places backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Non-success HTTP status. `message` is the body's `error` field when
    /// there was one.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .map(|e| e.error)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP error, status {status}"));
        ApiError::Status { status, message }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("a valid location is required before searching")]
    InvalidCenter,

    #[error("no restaurants found, try widening the search radius")]
    NoResults,

    #[error(transparent)]
    Backend(#[from] ApiError),
}

/// The four endpoints the client consumes.
#[async_trait(?Send)]
pub trait PlacesBackend {
    async fn find_places(&self, req: &FindPlacesRequest) -> Result<PlaceList, ApiError>;
    async fn categorize_places(&self, places: &PlaceList) -> Result<CategorizedPlaces, ApiError>;
    async fn place_details(&self, place_id: &str) -> Result<Restaurant, ApiError>;
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ApiError>;
}

/// Categorization work bound to the search that produced it.
#[derive(Debug, Clone)]
pub struct CategorizeJob {
    pub generation: u64,
    pub places: PlaceList,
}

#[derive(Debug, Clone)]
pub struct SearchStarted {
    pub found: usize,
    /// To be run with [`SearchOrchestrator::run_categorization`] without
    /// blocking the caller.
    pub job: CategorizeJob,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CategorizeOutcome {
    Applied { categories: usize },
    /// A newer search committed while this one was in flight.
    Stale,
    Failed(String),
}

pub struct SearchOrchestrator<B> {
    backend: B,
}

impl<B: PlacesBackend> SearchOrchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetches places around `center` and commits them unclassified.
    ///
    /// On any error the store is left exactly as it was.
    pub async fn perform_search(
        &self,
        store: &Store,
        center: Option<Location>,
        radius: SearchRadius,
    ) -> Result<SearchStarted, SearchError> {
        let center = center
            .filter(Location::is_valid)
            .ok_or(SearchError::InvalidCenter)?;

        let req = FindPlacesRequest::new(center, radius.meters());
        let places = self.backend.find_places(&req).await?;
        if places.is_empty() {
            info!(lat = center.lat, lon = center.lon, radius = radius.meters(), "no places found");
            return Err(SearchError::NoResults);
        }

        let found = places.len();
        let raw = places.clone().into_restaurants();
        let generation = store.update(Change::Restaurants, |s| {
            s.search_generation += 1;
            s.restaurants = RestaurantData::Unclassified(raw);
            s.is_categorizing = true;
            s.categorization_error = None;
            s.retry_in_flight = false;
            s.search_center = Some(center);
            s.search_radius = radius;
            s.reset_focus();
            s.search_generation
        });
        info!(found, generation, "search committed, categorizing");

        Ok(SearchStarted {
            found,
            job: CategorizeJob { generation, places },
        })
    }

    pub async fn run_categorization(&self, store: &Store, job: CategorizeJob) -> CategorizeOutcome {
        let result = self.backend.categorize_places(&job.places).await;

        if store.read(|s| s.search_generation) != job.generation {
            debug!(generation = job.generation, "discarding stale categorization");
            return CategorizeOutcome::Stale;
        }

        let result = result.map_err(|e| e.to_string()).and_then(|mut map| {
            map.retain(|_, list| !list.is_empty());
            if map.is_empty() {
                Err("categorization returned no categories".to_owned())
            } else {
                Ok(map)
            }
        });

        match result {
            Ok(map) => {
                let categories = map.len();
                store.update(Change::Categorization, |s| {
                    s.restaurants = RestaurantData::Classified(map);
                    s.is_categorizing = false;
                    s.retry_in_flight = false;
                    s.categorization_error = None;
                    s.reset_focus();
                });
                info!(categories, generation = job.generation, "categorization applied");
                CategorizeOutcome::Applied { categories }
            }
            Err(message) => {
                warn!(error = %message, generation = job.generation, "categorization failed");
                store.update(Change::Categorization, |s| {
                    s.is_categorizing = false;
                    s.retry_in_flight = false;
                    s.categorization_error = Some(message.clone());
                });
                CategorizeOutcome::Failed(message)
            }
        }
    }

    /// Re-issues categorization of the raw list already held in state. At
    /// most one retry is in flight; `None` when a retry is not applicable.
    pub fn retry_categorization(&self, store: &Store) -> Option<CategorizeJob> {
        if !store.read(|s| s.can_retry_categorization()) {
            return None;
        }
        store.update(Change::Categorization, |s| {
            let RestaurantData::Unclassified(raw) = &s.restaurants else {
                return None;
            };
            let places = PlaceList::List(raw.clone());
            s.retry_in_flight = true;
            s.is_categorizing = true;
            s.categorization_error = None;
            Some(CategorizeJob {
                generation: s.search_generation,
                places,
            })
        })
    }

    /// Fetches details for `key` and makes them the current details record.
    pub async fn load_details(
        &self,
        store: &Store,
        key: &RestaurantKey,
    ) -> Result<Restaurant, ApiError> {
        let place_id = store
            .read(|s| s.restaurant(key).and_then(|r| r.place_id.clone()))
            .unwrap_or_else(|| key.0.clone());

        let mut details = self.backend.place_details(&place_id).await?;
        if details.place_id.is_none() {
            details.place_id = Some(place_id);
        }
        store.update(Change::Details, |s| s.current_details = Some(details.clone()));
        Ok(details)
    }

    pub async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.backend.geocode(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, VecDeque};

    fn restaurant(id: &str) -> Restaurant {
        Restaurant {
            place_id: Some(id.to_owned()),
            name: format!("Place {id}"),
            lat: 25.03,
            lon: 121.56,
            rating: 4.1,
            price_level: 2,
            hours: None,
            is_open: Some(true),
            types: vec!["restaurant".into()],
            details: None,
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        places: RefCell<VecDeque<Result<PlaceList, ApiError>>>,
        categorized: RefCell<VecDeque<Result<CategorizedPlaces, ApiError>>>,
        find_calls: Cell<u32>,
        categorize_calls: Cell<u32>,
    }

    impl FakeBackend {
        fn with_places(self, places: Result<PlaceList, ApiError>) -> Self {
            self.places.borrow_mut().push_back(places);
            self
        }

        fn with_categories(self, result: Result<CategorizedPlaces, ApiError>) -> Self {
            self.categorized.borrow_mut().push_back(result);
            self
        }
    }

    #[async_trait(?Send)]
    impl PlacesBackend for FakeBackend {
        async fn find_places(&self, _req: &FindPlacesRequest) -> Result<PlaceList, ApiError> {
            self.find_calls.set(self.find_calls.get() + 1);
            self.places
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(PlaceList::default()))
        }

        async fn categorize_places(
            &self,
            _places: &PlaceList,
        ) -> Result<CategorizedPlaces, ApiError> {
            self.categorize_calls.set(self.categorize_calls.get() + 1);
            self.categorized
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("no response queued".into())))
        }

        async fn place_details(&self, place_id: &str) -> Result<Restaurant, ApiError> {
            let mut r = restaurant(place_id);
            r.place_id = None;
            r.details = Some(Default::default());
            Ok(r)
        }

        async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ApiError> {
            Ok(vec![GeocodeCandidate {
                address: query.to_owned(),
                lat: 25.0,
                lon: 121.5,
            }])
        }
    }

    fn two_places() -> PlaceList {
        PlaceList::List(vec![restaurant("a"), restaurant("b")])
    }

    fn categories() -> CategorizedPlaces {
        let mut map = BTreeMap::new();
        map.insert("麵食 🍜".to_owned(), vec![restaurant("a")]);
        map.insert("咖啡 ☕".to_owned(), vec![restaurant("b")]);
        map
    }

    const TAIPEI: Location = Location { lat: 25.03, lon: 121.56 };

    #[tokio::test]
    async fn search_then_categorize() {
        let orchestrator = SearchOrchestrator::new(
            FakeBackend::default()
                .with_places(Ok(two_places()))
                .with_categories(Ok(categories())),
        );
        let store = Store::new(AppState::new());
        store.update(Change::Focus, |s| {
            s.focused_categories.insert("old".into());
            s.active_category = Some("old".into());
        });

        let started = orchestrator
            .perform_search(&store, Some(TAIPEI), SearchRadius::new(500.0))
            .await
            .unwrap();
        assert_eq!(started.found, 2);
        store.read(|s| {
            assert_eq!(s.restaurants.len(), 2);
            assert!(!s.restaurants.is_classified());
            assert!(s.is_categorizing);
        });

        let outcome = orchestrator.run_categorization(&store, started.job).await;
        assert_eq!(outcome, CategorizeOutcome::Applied { categories: 2 });
        store.read(|s| {
            assert!(!s.is_categorizing);
            assert!(s.restaurants.is_classified());
            assert!(s.active_category.is_none());
            assert!(s.focused_categories.is_empty());
        });
    }

    #[tokio::test]
    async fn empty_result_leaves_state_untouched() {
        let orchestrator =
            SearchOrchestrator::new(FakeBackend::default().with_places(Ok(PlaceList::default())));
        let store = Store::new(AppState::new());
        store.update(Change::Restaurants, |s| {
            s.restaurants = RestaurantData::Unclassified(vec![restaurant("prev")]);
        });
        let before = store.read(|s| (s.restaurants.clone(), s.search_generation));

        let err = orchestrator
            .perform_search(&store, Some(Location::new(0.0, 0.0)), SearchRadius::new(500.0))
            .await
            .unwrap_err();
        assert_eq!(err, SearchError::NoResults);
        assert_eq!(store.read(|s| (s.restaurants.clone(), s.search_generation)), before);
    }

    #[tokio::test]
    async fn invalid_center_makes_no_call() {
        let orchestrator = SearchOrchestrator::new(FakeBackend::default());
        let store = Store::new(AppState::new());
        for center in [None, Some(Location::new(f64::NAN, 121.0))] {
            let err = orchestrator
                .perform_search(&store, center, SearchRadius::default())
                .await
                .unwrap_err();
            assert_eq!(err, SearchError::InvalidCenter);
        }
        assert_eq!(orchestrator.backend().find_calls.get(), 0);
    }

    #[tokio::test]
    async fn backend_failure_keeps_previous_data() {
        let orchestrator = SearchOrchestrator::new(
            FakeBackend::default().with_places(Err(ApiError::from_status(500, r#"{"error":"quota"}"#))),
        );
        let store = Store::new(AppState::new());
        let err = orchestrator
            .perform_search(&store, Some(TAIPEI), SearchRadius::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "quota");
        assert!(store.read(|s| s.restaurants.is_empty() && !s.is_categorizing));
    }

    #[tokio::test]
    async fn stale_categorization_is_discarded() {
        let orchestrator = SearchOrchestrator::new(
            FakeBackend::default()
                .with_places(Ok(two_places()))
                .with_places(Ok(PlaceList::List(vec![restaurant("c")])))
                .with_categories(Ok(categories()))
                .with_categories(Ok(categories())),
        );
        let store = Store::new(AppState::new());
        let first = orchestrator
            .perform_search(&store, Some(TAIPEI), SearchRadius::default())
            .await
            .unwrap();
        let second = orchestrator
            .perform_search(&store, Some(TAIPEI), SearchRadius::default())
            .await
            .unwrap();

        assert_eq!(
            orchestrator.run_categorization(&store, first.job).await,
            CategorizeOutcome::Stale
        );
        store.read(|s| {
            assert!(s.is_categorizing);
            assert_eq!(s.restaurants.len(), 1);
            assert!(!s.restaurants.is_classified());
        });

        assert!(matches!(
            orchestrator.run_categorization(&store, second.job).await,
            CategorizeOutcome::Applied { .. }
        ));
    }

    #[tokio::test]
    async fn failed_categorization_offers_a_single_retry() {
        let orchestrator = SearchOrchestrator::new(
            FakeBackend::default()
                .with_places(Ok(two_places()))
                .with_categories(Err(ApiError::from_status(503, "")))
                .with_categories(Ok(categories())),
        );
        let store = Store::new(AppState::new());
        let started = orchestrator
            .perform_search(&store, Some(TAIPEI), SearchRadius::default())
            .await
            .unwrap();

        let outcome = orchestrator.run_categorization(&store, started.job).await;
        assert_eq!(
            outcome,
            CategorizeOutcome::Failed("HTTP error, status 503".into())
        );
        store.read(|s| {
            assert!(!s.is_categorizing);
            assert_eq!(s.restaurants.len(), 2);
            assert!(s.can_retry_categorization());
        });

        let job = orchestrator.retry_categorization(&store).unwrap();
        assert!(orchestrator.retry_categorization(&store).is_none());
        assert!(store.read(|s| s.retry_in_flight && s.is_categorizing));

        assert!(matches!(
            orchestrator.run_categorization(&store, job).await,
            CategorizeOutcome::Applied { .. }
        ));
        assert!(!store.read(|s| s.retry_in_flight));
        assert!(orchestrator.retry_categorization(&store).is_none());
        assert_eq!(orchestrator.backend().find_calls.get(), 1);
        assert_eq!(orchestrator.backend().categorize_calls.get(), 2);
    }

    #[tokio::test]
    async fn empty_mapping_counts_as_failure() {
        let orchestrator = SearchOrchestrator::new(
            FakeBackend::default()
                .with_places(Ok(two_places()))
                .with_categories(Ok(BTreeMap::new())),
        );
        let store = Store::new(AppState::new());
        let started = orchestrator
            .perform_search(&store, Some(TAIPEI), SearchRadius::default())
            .await
            .unwrap();
        let outcome = orchestrator.run_categorization(&store, started.job).await;
        assert!(matches!(outcome, CategorizeOutcome::Failed(_)));
        assert!(!store.read(|s| s.restaurants.is_classified()));
    }

    #[tokio::test]
    async fn details_become_current_record() {
        let orchestrator = SearchOrchestrator::new(FakeBackend::default());
        let store = Store::new(AppState::new());
        let details = orchestrator
            .load_details(&store, &RestaurantKey("xyz".into()))
            .await
            .unwrap();
        assert_eq!(details.place_id.as_deref(), Some("xyz"));
        assert!(store.read(|s| s.current_details.is_some()));
    }

    #[tokio::test]
    async fn blank_geocode_query_is_not_sent() {
        let orchestrator = SearchOrchestrator::new(FakeBackend::default());
        assert!(orchestrator.geocode("   ").await.unwrap().is_empty());
        assert_eq!(orchestrator.geocode(" 台北 ").await.unwrap()[0].address, "台北");
    }

    #[test]
    fn status_errors_prefer_body_message() {
        assert_eq!(
            ApiError::from_status(400, r#"{"error":"lat and lon are required"}"#).to_string(),
            "lat and lon are required"
        );
        assert_eq!(
            ApiError::from_status(502, "<html>bad gateway</html>").to_string(),
            "HTTP error, status 502"
        );
    }
}
