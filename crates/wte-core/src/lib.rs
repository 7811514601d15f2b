pub mod candidates;
pub mod decision;
pub mod filter;
pub mod geo;
pub mod model;
pub mod search;
pub mod state;

pub use candidates::{Candidate, CandidateSet, DEFAULT_MAX_CANDIDATES};
pub use filter::{Filters, apply_filters};
pub use model::{DEFAULT_LOCATION, Page, RestaurantData, SearchRadius};
pub use search::{ApiError, PlacesBackend, SearchError, SearchOrchestrator};
pub use state::{AppState, Change, Store};
