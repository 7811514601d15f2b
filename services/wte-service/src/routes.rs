use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::{info, warn};
use wte_api_types::{
    CategorizedPlaces, FindPlacesRequest, GeocodeCandidate, Location, PlaceList, Restaurant,
};
use wte_core::geo::haversine_distance_m;
use wte_core::model::DEFAULT_RADIUS_METERS;

use crate::gemini::PlaceSummary;
use crate::{ApiResult, AppState, bad_request, internal_error, not_found};

#[derive(Debug, Deserialize)]
pub(crate) struct DetailsQuery {
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeQuery {
    q: Option<String>,
}

pub(crate) async fn find_places(
    State(state): State<AppState>,
    payload: Result<Json<FindPlacesRequest>, JsonRejection>,
) -> ApiResult<Vec<Restaurant>> {
    let Json(request) = payload.map_err(|e| bad_request(&e.body_text()))?;

    let (Some(lat), Some(lon)) = (request.lat, request.lon) else {
        return Err(bad_request("lat and lon are required"));
    };
    let center = Location::new(lat, lon);
    if !center.is_valid() {
        return Err(bad_request("lat and lon must be finite numbers"));
    }
    let radius = request.radius.unwrap_or(DEFAULT_RADIUS_METERS);
    if !radius.is_finite() || radius <= 0.0 {
        return Err(bad_request("radius must be a positive number of meters"));
    }

    let found = state
        .places
        .nearby(center, radius)
        .await
        .map_err(|err| {
            warn!(error = %err, "find_places upstream failure");
            internal_error("unexpected error while searching for places")
        })?;

    let total = found.len();
    let places = within_radius(found, center, radius);
    info!(total, kept = places.len(), radius, "distance filter applied");
    Ok(Json(places))
}

pub(crate) async fn categorize_places(
    State(state): State<AppState>,
    payload: Result<Json<PlaceList>, JsonRejection>,
) -> ApiResult<CategorizedPlaces> {
    let Json(places) = payload.map_err(|e| bad_request(&e.body_text()))?;
    let restaurants = places.into_restaurants();
    if restaurants.is_empty() {
        return Err(bad_request("a non-empty restaurant list is required"));
    }

    let summaries: Vec<PlaceSummary> = restaurants
        .iter()
        .map(|r| PlaceSummary {
            name: r.name.clone(),
            types: r.types.clone(),
        })
        .collect();

    let by_name = state
        .categorizer
        .categorize(&summaries)
        .await
        .map_err(|err| {
            warn!(error = %err, "categorize_places upstream failure");
            internal_error("AI classification failed")
        })?;

    let result = resolve_names(&restaurants, by_name);
    info!(places = restaurants.len(), categories = result.len(), "categorize_places done");
    Ok(Json(result))
}

pub(crate) async fn place_details(
    State(state): State<AppState>,
    Query(query): Query<DetailsQuery>,
) -> ApiResult<Restaurant> {
    let place_id = query
        .place_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| bad_request("place_id is required"))?;

    match state.places.details(&place_id).await {
        Ok(Some(restaurant)) => Ok(Json(restaurant)),
        Ok(None) => Err(not_found("place not found")),
        Err(err) => {
            warn!(place_id = %place_id, error = %err, "place details lookup failed");
            Err(not_found("place details unavailable"))
        }
    }
}

pub(crate) async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> Json<Vec<GeocodeCandidate>> {
    let Some(q) = query.q.map(|q| q.trim().to_owned()).filter(|q| !q.is_empty()) else {
        return Json(Vec::new());
    };

    match state.places.geocode(&q).await {
        Ok(found) => Json(found),
        Err(err) => {
            warn!(query = %q, error = %err, "geocode failed");
            Json(Vec::new())
        }
    }
}

fn within_radius(places: Vec<Restaurant>, center: Location, radius_m: f64) -> Vec<Restaurant> {
    places
        .into_iter()
        .filter(|p| haversine_distance_m(center, p.location()) <= radius_m)
        .collect()
}

/// Maps the model's name lists back onto the submitted restaurants. Unknown
/// names are ignored and categories left empty are dropped.
fn resolve_names(
    restaurants: &[Restaurant],
    by_name: crate::gemini::NameCategories,
) -> CategorizedPlaces {
    let mut lookup: HashMap<&str, &Restaurant> = HashMap::new();
    for r in restaurants {
        lookup.entry(r.name.as_str()).or_insert(r);
    }

    by_name
        .into_iter()
        .filter_map(|(label, names)| {
            let mut seen = HashSet::new();
            let members: Vec<Restaurant> = names
                .iter()
                .filter_map(|name| lookup.get(name.trim()).copied())
                .filter(|r| seen.insert(r.key()))
                .cloned()
                .collect();
            (!members.is_empty()).then_some((label, members))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::gemini::{Categorizer, NameCategories};
    use crate::google::PlaceSearch;
    use async_trait::async_trait;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct FakePlaces {
        nearby: Vec<Restaurant>,
        fail: bool,
    }

    #[async_trait]
    impl PlaceSearch for FakePlaces {
        async fn nearby(&self, _center: Location, _radius_m: f64) -> anyhow::Result<Vec<Restaurant>> {
            if self.fail {
                anyhow::bail!("upstream down");
            }
            Ok(self.nearby.clone())
        }

        async fn details(&self, place_id: &str) -> anyhow::Result<Option<Restaurant>> {
            if self.fail {
                anyhow::bail!("upstream down");
            }
            Ok(self
                .nearby
                .iter()
                .find(|r| r.place_id.as_deref() == Some(place_id))
                .cloned())
        }

        async fn geocode(&self, query: &str) -> anyhow::Result<Vec<GeocodeCandidate>> {
            if self.fail {
                anyhow::bail!("upstream down");
            }
            Ok(vec![GeocodeCandidate {
                address: query.to_owned(),
                lat: 25.0,
                lon: 121.5,
            }])
        }
    }

    struct FakeCategorizer(Option<NameCategories>);

    #[async_trait]
    impl Categorizer for FakeCategorizer {
        async fn categorize(&self, _places: &[PlaceSummary]) -> anyhow::Result<NameCategories> {
            self.0.clone().ok_or_else(|| anyhow::anyhow!("model unavailable"))
        }
    }

    fn restaurant(id: &str, name: &str, lat: f64, lon: f64) -> Restaurant {
        Restaurant {
            place_id: Some(id.to_owned()),
            name: name.to_owned(),
            lat,
            lon,
            rating: 4.0,
            price_level: 1,
            hours: None,
            is_open: Some(true),
            types: vec!["restaurant".into()],
            details: None,
        }
    }

    fn app(fail: bool, categories: Option<NameCategories>) -> Router {
        build_router(AppState {
            places: Arc::new(FakePlaces {
                nearby: vec![
                    restaurant("near", "近的麵店", 25.0300, 121.5600),
                    restaurant("far", "遠的壽司", 25.0500, 121.5600),
                ],
                fail,
            }),
            categorizer: Arc::new(FakeCategorizer(categories)),
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn find_places_drops_places_outside_the_radius() {
        let (status, json) = send(
            app(false, None),
            post_json("/api/find_places", json!({ "lat": 25.03, "lon": 121.56, "radius": 500 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let list = json.as_array().expect("array");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["place_id"], "near");
    }

    #[tokio::test]
    async fn find_places_requires_coordinates() {
        let (status, json) = send(
            app(false, None),
            post_json("/api/find_places", json!({ "lat": 25.03 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "lat and lon are required");
    }

    #[tokio::test]
    async fn malformed_body_is_a_json_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/find_places")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .expect("request");
        let (status, json) = send(app(false, None), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn find_places_upstream_failure_is_500() {
        let (status, json) = send(
            app(true, None),
            post_json("/api/find_places", json!({ "lat": 25.03, "lon": 121.56 })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn categorize_resolves_names_back_to_places() {
        let mut categories = NameCategories::new();
        categories.insert("牛肉麵 🍜".into(), vec!["近的麵店".into(), "不存在".into()]);
        categories.insert("空的 🫙".into(), vec!["誰".into()]);
        let body = json!([
            restaurant("near", "近的麵店", 25.03, 121.56),
            restaurant("far", "遠的壽司", 25.05, 121.56),
        ]);

        let (status, json) = send(
            app(false, Some(categories)),
            post_json("/api/categorize_places", body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let map = json.as_object().expect("object");
        assert_eq!(map.len(), 1);
        assert_eq!(map["牛肉麵 🍜"][0]["place_id"], "near");
    }

    #[tokio::test]
    async fn categorize_accepts_name_keyed_payload() {
        let mut categories = NameCategories::new();
        categories.insert("壽司 🍣".into(), vec!["遠的壽司".into()]);
        let body = json!({ "遠的壽司": restaurant("far", "遠的壽司", 25.05, 121.56) });

        let (status, json) = send(
            app(false, Some(categories)),
            post_json("/api/categorize_places", body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["壽司 🍣"][0]["name"], "遠的壽司");
    }

    #[tokio::test]
    async fn categorize_rejects_empty_input() {
        let (status, _) = send(
            app(false, Some(NameCategories::new())),
            post_json("/api/categorize_places", json!([])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn categorize_failure_carries_error_message() {
        let (status, json) = send(
            app(false, None),
            post_json(
                "/api/categorize_places",
                json!([restaurant("near", "近的麵店", 25.03, 121.56)]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "AI classification failed");
    }

    #[tokio::test]
    async fn place_details_known_and_unknown() {
        let (status, json) = send(app(false, None), get("/api/place_details?place_id=near")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "近的麵店");

        let (status, json) = send(app(false, None), get("/api/place_details?place_id=zzz")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].is_string());

        let (status, _) = send(app(false, None), get("/api/place_details")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn geocode_failure_is_an_empty_list() {
        let (status, json) = send(app(true, None), get("/api/geocode?q=taipei")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([]));

        let (_, json) = send(app(false, None), get("/api/geocode?q=%20taipei%20")).await;
        assert_eq!(json[0]["address"], "taipei");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, json) = send(app(false, None), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["service"], "wte-service");
    }
}
