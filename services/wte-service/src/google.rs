use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{info, warn};
use wte_api_types::{
    GeocodeCandidate, HOURS_CLOSED, HOURS_OPEN, HOURS_UNKNOWN, Location, OpeningHours,
    PlaceDetails, Restaurant, Review,
};

pub const DEFAULT_GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com";

/// Broad place types searched first, each with one follow-up page.
pub const SEARCH_TYPES: [&str; 3] = ["restaurant", "bar", "cafe"];
/// Keyword searches that catch places the type search misses.
pub const SEARCH_KEYWORDS: [&str; 6] = ["內用", "好吃", "消夜", "飲料", "甜點", "素食"];

const DETAIL_FIELDS: &str = "place_id,name,geometry,rating,price_level,opening_hours,types,photos,reviews,formatted_phone_number,website";
const MAX_PHOTOS: usize = 2;
const PHOTO_MAX_WIDTH: u32 = 400;
const PLACEHOLDER_PHOTO_URL: &str = "https://placehold.co/600x400/F5EBE0/424242";
/// A fresh `next_page_token` is rejected until it propagates.
const NEXT_PAGE_DELAY: Duration = Duration::from_secs(2);

/// Upstream place lookup used by the HTTP handlers.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Every place found around `center`, deduplicated by `place_id`.
    /// Results may lie slightly outside `radius_m`.
    async fn nearby(&self, center: Location, radius_m: f64) -> Result<Vec<Restaurant>>;
    /// `None` when the place is unknown upstream.
    async fn details(&self, place_id: &str) -> Result<Option<Restaurant>>;
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>>;
}

/// Google Maps Places and Geocoding web services.
pub struct GoogleMapsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
    next_page_delay: Duration,
}

impl GoogleMapsClient {
    pub fn new(
        http: reqwest::Client,
        api_key: impl Into<String>,
        base_url: &str,
        language: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            language: language.into(),
            next_page_delay: NEXT_PAGE_DELAY,
        }
    }

    pub fn with_next_page_delay(mut self, delay: Duration) -> Self {
        self.next_page_delay = delay;
        self
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("google {what} transport"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("google {what} HTTP {status}: {text}");
        }

        response
            .json()
            .await
            .with_context(|| format!("google {what} parse"))
    }

    async fn nearby_page(&self, params: &[(&str, String)]) -> Result<NearbyResponse> {
        let page: NearbyResponse = self
            .get("/maps/api/place/nearbysearch/json", params, "nearby search")
            .await?;
        page.check_status()?;
        Ok(page)
    }

    async fn search_type(&self, center: Location, radius_m: f64, place_type: &str) -> Result<Vec<PlaceResult>> {
        let mut params = self.nearby_params(center, radius_m);
        params.push(("type", place_type.to_owned()));
        let first = self.nearby_page(&params).await?;
        let mut results = first.results;

        if let Some(token) = first.next_page_token {
            tokio::time::sleep(self.next_page_delay).await;
            match self.nearby_page(&[("pagetoken", token)]).await {
                Ok(next) => results.extend(next.results),
                Err(err) => warn!(place_type, error = %err, "next page fetch failed"),
            }
        }
        Ok(results)
    }

    async fn search_keyword(&self, center: Location, radius_m: f64, keyword: &str) -> Result<Vec<PlaceResult>> {
        let mut params = self.nearby_params(center, radius_m);
        params.push(("keyword", keyword.to_owned()));
        Ok(self.nearby_page(&params).await?.results)
    }

    fn nearby_params(&self, center: Location, radius_m: f64) -> Vec<(&'static str, String)> {
        vec![
            ("location", format!("{},{}", center.lat, center.lon)),
            ("radius", format!("{}", radius_m.round())),
            ("language", self.language.clone()),
        ]
    }

    fn photo_url(&self, reference: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/maps/api/place/photo", self.base_url),
            &[
                ("maxwidth", PHOTO_MAX_WIDTH.to_string().as_str()),
                ("photoreference", reference),
                ("key", self.api_key.as_str()),
            ],
        )?;
        Ok(url.into())
    }
}

#[async_trait]
impl PlaceSearch for GoogleMapsClient {
    async fn nearby(&self, center: Location, radius_m: f64) -> Result<Vec<Restaurant>> {
        let type_searches = SEARCH_TYPES
            .iter()
            .map(|t| self.search_type(center, radius_m, t));
        let keyword_searches = SEARCH_KEYWORDS
            .iter()
            .map(|k| self.search_keyword(center, radius_m, k));
        let (by_type, by_keyword) = futures::join!(
            futures::future::join_all(type_searches),
            futures::future::join_all(keyword_searches),
        );

        let labels = SEARCH_TYPES.iter().chain(SEARCH_KEYWORDS.iter());
        let mut seen = HashSet::new();
        let mut places = Vec::new();
        let mut failures = 0;
        for (label, batch) in labels.zip(by_type.into_iter().chain(by_keyword)) {
            match batch {
                Ok(results) => {
                    for result in results {
                        if seen.insert(result.place_id.clone()) {
                            places.push(result.into_restaurant());
                        }
                    }
                }
                Err(err) => {
                    failures += 1;
                    warn!(query = label, error = %err, "nearby search failed");
                }
            }
        }

        if failures == SEARCH_TYPES.len() + SEARCH_KEYWORDS.len() {
            anyhow::bail!("every nearby search failed");
        }
        info!(found = places.len(), failures, "composite nearby search done");
        Ok(places)
    }

    async fn details(&self, place_id: &str) -> Result<Option<Restaurant>> {
        let response: DetailsResponse = self
            .get(
                "/maps/api/place/details/json",
                &[
                    ("place_id", place_id.to_owned()),
                    ("fields", DETAIL_FIELDS.to_owned()),
                    ("language", self.language.clone()),
                ],
                "place details",
            )
            .await?;

        if response.status != "OK" {
            warn!(place_id, status = %response.status, "place details not available");
            return Ok(None);
        }
        let Some(result) = response.result else {
            return Ok(None);
        };

        let mut photos = result
            .photos
            .iter()
            .take(MAX_PHOTOS)
            .map(|p| self.photo_url(&p.photo_reference))
            .collect::<Result<Vec<_>>>()?;
        if photos.is_empty() {
            let placeholder =
                Url::parse_with_params(PLACEHOLDER_PHOTO_URL, &[("text", result.place.name.as_str())])?;
            photos.push(placeholder.into());
        }

        let details = PlaceDetails {
            photos,
            opening_hours: OpeningHours {
                weekday_text: result
                    .place
                    .opening_hours
                    .as_ref()
                    .map(|h| h.weekday_text.clone())
                    .unwrap_or_default(),
            },
            reviews: result
                .reviews
                .into_iter()
                .filter(|r| !r.text.trim().is_empty())
                .collect(),
            formatted_phone_number: result.formatted_phone_number.filter(|s| !s.is_empty()),
            website: result.website.filter(|s| !s.is_empty()),
        };

        let mut restaurant = result.place.into_restaurant();
        restaurant.details = Some(details);
        Ok(Some(restaurant))
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>> {
        let response: GeocodeResponse = self
            .get(
                "/maps/api/geocode/json",
                &[
                    ("address", query.to_owned()),
                    ("language", self.language.clone()),
                ],
                "geocode",
            )
            .await?;

        Ok(response
            .results
            .into_iter()
            .map(|r| GeocodeCandidate {
                address: r.formatted_address,
                lat: r.geometry.location.lat,
                lon: r.geometry.location.lng,
            })
            .collect())
    }
}

// ── Google web service payloads ──────────────────────────────────────

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceResult>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl NearbyResponse {
    fn check_status(&self) -> Result<()> {
        match self.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(()),
            other => anyhow::bail!(
                "places status {other}: {}",
                self.error_message.as_deref().unwrap_or("no message")
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    name: String,
    geometry: Geometry,
    #[serde(default)]
    rating: f32,
    #[serde(default)]
    price_level: u8,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    opening_hours: Option<GoogleOpeningHours>,
}

impl PlaceResult {
    fn into_restaurant(self) -> Restaurant {
        let is_open = self.opening_hours.as_ref().and_then(|h| h.open_now);
        let hours = match is_open {
            Some(true) => HOURS_OPEN,
            Some(false) => HOURS_CLOSED,
            None => HOURS_UNKNOWN,
        };
        Restaurant {
            place_id: Some(self.place_id),
            name: self.name,
            lat: self.geometry.location.lat,
            lon: self.geometry.location.lng,
            rating: self.rating,
            price_level: self.price_level,
            hours: Some(hours.to_owned()),
            is_open: Some(is_open.unwrap_or(false)),
            types: self.types,
            details: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct GoogleOpeningHours {
    #[serde(default)]
    open_now: Option<bool>,
    #[serde(default)]
    weekday_text: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    result: Option<DetailsResult>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    #[serde(flatten)]
    place: PlaceResult,
    #[serde(default)]
    photos: Vec<PhotoRef>,
    #[serde(default)]
    reviews: Vec<Review>,
    #[serde(default)]
    formatted_phone_number: Option<String>,
    #[serde(default)]
    website: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoRef {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}
