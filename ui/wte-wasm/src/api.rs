//! HTTP client for the places backend.
//!
//! `FetchBackend` implements [`PlacesBackend`] over `window.fetch`. The base
//! URL comes from a `data-api-base` attribute on `<body>`, falling back to
//! same-origin.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response, UrlSearchParams};
use wte_api_types::{CategorizedPlaces, FindPlacesRequest, GeocodeCandidate, PlaceList, Restaurant};
use wte_core::{ApiError, PlacesBackend};

use crate::dom;

pub fn base_url() -> String {
    let configured = dom::query("body")
        .and_then(|body| body.get_attribute("data-api-base"))
        .map(|v| v.trim().trim_end_matches('/').to_owned())
        .unwrap_or_default();
    if !configured.is_empty() {
        return configured;
    }
    dom::window().location().origin().unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct FetchBackend {
    base_url: String,
}

impl Default for FetchBackend {
    fn default() -> Self {
        Self::new(base_url())
    }
}

impl FetchBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        let params = UrlSearchParams::new().map_err(js_transport)?;
        for (k, v) in query {
            params.append(k, v);
        }
        let qs: String = params.to_string().into();
        let url = format!("{}{}?{}", self.base_url, path, qs);
        self.request(&url, "GET", None).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let url = format!("{}{}", self.base_url, path);
        self.request(&url, "POST", Some(body)).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        body: Option<String>,
    ) -> Result<T, ApiError> {
        let opts = RequestInit::new();
        opts.set_method(method);
        opts.set_mode(RequestMode::Cors);

        let headers = Headers::new().map_err(js_transport)?;
        if let Some(ref b) = body {
            headers
                .set("Content-Type", "application/json")
                .map_err(js_transport)?;
            opts.set_body(&JsValue::from_str(b));
        }
        opts.set_headers(&headers);

        let request = Request::new_with_str_and_init(url, &opts).map_err(js_transport)?;
        let resp_value = JsFuture::from(dom::window().fetch_with_request(&request))
            .await
            .map_err(js_transport)?;
        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| ApiError::Transport("response is not a Response".into()))?;

        let text = JsFuture::from(resp.text().map_err(js_transport)?)
            .await
            .map_err(js_transport)?
            .as_string()
            .unwrap_or_default();

        if !resp.ok() {
            gloo_console::warn!(format!("{method} {url} -> {}", resp.status()));
            return Err(ApiError::from_status(resp.status(), &text));
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn js_transport(err: JsValue) -> ApiError {
    ApiError::Transport(format!("{err:?}"))
}

#[async_trait(?Send)]
impl PlacesBackend for FetchBackend {
    async fn find_places(&self, req: &FindPlacesRequest) -> Result<PlaceList, ApiError> {
        self.post("/api/find_places", req).await
    }

    async fn categorize_places(&self, places: &PlaceList) -> Result<CategorizedPlaces, ApiError> {
        self.post("/api/categorize_places", places).await
    }

    async fn place_details(&self, place_id: &str) -> Result<Restaurant, ApiError> {
        self.get("/api/place_details", &[("place_id", place_id)]).await
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ApiError> {
        self.get("/api/geocode", &[("q", query)]).await
    }
}
