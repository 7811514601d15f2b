//! Restaurant details page.

use wasm_bindgen::prelude::*;
use wte_api_types::{Restaurant, RestaurantKey};
use wte_core::Page;

use crate::dom;
use crate::state::App;
use crate::{candidates_view, navigation, overlay};

const PLACEHOLDER_IMAGE: &str = "https://placehold.co/600x400/F5EBE0/424242?text=No+Image";

/// Loads details for `key` and shows the details page.
pub async fn open(app: &App, key: &RestaurantKey) {
    overlay::show_loading(app, "正在為您打開店家大門...");
    match app.search.load_details(&app.store, key).await {
        Ok(_) => {
            overlay::hide_loading(app);
            navigation::navigate_to(app, Page::Details);
        }
        Err(err) => {
            gloo_console::error!(format!("details for {key} failed: {err}"));
            overlay::flash_error(app, &format!("無法載入店家資訊: {err}"));
        }
    }
}

pub fn render(app: &App) {
    let Some(restaurant) = app.store.read(|s| s.current_details.clone()) else {
        return;
    };
    if let Err(err) = render_restaurant(app, &restaurant) {
        gloo_console::error!(err);
    }
}

fn render_restaurant(app: &App, r: &Restaurant) -> Result<(), JsValue> {
    let details = r.details.clone().unwrap_or_default();

    let photo = details
        .photos
        .first()
        .map(String::as_str)
        .unwrap_or(PLACEHOLDER_IMAGE);
    dom::set_style(&app.els.details_header_image, "background-image", &format!("url(\"{photo}\")"));
    dom::set_text(&app.els.details_title, &r.name);
    dom::set_text(&app.els.details_rating, &format!("⭐ {}", r.rating));
    dom::set_text(&app.els.details_price, &"$".repeat(usize::from(r.price_level)));
    dom::set_text(&app.els.details_status, r.hours.as_deref().unwrap_or_default());
    render_add_button(app);

    let hours = &app.els.details_hours_list;
    hours.set_inner_html("");
    if details.opening_hours.weekday_text.is_empty() {
        dom::append_with(hours, "li", "", "暫無提供營業時間")?;
    }
    for line in &details.opening_hours.weekday_text {
        dom::append_with(hours, "li", "", line)?;
    }

    let reviews = &app.els.details_reviews_list;
    reviews.set_inner_html("");
    if details.reviews.is_empty() {
        dom::append_with(reviews, "p", "", "暫無評論")?;
    }
    for review in &details.reviews {
        let card = dom::create_with("div", "review-card", "")?;
        let header = dom::create_with("div", "review-card-header", "")?;
        dom::append_with(&header, "span", "review-author", &review.author_name)?;
        dom::append_with(
            &header,
            "span",
            "review-rating",
            &"⭐".repeat(usize::from(review.rating)),
        )?;
        dom::append_with(
            &header,
            "span",
            "review-time",
            &review.relative_time_description,
        )?;
        card.append_child(&header)?;
        dom::append_with(&card, "p", "review-text", &review.text)?;
        reviews.append_child(&card)?;
    }
    Ok(())
}

pub fn render_add_button(app: &App) {
    let added = app.store.read(|s| {
        s.current_details
            .as_ref()
            .is_some_and(|r| s.candidates.contains(&r.key()))
    });
    let button = &app.els.add_to_wheel_details_btn;
    dom::toggle_class(button, "added", added);
    let label = if added { "已加入" } else { "加入候選" };
    match button.query_selector("span") {
        Ok(Some(span)) => dom::set_text(&span, label),
        _ => dom::set_text(button, label),
    }
}

pub fn on_add(app: &App) {
    if let Some(restaurant) = app.store.read(|s| s.current_details.clone()) {
        candidates_view::toggle(app, &restaurant);
    }
}

pub fn on_call(app: &App) {
    let phone = app.store.read(|s| {
        s.current_details
            .as_ref()
            .and_then(|r| r.details.as_ref())
            .and_then(|d| d.formatted_phone_number.clone())
    });
    if let Some(phone) = phone.filter(|p| !p.is_empty()) {
        let _ = dom::window().location().set_href(&format!("tel:{phone}"));
    }
}

pub fn on_website(app: &App) {
    let site = app.store.read(|s| {
        s.current_details
            .as_ref()
            .and_then(|r| r.details.as_ref())
            .and_then(|d| d.website.clone())
    });
    if let Some(url) = site.filter(|u| !u.is_empty() && u != "#") {
        let _ = dom::window().open_with_url_and_target(&url, "_blank");
    }
}
