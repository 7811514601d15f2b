//! Filter panel: open-now toggle plus price and rating button groups.

use wte_core::{Change, Filters};

use crate::dom;
use crate::state::App;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterField {
    PriceLevel,
    Rating,
}

impl FilterField {
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "priceLevel" => Some(FilterField::PriceLevel),
            "rating" => Some(FilterField::Rating),
            _ => None,
        }
    }
}

/// Applies a button press; `0` clears the constraint.
pub fn apply_button(filters: &mut Filters, field: FilterField, value: f32) {
    match field {
        FilterField::PriceLevel => filters.price_level = value.clamp(0.0, 4.0) as u8,
        FilterField::Rating => filters.min_rating = value.max(0.0),
    }
}

pub fn on_button(app: &App, field: FilterField, value: f32) {
    app.store.update(Change::Filters, |s| apply_button(&mut s.filters, field, value));
}

pub fn on_open_now(app: &App, checked: bool) {
    app.store.update(Change::Filters, |s| s.filters.open_now = checked);
}

pub fn render(app: &App) {
    let filters = app.store.read(|s| s.filters);
    app.els.open_now_toggle.set_checked(filters.open_now);

    for btn in dom::query_all_within(&app.els.price_filter_buttons, "button") {
        let value = button_value(&btn);
        dom::toggle_class(&btn, "active", value == f32::from(filters.price_level));
    }
    for btn in dom::query_all_within(&app.els.rating_filter_buttons, "button") {
        let value = button_value(&btn);
        dom::toggle_class(&btn, "active", value == filters.min_rating);
    }
}

pub fn button_value(btn: &web_sys::Element) -> f32 {
    btn.get_attribute("data-value")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.0)
}

pub fn open(app: &App) {
    render(app);
    dom::add_class(&app.els.filter_panel, "visible");
}

pub fn close(app: &App) {
    dom::remove_class(&app.els.filter_panel, "visible");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_set_and_clear_constraints() {
        let mut filters = Filters::default();
        apply_button(&mut filters, FilterField::PriceLevel, 2.0);
        apply_button(&mut filters, FilterField::Rating, 4.5);
        assert_eq!(filters.price_level, 2);
        assert_eq!(filters.min_rating, 4.5);

        apply_button(&mut filters, FilterField::PriceLevel, 0.0);
        assert_eq!(filters.price_level, 0);
        apply_button(&mut filters, FilterField::PriceLevel, 9.0);
        assert_eq!(filters.price_level, 4);
    }

    #[test]
    fn filter_attributes_map_to_fields() {
        assert_eq!(FilterField::from_attr("priceLevel"), Some(FilterField::PriceLevel));
        assert_eq!(FilterField::from_attr("rating"), Some(FilterField::Rating));
        assert_eq!(FilterField::from_attr("openNow"), None);
    }
}
