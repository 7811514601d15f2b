//! Loading panel and result overlay.

use std::cell::RefCell;

use gloo_timers::callback::Timeout;
use gloo_timers::future::TimeoutFuture;
use wte_core::decision::{TYPEWRITER_STEP_MS, typewriter_frames};

use crate::dom;
use crate::state::App;

pub const ERROR_HIDE_MS: u32 = 3_000;

thread_local! {
    static HIDE_TIMER: RefCell<Option<Timeout>> = const { RefCell::new(None) };
    static REVEAL_TOKEN: RefCell<u64> = const { RefCell::new(0) };
}

// Dropping a pending `Timeout` cancels it.
fn cancel_hide() {
    HIDE_TIMER.with(|t| drop(t.borrow_mut().take()));
}

pub fn show_loading(app: &App, text: &str) {
    cancel_hide();
    dom::set_text(&app.els.loading_text, text);
    dom::add_class(&app.els.loading_overlay, "visible");
}

pub fn hide_loading(app: &App) {
    cancel_hide();
    dom::remove_class(&app.els.loading_overlay, "visible");
}

/// Shows `text` in the loading panel and hides it after [`ERROR_HIDE_MS`].
pub fn flash_error(app: &App, text: &str) {
    show_loading(app, text);
    let overlay = app.els.loading_overlay.clone();
    let timer = Timeout::new(ERROR_HIDE_MS, move || dom::remove_class(&overlay, "visible"));
    HIDE_TIMER.with(|t| *t.borrow_mut() = Some(timer));
}

/// Opens the result overlay and types `winner` out one character at a time.
/// A newer reveal or [`hide_result`] stops an older one mid-way.
pub async fn show_result(app: &App, winner: &str) {
    let token = REVEAL_TOKEN.with(|t| {
        let mut t = t.borrow_mut();
        *t += 1;
        *t
    });
    dom::set_text(&app.els.result_text, "");
    dom::add_class(&app.els.result_overlay, "visible");

    for frame in typewriter_frames(winner) {
        if REVEAL_TOKEN.with(|t| *t.borrow()) != token {
            return;
        }
        dom::set_text(&app.els.result_text, &frame);
        TimeoutFuture::new(TYPEWRITER_STEP_MS).await;
    }
}

pub fn hide_result(app: &App) {
    REVEAL_TOKEN.with(|t| *t.borrow_mut() += 1);
    dom::remove_class(&app.els.result_overlay, "visible");
}
