//! The decision wheel: slice rendering and the spin animation.
//!
//! Slice `i` is an east-pointing wedge rotated so it covers
//! `[i * s, (i + 1) * s)` clockwise from the pointer at the top, matching
//! [`wte_core::decision::slice_at_pointer`].

use std::cell::Cell;
use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;
use wte_core::Candidate;
use wte_core::decision::{DecisionMode, DecisionPlan, Phase, REVEAL_DELAY_MS, WheelSpin};

use crate::dom;
use crate::overlay;
use crate::state::{Animation, App, FrameCallback, LoopSlot, MathRandom};

const SLICE_COLORS: [&str; 2] = ["#FFF1E6", "#F0EFEB"];

/// Rotation of slice `index`'s wedge element, in degrees.
pub fn slice_rotation(index: usize, n: usize) -> f64 {
    let slice = 360.0 / n as f64;
    (index as f64 + 0.5) * slice - 90.0
}

/// `clip-path` cutting an east-pointing wedge of `360 / n` degrees out of
/// the square slice element.
pub fn slice_clip_path(n: usize) -> String {
    if n <= 2 {
        return "polygon(50% 0%, 100% 0%, 100% 100%, 50% 100%)".to_owned();
    }
    let half = (180.0 / n as f64).to_radians();
    let spread = half.tan() * 50.0;
    format!(
        "polygon(50% 50%, 100% {:.4}%, 100% {:.4}%)",
        50.0 - spread,
        50.0 + spread
    )
}

pub fn render(app: &App) -> Result<(), JsValue> {
    let candidates = app.store.read(|s| s.candidates.to_vec());
    let (deciding, rotation) = app.with_engine(|e| (e.is_deciding(), e.rotation()));
    let enough = candidates.len() >= 2;

    dom::set_display(&app.els.wheel_placeholder, if enough { "none" } else { "block" });
    if let Some(frame) = app
        .els
        .wheel_container
        .parent_element()
        .and_then(|p| p.dyn_into::<HtmlElement>().ok())
    {
        dom::set_display(&frame, if enough { "flex" } else { "none" });
    }
    dom::set_display(&app.els.spin_btn, if enough { "inline-flex" } else { "none" });
    app.els.spin_btn.set_disabled(deciding);

    // Never redraw under a running spin.
    if !enough || deciding {
        return Ok(());
    }

    let container = &app.els.wheel_container;
    container.set_inner_html("");
    let n = candidates.len();
    dom::set_style(container, "--slice-angle", &format!("{}deg", 360.0 / n as f64));
    set_rotation(container, rotation);

    let clip = slice_clip_path(n);
    for (index, candidate) in candidates.iter().enumerate() {
        let slice = dom::create_html("div")?;
        slice.set_class_name("wheel-slice");
        slice.set_attribute("data-key", &candidate.key.0)?;
        dom::set_style(&slice, "transform", &format!("rotate({}deg)", slice_rotation(index, n)));
        dom::set_style(&slice, "clip-path", &clip);

        let content = dom::create_html("div")?;
        content.set_class_name("wheel-slice-content");
        dom::set_style(&content, "background-color", SLICE_COLORS[index % SLICE_COLORS.len()]);
        dom::append_with(&content, "span", "wheel-slice-text", &candidate.name)?;

        slice.append_child(&content)?;
        container.append_child(&slice)?;
    }
    Ok(())
}

fn set_rotation(el: &HtmlElement, degrees: f64) {
    dom::set_style(el, "transform", &format!("rotate({degrees}deg)"));
}

/// Starts a spin over the current candidates. No-op while a decision is
/// under way or with fewer than two candidates.
pub fn spin(app: &App) {
    let candidates = app.store.read(|s| s.candidates.to_vec());
    let Some(decision) =
        app.with_engine(|e| e.begin(&candidates, DecisionMode::Wheel, &mut MathRandom))
    else {
        return;
    };
    let DecisionPlan::Wheel(spin) = decision.plan else {
        app.with_engine(|e| e.abort());
        return;
    };

    app.els.spin_btn.set_disabled(true);
    run_frames(app, spin, decision.winner().clone());
}

fn run_frames(app: &App, spin: WheelSpin, winner: Candidate) {
    let callback: LoopSlot<FrameCallback> = LoopSlot::default();
    let pending = Rc::new(Cell::new(0));
    let started_at = Cell::new(None::<f64>);

    let frame = {
        let (app, callback, pending) = (app.clone(), callback.clone(), pending.clone());
        Closure::wrap(Box::new(move |now: f64| {
            let start = started_at.get().unwrap_or(now);
            started_at.set(Some(start));
            let elapsed = now - start;
            set_rotation(&app.els.wheel_container, spin.rotation_at(elapsed.min(spin.duration_ms)));

            if spin.is_complete(elapsed) {
                callback.release();
                land(&app, &winner);
            } else if !request_frame(&callback, &pending) {
                app.with_engine(|e| e.abort());
            }
        }) as Box<dyn FnMut(f64)>)
    };
    callback.set(frame);

    let handle = Animation::Frame {
        id: pending.clone(),
        callback: callback.clone(),
    };
    app.with_engine(|e| e.install_animation(handle));
    if !request_frame(&callback, &pending) {
        app.with_engine(|e| e.abort());
    }
}

/// Asks for the next frame and records its id. False when nothing was
/// scheduled.
fn request_frame(callback: &LoopSlot<FrameCallback>, pending: &Cell<i32>) -> bool {
    let requested =
        callback.with(|cb| dom::window().request_animation_frame(cb.as_ref().unchecked_ref()));
    match requested {
        Some(Ok(id)) => {
            pending.set(id);
            true
        }
        Some(Err(err)) => {
            gloo_console::error!(err);
            false
        }
        None => false,
    }
}

fn land(app: &App, expected: &Candidate) {
    let Some(winner) = app.with_engine(|e| e.finish_animation()) else {
        return;
    };
    debug_assert_eq!(&winner, expected);

    let selector = format!(".wheel-slice[data-key=\"{}\"]", css_escape(&winner.key.0));
    if let Ok(Some(slice)) = app.els.wheel_container.query_selector(&selector) {
        dom::add_class(&slice, "winner-glow");
    }

    let app = app.clone();
    wasm_bindgen_futures::spawn_local(async move {
        TimeoutFuture::new(REVEAL_DELAY_MS).await;
        if app.with_engine(|e| e.phase()) == Phase::Revealing {
            overlay::show_result(&app, &winner.name).await;
        }
    });
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wte_core::decision::slice_at_pointer;

    #[test]
    fn slice_centres_sit_under_the_pointer_at_matching_rotation() {
        for n in 2..=8 {
            let slice = 360.0 / n as f64;
            for i in 0..n {
                // Wedge `i` points east after `slice_rotation`; its centre is
                // therefore `slice_rotation + 90` clockwise from the top.
                let centre_from_top = slice_rotation(i, n) + 90.0;
                assert!((centre_from_top - (i as f64 + 0.5) * slice).abs() < 1e-9);
                // Rotating the wheel back by that angle brings it to the pointer.
                assert_eq!(slice_at_pointer(-centre_from_top, n), i);
            }
        }
    }

    #[test]
    fn clip_path_wedge_matches_slice_angle() {
        assert_eq!(slice_clip_path(4), "polygon(50% 50%, 100% 0.0000%, 100% 100.0000%)");
        assert!(slice_clip_path(2).starts_with("polygon(50% 0%"));
    }
}
