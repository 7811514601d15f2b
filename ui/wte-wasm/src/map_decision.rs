//! Random decision on the map: candidate markers flash round-robin, slowing
//! down until the last flash lands on the winner.

use std::cell::Cell;
use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use wte_api_types::RestaurantKey;
use wte_core::decision::{Decision, DecisionMode, DecisionPlan, FlashSchedule, Phase, REVEAL_DELAY_MS};

use crate::state::{Animation, App, MathRandom};
use crate::{candidates_view, map_view, overlay};

const FLASH_CLASS: &str = "marker-flash";
const WINNER_CLASS: &str = "marker-winner";

pub fn decide(app: &App) {
    let candidates: Vec<_> = app
        .store
        .read(|s| s.candidates.to_vec())
        .into_iter()
        .filter(|c| map_view::has_marker(&c.key))
        .collect();

    let Some(decision) =
        app.with_engine(|e| e.begin(&candidates, DecisionMode::Map, &mut MathRandom))
    else {
        if candidates.len() < 2 {
            overlay::flash_error(app, "目前地圖上的候選店家不足兩家");
        }
        return;
    };
    let DecisionPlan::Map(schedule) = decision.plan.clone() else {
        app.with_engine(|e| e.abort());
        return;
    };

    candidates_view::hide_list(app);
    let keys: Vec<RestaurantKey> = decision.candidates.iter().map(|c| c.key.clone()).collect();
    map_view::show_only(&keys);

    let cancelled = Rc::new(Cell::new(false));
    app.with_engine(|e| e.install_animation(Animation::Flash(cancelled.clone())));

    let app = app.clone();
    wasm_bindgen_futures::spawn_local(async move {
        run(&app, decision, schedule, cancelled).await;
    });
}

async fn run(app: &App, decision: Decision, schedule: FlashSchedule, cancelled: Rc<Cell<bool>>) {
    let keys: Vec<&RestaurantKey> = decision.candidates.iter().map(|c| &c.key).collect();
    let mut lit: Option<usize> = None;

    for step in &schedule.steps {
        if let Some(prev) = lit.take() {
            map_view::set_marker_class(keys[prev], FLASH_CLASS, false);
        }
        if cancelled.get() {
            return;
        }
        map_view::set_marker_class(keys[step.marker], FLASH_CLASS, true);
        lit = Some(step.marker);
        TimeoutFuture::new(step.delay_ms.round() as u32).await;
    }
    if let Some(prev) = lit {
        map_view::set_marker_class(keys[prev], FLASH_CLASS, false);
    }
    if cancelled.get() {
        return;
    }

    let Some(winner) = app.with_engine(|e| e.finish_animation()) else {
        return;
    };
    map_view::set_marker_class(&winner.key, WINNER_CLASS, true);
    map_view::open_popup(&winner.key);

    TimeoutFuture::new(REVEAL_DELAY_MS).await;
    if app.with_engine(|e| e.phase()) == Phase::Revealing {
        overlay::show_result(app, &winner.name).await;
    }
}
