//! The application context handed to every view.
//!
//! One [`App`] is built at startup and cloned into each listener; the clones
//! share the store, the search orchestrator and the decision engine.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::Closure;
use wte_core::decision::{AnimationHandle, DecisionEngine, RandomSource};
use wte_core::{AppState, SearchOrchestrator, Store};

use crate::api::FetchBackend;
use crate::dom::{self, Elements};

pub type FrameCallback = Closure<dyn FnMut(f64)>;

/// Home of a callback that re-arms itself. The callback keeps a clone of its
/// slot, so the pair stays alive until [`LoopSlot::release`] empties it.
pub struct LoopSlot<C>(Rc<RefCell<Option<C>>>);

impl<C> Clone for LoopSlot<C> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<C> Default for LoopSlot<C> {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }
}

impl<C> LoopSlot<C> {
    pub fn set(&self, callback: C) {
        let previous = self.0.borrow_mut().replace(callback);
        drop(previous);
    }

    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        self.0.borrow().as_ref().map(f)
    }

    /// Drops the callback and with it the cycle through this slot.
    pub fn release(&self) {
        let taken = self.0.borrow_mut().take();
        drop(taken);
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_none()
    }
}

/// The live decision animation, whichever mode is running.
pub enum Animation {
    /// A `requestAnimationFrame` loop: the pending frame id and the callback
    /// that requests the next one.
    Frame {
        id: Rc<Cell<i32>>,
        callback: LoopSlot<FrameCallback>,
    },
    /// Cancellation flag polled by the flash timer loop.
    Flash(Rc<Cell<bool>>),
}

impl AnimationHandle for Animation {
    fn cancel(&mut self) {
        match self {
            Animation::Frame { id, callback } => {
                let _ = dom::window().cancel_animation_frame(id.get());
                callback.release();
            }
            Animation::Flash(cancelled) => cancelled.set(true),
        }
    }
}

/// `Math.random()` as a [`RandomSource`].
pub struct MathRandom;

impl RandomSource for MathRandom {
    fn next_unit(&mut self) -> f64 {
        js_sys::Math::random()
    }
}

#[derive(Clone)]
pub struct App {
    pub els: Elements,
    pub store: Rc<Store>,
    pub search: Rc<SearchOrchestrator<FetchBackend>>,
    engine: Rc<RefCell<DecisionEngine<Animation>>>,
}

impl App {
    pub fn new(els: Elements) -> Self {
        Self {
            els,
            store: Rc::new(Store::new(AppState::new())),
            search: Rc::new(SearchOrchestrator::new(FetchBackend::default())),
            engine: Rc::new(RefCell::new(DecisionEngine::new())),
        }
    }

    /// Runs `f` against the decision engine. `f` must not call back into
    /// `with_engine`.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut DecisionEngine<Animation>) -> R) -> R {
        f(&mut self.engine.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rearming {
        _slot: LoopSlot<Rearming>,
    }

    #[test]
    fn release_breaks_the_callback_cycle() {
        let slot: LoopSlot<Rearming> = LoopSlot::default();
        slot.set(Rearming { _slot: slot.clone() });
        assert_eq!(Rc::strong_count(&slot.0), 2);
        assert!(!slot.is_empty());

        slot.release();
        assert_eq!(Rc::strong_count(&slot.0), 1);
        assert!(slot.is_empty());
        assert!(slot.with(|_| ()).is_none());
    }

    #[test]
    fn setting_again_drops_the_previous_callback() {
        let first = Rc::new(());
        let slot = LoopSlot::default();
        slot.set(Rc::clone(&first));
        slot.set(Rc::new(()));
        assert_eq!(Rc::strong_count(&first), 1);
    }
}
