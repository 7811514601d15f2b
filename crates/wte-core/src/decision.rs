//! Random choice between shortlisted candidates, revealed by a wheel spin or
//! by flashing markers on the map.
//!
//! The winner is drawn once in [`DecisionEngine::begin`]. Animation plans are
//! derived from that index and never feed back into it.

use rand::{Rng, RngCore};
use tracing::debug;

use crate::candidates::Candidate;

pub const WHEEL_SPIN_DURATION_MS: f64 = 5_000.0;
pub const WHEEL_FULL_TURNS: f64 = 5.0;
/// Jitter is drawn from `[-JITTER_FRACTION, JITTER_FRACTION]` of a slice.
pub const JITTER_FRACTION: f64 = 0.4;
pub const BASE_FLASH_DELAY_MS: f64 = 60.0;
pub const REVEAL_DELAY_MS: u32 = 500;
pub const TYPEWRITER_STEP_MS: u32 = 100;

/// Uniform samples in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

/// Adapts any `rand` generator.
pub struct RngSource<R>(pub R);

impl<R: RngCore> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen_range(0.0..1.0)
    }
}

/// A running animation that can be stopped (frame request, timer, ...).
pub trait AnimationHandle {
    fn cancel(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMode {
    Wheel,
    Map,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Revealing,
}

/// `floor(r * n)`, clamped so that `r` values at or above 1 stay in range.
pub fn pick_winner(n: usize, rng: &mut dyn RandomSource) -> usize {
    let r = rng.next_unit();
    ((r * n as f64).floor().max(0.0) as usize).min(n.saturating_sub(1))
}

pub fn ease_out_quint(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(5)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSpin {
    pub from: f64,
    pub to: f64,
    pub duration_ms: f64,
}

impl WheelSpin {
    /// Plans a spin that stops with slice `winner` under the pointer at 0°.
    /// Slice `i` covers `[i * slice, (i + 1) * slice)` before rotation.
    pub fn plan(from: f64, n: usize, winner: usize, jitter_unit: f64) -> Self {
        let slice = 360.0 / n as f64;
        let jitter = (jitter_unit * 2.0 * JITTER_FRACTION - JITTER_FRACTION) * slice;
        let to = 360.0 * WHEEL_FULL_TURNS + (360.0 - winner as f64 * slice) - slice / 2.0 + jitter;
        Self {
            from,
            to,
            duration_ms: WHEEL_SPIN_DURATION_MS,
        }
    }

    pub fn rotation_at(&self, elapsed_ms: f64) -> f64 {
        let t = elapsed_ms / self.duration_ms;
        self.from + (self.to - self.from) * ease_out_quint(t)
    }

    pub fn is_complete(&self, elapsed_ms: f64) -> bool {
        elapsed_ms >= self.duration_ms
    }

    /// Rotation carried into the next spin.
    pub fn resting_rotation(&self) -> f64 {
        self.to.rem_euclid(360.0)
    }
}

/// Index of the slice under the pointer for a wheel rotated by `rotation`.
pub fn slice_at_pointer(rotation: f64, n: usize) -> usize {
    let slice = 360.0 / n as f64;
    let angle = (-rotation).rem_euclid(360.0);
    ((angle / slice).floor() as usize).min(n - 1)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashStep {
    pub marker: usize,
    /// Wait before lighting the next marker.
    pub delay_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlashSchedule {
    pub steps: Vec<FlashStep>,
}

impl FlashSchedule {
    /// Round-robin over `n` markers for `2n + winner` hops. The first flash is
    /// marker 0 and the last one is the winner.
    pub fn plan(n: usize, winner: usize) -> Self {
        let hop_count = 2 * n + winner;
        let mut delay = BASE_FLASH_DELAY_MS;
        let steps = (0..=hop_count)
            .map(|step| {
                let progress = step as f64 / hop_count as f64;
                if progress > 0.5 {
                    delay *= 1.2;
                }
                if progress > 0.8 {
                    delay *= 1.3;
                }
                FlashStep {
                    marker: step % n,
                    delay_ms: delay,
                }
            })
            .collect();
        Self { steps }
    }

    pub fn last_marker(&self) -> Option<usize> {
        self.steps.last().map(|s| s.marker)
    }

    pub fn total_ms(&self) -> f64 {
        self.steps.iter().map(|s| s.delay_ms).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionPlan {
    Wheel(WheelSpin),
    Map(FlashSchedule),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub candidates: Vec<Candidate>,
    pub winner_index: usize,
    pub plan: DecisionPlan,
}

impl Decision {
    pub fn winner(&self) -> &Candidate {
        &self.candidates[self.winner_index]
    }
}

/// Owns the phase, the wheel's resting rotation and the single live
/// animation handle.
pub struct DecisionEngine<H: AnimationHandle> {
    phase: Phase,
    rotation: f64,
    current: Option<Decision>,
    last_winner: Option<Candidate>,
    animation: Option<H>,
}

impl<H: AnimationHandle> Default for DecisionEngine<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: AnimationHandle> DecisionEngine<H> {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            rotation: 0.0,
            current: None,
            last_winner: None,
            animation: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_deciding(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn current(&self) -> Option<&Decision> {
        self.current.as_ref()
    }

    pub fn last_winner(&self) -> Option<&Candidate> {
        self.last_winner.as_ref()
    }

    /// Draws the winner and moves to `Running`. `None` when fewer than two
    /// candidates are given or a decision is already under way.
    pub fn begin(
        &mut self,
        candidates: &[Candidate],
        mode: DecisionMode,
        rng: &mut dyn RandomSource,
    ) -> Option<Decision> {
        if candidates.len() < 2 || self.phase != Phase::Idle {
            debug!(n = candidates.len(), phase = ?self.phase, "decision request ignored");
            return None;
        }

        let n = candidates.len();
        let winner_index = pick_winner(n, rng);
        let plan = match mode {
            DecisionMode::Wheel => {
                DecisionPlan::Wheel(WheelSpin::plan(self.rotation, n, winner_index, rng.next_unit()))
            }
            DecisionMode::Map => DecisionPlan::Map(FlashSchedule::plan(n, winner_index)),
        };

        let decision = Decision {
            candidates: candidates.to_vec(),
            winner_index,
            plan,
        };
        debug!(n, winner_index, ?mode, "decision started");
        self.phase = Phase::Running;
        self.current = Some(decision.clone());
        Some(decision)
    }

    /// Stores the animation driving the current decision, cancelling any
    /// previous one first.
    pub fn install_animation(&mut self, handle: H) {
        if let Some(mut old) = self.animation.take() {
            old.cancel();
        }
        self.animation = Some(handle);
    }

    /// `Running -> Revealing`. Returns the winner to reveal.
    pub fn finish_animation(&mut self) -> Option<Candidate> {
        if self.phase != Phase::Running {
            return None;
        }
        self.animation = None;
        let decision = self.current.as_ref()?;
        if let DecisionPlan::Wheel(spin) = &decision.plan {
            self.rotation = spin.resting_rotation();
        }
        let winner = decision.winner().clone();
        self.last_winner = Some(winner.clone());
        self.phase = Phase::Revealing;
        Some(winner)
    }

    /// `Revealing -> Idle`. Returns the winner whose highlight must be cleared.
    pub fn dismiss(&mut self) -> Option<Candidate> {
        if self.phase != Phase::Revealing {
            return None;
        }
        self.phase = Phase::Idle;
        self.current = None;
        self.last_winner.clone()
    }

    /// Stops whatever is running and returns to `Idle`.
    pub fn abort(&mut self) {
        if let Some(mut handle) = self.animation.take() {
            handle.cancel();
        }
        self.current = None;
        self.phase = Phase::Idle;
    }
}

/// Successive prefixes of `text`, one per character.
pub fn typewriter_frames(text: &str) -> Vec<String> {
    text.char_indices()
        .map(|(i, c)| text[..i + c.len_utf8()].to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::cell::Cell;
    use std::rc::Rc;
    use wte_api_types::RestaurantKey;

    struct FixedRandom(Vec<f64>, usize);

    impl FixedRandom {
        fn new(values: &[f64]) -> Self {
            Self(values.to_vec(), 0)
        }
    }

    impl RandomSource for FixedRandom {
        fn next_unit(&mut self) -> f64 {
            let v = self.0[self.1 % self.0.len()];
            self.1 += 1;
            v
        }
    }

    #[derive(Clone, Default)]
    struct CountingHandle(Rc<Cell<u32>>);

    impl AnimationHandle for CountingHandle {
        fn cancel(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn candidates(names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .map(|n| Candidate {
                key: RestaurantKey(format!("id-{n}")),
                name: (*n).to_owned(),
            })
            .collect()
    }

    #[test]
    fn forced_random_picks_second_of_two() {
        let mut engine = DecisionEngine::<CountingHandle>::new();
        let mut rng = FixedRandom::new(&[0.99, 0.5]);
        let decision = engine
            .begin(&candidates(&["A", "B"]), DecisionMode::Wheel, &mut rng)
            .unwrap();
        assert_eq!(decision.winner_index, 1);
        assert_eq!(engine.finish_animation().unwrap().name, "B");
        assert_eq!(engine.phase(), Phase::Revealing);
        assert_eq!(engine.dismiss().unwrap().name, "B");
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn winner_index_is_uniform() {
        const N: usize = 5;
        const TRIALS: usize = 5_000;
        let mut rng = RngSource(StdRng::seed_from_u64(0x5eed));
        let mut counts = [0usize; N];
        for _ in 0..TRIALS {
            counts[pick_winner(N, &mut rng)] += 1;
        }
        let expected = TRIALS as f64 / N as f64;
        let chi2: f64 = counts
            .iter()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum();
        // df = 4, p = 0.001
        assert!(chi2 < 18.47, "chi2 = {chi2}, counts = {counts:?}");
    }

    #[test]
    fn wheel_lands_on_winner_for_any_jitter() {
        for n in 2..=8 {
            for winner in 0..n {
                for jitter in [0.0, 0.01, 0.25, 0.5, 0.75, 0.999] {
                    let from = (winner as f64 * 37.0).rem_euclid(360.0);
                    let spin = WheelSpin::plan(from, n, winner, jitter);
                    assert_eq!(slice_at_pointer(spin.to, n), winner, "n={n} jitter={jitter}");
                    assert_eq!(slice_at_pointer(spin.resting_rotation(), n), winner);
                }
            }
        }
    }

    #[test]
    fn wheel_rotation_eases_to_target() {
        let spin = WheelSpin::plan(10.0, 4, 2, 0.5);
        assert_eq!(spin.rotation_at(0.0), 10.0);
        assert!((spin.rotation_at(WHEEL_SPIN_DURATION_MS) - spin.to).abs() < 1e-9);
        assert!((spin.rotation_at(WHEEL_SPIN_DURATION_MS * 3.0) - spin.to).abs() < 1e-9);
        let half = spin.rotation_at(WHEEL_SPIN_DURATION_MS / 2.0);
        assert!(half > spin.from + 0.9 * (spin.to - spin.from));
        assert!(spin.to > 1_800.0);
    }

    #[test]
    fn flashes_end_on_winner_and_slow_down() {
        for n in 2..=8 {
            for winner in 0..n {
                let schedule = FlashSchedule::plan(n, winner);
                assert_eq!(schedule.steps.len(), 2 * n + winner + 1);
                assert_eq!(schedule.steps[0].marker, 0);
                assert_eq!(schedule.last_marker(), Some(winner));
                assert!(
                    schedule
                        .steps
                        .windows(2)
                        .all(|w| w[1].delay_ms >= w[0].delay_ms)
                );
            }
        }
        let schedule = FlashSchedule::plan(4, 0);
        assert_eq!(schedule.steps[0].delay_ms, BASE_FLASH_DELAY_MS);
        assert!(schedule.steps.last().unwrap().delay_ms > 3.0 * BASE_FLASH_DELAY_MS);
    }

    #[test]
    fn begin_is_guarded() {
        let mut engine = DecisionEngine::<CountingHandle>::new();
        let mut rng = FixedRandom::new(&[0.1]);
        assert!(engine.begin(&candidates(&["A"]), DecisionMode::Map, &mut rng).is_none());
        assert_eq!(engine.phase(), Phase::Idle);

        let pair = candidates(&["A", "B"]);
        assert!(engine.begin(&pair, DecisionMode::Map, &mut rng).is_some());
        assert!(engine.begin(&pair, DecisionMode::Map, &mut rng).is_none());
        engine.finish_animation();
        assert!(engine.begin(&pair, DecisionMode::Map, &mut rng).is_none());
        engine.dismiss();
        assert!(engine.begin(&pair, DecisionMode::Map, &mut rng).is_some());
    }

    #[test]
    fn installing_an_animation_cancels_the_previous_one() {
        let first = CountingHandle::default();
        let second = CountingHandle::default();
        let mut engine = DecisionEngine::new();
        engine.install_animation(first.clone());
        engine.install_animation(second.clone());
        assert_eq!(first.0.get(), 1);
        assert_eq!(second.0.get(), 0);
        engine.abort();
        assert_eq!(second.0.get(), 1);
        assert!(!engine.is_deciding());
    }

    #[test]
    fn finished_spin_keeps_rotation_modulo_360() {
        let mut engine = DecisionEngine::<CountingHandle>::new();
        let mut rng = FixedRandom::new(&[0.6, 0.3]);
        let decision = engine
            .begin(&candidates(&["A", "B", "C"]), DecisionMode::Wheel, &mut rng)
            .unwrap();
        let DecisionPlan::Wheel(spin) = decision.plan else {
            panic!("wheel mode must plan a spin");
        };
        engine.finish_animation();
        assert!((0.0..360.0).contains(&engine.rotation()));
        assert!((engine.rotation() - spin.to.rem_euclid(360.0)).abs() < 1e-9);
    }

    #[test]
    fn typewriter_counts_characters_not_bytes() {
        assert_eq!(typewriter_frames("牛肉麵"), vec!["牛", "牛肉", "牛肉麵"]);
        assert!(typewriter_frames("").is_empty());
    }
}
