use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::meter::{BAR_COUNT, LevelSnapshot};

/// Burst shapes scrolled across the tape, one value per pattern step.
pub const IDLE_PATTERNS: [&[f32]; 5] = [
    &[0.4, 0.7, 0.9, 0.7, 0.4],
    &[0.6, 0.9, 0.6, 0.3, 0.6, 0.9, 0.6],
    &[0.3, 0.5, 0.7, 0.9, 0.8, 0.6, 0.4, 0.2],
    &[0.8, 0.4, 1.0, 0.3, 0.9, 0.5, 1.0, 0.4],
    &[0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0],
];

const SHIFT_EVERY: u64 = 2;
const STEP_EVERY: u64 = 6;
const JITTER: f32 = 0.05;
const TAIL_NOISE: f32 = 0.02;
const TRANSMIT_LEVEL: f32 = 0.4;

/// Synthetic radio chatter for hosts without audio capture.
///
/// Bars scroll left one slot every other frame. Between bursts the tape is
/// silent; each burst replays one of [`IDLE_PATTERNS`] with slight jitter.
#[derive(Debug, Clone)]
pub struct IdlePattern<R = StdRng> {
    bars: Vec<f32>,
    level: f32,
    transmitting: bool,
    until_next: f32,
    pattern: &'static [f32],
    pattern_index: usize,
    frame: u64,
    rng: R,
}

impl IdlePattern<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for IdlePattern<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> IdlePattern<R> {
    pub fn with_rng(mut rng: R) -> Self {
        let until_next = rng.gen_range(0.5..=1.5);
        Self {
            bars: vec![0.0; BAR_COUNT],
            level: 0.0,
            transmitting: false,
            until_next,
            pattern: &[],
            pattern_index: 0,
            frame: 0,
            rng,
        }
    }

    pub fn is_transmitting(&self) -> bool {
        self.transmitting
    }

    pub fn bars(&self) -> &[f32] {
        &self.bars
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            level: self.level,
            bars: self.bars.clone(),
        }
    }

    /// Advance one frame of `dt` seconds (nominally 1/60).
    pub fn step(&mut self, dt: f32) {
        self.frame += 1;
        self.until_next -= dt.max(0.0);

        if self.frame % SHIFT_EVERY == 0 {
            self.bars.rotate_left(1);
            let fresh = self.next_value();
            if let Some(last) = self.bars.last_mut() {
                *last = fresh;
            }
        }

        self.level = if self.transmitting { TRANSMIT_LEVEL } else { 0.0 };
    }

    fn next_value(&mut self) -> f32 {
        if !self.transmitting {
            if self.until_next <= 0.0 {
                self.transmitting = true;
                self.pattern = IDLE_PATTERNS
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(&[0.5]);
                self.pattern_index = 0;
                tracing::trace!(len = self.pattern.len(), "idle burst started");
            }
            return 0.0;
        }

        match self.pattern.get(self.pattern_index) {
            Some(&v) => {
                let jittered = (v + self.rng.gen_range(-JITTER..=JITTER)).clamp(0.0, 1.0);
                if self.frame % STEP_EVERY == 0 {
                    self.pattern_index += 1;
                }
                jittered
            }
            None => {
                self.transmitting = false;
                self.until_next = self.rng.gen_range(1.5..=4.0);
                self.rng.gen_range(0.0..=TAIL_NOISE)
            }
        }
    }
}
