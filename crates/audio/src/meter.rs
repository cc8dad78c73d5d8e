use std::f32::consts::TAU;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// Samples considered per buffer; longer buffers are truncated.
pub const WINDOW_SIZE: usize = 1024;
pub const BAR_COUNT: usize = 64;

const BAR_SMOOTHING: f32 = 0.65;
const LEVEL_SMOOTHING: f32 = 0.8;
const PEAK_FLOOR: f32 = 1e-4;

/// One published meter reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSnapshot {
    /// Overall amplitude in `[0, 1]`.
    pub level: f32,
    /// Per-bar amplitude in `[0, 1]`.
    pub bars: Vec<f32>,
}

impl LevelSnapshot {
    pub fn silent(bar_count: usize) -> Self {
        Self {
            level: 0.0,
            bars: vec![0.0; bar_count],
        }
    }
}

/// Time-domain level meter with fast attack and geometric decay.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    window: Vec<f32>,
    scratch: Vec<f32>,
    bars: Vec<f32>,
    level: f32,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(BAR_COUNT)
    }
}

impl LevelMeter {
    pub fn new(bar_count: usize) -> Self {
        Self {
            window: hann(WINDOW_SIZE),
            scratch: Vec::with_capacity(WINDOW_SIZE),
            bars: vec![0.0; bar_count.max(1)],
            level: 0.0,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn bars(&self) -> &[f32] {
        &self.bars
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            level: self.level,
            bars: self.bars.clone(),
        }
    }

    /// Fold one buffer into the meter. Empty buffers are ignored.
    pub fn process(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let n = samples.len().min(WINDOW_SIZE);
        self.scratch.clear();
        self.scratch.extend(
            samples[..n]
                .iter()
                .zip(&self.window)
                .map(|(s, w)| finite_or_zero(s * w).abs()),
        );

        let mean = self.scratch.iter().sum::<f32>() / n as f32;
        let raw_level = (mean * 2.0).min(1.0);

        let bar_count = self.bars.len();
        let bin = (n / bar_count).max(1);
        let peak = self.scratch.iter().copied().fold(0.0_f32, f32::max);
        for (i, bar) in self.bars.iter_mut().enumerate() {
            let start = i * bin;
            let end = (start + bin).min(n);
            let mut fresh = if start < end {
                self.scratch[start..end].iter().copied().fold(0.0_f32, f32::max)
            } else {
                0.0
            };
            if peak > PEAK_FLOOR {
                fresh = (fresh / peak).min(1.0);
            }
            *bar = fresh.max(*bar * BAR_SMOOTHING + fresh * (1.0 - BAR_SMOOTHING));
        }

        self.level = raw_level.max(self.level * LEVEL_SMOOTHING + raw_level * (1.0 - LEVEL_SMOOTHING));
        tracing::trace!(level = self.level, raw_level, "meter processed buffer");
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

fn hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (1.0 - (TAU * i as f32 / len as f32).cos()))
        .collect()
}

/// Replace-latest handoff between a capture context and the render loop.
#[derive(Debug, Clone, Default)]
pub struct LevelTap {
    latest: Arc<Mutex<Option<LevelSnapshot>>>,
}

impl LevelTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the cell. An unread previous snapshot is dropped.
    pub fn publish(&self, snapshot: LevelSnapshot) {
        *self.latest.lock() = Some(snapshot);
    }

    /// Newest snapshot, or `None` if nothing was published or the writer
    /// holds the cell at this instant.
    pub fn latest(&self) -> Option<LevelSnapshot> {
        self.latest.try_lock().and_then(|guard| guard.clone())
    }

    pub fn clear(&self) {
        *self.latest.lock() = None;
    }
}
