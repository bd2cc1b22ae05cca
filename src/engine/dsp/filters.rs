use std::f32::consts::TAU;

use crate::engine::constants::CUTOFF_MIN_HZ;

/// Clamp a cutoff into `[CUTOFF_MIN_HZ, 0.45 * fs]`.
pub fn clamp_cutoff_hz(cutoff_hz: f32, sample_rate: f32) -> f32 {
    let max_hz = (sample_rate * 0.45).max(CUTOFF_MIN_HZ);
    if cutoff_hz.is_finite() {
        cutoff_hz.clamp(CUTOFF_MIN_HZ, max_hz)
    } else {
        max_hz
    }
}

/// One-pole smoothing coefficient `1 - exp(-2 pi fc / fs)`.
pub fn one_pole_coeff(cutoff_hz: f32, sample_rate: f32) -> f32 {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return 1.0;
    }
    let fc = clamp_cutoff_hz(cutoff_hz, sample_rate);
    (1.0 - (-TAU * fc / sample_rate).exp()).clamp(0.0, 1.0)
}

/// `y += a * (x - y)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePoleLowPass {
    coeff: f32,
    state: f32,
}

impl OnePoleLowPass {
    pub fn with_cutoff(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self {
            coeff: one_pole_coeff(cutoff_hz, sample_rate),
            state: 0.0,
        }
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32, sample_rate: f32) {
        self.coeff = one_pole_coeff(cutoff_hz, sample_rate);
    }

    /// Set the raw coefficient, clamped to `[0, 1]`.
    pub fn set_coeff(&mut self, coeff: f32) {
        self.coeff = if coeff.is_finite() { coeff.clamp(0.0, 1.0) } else { 0.0 };
    }

    pub fn coeff(&self) -> f32 {
        self.coeff
    }

    /// Current output without feeding a new sample.
    pub fn value(&self) -> f32 {
        self.state
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.state += self.coeff * (x - self.state);
        self.state
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

/// DC blocker `y = x - x1 + r * y1`.
#[derive(Debug, Clone, Copy)]
pub struct DcBlocker {
    r: f32,
    x1: f32,
    y1: f32,
}

impl DcBlocker {
    pub fn new(r: f32) -> Self {
        Self {
            r: r.clamp(0.0, 0.9999),
            x1: 0.0,
            y1: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.r * self.y1;
        self.x1 = x;
        self.y1 = y;
        y
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}
