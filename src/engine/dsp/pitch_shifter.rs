//! Delay-based pitch shifter.
//!
//! Two read heads sweep through a short window at a rate set by the pitch
//! ratio, half a window apart. Their outputs are crossfaded with
//! complementary `sin^2`/`cos^2` gains so that each head is silent when it
//! jumps back to the other end of the window.

use std::f32::consts::PI;

use crate::engine::dsp::delay_line::DelayLine;
use crate::engine::dsp::seconds_to_capacity;

const WINDOW_SECONDS: f32 = 0.05;

/// Headroom so the head at the far end of the window can interpolate.
const GUARD_SAMPLES: usize = 4;

#[derive(Debug, Clone)]
pub struct PitchShifter {
    line: DelayLine,
    window: f32,
    phase: f32,
    phase_increment: f32,
    semitones: f32,
}

impl PitchShifter {
    pub fn new(sample_rate: f32) -> Self {
        let window = seconds_to_capacity(WINDOW_SECONDS, sample_rate).max(2);
        let mut shifter = Self {
            line: DelayLine::new(window + GUARD_SAMPLES),
            window: window as f32,
            phase: 0.0,
            phase_increment: 0.0,
            semitones: 0.0,
        };
        shifter.set_transposition(0.0);
        shifter
    }

    /// Transposition in semitones; clamped to two octaves either way.
    pub fn set_transposition(&mut self, semitones: f32) {
        let semitones = if semitones.is_finite() {
            semitones.clamp(-24.0, 24.0)
        } else {
            0.0
        };
        let ratio = 2.0_f32.powf(semitones / 12.0);
        self.semitones = semitones;
        self.phase_increment = (1.0 - ratio) / self.window;
    }

    pub fn transposition(&self) -> f32 {
        self.semitones
    }

    pub fn reset(&mut self) {
        self.line.reset();
        self.phase = 0.0;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.phase = (self.phase + self.phase_increment).rem_euclid(1.0);
        // rem_euclid can round up to exactly 1.0 for tiny negative inputs.
        if self.phase >= 1.0 {
            self.phase = 0.0;
        }
        let phase_b = (self.phase + 0.5) % 1.0;

        let head_a = self.line.read_at(1.0 + self.phase * self.window);
        let head_b = self.line.read_at(1.0 + phase_b * self.window);

        let gain_a = (PI * self.phase).sin().powi(2);
        let gain_b = 1.0 - gain_a;

        self.line.write(x);
        head_a * gain_a + head_b * gain_b
    }
}
