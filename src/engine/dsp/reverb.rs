//! Stereo feedback-delay-network reverb.
//!
//! Eight delay lines of mutually prime lengths feed a Householder junction.
//! Each line's return is damped by a one-pole low-pass and scaled by the
//! feedback coefficient before re-entering the junction. Even lines carry the
//! left input and output, odd lines the right.

use crate::engine::constants::{REVERB_FEEDBACK_MAX, REVERB_FEEDBACK_MIN};
use crate::engine::dsp::delay_line::DelayLine;
use crate::engine::dsp::filters::OnePoleLowPass;

const NUM_LINES: usize = 8;

/// Line lengths in samples at 44.1 kHz.
const LINE_LENGTHS_44K: [f32; NUM_LINES] =
    [2473.0, 2767.0, 3217.0, 3557.0, 3907.0, 4127.0, 2143.0, 1933.0];

/// Householder junction gain `2 / N`.
const JUNCTION_GAIN: f32 = 2.0 / NUM_LINES as f32;

const OUTPUT_GAIN: f32 = 0.35;

const DEFAULT_FEEDBACK: f32 = 0.97;
const DEFAULT_CUTOFF_HZ: f32 = 10_000.0;

#[derive(Debug, Clone)]
pub struct ReverbTank {
    sample_rate: f32,
    lines: [DelayLine; NUM_LINES],
    lengths: [f32; NUM_LINES],
    damping: [OnePoleLowPass; NUM_LINES],
    returns: [f32; NUM_LINES],
    feedback: f32,
    cutoff_hz: f32,
}

impl ReverbTank {
    pub fn new(sample_rate: f32) -> Self {
        let scale = sample_rate / 44_100.0;
        let lengths = LINE_LENGTHS_44K.map(|len| (len * scale).round().max(2.0));
        let lines = lengths.map(|len| DelayLine::new(len as usize + 2));

        let mut reverb = Self {
            sample_rate,
            lines,
            lengths,
            damping: [OnePoleLowPass::default(); NUM_LINES],
            returns: [0.0; NUM_LINES],
            feedback: DEFAULT_FEEDBACK,
            cutoff_hz: DEFAULT_CUTOFF_HZ,
        };
        reverb.set_lp_freq(DEFAULT_CUTOFF_HZ);
        reverb
    }

    /// Feedback coefficient, clamped to the stable range.
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = if feedback.is_finite() {
            feedback.clamp(REVERB_FEEDBACK_MIN, REVERB_FEEDBACK_MAX)
        } else {
            REVERB_FEEDBACK_MIN
        };
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Damping cutoff in Hz.
    pub fn set_lp_freq(&mut self, cutoff_hz: f32) {
        for lp in &mut self.damping {
            lp.set_cutoff(cutoff_hz, self.sample_rate);
        }
        self.cutoff_hz = cutoff_hz;
    }

    pub fn lp_freq(&self) -> f32 {
        self.cutoff_hz
    }

    /// Clear the tank without touching the current settings.
    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
        for lp in &mut self.damping {
            lp.reset();
        }
        self.returns = [0.0; NUM_LINES];
    }

    #[inline]
    pub fn process(&mut self, in_l: f32, in_r: f32) -> (f32, f32) {
        let mut sum = 0.0;
        for i in 0..NUM_LINES {
            let out = self.lines[i].read_at(self.lengths[i]);
            let damped = self.damping[i].process(out) * self.feedback;
            self.returns[i] = damped;
            sum += damped;
        }

        let junction = JUNCTION_GAIN * sum;

        let mut out_l = 0.0;
        let mut out_r = 0.0;
        for i in 0..NUM_LINES {
            let y = self.returns[i];
            let input = if i % 2 == 0 { in_l } else { in_r };
            self.lines[i].write(input + junction - y);

            if i % 2 == 0 {
                out_l += y;
            } else {
                out_r += y;
            }
        }

        (out_l * OUTPUT_GAIN, out_r * OUTPUT_GAIN)
    }
}
