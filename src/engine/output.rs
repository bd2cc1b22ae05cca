use crate::engine::constants::{DC_BLOCK_R, OUTPUT_HEADROOM, OUTPUT_LPF_HZ};
use crate::engine::dsp::{DcBlocker, OnePoleLowPass};

/// Final stereo stage: DC blocker, fixed low-pass, hard clamp.
#[derive(Debug, Clone)]
pub struct OutputConditioner {
    dc: [DcBlocker; 2],
    lp: [OnePoleLowPass; 2],
}

impl OutputConditioner {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            dc: [DcBlocker::new(DC_BLOCK_R); 2],
            lp: [OnePoleLowPass::with_cutoff(OUTPUT_LPF_HZ, sample_rate); 2],
        }
    }

    #[inline]
    pub fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        (self.channel(0, l), self.channel(1, r))
    }

    #[inline]
    fn channel(&mut self, ch: usize, x: f32) -> f32 {
        // A NaN here would latch into both filters forever.
        let x = if x.is_finite() { x } else { 0.0 };
        let y = self.lp[ch].process(self.dc[ch].process(x));
        y.clamp(-OUTPUT_HEADROOM, OUTPUT_HEADROOM)
    }

    pub fn reset(&mut self) {
        for dc in &mut self.dc {
            dc.reset();
        }
        for lp in &mut self.lp {
            lp.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_clamps_to_headroom() {
        let mut out = OutputConditioner::new(SR);
        for _ in 0..10 {
            let (l, r) = out.process(50.0, -50.0);
            assert!(l <= OUTPUT_HEADROOM && r >= -OUTPUT_HEADROOM);
        }
        let (l, r) = out.process(50.0, -50.0);
        assert_eq!(l, OUTPUT_HEADROOM);
        assert_eq!(r, -OUTPUT_HEADROOM);
    }

    #[test]
    fn test_removes_dc() {
        let mut out = OutputConditioner::new(SR);
        let mut last = (1.0, 1.0);
        for _ in 0..48_000 {
            last = out.process(0.5, -0.5);
        }
        assert!(last.0.abs() < 1e-3 && last.1.abs() < 1e-3);
    }

    #[test]
    fn test_passes_midband_signal() {
        let mut out = OutputConditioner::new(SR);
        let mut peak = 0.0_f32;
        for i in 0..48_000 {
            let x = 0.5 * (std::f32::consts::TAU * 1_000.0 * i as f32 / SR).sin();
            let (l, _) = out.process(x, x);
            if i > 24_000 {
                peak = peak.max(l.abs());
            }
        }
        assert!(peak > 0.45 && peak < 0.55);
    }

    #[test]
    fn test_non_finite_input_is_silenced() {
        let mut out = OutputConditioner::new(SR);
        out.process(f32::NAN, f32::INFINITY);
        let (l, r) = out.process(0.0, 0.0);
        assert!(l.is_finite() && r.is_finite());
    }
}
