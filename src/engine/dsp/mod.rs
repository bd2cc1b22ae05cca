//! Signal-processing primitives used by the patches.
//!
//! Every primitive allocates its memory once in `new` and exposes a `reset`
//! that clears state in place, so a patch commit never allocates on the audio
//! thread.

pub mod delay_line;
pub mod filters;
pub mod pitch_shifter;
pub mod reverb;

pub use delay_line::DelayLine;
pub use filters::{DcBlocker, OnePoleLowPass};
pub use pitch_shifter::PitchShifter;
pub use reverb::ReverbTank;

/// Seconds to a whole number of samples, at least one.
pub(crate) fn seconds_to_capacity(seconds: f32, sample_rate: f32) -> usize {
    let samples = (seconds * sample_rate).ceil();
    if samples.is_finite() && samples >= 1.0 {
        samples as usize
    } else {
        1
    }
}

/// Advance a normalized phase accumulator, wrapping into `[0, 1)`.
#[inline]
pub(crate) fn advance_phase(phase: &mut f32, increment: f32) {
    *phase += increment;
    if *phase >= 1.0 {
        *phase -= 1.0;
    }
}

/// `sin(2 pi phase)`.
#[inline]
pub(crate) fn sin_cycle(phase: f32) -> f32 {
    (std::f32::consts::TAU * phase).sin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_capacity() {
        assert_eq!(seconds_to_capacity(2.0, 48_000.0), 96_000);
        assert_eq!(seconds_to_capacity(0.25, 44_100.0), 11_025);
        assert_eq!(seconds_to_capacity(0.0, 48_000.0), 1);
        assert_eq!(seconds_to_capacity(f32::NAN, 48_000.0), 1);
    }

    #[test]
    fn test_advance_phase_wraps() {
        let mut phase = 0.9;
        advance_phase(&mut phase, 0.2);
        assert!((phase - 0.1).abs() < 1e-6);
    }
}
