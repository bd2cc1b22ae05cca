//! Message definitions for communication between the control loop and the audio thread.
//!
//! This module defines the types that serve as the wire format for messages passed through the
//! lock-free ring buffers. Every message is `Copy` and fixed-size so that neither side allocates
//! while sending or receiving.

use crate::engine::bank_patch::PatchId;
use crate::engine::mapping::clamp01;

/// Resolved control values published by the control loop once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlFrame {
    /// Dry/wet mix in `[0, 1]`.
    pub mix: f32,

    /// Decay/time control in `[0, 1]`, after CV takeover.
    pub time: f32,

    /// Tone/feedback control in `[0, 1]`, after CV takeover.
    pub tone: f32,

    /// Armed tap-tempo delay length in samples, if any.
    pub tap_samples: Option<f32>,
}

impl ControlFrame {
    /// Clamp every field into its legal range.
    ///
    /// NaN falls back to 0, infinities saturate, and a non-positive or
    /// non-finite tap length disarms the tap.
    pub fn sanitized(self) -> Self {
        Self {
            mix: clamp01(self.mix),
            time: clamp01(self.time),
            tone: clamp01(self.tone),
            tap_samples: self.tap_samples.filter(|s| s.is_finite() && *s > 0.0),
        }
    }
}

impl Default for ControlFrame {
    fn default() -> Self {
        Self {
            mix: 0.0,
            time: 0.0,
            tone: 0.0,
            tap_samples: None,
        }
    }
}

/// Message that is emitted from the control loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMessage {
    /// Latest control values. Applied at the start of the next audio block.
    Controls(ControlFrame),

    /// Switch to a patch: reset its DSP state and start the fade.
    ///
    /// # Parameters
    /// * `PatchId` - Newly committed bank and patch index
    CommitPatch(PatchId),
}

/// Message that is emitted from the audio thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMessage {
    /// A committed patch has been reset and is now producing audio.
    PatchEngaged { patch: PatchId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_clamps_fields() {
        let frame = ControlFrame {
            mix: 1.5,
            time: f32::NAN,
            tone: -0.2,
            tap_samples: Some(f32::INFINITY),
        }
        .sanitized();

        assert_eq!(frame.mix, 1.0);
        assert_eq!(frame.time, 0.0);
        assert_eq!(frame.tone, 0.0);
        assert_eq!(frame.tap_samples, None);
    }

    #[test]
    fn test_sanitized_saturates_infinite_controls() {
        let frame = ControlFrame {
            mix: f32::INFINITY,
            time: f32::NEG_INFINITY,
            tone: f32::INFINITY,
            tap_samples: None,
        }
        .sanitized();

        assert_eq!(frame.mix, 1.0);
        assert_eq!(frame.time, 0.0);
        assert_eq!(frame.tone, 1.0);
    }

    #[test]
    fn test_sanitized_keeps_valid_tap() {
        let frame = ControlFrame {
            tap_samples: Some(24_000.0),
            ..ControlFrame::default()
        };
        assert_eq!(frame.sanitized().tap_samples, Some(24_000.0));

        let frame = ControlFrame {
            tap_samples: Some(0.0),
            ..ControlFrame::default()
        };
        assert_eq!(frame.sanitized().tap_samples, None);
    }
}
