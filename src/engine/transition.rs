//! Patch-change fade and shimmer warm-up envelopes.
//!
//! Both are linear 0 -> 1 ramps counted down in samples. A new commit
//! restarts them from their full length; there is no blending across two
//! consecutive changes.

use crate::engine::constants::{PATCH_FADE_SAMPLES, SHIMMER_WARMUP_SAMPLES};

/// Per-sample envelope gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionGains {
    /// Applied to the whole wet signal.
    pub fade: f32,
    /// Applied to the shimmer tail only.
    pub warmup: f32,
}

impl TransitionGains {
    pub const UNITY: Self = Self {
        fade: 1.0,
        warmup: 1.0,
    };
}

#[derive(Debug, Clone)]
pub struct TransitionManager {
    fade_len: u32,
    warmup_len: u32,
    fade_remaining: u32,
    warmup_remaining: u32,
}

impl TransitionManager {
    pub fn new() -> Self {
        Self::with_lengths(PATCH_FADE_SAMPLES, SHIMMER_WARMUP_SAMPLES)
    }

    /// Custom ramp lengths; zero lengths are bumped to one sample.
    pub fn with_lengths(fade_len: u32, warmup_len: u32) -> Self {
        Self {
            fade_len: fade_len.max(1),
            warmup_len: warmup_len.max(1),
            fade_remaining: 0,
            warmup_remaining: 0,
        }
    }

    /// Restart the fade, and the warm-up if the new patch asks for it.
    pub fn arm(&mut self, needs_warmup: bool) {
        self.fade_remaining = self.fade_len;
        self.warmup_remaining = if needs_warmup { self.warmup_len } else { 0 };
    }

    /// Gains for the current sample, then consume one sample of each ramp.
    #[inline]
    pub fn next_gains(&mut self) -> TransitionGains {
        let gains = self.current_gains();
        self.fade_remaining = self.fade_remaining.saturating_sub(1);
        self.warmup_remaining = self.warmup_remaining.saturating_sub(1);
        gains
    }

    /// Gains for the current sample without advancing.
    #[inline]
    pub fn current_gains(&self) -> TransitionGains {
        TransitionGains {
            fade: 1.0 - self.fade_remaining as f32 / self.fade_len as f32,
            warmup: 1.0 - self.warmup_remaining as f32 / self.warmup_len as f32,
        }
    }

    pub fn fade_remaining(&self) -> u32 {
        self.fade_remaining
    }

    pub fn warmup_remaining(&self) -> u32 {
        self.warmup_remaining
    }

    pub fn fade_len(&self) -> u32 {
        self.fade_len
    }

    pub fn is_idle(&self) -> bool {
        self.fade_remaining == 0 && self.warmup_remaining == 0
    }
}

impl Default for TransitionManager {
    fn default() -> Self {
        Self::new()
    }
}
