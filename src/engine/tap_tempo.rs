//! Tap tempo from an external gate on the Tone CV jack.
//!
//! Only active while the delay bank is selected. A valid interval between two
//! rising edges replaces the knob-derived delay time until the estimate
//! expires or the bank changes.

use crate::engine::constants::{
    TAP_EXPIRY_MS, TAP_FLASH_MS, TAP_HIGH_VOLTS, TAP_LOW_VOLTS, TAP_MAX_INTERVAL_MS,
    TAP_MIN_INTERVAL_MS,
};

/// Outcome of one estimator update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapEvent {
    /// A rising edge produced a new estimate.
    Accepted { interval_samples: f32 },
    /// A rising edge arrived outside the accepted interval window.
    Rejected { interval_ms: u64 },
    /// The armed estimate timed out.
    Expired,
    /// Leaving the delay bank cleared the armed estimate.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct TapTempoEstimator {
    sample_rate: f32,
    gate: bool,
    last_tap_ms: Option<u64>,
    armed: bool,
    interval_samples: f32,
}

impl TapTempoEstimator {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            gate: false,
            last_tap_ms: None,
            armed: false,
            // Half a second until the first valid tap.
            interval_samples: 0.5 * sample_rate,
        }
    }

    /// Advance the estimator by one control tick.
    pub fn update(&mut self, gate_volts: f32, now_ms: u64, delay_bank_active: bool) -> Option<TapEvent> {
        if !delay_bank_active {
            if self.armed {
                self.armed = false;
                return Some(TapEvent::Cancelled);
            }
            return None;
        }

        let mut event = None;

        if !self.gate && gate_volts >= TAP_HIGH_VOLTS {
            self.gate = true;
            event = self.on_rising_edge(now_ms);
        } else if self.gate && gate_volts <= TAP_LOW_VOLTS {
            self.gate = false;
        }

        if self.armed && self.elapsed_since_tap(now_ms).is_some_and(|dt| dt > TAP_EXPIRY_MS) {
            self.armed = false;
            event = Some(TapEvent::Expired);
        }

        event
    }

    fn on_rising_edge(&mut self, now_ms: u64) -> Option<TapEvent> {
        let previous = self.last_tap_ms.replace(now_ms)?;
        let dt = now_ms.saturating_sub(previous);

        if dt > TAP_MIN_INTERVAL_MS && dt < TAP_MAX_INTERVAL_MS {
            self.interval_samples = (dt as f32 / 1000.0) * self.sample_rate;
            self.armed = true;
            Some(TapEvent::Accepted {
                interval_samples: self.interval_samples,
            })
        } else {
            Some(TapEvent::Rejected { interval_ms: dt })
        }
    }

    fn elapsed_since_tap(&self, now_ms: u64) -> Option<u64> {
        self.last_tap_ms.map(|t| now_ms.saturating_sub(t))
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn interval_samples(&self) -> f32 {
        self.interval_samples
    }

    /// The estimate to use as delay length, if one is armed.
    pub fn active_interval(&self) -> Option<f32> {
        self.armed.then_some(self.interval_samples)
    }

    /// True shortly after any rising edge, for the UI tap indicator.
    pub fn recently_tapped(&self, now_ms: u64, delay_bank_active: bool) -> bool {
        delay_bank_active && self.elapsed_since_tap(now_ms).is_some_and(|dt| dt < TAP_FLASH_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    /// Drive a full pulse: rising edge at `t`, falling edge 10 ms later.
    fn pulse(tap: &mut TapTempoEstimator, t: u64) -> Option<TapEvent> {
        let event = tap.update(5.0, t, true);
        tap.update(0.0, t + 10, true);
        event
    }

    #[test]
    fn test_first_edge_only_records_time() {
        let mut tap = TapTempoEstimator::new(SR);
        assert_eq!(pulse(&mut tap, 1000), None);
        assert!(!tap.is_armed());
    }

    #[test]
    fn test_500ms_pair_yields_half_second() {
        let mut tap = TapTempoEstimator::new(SR);
        pulse(&mut tap, 1000);
        let event = pulse(&mut tap, 1500);

        assert!(tap.is_armed());
        assert!((tap.interval_samples() - 0.5 * SR).abs() < 1.0);
        assert!(matches!(event, Some(TapEvent::Accepted { .. })));
        assert_eq!(tap.active_interval(), Some(tap.interval_samples()));
    }

    #[test]
    fn test_too_short_interval_rejected() {
        let mut tap = TapTempoEstimator::new(SR);
        let before = tap.interval_samples();
        tap.update(5.0, 1000, true);
        tap.update(0.0, 1010, true);
        let event = tap.update(5.0, 1030, true);

        assert_eq!(event, Some(TapEvent::Rejected { interval_ms: 30 }));
        assert!(!tap.is_armed());
        assert_eq!(tap.interval_samples(), before);
    }

    #[test]
    fn test_too_long_interval_rejected_keeps_previous_state() {
        let mut tap = TapTempoEstimator::new(SR);
        pulse(&mut tap, 0);
        pulse(&mut tap, 400);
        assert!(tap.is_armed());
        let armed_interval = tap.interval_samples();

        pulse(&mut tap, 1000);
        assert!(tap.is_armed());
        let event = pulse(&mut tap, 4000);

        // No ticks in between, so nothing expired; the estimate survives.
        assert!(matches!(event, Some(TapEvent::Rejected { interval_ms: 3000 })));
        assert!(tap.is_armed());
        assert!((armed_interval - 0.4 * SR).abs() < 1.0);
        assert!((tap.interval_samples() - 0.6 * SR).abs() < 1.0);
    }

    #[test]
    fn test_rejected_edge_leaves_armed_flag() {
        let mut tap = TapTempoEstimator::new(SR);
        pulse(&mut tap, 0);
        pulse(&mut tap, 500);
        assert!(tap.is_armed());

        // 30 ms later: rejected, still armed, estimate unchanged.
        let event = pulse(&mut tap, 530);
        assert!(matches!(event, Some(TapEvent::Rejected { .. })));
        assert!(tap.is_armed());
        assert!((tap.interval_samples() - 0.5 * SR).abs() < 1.0);
    }

    #[test]
    fn test_gate_hysteresis_ignores_bounce() {
        let mut tap = TapTempoEstimator::new(SR);
        tap.update(5.0, 0, true);
        // Drops to 1.2 V: above TAP_LOW, so the gate stays high.
        tap.update(1.2, 5, true);
        // Back above TAP_HIGH without a proper fall: not a new edge.
        assert_eq!(tap.update(5.0, 100, true), None);
        assert!(!tap.is_armed());
    }

    #[test]
    fn test_expiry_after_1801ms() {
        let mut tap = TapTempoEstimator::new(SR);
        pulse(&mut tap, 0);
        pulse(&mut tap, 500);
        assert!(tap.is_armed());

        assert_eq!(tap.update(0.0, 500 + 1800, true), None);
        assert!(tap.is_armed());

        assert_eq!(tap.update(0.0, 500 + 1801, true), Some(TapEvent::Expired));
        assert!(!tap.is_armed());
        assert_eq!(tap.active_interval(), None);
    }

    #[test]
    fn test_leaving_delay_bank_clears_armed() {
        let mut tap = TapTempoEstimator::new(SR);
        pulse(&mut tap, 0);
        pulse(&mut tap, 500);
        assert!(tap.is_armed());

        assert_eq!(tap.update(0.0, 600, false), Some(TapEvent::Cancelled));
        assert!(!tap.is_armed());
        assert_eq!(tap.update(0.0, 700, false), None);
    }

    #[test]
    fn test_gate_ignored_outside_delay_bank() {
        let mut tap = TapTempoEstimator::new(SR);
        tap.update(5.0, 0, false);
        tap.update(0.0, 10, false);
        tap.update(5.0, 500, false);
        assert!(!tap.is_armed());
        assert!(!tap.recently_tapped(505, true));
    }

    #[test]
    fn test_recently_tapped_window() {
        let mut tap = TapTempoEstimator::new(SR);
        tap.update(5.0, 1000, true);
        assert!(tap.recently_tapped(1100, true));
        assert!(!tap.recently_tapped(1100, false));
        assert!(!tap.recently_tapped(1200, true));
    }
}
