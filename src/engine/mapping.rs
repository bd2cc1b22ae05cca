//! Control-value mapping helpers shared by the control loop and the patches.

use crate::engine::constants::CV_RANGE_VOLTS;

/// Clamp to `[0, 1]`. NaN reads as 0; infinities saturate to their own end.
#[inline]
pub fn clamp01(x: f32) -> f32 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// Linear interpolation of a unit control into `[min, max]`.
#[inline]
pub fn map_lin01(x01: f32, min: f32, max: f32) -> f32 {
    min + clamp01(x01) * (max - min)
}

/// Exponential interpolation of a unit control into `[min, max]`.
///
/// Gives fine resolution near `min`; used for times in milliseconds. Both
/// bounds must be positive, otherwise the linear map is used.
#[inline]
pub fn map_exp01(x01: f32, min: f32, max: f32) -> f32 {
    if !(min > 0.0 && max > 0.0) {
        return map_lin01(x01, min, max);
    }

    let ln_min = min.ln();
    let ln_range = max.ln() - ln_min;
    (ln_min + clamp01(x01) * ln_range).exp()
}

/// Map a bipolar CV voltage (±5 V) into `[0, 1]`.
#[inline]
pub fn cv_to_unipolar(volts: f32) -> f32 {
    clamp01((volts + CV_RANGE_VOLTS) / (2.0 * CV_RANGE_VOLTS))
}

/// Potentiometers are wired so that a raw ADC reading of 0 is fully clockwise.
#[inline]
pub fn invert_pot(adc01: f32) -> f32 {
    1.0 - clamp01(adc01)
}

/// One-pole step of `current` toward `target`.
#[inline]
pub fn one_pole_toward(current: &mut f32, target: f32, coeff: f32) {
    *current += coeff * (target - *current);
}

#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * 0.001 * sample_rate
}

/// Linear calibration `y = gain * x + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearCalibration {
    pub gain: f32,
    pub offset: f32,
}

impl LinearCalibration {
    pub const ZERO: Self = Self {
        gain: 0.0,
        offset: 0.0,
    };

    /// Hardware CV input stage: `(3.3 * adc - 1.68) / -0.33` volts.
    pub const DEFAULT_CV: Self = Self {
        gain: -10.0,
        offset: 1.68 / 0.33,
    };

    /// Fit through two measured points.
    ///
    /// Coincident x values cannot define a slope; the zero map is returned
    /// so that a bad calibration reads as 0 V rather than as garbage.
    pub fn from_two_points(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let dx = x2 - x1;
        if !dx.is_finite() || dx.abs() < 1e-9 {
            return Self::ZERO;
        }

        let gain = (y2 - y1) / dx;
        let offset = y1 - gain * x1;
        if gain.is_finite() && offset.is_finite() {
            Self { gain, offset }
        } else {
            Self::ZERO
        }
    }

    #[inline]
    pub fn apply(&self, x: f32) -> f32 {
        self.gain * x + self.offset
    }
}

impl Default for LinearCalibration {
    fn default() -> Self {
        Self::DEFAULT_CV
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp01_saturates_infinities() {
        assert_eq!(clamp01(f32::INFINITY), 1.0);
        assert_eq!(clamp01(f32::NEG_INFINITY), 0.0);
        assert_eq!(clamp01(f32::NAN), 0.0);
        assert_eq!(clamp01(0.25), 0.25);
    }

    #[test]
    fn test_map_lin01_endpoints_and_clamp() {
        assert!((map_lin01(0.0, 0.70, 0.98) - 0.70).abs() < 1e-6);
        assert!((map_lin01(1.0, 0.70, 0.98) - 0.98).abs() < 1e-6);
        assert!((map_lin01(2.0, 0.70, 0.98) - 0.98).abs() < 1e-6);
        assert!((map_lin01(f32::NAN, 0.70, 0.98) - 0.70).abs() < 1e-6);
    }

    #[test]
    fn test_map_exp01_is_geometric() {
        assert!((map_exp01(0.0, 10.0, 80.0) - 10.0).abs() < 1e-3);
        assert!((map_exp01(1.0, 10.0, 80.0) - 80.0).abs() < 1e-3);
        // Midpoint of an exponential map is the geometric mean.
        let mid = map_exp01(0.5, 10.0, 1000.0);
        assert!((mid - 100.0).abs() < 1e-2);
    }

    #[test]
    fn test_map_exp01_falls_back_for_non_positive_bounds() {
        assert!((map_exp01(0.5, 0.0, 10.0) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_cv_to_unipolar() {
        assert_eq!(cv_to_unipolar(-5.0), 0.0);
        assert!((cv_to_unipolar(0.0) - 0.5).abs() < 1e-6);
        assert_eq!(cv_to_unipolar(5.0), 1.0);
        assert_eq!(cv_to_unipolar(12.0), 1.0);
        assert_eq!(cv_to_unipolar(-12.0), 0.0);
    }

    #[test]
    fn test_invert_pot() {
        assert_eq!(invert_pot(0.0), 1.0);
        assert_eq!(invert_pot(1.0), 0.0);
        assert_eq!(invert_pot(-0.5), 1.0);
    }

    #[test]
    fn test_one_pole_toward_converges() {
        let mut y = 0.0;
        for _ in 0..10_000 {
            one_pole_toward(&mut y, 100.0, 0.0015);
        }
        assert!((y - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_calibration_from_two_points() {
        let calib = LinearCalibration::from_two_points(0.0, 5.0, 1.0, -5.0);
        assert!((calib.apply(0.5) - 0.0).abs() < 1e-6);
        assert!((calib.apply(0.0) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_calibration_is_zero_map() {
        let calib = LinearCalibration::from_two_points(0.3, 1.0, 0.3, 2.0);
        assert_eq!(calib, LinearCalibration::ZERO);
        assert_eq!(calib.apply(0.7), 0.0);
    }

    #[test]
    fn test_default_cv_calibration_matches_hardware_stage() {
        let calib = LinearCalibration::DEFAULT_CV;
        for adc in [0.0_f32, 0.25, 0.5, 0.75, 1.0] {
            let expected = (3.3 * adc - 1.68) / -0.33;
            assert!((calib.apply(adc) - expected).abs() < 1e-4);
        }
    }
}
