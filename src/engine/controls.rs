//! Potentiometer / CV smoothing and the hysteretic CV takeover.
//!
//! Three controls exist: Mix, Time (decay/time) and Tone (tone/feedback). The
//! last two can be handed over to a CV input by turning their pot fully down;
//! turning the pot back up past a second, higher threshold reclaims it.

use crate::engine::constants::{
    CV1_FALL_ALPHA, CV1_RISE_ALPHA, CV2_FALL_ALPHA, CV2_RISE_ALPHA, POT_SMOOTHING_ALPHA,
    TAKEOVER_EPS_OFF, TAKEOVER_EPS_ON,
};
use crate::engine::mapping::{clamp01, cv_to_unipolar};

/// One of the three per-patch controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Mix,
    Time,
    Tone,
}

impl ControlId {
    pub const ALL: [ControlId; 3] = [ControlId::Mix, ControlId::Time, ControlId::Tone];

    fn index(self) -> usize {
        match self {
            ControlId::Mix => 0,
            ControlId::Time => 1,
            ControlId::Tone => 2,
        }
    }
}

/// Exponential moving average.
#[derive(Debug, Clone, Copy)]
pub struct ExpSmoother {
    value: f32,
    alpha: f32,
}

impl ExpSmoother {
    pub fn new(initial: f32, alpha: f32) -> Self {
        Self {
            value: initial,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn update(&mut self, target: f32) -> f32 {
        if target.is_finite() {
            self.value += self.alpha * (target - self.value);
        }
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

/// Exponential average with separate rise and fall rates.
#[derive(Debug, Clone, Copy)]
pub struct AsymmetricSmoother {
    value: f32,
    rise: f32,
    fall: f32,
}

impl AsymmetricSmoother {
    pub fn new(initial: f32, rise: f32, fall: f32) -> Self {
        Self {
            value: initial,
            rise: rise.clamp(0.0, 1.0),
            fall: fall.clamp(0.0, 1.0),
        }
    }

    pub fn update(&mut self, target: f32) -> f32 {
        if target.is_finite() {
            let alpha = if target > self.value {
                self.rise
            } else {
                self.fall
            };
            self.value += alpha * (target - self.value);
        }
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

/// Hysteretic pot → CV handover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CvTakeover {
    eps_on: f32,
    eps_off: f32,
    cv_mode: bool,
}

impl CvTakeover {
    /// `eps_on` must lie below `eps_off`; the pair is swapped otherwise.
    pub fn new(eps_on: f32, eps_off: f32) -> Self {
        let (eps_on, eps_off) = if eps_on <= eps_off {
            (eps_on, eps_off)
        } else {
            (eps_off, eps_on)
        };
        Self {
            eps_on,
            eps_off,
            cv_mode: false,
        }
    }

    pub fn update(&mut self, pot01: f32) -> bool {
        if !self.cv_mode && pot01 <= self.eps_on {
            self.cv_mode = true;
        } else if self.cv_mode && pot01 >= self.eps_off {
            self.cv_mode = false;
        }
        self.cv_mode
    }

    pub fn cv_mode(&self) -> bool {
        self.cv_mode
    }
}

impl Default for CvTakeover {
    fn default() -> Self {
        Self::new(TAKEOVER_EPS_ON, TAKEOVER_EPS_OFF)
    }
}

#[derive(Debug, Clone, Copy)]
struct CvInput {
    smoother: AsymmetricSmoother,
    takeover: CvTakeover,
    raw_volts: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct ControlChannel {
    pot: ExpSmoother,
    cv: Option<CvInput>,
}

impl ControlChannel {
    fn pot_only() -> Self {
        Self {
            pot: ExpSmoother::new(0.0, POT_SMOOTHING_ALPHA),
            cv: None,
        }
    }

    fn with_cv(rise: f32, fall: f32) -> Self {
        Self {
            pot: ExpSmoother::new(0.0, POT_SMOOTHING_ALPHA),
            cv: Some(CvInput {
                smoother: AsymmetricSmoother::new(0.0, rise, fall),
                takeover: CvTakeover::default(),
                raw_volts: 0.0,
            }),
        }
    }

    fn update(&mut self, pot01: f32, cv_volts: Option<f32>) {
        let pot = self.pot.update(clamp01(pot01));
        if let (Some(cv), Some(volts)) = (self.cv.as_mut(), cv_volts) {
            if volts.is_finite() {
                cv.raw_volts = volts;
            }
            cv.smoother.update(volts);
            cv.takeover.update(pot);
        }
    }

    /// Smoothed pot position.
    pub fn pot(&self) -> f32 {
        self.pot.value()
    }

    /// Whether the CV input currently owns this control.
    pub fn cv_mode(&self) -> bool {
        self.cv.is_some_and(|cv| cv.takeover.cv_mode())
    }

    /// Smoothed CV mapped into `[0, 1]`, if this channel has a CV input.
    pub fn cv_unipolar(&self) -> Option<f32> {
        self.cv.map(|cv| cv_to_unipolar(cv.smoother.value()))
    }

    /// The value consumers should use.
    pub fn value(&self) -> f32 {
        match self.cv {
            Some(cv) if cv.takeover.cv_mode() => cv_to_unipolar(cv.smoother.value()),
            _ => clamp01(self.pot.value()),
        }
    }
}

/// Resolved control values after smoothing and takeover.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlValues {
    pub mix: f32,
    pub time: f32,
    pub tone: f32,
    pub time_cv_mode: bool,
    pub tone_cv_mode: bool,
}

/// Smooths the three pots and two CV inputs once per control tick.
#[derive(Debug, Clone)]
pub struct ParameterController {
    channels: [ControlChannel; 3],
}

impl ParameterController {
    pub fn new() -> Self {
        Self {
            channels: [
                ControlChannel::pot_only(),
                ControlChannel::with_cv(CV1_RISE_ALPHA, CV1_FALL_ALPHA),
                ControlChannel::with_cv(CV2_RISE_ALPHA, CV2_FALL_ALPHA),
            ],
        }
    }

    /// Feed one tick of normalized pot values and CV voltages.
    ///
    /// `pots` are already polarity-corrected `[Mix, Time, Tone]`; `cv_volts`
    /// drive Time and Tone respectively.
    pub fn update(&mut self, pots: [f32; 3], cv_volts: [f32; 2]) {
        self.channels[0].update(pots[0], None);
        self.channels[1].update(pots[1], Some(cv_volts[0]));
        self.channels[2].update(pots[2], Some(cv_volts[1]));
    }

    pub fn channel(&self, id: ControlId) -> &ControlChannel {
        &self.channels[id.index()]
    }

    pub fn value(&self, id: ControlId) -> f32 {
        self.channel(id).value()
    }

    pub fn cv_mode(&self, id: ControlId) -> bool {
        self.channel(id).cv_mode()
    }

    /// Most recent unsmoothed voltage on the Tone CV jack (the tap gate).
    pub fn tone_cv_raw_volts(&self) -> f32 {
        self.channels[2].cv.map_or(0.0, |cv| cv.raw_volts)
    }

    pub fn values(&self) -> ControlValues {
        ControlValues {
            mix: self.value(ControlId::Mix),
            time: self.value(ControlId::Time),
            tone: self.value(ControlId::Tone),
            time_cv_mode: self.cv_mode(ControlId::Time),
            tone_cv_mode: self.cv_mode(ControlId::Tone),
        }
    }
}

impl Default for ParameterController {
    fn default() -> Self {
        Self::new()
    }
}
