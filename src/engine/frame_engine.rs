//! Per-sample wet path: active patch, transition envelope and dry/wet mix.

use crate::engine::bank_patch::PatchId;
use crate::engine::patches::{DspResources, Patch};
use crate::engine::transition::TransitionManager;
use crate::messages::ControlFrame;

pub struct AudioFrameEngine {
    resources: DspResources,
    transition: TransitionManager,
    active: PatchId,
    patch: Patch,
    controls: ControlFrame,
}

impl AudioFrameEngine {
    /// Starts on A1 with no fade pending.
    pub fn new(sample_rate: f32) -> Self {
        let active = PatchId::default();
        Self {
            resources: DspResources::new(sample_rate),
            transition: TransitionManager::new(),
            active,
            patch: Patch::from_id(active),
            controls: ControlFrame::default(),
        }
    }

    pub fn active(&self) -> PatchId {
        self.active
    }

    pub fn patch(&self) -> Patch {
        self.patch
    }

    pub fn controls(&self) -> &ControlFrame {
        &self.controls
    }

    pub fn transition(&self) -> &TransitionManager {
        &self.transition
    }

    pub fn resources(&self) -> &DspResources {
        &self.resources
    }

    /// Replace the control values used from the next sample on.
    pub fn set_controls(&mut self, controls: ControlFrame) {
        self.controls = controls.sanitized();
    }

    /// Switch patch: clear DSP memory and restart the fade.
    ///
    /// Re-committing the active patch is a full reset too.
    pub fn commit(&mut self, id: PatchId) {
        self.active = id;
        self.patch = Patch::from_id(id);
        self.resources.reset();
        self.transition.arm(self.patch.needs_warmup());
    }

    /// Process one stereo sample and return the mixed (not yet conditioned) output.
    #[inline]
    pub fn process_frame(&mut self, dry_l: f32, dry_r: f32) -> (f32, f32) {
        // A NaN written into a delay line or the reverb never leaves it.
        let dry_l = if dry_l.is_finite() { dry_l } else { 0.0 };
        let dry_r = if dry_r.is_finite() { dry_r } else { 0.0 };

        let gains = self.transition.next_gains();
        let (wet_l, wet_r) =
            self.patch
                .process(&mut self.resources, &self.controls, gains.warmup, dry_l, dry_r);

        let mix = self.controls.mix;
        let dry_gain = 1.0 - mix;
        let wet_gain = mix * gains.fade;
        (
            dry_gain * dry_l + wet_gain * wet_l,
            dry_gain * dry_r + wet_gain * wet_r,
        )
    }
}
