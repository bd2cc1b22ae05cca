//! Control-thread half of the engine.
//!
//! Owns the parameter controller, the tap-tempo estimator and the bank/patch
//! state machine. Each [`ControlLoop::tick`] reads one set of raw inputs,
//! publishes the resolved controls to the audio thread and returns a snapshot
//! for the display.

use rtrb::{Consumer, Producer};

use crate::engine::bank_patch::{Bank, BankPatchStateMachine, PatchId, SelectionEvent, UiLevel};
use crate::engine::constants::{UI_CHANGE_EPS, UI_IDLE_SLEEP_MS};
use crate::engine::controls::{ControlId, ControlValues, ParameterController};
use crate::engine::mapping::{LinearCalibration, invert_pot};
use crate::engine::patches::Patch;
use crate::engine::tap_tempo::{TapEvent, TapTempoEstimator};
use crate::messages::{AudioMessage, ControlFrame, ControlMessage};

/// One sample of every physical input.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawInputs {
    /// `[Mix, Time, Tone]` pot positions in `[0, 1]`, already polarity-corrected.
    pub pots: [f32; 3],

    /// Voltages on the Time and Tone CV jacks.
    pub cv_volts: [f32; 2],

    /// Raw (undebounced) button contact.
    pub button_pressed: bool,
}

impl RawInputs {
    /// Build from raw ADC fractions.
    ///
    /// # Parameters
    /// - `pot_adc`: Pot readings in `[0, 1]`; inverted because the pots are wired backwards
    /// - `cv_adc`: CV jack readings in `[0, 1]`, converted to volts through `calibration`
    /// - `button_pressed`: Raw button contact
    pub fn from_adc(
        pot_adc: [f32; 3],
        cv_adc: [f32; 2],
        button_pressed: bool,
        calibration: &LinearCalibration,
    ) -> Self {
        Self {
            pots: pot_adc.map(invert_pot),
            cv_volts: cv_adc.map(|a| calibration.apply(a)),
            button_pressed,
        }
    }
}

/// Read-only state for an external display.
#[derive(Debug, Clone, PartialEq)]
pub struct UiSnapshot {
    pub level: UiLevel,
    pub active: PatchId,
    pub preview: Bank,
    pub patch_name: &'static str,
    pub bank_title: &'static str,
    pub control_labels: [&'static str; 3],
    pub values: ControlValues,
    pub tap_armed: bool,
    pub recently_tapped: bool,
    pub button_held: bool,
    pub last_interaction_ms: u64,
    pub display_awake: bool,
    /// Last patch the audio thread confirmed as running.
    pub engaged: Option<PatchId>,
}

/// Values compared between ticks to detect user activity.
#[derive(Debug, Clone, Copy, PartialEq)]
struct UiFingerprint {
    pots: [f32; 3],
    level: UiLevel,
    active: PatchId,
    preview: Bank,
}

impl UiFingerprint {
    fn differs_from(&self, other: &Self) -> bool {
        let pots_moved = self
            .pots
            .iter()
            .zip(other.pots)
            .any(|(a, b)| (a - b).abs() > UI_CHANGE_EPS);
        pots_moved
            || self.level != other.level
            || self.active != other.active
            || self.preview != other.preview
    }
}

pub struct ControlLoop {
    controls: ParameterController,
    tap: TapTempoEstimator,
    selection: BankPatchStateMachine,
    control_tx: Producer<ControlMessage>,
    audio_rx: Consumer<AudioMessage>,
    pending_commit: Option<PatchId>,
    engaged: Option<PatchId>,
    last_seen: Option<UiFingerprint>,
    controls_dropped: bool,
}

impl ControlLoop {
    pub(crate) fn new(
        sample_rate: f32,
        control_tx: Producer<ControlMessage>,
        audio_rx: Consumer<AudioMessage>,
    ) -> Self {
        Self {
            controls: ParameterController::new(),
            tap: TapTempoEstimator::new(sample_rate),
            selection: BankPatchStateMachine::new(0),
            control_tx,
            audio_rx,
            pending_commit: None,
            engaged: None,
            last_seen: None,
            controls_dropped: false,
        }
    }

    pub fn controls(&self) -> &ParameterController {
        &self.controls
    }

    pub fn tap(&self) -> &TapTempoEstimator {
        &self.tap
    }

    pub fn selection(&self) -> &BankPatchStateMachine {
        &self.selection
    }

    /// Run one control iteration at `now_ms`.
    pub fn tick(&mut self, inputs: &RawInputs, now_ms: u64) -> UiSnapshot {
        self.controls.update(inputs.pots, inputs.cv_volts);

        if let Some(event) = self.selection.update(inputs.button_pressed, now_ms) {
            self.on_selection(event);
        }

        // After the selection, so a commit into the reverb bank drops the tap
        // before this tick publishes.
        let delay_bank = self.selection.active().bank().is_delay();
        if let Some(event) = self
            .tap
            .update(self.controls.tone_cv_raw_volts(), now_ms, delay_bank)
        {
            log_tap_event(event);
        }

        self.track_interaction(now_ms);
        self.publish();
        self.drain_audio_messages();

        self.snapshot(now_ms)
    }

    /// Current UI state without advancing anything.
    pub fn snapshot(&self, now_ms: u64) -> UiSnapshot {
        let active = self.selection.active();
        let patch = Patch::from_id(active);
        let delay_bank = active.bank().is_delay();
        let last_interaction_ms = self.selection.last_interaction_ms();

        UiSnapshot {
            level: self.selection.level(),
            active,
            preview: self.selection.preview(),
            patch_name: patch.name(),
            bank_title: self.selection.preview().title(),
            control_labels: patch.control_labels(),
            values: self.controls.values(),
            tap_armed: self.tap.is_armed(),
            recently_tapped: self.tap.recently_tapped(now_ms, delay_bank),
            button_held: self.selection.button_held(),
            last_interaction_ms,
            display_awake: now_ms.saturating_sub(last_interaction_ms) <= UI_IDLE_SLEEP_MS,
            engaged: self.engaged,
        }
    }

    /// The frame that the next publish will send.
    pub fn control_frame(&self) -> ControlFrame {
        ControlFrame {
            mix: self.controls.value(ControlId::Mix),
            time: self.controls.value(ControlId::Time),
            tone: self.controls.value(ControlId::Tone),
            tap_samples: self.tap.active_interval(),
        }
    }

    /// Commit still waiting for room in the control ring.
    pub fn pending_commit(&self) -> Option<PatchId> {
        self.pending_commit
    }

    fn on_selection(&mut self, event: SelectionEvent) {
        match event {
            SelectionEvent::PatchCommitted(patch) => {
                log::info!("Patch {} committed ({})", patch, Patch::from_id(patch).name());
                self.pending_commit = Some(patch);
            }
            SelectionEvent::PreviewToggled { preview } => {
                log::info!("Previewing bank {}", preview.title());
            }
            SelectionEvent::BankMenuOpened { preview } => {
                log::info!("Bank menu opened on {}", preview.title());
            }
        }
    }

    fn track_interaction(&mut self, now_ms: u64) {
        let current = UiFingerprint {
            pots: ControlId::ALL.map(|id| self.controls.channel(id).pot()),
            level: self.selection.level(),
            active: self.selection.active(),
            preview: self.selection.preview(),
        };

        let changed = self
            .last_seen
            .is_none_or(|previous| current.differs_from(&previous));
        let delay_bank = current.active.bank().is_delay();

        if changed || self.selection.button_held() || self.tap.recently_tapped(now_ms, delay_bank) {
            self.selection.note_interaction(now_ms);
            self.last_seen = Some(current);
        }
    }

    fn publish(&mut self) {
        if let Some(patch) = self.pending_commit {
            match self.control_tx.push(ControlMessage::CommitPatch(patch)) {
                Ok(()) => self.pending_commit = None,
                Err(_) => log::warn!("Control ring full, retrying commit of {patch}"),
            }
        }

        let frame = self.control_frame();
        match self.control_tx.push(ControlMessage::Controls(frame)) {
            Ok(()) => self.controls_dropped = false,
            Err(_) => {
                if !self.controls_dropped {
                    log::warn!("Control ring full, dropping control updates");
                }
                self.controls_dropped = true;
            }
        }
    }

    fn drain_audio_messages(&mut self) {
        while let Ok(message) = self.audio_rx.pop() {
            match message {
                AudioMessage::PatchEngaged { patch } => {
                    log::debug!("Audio engaged {patch}");
                    self.engaged = Some(patch);
                }
            }
        }
    }
}

fn log_tap_event(event: TapEvent) {
    match event {
        TapEvent::Accepted { interval_samples } => {
            log::debug!("Tap accepted: {interval_samples:.0} samples");
        }
        TapEvent::Rejected { interval_ms } => {
            log::debug!("Tap rejected: {interval_ms} ms");
        }
        TapEvent::Expired => log::debug!("Tap estimate expired"),
        TapEvent::Cancelled => log::debug!("Tap cleared on bank change"),
    }
}
