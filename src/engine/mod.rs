//! Effects Engine Module
//!
//! This module provides the real-time stereo effects engine. It is organized
//! into sub-modules, each with a specific responsibility:
//!
//! - [`audio_stream`]: CPAL duplex stream management and real-time callback
//! - [`config`]: Host configuration and environment overrides
//! - [`constants`]: Timing constants, thresholds and safe ranges
//! - [`errors`]: Engine error types
//! - [`controls`]: Pot/CV smoothing and CV takeover
//! - [`tap_tempo`]: Delay time from an external gate
//! - [`bank_patch`]: Button debouncing and bank/patch selection
//! - [`transition`]: Patch-change fade and shimmer warm-up
//! - [`patches`]: The eight effect patches and their shared DSP state
//! - [`frame_engine`]: Per-sample wet path and dry/wet mix
//! - [`output`]: DC blocking, low-pass and clamp on the final signal
//! - [`processor`]: Audio-thread half
//! - [`control_loop`]: Control-thread half
//!
//! [`engine_pair`] builds the two halves connected by lock-free rings for
//! hosts that drive audio themselves. [`EffectsEngine`] wraps both halves
//! around the default CPAL devices.

use rtrb::RingBuffer;

use crate::engine::audio_stream::{AudioStreamHandle, create_audio_streams, start_streams};

pub mod audio_stream;
pub mod bank_patch;
pub mod config;
pub mod constants;
pub mod control_loop;
pub mod controls;
pub mod dsp;
pub mod errors;
pub mod frame_engine;
pub mod mapping;
pub mod output;
pub mod patches;
pub mod processor;
pub mod tap_tempo;
pub mod transition;

pub use config::EngineConfig;
pub use control_loop::{ControlLoop, RawInputs, UiSnapshot};
pub use errors::{ConfigError, EngineError};
pub use processor::AudioProcessor;

/// Build the control-thread and audio-thread halves for `config`.
pub fn engine_pair(config: &EngineConfig) -> (ControlLoop, AudioProcessor) {
    let (control_tx, control_rx) = RingBuffer::new(config.message_capacity);
    let (audio_tx, audio_rx) = RingBuffer::new(config.message_capacity);
    let sample_rate = config.sample_rate_hz();

    (
        ControlLoop::new(sample_rate, control_tx, audio_rx),
        AudioProcessor::new(sample_rate, control_rx, audio_tx),
    )
}

/// Effects engine driving the default audio devices.
pub struct EffectsEngine {
    config: EngineConfig,
    control: ControlLoop,
    processor: Option<AudioProcessor>,
    stream_handle: Option<AudioStreamHandle>,
}

impl EffectsEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let (control, processor) = engine_pair(&config);

        Ok(Self {
            config,
            control,
            processor: Some(processor),
            stream_handle: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.stream_handle.is_some()
    }

    /// Open the default devices and start processing.
    ///
    /// The audio half moves into the stream callback, so an engine can only
    /// run once.
    pub fn run(&mut self) -> Result<(), EngineError> {
        if self.stream_handle.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let processor = self
            .processor
            .take()
            .ok_or(EngineError::ProcessorConsumed)?;
        let handle = create_audio_streams(&self.config, processor)?;
        start_streams(&handle)?;
        self.stream_handle = Some(handle);
        Ok(())
    }

    /// Stop and close the streams.
    pub fn shut_down(&mut self) {
        if self.stream_handle.take().is_some() {
            log::info!("Effects engine stopped");
        }
    }

    /// Run one control iteration; see [`ControlLoop::tick`].
    pub fn tick(&mut self, inputs: &RawInputs, now_ms: u64) -> UiSnapshot {
        self.control.tick(inputs, now_ms)
    }

    pub fn snapshot(&self, now_ms: u64) -> UiSnapshot {
        self.control.snapshot(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bank_patch::{Bank, PatchId, UiLevel};
    use crate::engine::constants::PATCH_FADE_SAMPLES;
    use crate::engine::frame_engine::AudioFrameEngine;
    use crate::engine::patches::Patch;
    use crate::messages::ControlFrame;

    const SR: f32 = 48_000.0;
    const FRAMES_PER_MS: usize = 48;

    /// Both halves on one thread with a 1 ms control tick.
    struct Rig {
        control: ControlLoop,
        processor: AudioProcessor,
        now_ms: u64,
    }

    impl Rig {
        fn new() -> Self {
            let config = EngineConfig {
                message_capacity: 4096,
                ..EngineConfig::default()
            };
            let (control, processor) = engine_pair(&config);
            Self {
                control,
                processor,
                now_ms: 0,
            }
        }

        /// Tick the control loop for `ms` milliseconds, delivering messages
        /// without rendering audio.
        fn hold(&mut self, inputs: RawInputs, ms: u64) {
            for _ in 0..ms {
                self.control.tick(&inputs, self.now_ms);
                self.processor.process_messages();
                self.now_ms += 1;
            }
        }

        fn short_press(&mut self, inputs: RawInputs) {
            self.hold(RawInputs { button_pressed: true, ..inputs }, 100);
            self.hold(inputs, 100);
        }

        fn long_press(&mut self, inputs: RawInputs) {
            self.hold(RawInputs { button_pressed: true, ..inputs }, 1_000);
            self.hold(inputs, 100);
        }
    }

    fn sine(n: usize, amplitude: f32) -> f32 {
        amplitude * (std::f32::consts::TAU * 1_000.0 * n as f32 / SR).sin()
    }

    fn rms(xs: &[f32]) -> f32 {
        (xs.iter().map(|x| x * x).sum::<f32>() / xs.len() as f32).sqrt()
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let result = EffectsEngine::new(EngineConfig::default().with_block_size(0));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_engine_facade_ticks_without_streams() {
        let mut engine = EffectsEngine::new(EngineConfig::default()).unwrap();
        assert!(!engine.is_running());

        let snapshot = engine.tick(&RawInputs::default(), 0);
        assert_eq!(snapshot.patch_name, "A1 Classic");
        assert_eq!(snapshot.level, UiLevel::Patch);
        assert_eq!(engine.snapshot(0).active, PatchId::new(Bank::A, 0));

        engine.shut_down();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_short_press_commits_next_patch_and_fades_in() {
        let mut rig = Rig::new();
        let idle = RawInputs {
            pots: [0.5, 0.5, 0.5],
            ..RawInputs::default()
        };
        rig.hold(idle, 500);
        rig.short_press(idle);

        let engine = rig.processor.engine();
        assert_eq!(engine.active(), PatchId::new(Bank::A, 1));
        assert_eq!(engine.patch(), Patch::Plate);
        assert_eq!(engine.transition().fade_remaining(), PATCH_FADE_SAMPLES);

        // The fade gain climbs linearly from 0 to 1 over exactly the fade length.
        for k in 0..=PATCH_FADE_SAMPLES {
            let fade = rig.processor.engine().transition().current_gains().fade;
            let expected = k as f32 / PATCH_FADE_SAMPLES as f32;
            assert!((fade - expected).abs() < 1e-6);
            rig.processor.process_frame(sine(k as usize, 0.5), sine(k as usize, 0.5));
        }
        assert_eq!(rig.processor.engine().transition().fade_remaining(), 0);

        // The acknowledgement reaches the UI on the next tick.
        let snapshot = rig.control.tick(&idle, rig.now_ms);
        assert_eq!(snapshot.engaged, Some(PatchId::new(Bank::A, 1)));
        assert_eq!(snapshot.patch_name, "A2 Plate");
    }

    #[test]
    fn test_wet_contribution_rises_through_fade() {
        // B3 MultiTap at its shortest base time has a first tap at 1440
        // samples, inside the 2048-sample fade. Fully wet, full width: the
        // left output is that tap scaled by the fade.
        let mut rig = Rig::new();
        let inputs = RawInputs {
            pots: [1.0, 0.0, 1.0],
            cv_volts: [-5.0, -5.0],
            button_pressed: false,
        };
        rig.hold(inputs, 1_000);
        rig.long_press(inputs);
        rig.short_press(inputs);
        rig.long_press(inputs);
        rig.short_press(inputs);
        rig.short_press(inputs);
        rig.hold(inputs, 1_000);

        // The last commit was B3; no audio has run since, so its fade is intact.
        assert_eq!(rig.processor.engine().patch(), Patch::MultiTap);
        assert!((rig.processor.engine().controls().mix - 1.0).abs() < 1e-5);

        let total = 2_400;
        let left: Vec<f32> = (0..total)
            .map(|n| rig.processor.process_frame(sine(n, 0.5), sine(n, 0.5)).0)
            .collect();

        // Silent before the first tap arrives.
        assert!(rms(&left[..1_400]) < 1e-4);

        let window = 96;
        let fading: Vec<f32> = (1_536..2_048)
            .step_by(window)
            .map(|start| rms(&left[start..start + window]))
            .collect();
        for pair in fading.windows(2) {
            assert!(pair[1] > pair[0], "wet RMS fell during fade: {fading:?}");
        }

        let full = rms(&left[2_048..2_048 + 3 * window]);
        let expected = 0.5 / 2.0_f32.sqrt();
        assert!((full - expected).abs() < 0.03 * expected);
        assert!(fading[0] < full);
    }

    #[test]
    fn test_tap_train_sets_delay_time() {
        let mut rig = Rig::new();
        let inputs = RawInputs {
            pots: [0.5, 0.5, 0.5],
            ..RawInputs::default()
        };
        rig.hold(inputs, 500);
        rig.long_press(inputs);
        rig.short_press(inputs);
        rig.long_press(inputs);
        assert_eq!(rig.control.selection().active(), PatchId::new(Bank::B, 0));

        let mut input = vec![0.0; FRAMES_PER_MS * 2];
        let mut output = vec![0.0; FRAMES_PER_MS * 2];
        let mut ms = 0;

        // 120 BPM gate for three beats, then one more beat of listening.
        while ms < 2_000 {
            let gate = if ms % 500 < 10 && ms < 1_500 { 5.0 } else { 0.0 };
            let raw = RawInputs {
                cv_volts: [0.0, gate],
                ..inputs
            };
            rig.control.tick(&raw, rig.now_ms);
            for (i, s) in input.iter_mut().enumerate() {
                *s = sine(ms * FRAMES_PER_MS + i / 2, 0.3);
            }
            rig.processor.render(&input, 2, &mut output, 2);
            rig.now_ms += 1;
            ms += 1;
        }

        let snapshot = rig.control.snapshot(rig.now_ms);
        assert!(snapshot.tap_armed);
        let delay = rig.processor.engine().resources().delay_time_samples();
        assert!((delay - 0.5 * SR).abs() < 1.0, "delay settled at {delay}");
    }

    #[test]
    fn test_settled_controls_resolve_identically() {
        let mut rig = Rig::new();
        let inputs = RawInputs {
            pots: [0.25, 0.75, 0.4],
            cv_volts: [1.0, -1.0],
            button_pressed: false,
        };
        rig.hold(inputs, 5_000);

        let first = rig.control.control_frame();
        rig.hold(inputs, 1);
        assert_eq!(rig.control.control_frame(), first);
    }

    #[test]
    fn test_steady_state_processing_has_no_drift() {
        // With the fade finished and a silent input, a reset patch must keep
        // returning exactly the same output.
        let (_control, mut processor) = engine_pair(&EngineConfig::default());
        for _ in 0..PATCH_FADE_SAMPLES {
            processor.process_frame(0.0, 0.0);
        }
        let first = processor.process_frame(0.0, 0.0);
        for _ in 0..10_000 {
            assert_eq!(processor.process_frame(0.0, 0.0), first);
        }
    }

    #[test]
    fn test_constant_input_through_dry_path_has_no_drift() {
        // At mix 0 the mixed output is the dry input, whatever the patch's
        // delay lines and reverb are doing with the constant.
        let dry = ControlFrame {
            mix: 0.0,
            time: 0.5,
            tone: 0.5,
            tap_samples: None,
        };
        for patch in Patch::ALL {
            let mut engine = AudioFrameEngine::new(SR);
            engine.set_controls(dry);
            engine.commit(patch.id());
            for _ in 0..PATCH_FADE_SAMPLES {
                engine.process_frame(0.3, -0.2);
            }
            for _ in 0..10_000 {
                assert_eq!(engine.process_frame(0.3, -0.2), (0.3, -0.2), "{}", patch.name());
            }
        }
    }
}
