//! Audio-thread half of the engine.
//!
//! Drains pending control messages at the start of every block, then runs the
//! frame engine and the output conditioner sample by sample. Nothing here
//! allocates, locks or logs.

use cpal::Sample;
use rtrb::{Consumer, Producer};

use crate::engine::frame_engine::AudioFrameEngine;
use crate::engine::output::OutputConditioner;
use crate::messages::{AudioMessage, ControlMessage};

pub struct AudioProcessor {
    engine: AudioFrameEngine,
    output: OutputConditioner,
    control_rx: Consumer<ControlMessage>,
    audio_tx: Producer<AudioMessage>,
}

impl AudioProcessor {
    pub(crate) fn new(
        sample_rate: f32,
        control_rx: Consumer<ControlMessage>,
        audio_tx: Producer<AudioMessage>,
    ) -> Self {
        Self {
            engine: AudioFrameEngine::new(sample_rate),
            output: OutputConditioner::new(sample_rate),
            control_rx,
            audio_tx,
        }
    }

    pub fn engine(&self) -> &AudioFrameEngine {
        &self.engine
    }

    /// Apply every queued control message.
    ///
    /// Patch commits reset the DSP and arm the fade here, on the audio
    /// thread, so the new topology never runs on stale buffers.
    pub fn process_messages(&mut self) {
        while let Ok(message) = self.control_rx.pop() {
            match message {
                ControlMessage::Controls(frame) => {
                    self.engine.set_controls(frame);
                }
                ControlMessage::CommitPatch(patch) => {
                    self.engine.commit(patch);
                    let _ = self.audio_tx.push(AudioMessage::PatchEngaged { patch });
                }
            }
        }
    }

    /// One fully processed output sample.
    #[inline]
    pub fn process_frame(&mut self, dry_l: f32, dry_r: f32) -> (f32, f32) {
        let (l, r) = self.engine.process_frame(dry_l, dry_r);
        self.output.process(l, r)
    }

    /// Render one interleaved block.
    ///
    /// # Parameters
    /// - `input`: Interleaved capture samples; missing frames read as silence
    /// - `input_channels`: Channels per input frame (mono input is duplicated)
    /// - `output`: Interleaved output buffer to fill
    /// - `output_channels`: Channels per output frame; channels past the
    ///   second are left silent, a mono output gets the average
    pub fn render(
        &mut self,
        input: &[f32],
        input_channels: usize,
        output: &mut [f32],
        output_channels: usize,
    ) {
        self.process_messages();
        output.fill(Sample::EQUILIBRIUM);

        if output_channels == 0 {
            return;
        }

        for (i, out_frame) in output.chunks_exact_mut(output_channels).enumerate() {
            let (dry_l, dry_r) = input_frame(input, input_channels, i);
            let (l, r) = self.process_frame(dry_l, dry_r);

            if output_channels == 1 {
                out_frame[0] = 0.5 * (l + r);
            } else {
                out_frame[0] = l;
                out_frame[1] = r;
            }
        }
    }
}

#[inline]
fn input_frame(input: &[f32], channels: usize, frame: usize) -> (f32, f32) {
    if channels == 0 {
        return (0.0, 0.0);
    }

    let start = frame * channels;
    match input.get(start..start + channels) {
        Some(samples) if channels == 1 => (samples[0], samples[0]),
        Some(samples) => (samples[0], samples[1]),
        None => (0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bank_patch::{Bank, PatchId};
    use crate::messages::ControlFrame;
    use rtrb::RingBuffer;

    const SR: f32 = 48_000.0;

    fn processor() -> (
        AudioProcessor,
        Producer<ControlMessage>,
        Consumer<AudioMessage>,
    ) {
        let (control_tx, control_rx) = RingBuffer::new(64);
        let (audio_tx, audio_rx) = RingBuffer::new(64);
        (AudioProcessor::new(SR, control_rx, audio_tx), control_tx, audio_rx)
    }

    #[test]
    fn test_render_silence() {
        let (mut proc, _tx, _rx) = processor();
        let input = vec![0.0; 256];
        let mut output = vec![1.0; 256];
        proc.render(&input, 2, &mut output, 2);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_commit_is_applied_and_acknowledged() {
        let (mut proc, mut tx, mut rx) = processor();
        let patch = PatchId::new(Bank::B, 3);
        tx.push(ControlMessage::CommitPatch(patch)).unwrap();

        let mut output = vec![0.0; 64];
        proc.render(&[], 2, &mut output, 2);

        assert_eq!(proc.engine().active(), patch);
        assert_eq!(rx.pop(), Ok(AudioMessage::PatchEngaged { patch }));
    }

    #[test]
    fn test_latest_controls_win() {
        let (mut proc, mut tx, _rx) = processor();
        for mix in [0.1, 0.2, 0.3] {
            let frame = ControlFrame {
                mix,
                ..ControlFrame::default()
            };
            tx.push(ControlMessage::Controls(frame)).unwrap();
        }
        proc.process_messages();
        assert_eq!(proc.engine().controls().mix, 0.3);
    }

    #[test]
    fn test_mono_input_is_duplicated() {
        let (mut proc, _tx, _rx) = processor();
        // Mix 0: output is the conditioned dry signal.
        let input: Vec<f32> = (0..128).map(|i| (i as f32 * 0.2).sin() * 0.5).collect();
        let mut output = vec![0.0; 256];
        proc.render(&input, 1, &mut output, 2);

        for frame in output.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(output.iter().any(|&s| s.abs() > 0.1));
    }

    #[test]
    fn test_extra_output_channels_stay_silent() {
        let (mut proc, _tx, _rx) = processor();
        let input = vec![0.5; 64];
        let mut output = vec![1.0; 128];
        proc.render(&input, 2, &mut output, 4);

        for frame in output.chunks_exact(4) {
            assert_eq!(frame[2], 0.0);
            assert_eq!(frame[3], 0.0);
        }
    }

    #[test]
    fn test_short_input_reads_as_silence() {
        assert_eq!(input_frame(&[0.1, 0.2], 2, 0), (0.1, 0.2));
        assert_eq!(input_frame(&[0.1, 0.2], 2, 1), (0.0, 0.0));
        assert_eq!(input_frame(&[0.3], 1, 0), (0.3, 0.3));
        assert_eq!(input_frame(&[0.3], 0, 0), (0.0, 0.0));
    }
}
