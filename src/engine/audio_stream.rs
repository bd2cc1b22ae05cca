//! Audio Stream Module
//!
//! This module handles CPAL audio stream management including:
//! - Input and output stream initialization and configuration
//! - Forwarding captured samples to the output callback through a lock-free ring
//! - Running the [`AudioProcessor`] inside the output callback
//! - Error handling for audio stream operations

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Stream, StreamConfig};
use env_logger::{Builder, Env};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::engine::config::EngineConfig;
use crate::engine::errors::EngineError;
use crate::engine::processor::AudioProcessor;

/// Blocks of captured audio the input ring can buffer.
const INPUT_RING_BLOCKS: usize = 8;

/// Handle to the running duplex streams. Dropping it stops audio.
pub struct AudioStreamHandle {
    pub input: Stream,
    pub output: Stream,
    pub input_channels: usize,
    pub output_channels: usize,
    pub sample_rate: u32,
}

/// Setup and configure the logger for audio operations
pub fn setup_logger() {
    // Users can override via `RUST_LOG`, e.g. `RUST_LOG=debug` to see tap events.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}

/// Create the input and output streams for `processor`.
///
/// This function:
/// 1. Opens the default input and output devices
/// 2. Configures both streams at the engine's sample rate and block size
/// 3. Connects them through a sample ring buffer
/// 4. Moves the processor into the output callback
pub fn create_audio_streams(
    config: &EngineConfig,
    processor: AudioProcessor,
) -> Result<AudioStreamHandle, EngineError> {
    setup_logger();

    let host = cpal::default_host();
    let input_device = host
        .default_input_device()
        .ok_or(EngineError::NoInputDevice)?;
    let output_device = host
        .default_output_device()
        .ok_or(EngineError::NoOutputDevice)?;

    let input_channels = input_device.default_input_config()?.channels();
    let output_channels = output_device.default_output_config()?.channels();
    if output_channels < 2 {
        return Err(EngineError::UnsupportedChannels {
            channels: output_channels,
        });
    }
    if input_channels == 0 {
        return Err(EngineError::UnsupportedChannels {
            channels: input_channels,
        });
    }

    let sample_rate = config.sample_rate;
    let block_size = config.block_size;

    log::info!(
        "Starting effects engine... ({} in / {} out ch@{} Hz, {} frames)",
        input_channels,
        output_channels,
        sample_rate,
        block_size
    );

    let in_ch = input_channels as usize;
    let out_ch = output_channels as usize;

    let (mut sample_tx, sample_rx) = RingBuffer::new(block_size * in_ch * INPUT_RING_BLOCKS);

    let input_config = StreamConfig {
        channels: input_channels,
        sample_rate,
        buffer_size: BufferSize::Fixed(block_size as u32),
    };
    let output_config = StreamConfig {
        channels: output_channels,
        sample_rate,
        buffer_size: BufferSize::Fixed(block_size as u32),
    };

    let input = input_device.build_input_stream(
        &input_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            push_input(&mut sample_tx, data);
        },
        |err| {
            log::error!("Audio input stream error: {}", err);
        },
        None,
    )?;

    let mut callback = OutputCallback::new(processor, sample_rx, in_ch, out_ch, block_size);
    let output = output_device.build_output_stream(
        &output_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            callback.render(data);
        },
        |err| {
            log::error!("Audio output stream error: {}", err);
        },
        None,
    )?;

    Ok(AudioStreamHandle {
        input,
        output,
        input_channels: in_ch,
        output_channels: out_ch,
        sample_rate,
    })
}

/// Start playing both streams
pub fn start_streams(handle: &AudioStreamHandle) -> Result<(), EngineError> {
    handle.input.play()?;
    handle.output.play()?;
    Ok(())
}

/// Forward a captured buffer, or drop it whole if the ring cannot take it.
///
/// Dropping whole buffers keeps the ring aligned on frame boundaries.
fn push_input(sample_tx: &mut Producer<f32>, data: &[f32]) {
    if sample_tx.slots() < data.len() {
        return;
    }
    for &sample in data {
        let _ = sample_tx.push(sample);
    }
}

/// State moved into the output callback.
struct OutputCallback {
    processor: AudioProcessor,
    sample_rx: Consumer<f32>,
    scratch: Vec<f32>,
    input_channels: usize,
    output_channels: usize,
}

impl OutputCallback {
    fn new(
        processor: AudioProcessor,
        sample_rx: Consumer<f32>,
        input_channels: usize,
        output_channels: usize,
        block_size: usize,
    ) -> Self {
        Self {
            processor,
            sample_rx,
            scratch: vec![0.0; block_size.max(1) * input_channels],
            input_channels,
            output_channels,
        }
    }

    fn render(&mut self, data: &mut [f32]) {
        let scratch_frames = self.scratch.len() / self.input_channels;
        let mut remaining = data;

        // Drivers may ask for more than the configured block; work in scratch-sized chunks.
        while !remaining.is_empty() {
            let frames = (remaining.len() / self.output_channels).min(scratch_frames);
            if frames == 0 {
                remaining.fill(0.0);
                break;
            }

            let (chunk, rest) =
                std::mem::take(&mut remaining).split_at_mut(frames * self.output_channels);
            let input = &mut self.scratch[..frames * self.input_channels];
            pop_input(&mut self.sample_rx, input, self.input_channels);

            self.processor
                .render(input, self.input_channels, chunk, self.output_channels);
            remaining = rest;
        }
    }
}

/// Fill `input` with whole captured frames; missing frames are silence.
fn pop_input(sample_rx: &mut Consumer<f32>, input: &mut [f32], channels: usize) {
    let available = (sample_rx.slots() / channels) * channels;
    let take = available.min(input.len());

    for slot in &mut input[..take] {
        *slot = sample_rx.pop().unwrap_or(0.0);
    }
    input[take..].fill(0.0);
}
