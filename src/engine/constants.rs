//! Engine timing constants, thresholds and safe parameter ranges.

/// Number of banks selectable from the button.
pub const NUM_BANKS: usize = 2;

/// Number of patches in each bank.
pub const PATCHES_PER_BANK: usize = 4;

/// Total number of patches.
pub const NUM_PATCHES: usize = NUM_BANKS * PATCHES_PER_BANK;

/// Raw button level must be stable this long before it is accepted.
pub const BUTTON_DEBOUNCE_MS: u64 = 25;

/// Holding the button at least this long is a long press.
pub const BUTTON_LONG_PRESS_MS: u64 = 800;

/// Per-tick exponential smoothing factor for the potentiometers.
pub const POT_SMOOTHING_ALPHA: f32 = 0.02;

/// CV1 smoothing factor while the voltage rises.
pub const CV1_RISE_ALPHA: f32 = 0.05;

/// CV1 smoothing factor while the voltage falls.
pub const CV1_FALL_ALPHA: f32 = 0.08;

/// CV2 smoothing factor while the voltage rises.
pub const CV2_RISE_ALPHA: f32 = 0.10;

/// CV2 smoothing factor while the voltage falls.
pub const CV2_FALL_ALPHA: f32 = 0.07;

/// Pot level at or below which a channel hands control to its CV input.
pub const TAKEOVER_EPS_ON: f32 = 0.015;

/// Pot level at or above which a channel takes control back from CV.
pub const TAKEOVER_EPS_OFF: f32 = 0.030;

/// Half-range of the bipolar CV inputs in volts.
pub const CV_RANGE_VOLTS: f32 = 5.0;

/// Gate voltage that counts as a rising tap edge.
pub const TAP_HIGH_VOLTS: f32 = 1.5;

/// Gate voltage that re-arms edge detection after a tap.
pub const TAP_LOW_VOLTS: f32 = 1.0;

/// Shortest accepted interval between taps (exclusive).
pub const TAP_MIN_INTERVAL_MS: u64 = 50;

/// Longest accepted interval between taps (exclusive).
pub const TAP_MAX_INTERVAL_MS: u64 = 2000;

/// A tap estimate expires when no edge arrives for longer than this.
pub const TAP_EXPIRY_MS: u64 = 1800;

/// How long the "recently tapped" flag stays up after an edge.
pub const TAP_FLASH_MS: u64 = 200;

/// Length of the wet fade applied after every patch commit, in samples.
pub const PATCH_FADE_SAMPLES: u32 = 2048;

/// Length of the shimmer warm-up ramp, in samples.
pub const SHIMMER_WARMUP_SAMPLES: u32 = 8192;

/// Smoothing coefficient applied per sample to delay and pre-delay lengths.
pub const DELAY_SMOOTHING_COEFF: f32 = 0.0015;

/// Shortest delay length handed to a delay primitive, in samples.
pub const MIN_DELAY_SAMPLES: f32 = 10.0;

/// Capacity of the long stereo delay line, in seconds.
pub const LONG_DELAY_SECONDS: f32 = 2.0;

/// Capacity of the plate pre-delay lines, in seconds.
pub const PLATE_PREDELAY_SECONDS: f32 = 0.25;

/// Capacity of the tank pre-delay lines, in seconds.
pub const TANK_PREDELAY_SECONDS: f32 = 1.0 / 3.0;

/// Capacity of the tank modulation lines, in seconds.
pub const TANK_MOD_SECONDS: f32 = 0.025;

/// Safe range for reverb feedback coefficients.
pub const REVERB_FEEDBACK_MIN: f32 = 0.0;
pub const REVERB_FEEDBACK_MAX: f32 = 0.99;

/// Safe range for delay feedback amounts.
pub const DELAY_FEEDBACK_MAX: f32 = 0.90;

/// Lowest cutoff accepted by any filter, in Hz.
pub const CUTOFF_MIN_HZ: f32 = 20.0;

/// Pole radius of the output DC blocker.
pub const DC_BLOCK_R: f32 = 0.995;

/// Cutoff of the output low-pass filter, in Hz.
pub const OUTPUT_LPF_HZ: f32 = 14_500.0;

/// Output hard-clamp headroom (full scale is 1.0).
pub const OUTPUT_HEADROOM: f32 = 1.2;

/// Smoothed pot movement that counts as a user interaction.
pub const UI_CHANGE_EPS: f32 = 0.005;

/// The display sleeps after this long without user interaction.
pub const UI_IDLE_SLEEP_MS: u64 = 15_000;
