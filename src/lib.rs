//! Stereo multi-effects engine: two banks of four reverb and delay patches
//! driven by three pots, two CV inputs, a tap gate and a single button.

pub mod engine;
pub mod messages;

pub use engine::{
    AudioProcessor, ConfigError, ControlLoop, EffectsEngine, EngineConfig, EngineError, RawInputs,
    UiSnapshot, engine_pair,
};
pub use messages::{AudioMessage, ControlFrame, ControlMessage};
