//! The eight effect patches and the DSP state they share.
//!
//! A patch is a closed set of signal paths selected through [`PATCH_TABLE`].
//! Every patch maps the three unit controls to its own DSP ranges and
//! processes one stereo sample at a time against [`DspResources`], which owns
//! all buffers and is reset in place on every commit.
//!
//! Control mapping per patch (`time` = P2, `tone` = P3):
//!
//! | Patch    | P2                                  | P3                                 |
//! |----------|-------------------------------------|------------------------------------|
//! | Classic  | feedback 0.70..0.98                 | damping 1..18 kHz                  |
//! | Plate    | predelay 10..80 ms (exp), feedback  | damping 12..18 kHz                 |
//! | Tank     | predelay 30..200 ms (exp), feedback | damping 12..3 kHz (inverted)       |
//! | Shimmer  | feedback 0.75..0.98                 | damping 1.5..16 kHz, shimmer level |
//! | Ping     | time 10..800 ms (exp) or tap        | cross feedback                     |
//! | Tape     | time 20..800 ms (exp) or tap        | filtered feedback                  |
//! | MultiTap | base 60..900 ms (exp) or tap        | stereo width                       |
//! | EchoVerb | time 30..900 ms (exp) or tap        | feedback, reverb send and damping  |

use crate::engine::bank_patch::{Bank, PatchId};
use crate::engine::constants::{
    DELAY_FEEDBACK_MAX, DELAY_SMOOTHING_COEFF, LONG_DELAY_SECONDS, MIN_DELAY_SAMPLES, NUM_BANKS,
    NUM_PATCHES, PATCHES_PER_BANK, PLATE_PREDELAY_SECONDS, TANK_MOD_SECONDS, TANK_PREDELAY_SECONDS,
};
use crate::engine::dsp::{
    DelayLine, OnePoleLowPass, PitchShifter, ReverbTank, advance_phase, seconds_to_capacity,
    sin_cycle,
};
use crate::engine::mapping::{clamp01, map_exp01, map_lin01, ms_to_samples, one_pole_toward};
use crate::messages::ControlFrame;

const SHIMMER_SEMITONES: f32 = 12.0;
const SHIMMER_SEND: f32 = 0.7;

const TANK_MOD_RATE_HZ: f32 = 0.15;
const TANK_MOD_CENTER_SECONDS: f32 = 0.006;
const TANK_MOD_DEPTH_SECONDS: f32 = 0.002;
const TANK_MOD_STEREO_OFFSET: f32 = 0.3;
const TANK_MOD_MIN_SAMPLES: f32 = 4.0;

const TAPE_WOW_RATE_HZ: f32 = 0.6;
const TAPE_WOW_DEPTH: f32 = 0.0025;

const MULTITAP_RATIOS: [f32; 3] = [0.5, 1.0, 1.5];
const MULTITAP_GAINS: [f32; 3] = [1.0, 0.8, 0.6];

const ECHOVERB_FEEDBACK: f32 = 0.88;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Patch {
    Classic,
    Plate,
    Tank,
    Shimmer,
    Ping,
    Tape,
    MultiTap,
    EchoVerb,
}

/// Dispatch table indexed by `[bank][index]`.
pub const PATCH_TABLE: [[Patch; PATCHES_PER_BANK]; NUM_BANKS] = [
    [Patch::Classic, Patch::Plate, Patch::Tank, Patch::Shimmer],
    [Patch::Ping, Patch::Tape, Patch::MultiTap, Patch::EchoVerb],
];

impl Patch {
    pub const ALL: [Patch; NUM_PATCHES] = [
        Patch::Classic,
        Patch::Plate,
        Patch::Tank,
        Patch::Shimmer,
        Patch::Ping,
        Patch::Tape,
        Patch::MultiTap,
        Patch::EchoVerb,
    ];

    pub fn from_id(id: PatchId) -> Self {
        PATCH_TABLE[id.bank().index()][id.index()]
    }

    pub fn id(self) -> PatchId {
        match self {
            Patch::Classic => PatchId::new(Bank::A, 0),
            Patch::Plate => PatchId::new(Bank::A, 1),
            Patch::Tank => PatchId::new(Bank::A, 2),
            Patch::Shimmer => PatchId::new(Bank::A, 3),
            Patch::Ping => PatchId::new(Bank::B, 0),
            Patch::Tape => PatchId::new(Bank::B, 1),
            Patch::MultiTap => PatchId::new(Bank::B, 2),
            Patch::EchoVerb => PatchId::new(Bank::B, 3),
        }
    }

    /// Display name, e.g. `"A3 Tank"`.
    pub fn name(self) -> &'static str {
        match self {
            Patch::Classic => "A1 Classic",
            Patch::Plate => "A2 Plate",
            Patch::Tank => "A3 Tank",
            Patch::Shimmer => "A4 Shimmer",
            Patch::Ping => "B1 Ping",
            Patch::Tape => "B2 Tape",
            Patch::MultiTap => "B3 MultiTap",
            Patch::EchoVerb => "B4 EchoVerb",
        }
    }

    /// Short labels for the Mix, Time and Tone controls.
    pub fn control_labels(self) -> [&'static str; 3] {
        let time = match self {
            Patch::Plate | Patch::Tank => "PreD",
            Patch::Classic | Patch::Shimmer => "Decy",
            _ => "Time",
        };
        let tone = match self {
            Patch::Shimmer => "Shim",
            Patch::Classic | Patch::Plate | Patch::Tank => "Tone",
            Patch::EchoVerb => "Macr",
            _ => "Fdbk",
        };
        ["Mix", time, tone]
    }

    /// Whether a commit to this patch also arms the shimmer warm-up ramp.
    pub fn needs_warmup(self) -> bool {
        matches!(self, Patch::Shimmer)
    }

    pub fn is_delay(self) -> bool {
        self.id().bank().is_delay()
    }

    /// Process one stereo sample and return the wet signal.
    ///
    /// `warmup` scales the secondary shimmer tail and is ignored by every
    /// other patch.
    #[inline]
    pub fn process(
        self,
        res: &mut DspResources,
        controls: &ControlFrame,
        warmup: f32,
        dry_l: f32,
        dry_r: f32,
    ) -> (f32, f32) {
        match self {
            Patch::Classic => classic(res, controls, dry_l, dry_r),
            Patch::Plate => plate(res, controls, dry_l, dry_r),
            Patch::Tank => tank(res, controls, dry_l, dry_r),
            Patch::Shimmer => shimmer(res, controls, warmup, dry_l, dry_r),
            Patch::Ping => ping(res, controls, dry_l, dry_r),
            Patch::Tape => tape(res, controls, dry_l, dry_r),
            Patch::MultiTap => multitap(res, controls, dry_l, dry_r),
            Patch::EchoVerb => echoverb(res, controls, dry_l, dry_r),
        }
    }
}

/// Delay length that follows its target through a one-pole smoother.
///
/// The first value after a reset jumps straight to the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmoothedDelay {
    value: f32,
    primed: bool,
}

impl SmoothedDelay {
    #[inline]
    pub fn advance(&mut self, target: f32) -> f32 {
        if self.primed {
            one_pole_toward(&mut self.value, target, DELAY_SMOOTHING_COEFF);
        } else {
            self.value = target;
            self.primed = true;
        }
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.primed = false;
    }
}

/// Buffers and filter memory shared by the patches.
pub struct DspResources {
    sample_rate: f32,
    reverb: ReverbTank,
    plate_predelay: [DelayLine; 2],
    tank_predelay: [DelayLine; 2],
    tank_mod: [DelayLine; 2],
    shifter: PitchShifter,
    delay: [DelayLine; 2],
    feedback_lp: [OnePoleLowPass; 2],
    predelay_time: SmoothedDelay,
    delay_time: SmoothedDelay,
    tank_phase: [f32; 2],
    tape_phase: f32,
}

impl DspResources {
    /// Allocates every buffer for `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        let line = |seconds: f32| DelayLine::new(seconds_to_capacity(seconds, sample_rate));

        let mut shifter = PitchShifter::new(sample_rate);
        shifter.set_transposition(SHIMMER_SEMITONES);

        Self {
            sample_rate,
            reverb: ReverbTank::new(sample_rate),
            plate_predelay: [line(PLATE_PREDELAY_SECONDS), line(PLATE_PREDELAY_SECONDS)],
            tank_predelay: [line(TANK_PREDELAY_SECONDS), line(TANK_PREDELAY_SECONDS)],
            tank_mod: [line(TANK_MOD_SECONDS), line(TANK_MOD_SECONDS)],
            shifter,
            delay: [line(LONG_DELAY_SECONDS), line(LONG_DELAY_SECONDS)],
            feedback_lp: [OnePoleLowPass::default(); 2],
            predelay_time: SmoothedDelay::default(),
            delay_time: SmoothedDelay::default(),
            tank_phase: [0.0, 0.5],
            tape_phase: 0.0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Clear all audio memory and restart modulators. Does not allocate.
    pub fn reset(&mut self) {
        self.reverb.reset();
        for line in self
            .plate_predelay
            .iter_mut()
            .chain(&mut self.tank_predelay)
            .chain(&mut self.tank_mod)
            .chain(&mut self.delay)
        {
            line.reset();
        }
        self.shifter.reset();
        self.shifter.set_transposition(SHIMMER_SEMITONES);
        for lp in &mut self.feedback_lp {
            lp.reset();
        }
        self.predelay_time.reset();
        self.delay_time.reset();
        self.tank_phase = [0.0, 0.5];
        self.tape_phase = 0.0;
    }

    /// Current smoothed length of the long delay, in samples.
    pub fn delay_time_samples(&self) -> f32 {
        self.delay_time.value()
    }

    /// Current smoothed predelay of the plate/tank reverbs, in samples.
    pub fn predelay_samples(&self) -> f32 {
        self.predelay_time.value()
    }

    fn long_delay_max(&self) -> f32 {
        self.delay[0].capacity() as f32 - MIN_DELAY_SAMPLES
    }

    /// Tap estimate if armed, else the exponential knob mapping.
    fn delay_target(&self, controls: &ControlFrame, min_ms: f32, max_ms: f32) -> f32 {
        controls.tap_samples.unwrap_or_else(|| {
            ms_to_samples(map_exp01(controls.time, min_ms, max_ms), self.sample_rate)
        })
    }

    fn set_long_delay(&mut self, samples: f32) {
        for line in &mut self.delay {
            line.set_delay(samples);
        }
    }

    /// Feed the delayed signal through the tone filter.
    fn filtered_feedback(&mut self, coeff: f32, dl: f32, dr: f32) -> (f32, f32) {
        for lp in &mut self.feedback_lp {
            lp.set_coeff(coeff);
        }
        (self.feedback_lp[0].process(dl), self.feedback_lp[1].process(dr))
    }
}

fn clamp_delay(samples: f32, max: f32) -> f32 {
    if samples.is_finite() {
        samples.clamp(MIN_DELAY_SAMPLES, max)
    } else {
        MIN_DELAY_SAMPLES
    }
}

fn clamp_feedback(amount: f32) -> f32 {
    clamp01(amount).min(DELAY_FEEDBACK_MAX)
}

fn classic(res: &mut DspResources, c: &ControlFrame, dry_l: f32, dry_r: f32) -> (f32, f32) {
    res.reverb.set_feedback(map_lin01(c.time, 0.70, 0.98));
    res.reverb.set_lp_freq(map_lin01(c.tone, 1_000.0, 18_000.0));
    res.reverb.process(dry_l, dry_r)
}

fn plate(res: &mut DspResources, c: &ControlFrame, dry_l: f32, dry_r: f32) -> (f32, f32) {
    let pre_ms = map_exp01(c.time, 10.0, 80.0);
    let max = res.plate_predelay[0].max_delay();
    let target = ms_to_samples(pre_ms, res.sample_rate).clamp(1.0, max);
    let pre = res.predelay_time.advance(target);

    let [line_l, line_r] = &mut res.plate_predelay;
    line_l.set_delay(pre);
    line_r.set_delay(pre);
    let in_l = line_l.read();
    let in_r = line_r.read();
    line_l.write(dry_l);
    line_r.write(dry_r);

    res.reverb.set_feedback(map_lin01(0.6 + 0.4 * c.time, 0.75, 0.97));
    res.reverb.set_lp_freq(map_lin01(c.tone, 12_000.0, 18_000.0));
    res.reverb.process(in_l, in_r)
}

fn tank(res: &mut DspResources, c: &ControlFrame, dry_l: f32, dry_r: f32) -> (f32, f32) {
    let sr = res.sample_rate;

    let pre_ms = map_exp01(c.time, 30.0, 200.0);
    let max = res.tank_predelay[0].max_delay();
    let target = ms_to_samples(pre_ms, sr).clamp(1.0, max);
    let pre = res.predelay_time.advance(target);

    let [pre_l, pre_r] = &mut res.tank_predelay;
    pre_l.set_delay(pre);
    pre_r.set_delay(pre);
    let in_l = pre_l.read();
    let in_r = pre_r.read();
    pre_l.write(dry_l);
    pre_r.write(dry_r);

    let rate = TANK_MOD_RATE_HZ / sr;
    for phase in &mut res.tank_phase {
        advance_phase(phase, rate);
    }

    let mod_max = res.tank_mod[0].capacity() as f32 - MIN_DELAY_SAMPLES;
    let mod_delay = |phase: f32| {
        (sr * (TANK_MOD_CENTER_SECONDS + TANK_MOD_DEPTH_SECONDS * sin_cycle(phase)))
            .clamp(TANK_MOD_MIN_SAMPLES, mod_max.max(TANK_MOD_MIN_SAMPLES))
    };
    let delay_l = mod_delay(res.tank_phase[0]);
    let delay_r = mod_delay(res.tank_phase[1] + TANK_MOD_STEREO_OFFSET);

    let [mod_l, mod_r] = &mut res.tank_mod;
    mod_l.set_delay(delay_l);
    mod_r.set_delay(delay_r);
    let moved_l = mod_l.read();
    let moved_r = mod_r.read();
    mod_l.write(in_l);
    mod_r.write(in_r);

    res.reverb.set_feedback(map_lin01(0.5 + 0.5 * c.time, 0.85, 0.985));
    res.reverb.set_lp_freq(map_lin01(1.0 - c.tone, 3_000.0, 12_000.0));
    res.reverb.process(moved_l, moved_r)
}

fn shimmer(
    res: &mut DspResources,
    c: &ControlFrame,
    warmup: f32,
    dry_l: f32,
    dry_r: f32,
) -> (f32, f32) {
    res.reverb.set_feedback(map_lin01(c.time, 0.75, 0.98));
    res.reverb.set_lp_freq(map_lin01(c.tone, 1_500.0, 16_000.0));
    let (verb_l, verb_r) = res.reverb.process(dry_l, dry_r);

    let mono = 0.5 * (verb_l + verb_r);
    let shim = res.shifter.process(mono) * clamp01(c.tone) * clamp01(warmup);

    (verb_l + shim * SHIMMER_SEND, verb_r + shim * SHIMMER_SEND)
}

fn ping(res: &mut DspResources, c: &ControlFrame, dry_l: f32, dry_r: f32) -> (f32, f32) {
    let target = clamp_delay(res.delay_target(c, 10.0, 800.0), res.long_delay_max());
    let time = res.delay_time.advance(target);
    res.set_long_delay(time);

    let dl = res.delay[0].read();
    let dr = res.delay[1].read();
    let fb = clamp_feedback(c.tone);
    res.delay[0].write(dry_l + dr * fb);
    res.delay[1].write(dry_r + dl * fb);

    (dl, dr)
}

fn tape(res: &mut DspResources, c: &ControlFrame, dry_l: f32, dry_r: f32) -> (f32, f32) {
    advance_phase(&mut res.tape_phase, TAPE_WOW_RATE_HZ / res.sample_rate);
    let wow = 1.0 + TAPE_WOW_DEPTH * sin_cycle(res.tape_phase);

    let base = res.delay_target(c, 20.0, 800.0);
    let target = clamp_delay(base * wow, res.long_delay_max());
    let time = res.delay_time.advance(target);
    res.set_long_delay(time);

    let dl = res.delay[0].read();
    let dr = res.delay[1].read();
    let fb = clamp_feedback(c.tone);
    let (fb_l, fb_r) = res.filtered_feedback(map_lin01(fb, 0.10, 0.35), dl, dr);
    res.delay[0].write(dry_l + fb_l * fb);
    res.delay[1].write(dry_r + fb_r * fb);

    (dl, dr)
}

fn multitap(res: &mut DspResources, c: &ControlFrame, dry_l: f32, dry_r: f32) -> (f32, f32) {
    let longest = MULTITAP_RATIOS[MULTITAP_RATIOS.len() - 1];
    let base_max = res.long_delay_max() / longest;
    let target = clamp_delay(res.delay_target(c, 60.0, 900.0), base_max);
    let base = res.delay_time.advance(target);

    res.delay[0].write(dry_l);
    res.delay[1].write(dry_r);

    let width = clamp01(c.tone);
    let max = res.long_delay_max();
    let mut sum_l = 0.0;
    let mut sum_r = 0.0;
    for (t, (ratio, gain)) in MULTITAP_RATIOS.iter().zip(MULTITAP_GAINS).enumerate() {
        let d = clamp_delay(ratio * base, max);
        let x_l = res.delay[0].read_at(d);
        let x_r = res.delay[1].read_at(d);

        let pan = (t as f32 - 1.0) * width;
        let left = if pan <= 0.0 { 1.0 } else { 1.0 - pan };
        let right = if pan >= 0.0 { 1.0 } else { 1.0 + pan };
        sum_l += x_l * gain * left;
        sum_r += x_r * gain * right;
    }

    (sum_l, sum_r)
}

fn echoverb(res: &mut DspResources, c: &ControlFrame, dry_l: f32, dry_r: f32) -> (f32, f32) {
    let target = clamp_delay(res.delay_target(c, 30.0, 900.0), res.long_delay_max());
    let time = res.delay_time.advance(target);
    res.set_long_delay(time);

    let dl = res.delay[0].read();
    let dr = res.delay[1].read();
    let amount = clamp01(c.tone);
    let fb = clamp_feedback(amount);
    let (fb_l, fb_r) = res.filtered_feedback(map_lin01(amount, 0.10, 0.35), dl, dr);
    res.delay[0].write(dry_l + fb_l * fb);
    res.delay[1].write(dry_r + fb_r * fb);

    let send = map_lin01(amount, 0.20, 0.60);
    res.reverb.set_feedback(ECHOVERB_FEEDBACK);
    res.reverb.set_lp_freq(map_lin01(1.0 - amount, 5_000.0, 14_000.0));
    let (verb_l, verb_r) = res.reverb.process(dl * send, dr * send);

    (dl + verb_l, dr + verb_r)
}
