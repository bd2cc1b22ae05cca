/// Circular delay buffer with linearly interpolated fractional reads.
///
/// Reads are expected before the write of the same sample: with a delay of
/// `d`, `read()` returns what was written `d` calls to `write()` ago.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    delay: f32,
}

impl DelayLine {
    /// Allocates `capacity` samples (minimum 2).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            delay: 1.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Longest delay that can be read back.
    pub fn max_delay(&self) -> f32 {
        (self.buffer.len() - 1) as f32
    }

    /// Zero the buffer in place.
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Set the delay in samples, clamped to `[1, max_delay]`.
    pub fn set_delay(&mut self, samples: f32) {
        self.delay = self.clamp_delay(samples);
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    #[inline]
    pub fn read(&self) -> f32 {
        self.read_at(self.delay)
    }

    /// Read at an arbitrary delay without changing the stored one.
    #[inline]
    pub fn read_at(&self, samples: f32) -> f32 {
        let delay = self.clamp_delay(samples);
        let whole = delay.floor();
        let frac = delay - whole;

        let a = self.tap(whole as usize);
        let b = self.tap(whole as usize + 1);
        a + (b - a) * frac
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }
    }

    #[inline]
    fn tap(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.min(len - 1);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    #[inline]
    fn clamp_delay(&self, samples: f32) -> f32 {
        if samples.is_finite() {
            samples.clamp(1.0, self.max_delay())
        } else {
            1.0
        }
    }
}
