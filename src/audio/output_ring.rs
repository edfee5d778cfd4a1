//! Offset-addressed PCM ring used on the playback side.
//! The device plays from one position while frames are written ahead of it;
//! every lead/lag decision reduces to `offset_delta`.

/// Circular i16 PCM buffer addressed by absolute sample offsets.
pub struct OutputRing {
    samples: Box<[i16]>,
    sample_rate: u32,
    offset_to_seconds: f64,
    /// Next offset to be committed by the writer.
    pub write_pointer: usize,
}

impl Default for OutputRing {
    fn default() -> Self {
        Self {
            samples: Box::default(),
            sample_rate: 0,
            offset_to_seconds: 0.0,
            write_pointer: 0,
        }
    }
}

impl OutputRing {
    pub fn new(sample_rate: u32, buffer_size: usize) -> Self {
        let mut ring = Self::default();
        ring.initialize(sample_rate, buffer_size);
        ring
    }

    /// Allocate `buffer_size` zeroed samples.
    pub fn initialize(&mut self, sample_rate: u32, buffer_size: usize) {
        self.samples = vec![0i16; buffer_size].into_boxed_slice();
        self.sample_rate = sample_rate;
        self.offset_to_seconds = if sample_rate > 0 {
            1.0 / sample_rate as f64
        } else {
            0.0
        };
        self.write_pointer = 0;
    }

    pub fn destroy(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn offset_to_time(&self, offset: usize) -> f64 {
        offset as f64 * self.offset_to_seconds
    }

    /// Forward distance from `from` to `to` in seconds.
    #[inline]
    pub fn time_delta(&self, from: usize, to: usize) -> f64 {
        self.offset_to_time(self.offset_delta(from, to))
    }

    /// Forward distance from `from` to `to`, walking increasing offsets.
    /// Zero when equal; always below the buffer size.
    #[inline]
    pub fn offset_delta(&self, from: usize, to: usize) -> usize {
        let size = self.buffer_size();
        if size == 0 {
            return 0;
        }

        let from = from % size;
        let to = to % size;
        if to >= from {
            to - from
        } else {
            size - from + to
        }
    }

    /// `offset + index` wrapped into the buffer.
    #[inline]
    pub fn buffer_index(&self, offset: usize, index: isize) -> usize {
        let size = self.buffer_size();
        if size == 0 {
            return 0;
        }

        let size_i = size as i128;
        (((offset as i128 + index as i128) % size_i + size_i) % size_i) as usize
    }

    #[inline]
    pub fn write_sample(&mut self, sample: i16, offset: usize, index: isize) {
        if self.samples.is_empty() {
            return;
        }
        let slot = self.buffer_index(offset, index);
        self.samples[slot] = sample;
    }

    #[inline]
    pub fn read_sample(&self, offset: usize, index: isize) -> i16 {
        if self.samples.is_empty() {
            return 0;
        }
        self.samples[self.buffer_index(offset, index)]
    }

    /// Advance the write pointer past `length` freshly written samples.
    #[inline]
    pub fn commit_block(&mut self, length: usize) {
        if self.samples.is_empty() {
            return;
        }
        self.write_pointer = self.buffer_index(self.write_pointer, length as isize);
    }

    /// Copy `dest.len()` samples starting at `offset` into `dest`, clamped to the
    /// buffer size. Returns the number of samples copied.
    pub fn copy_buffer(&self, dest: &mut [i16], offset: usize) -> usize {
        let size = self.buffer_size();
        if size == 0 || dest.is_empty() {
            return 0;
        }

        let length = dest.len().min(size);
        let start = self.buffer_index(offset, 0);
        let first_span = length.min(size - start);
        dest[..first_span].copy_from_slice(&self.samples[start..start + first_span]);

        let remaining = length - first_span;
        if remaining > 0 {
            dest[first_span..length].copy_from_slice(&self.samples[..remaining]);
        }

        length
    }

    /// Whether two consecutive samples, in ring order starting at the write
    /// pointer, differ by more than `threshold`.
    pub fn check_for_discontinuity(&self, threshold: i32) -> bool {
        if self.samples.len() < 2 {
            return false;
        }

        let mut previous = self.read_sample(self.write_pointer, 0) as i32;
        for i in 1..self.samples.len() {
            let sample = self.read_sample(self.write_pointer, i as isize) as i32;
            if (sample - previous).abs() > threshold {
                return true;
            }
            previous = sample;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn offset_delta_wraps_forward() {
        let ring = OutputRing::new(100, 10);
        assert_eq!(ring.offset_delta(3, 3), 0);
        assert_eq!(ring.offset_delta(3, 7), 4);
        assert_eq!(ring.offset_delta(7, 3), 6);
        assert_eq!(ring.offset_delta(9, 0), 1);
        assert_abs_diff_eq!(ring.time_delta(7, 3), 0.06, epsilon = 1e-12);
    }

    #[test]
    fn empty_ring_is_inert() {
        let mut ring = OutputRing::default();
        ring.write_sample(5, 1, 2);
        ring.commit_block(10);
        let mut dest = [7i16; 4];
        assert_eq!(ring.copy_buffer(&mut dest, 0), 0);
        assert_eq!(dest, [7; 4]);
        assert_eq!(ring.offset_delta(1, 2), 0);
        assert_eq!(ring.read_sample(0, 0), 0);
        assert!(!ring.check_for_discontinuity(0));
    }

    #[test]
    fn destroy_then_initialize_starts_fresh() {
        let mut ring = OutputRing::new(44100, 8);
        for i in 0..5 {
            ring.write_sample(100 + i as i16, 0, i);
        }
        ring.commit_block(5);
        assert_eq!(ring.write_pointer, 5);

        ring.destroy();
        assert_eq!(ring.buffer_size(), 0);
        assert_eq!(ring.sample_rate(), 0);
        assert_eq!(ring.write_pointer, 0);
        let mut dest = [7i16; 2];
        assert_eq!(ring.copy_buffer(&mut dest, 0), 0);
        assert_eq!(ring.time_delta(0, 3), 0.0);

        ring.initialize(1000, 4);
        assert_eq!(ring.buffer_size(), 4);
        assert_eq!(ring.write_pointer, 0);
        let mut dest = [7i16; 4];
        assert_eq!(ring.copy_buffer(&mut dest, 0), 4);
        assert_eq!(dest, [0; 4]);
        assert_abs_diff_eq!(ring.time_delta(0, 2), 0.002, epsilon = 1e-12);
    }

    #[test]
    fn negative_index_addresses_backwards() {
        let mut ring = OutputRing::new(44100, 8);
        ring.write_sample(42, 1, -3);
        assert_eq!(ring.read_sample(6, 0), 42);
        assert_eq!(ring.buffer_index(0, -1), 7);
    }

    #[test]
    fn copy_buffer_splits_at_wrap_and_clamps() {
        let mut ring = OutputRing::new(44100, 6);
        for i in 0..6 {
            ring.write_sample(i as i16 * 10, 0, i);
        }

        let mut dest = [0i16; 4];
        assert_eq!(ring.copy_buffer(&mut dest, 4), 4);
        assert_eq!(dest, [40, 50, 0, 10]);

        let mut long = [0i16; 9];
        assert_eq!(ring.copy_buffer(&mut long, 2), 6);
        assert_eq!(&long[..6], &[20, 30, 40, 50, 0, 10]);
        assert_eq!(&long[6..], &[0, 0, 0]);
    }

    #[test]
    fn commit_block_wraps_write_pointer() {
        let mut ring = OutputRing::new(44100, 10);
        ring.write_pointer = 8;
        ring.commit_block(5);
        assert_eq!(ring.write_pointer, 3);
    }

    #[test]
    fn discontinuity_detection() {
        let mut ring = OutputRing::new(44100, 8);
        for i in 0..8 {
            ring.write_sample(i as i16 * 10, 0, i);
        }
        ring.write_pointer = 0;
        assert!(!ring.check_for_discontinuity(10));

        ring.write_sample(1000, 0, 4);
        assert!(ring.check_for_discontinuity(10));
    }

    proptest! {
        #[test]
        fn offset_delta_lands_on_target(size in 1usize..512, a in 0usize..512, b in 0usize..512) {
            let ring = OutputRing::new(44100, size);
            let (a, b) = (a % size, b % size);
            let delta = ring.offset_delta(a, b);
            prop_assert!(delta < size);
            prop_assert_eq!(ring.buffer_index(a, delta as isize), b);
            prop_assert_eq!(ring.offset_delta(a, a), 0);
        }
    }
}
