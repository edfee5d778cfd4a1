//! Generic sample ring buffer: fixed pre-allocated circular storage.
//! Used for the per-channel resampled input and for the rendered PCM output.
//! Never grows. Writing into a full buffer drops the oldest element.

/// Fixed-capacity circular store with independent read and write cursors.
///
/// Occupancy is tracked explicitly, so a full buffer reports `size() == capacity()`
/// rather than aliasing to empty when the cursors meet.
pub struct RingBuffer<T> {
    buffer: Box<[T]>,
    start: usize,
    write_index: usize,
    len: usize,
}

impl<T: Copy + Default> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a buffer holding `capacity` elements. Capacity 0 yields an inert buffer.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![T::default(); capacity].into_boxed_slice(),
            start: 0,
            write_index: 0,
            len: 0,
        }
    }

    /// Reallocate storage for `capacity` elements and reset both cursors.
    pub fn initialize(&mut self, capacity: usize) {
        *self = Self::new(capacity);
    }

    /// Release storage. The buffer becomes inert until initialized again.
    pub fn destroy(&mut self) {
        *self = Self::new(0);
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of unread elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.capacity() > 0 && self.len == self.capacity()
    }

    #[inline]
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Append one element. Overwrites the oldest unread element when full.
    #[inline]
    pub fn write(&mut self, value: T) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }

        self.buffer[self.write_index] = value;
        self.write_index = self.wrap_forward(self.write_index, 1);

        if self.len == capacity {
            self.start = self.write_index;
        } else {
            self.len += 1;
        }
    }

    /// Replace the element `relative_index` positions after the read head.
    #[inline]
    pub fn overwrite(&mut self, value: T, relative_index: usize) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }

        let slot = self.wrap_forward(self.start, relative_index % capacity);
        self.buffer[slot] = value;
    }

    /// Element `relative_index` positions after the read head.
    #[inline]
    pub fn read_at(&self, relative_index: usize) -> T {
        let capacity = self.capacity();
        if capacity == 0 {
            return T::default();
        }

        self.buffer[self.wrap_forward(self.start, relative_index % capacity)]
    }

    /// Copy the oldest unread elements into `target` without consuming them.
    /// Returns the number of elements copied.
    pub fn read(&self, target: &mut [T]) -> usize {
        let n = target.len().min(self.len);
        if n == 0 {
            return 0;
        }

        let first_span = n.min(self.capacity() - self.start);
        target[..first_span].copy_from_slice(&self.buffer[self.start..self.start + first_span]);

        let remaining = n - first_span;
        if remaining > 0 {
            target[first_span..n].copy_from_slice(&self.buffer[..remaining]);
        }

        n
    }

    /// Copy the oldest unread elements into `target` and consume them.
    /// Returns the number of elements copied.
    pub fn read_and_remove(&mut self, target: &mut [T]) -> usize {
        let n = self.read(target);
        self.remove_beginning(n);
        n
    }

    /// Discard up to `n` of the oldest unread elements.
    #[inline]
    pub fn remove_beginning(&mut self, n: usize) {
        if self.capacity() == 0 {
            return;
        }

        let n = n.min(self.len);
        self.start = self.wrap_forward(self.start, n);
        self.len -= n;
    }

    /// Move the write head. Occupancy is recomputed from the cursors; a full
    /// buffer whose cursors still meet stays full.
    pub fn set_write_index(&mut self, write_index: usize) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }

        self.write_index = write_index % capacity;
        self.len = self.occupancy_from_cursors();
    }

    /// Move the read head. Occupancy is recomputed the same way as for
    /// [`set_write_index`](Self::set_write_index).
    pub fn set_start_index(&mut self, start: usize) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }

        self.start = start % capacity;
        self.len = self.occupancy_from_cursors();
    }

    fn occupancy_from_cursors(&self) -> usize {
        let len = self.distance(self.start, self.write_index);
        if len == 0 && self.len == self.capacity() {
            self.capacity()
        } else {
            len
        }
    }

    /// Signed relative addressing: `base + offset` wrapped into `[0, capacity)`.
    #[inline]
    pub fn index(&self, base: usize, offset: isize) -> usize {
        let capacity = self.capacity();
        if capacity == 0 {
            return 0;
        }

        let base = base % capacity;
        let step = offset.unsigned_abs() % capacity;
        if offset >= 0 {
            self.wrap_forward(base, step)
        } else if step <= base {
            base - step
        } else {
            base + capacity - step
        }
    }

    /// Forward distance from cursor `from` to cursor `to`.
    #[inline]
    pub fn distance(&self, from: usize, to: usize) -> usize {
        if to >= from {
            to - from
        } else {
            self.capacity() - from + to
        }
    }

    #[inline]
    fn wrap_forward(&self, base: usize, step: usize) -> usize {
        let raw = base + step;
        if raw >= self.capacity() {
            raw - self.capacity()
        } else {
            raw
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_capacity_is_inert() {
        let mut rb = RingBuffer::<f32>::new(0);
        rb.write(1.0);
        rb.overwrite(2.0, 3);
        rb.remove_beginning(4);

        let mut out = [9.0; 4];
        assert_eq!(rb.read_and_remove(&mut out), 0);
        assert_eq!(out, [9.0; 4]);
        assert_eq!(rb.size(), 0);
        assert_eq!(rb.read_at(0), 0.0);
        assert_eq!(rb.index(3, -7), 0);
    }

    #[test]
    fn full_buffer_reports_capacity() {
        let mut rb = RingBuffer::new(4);
        for i in 0..4 {
            rb.write(i);
        }
        assert!(rb.is_full());
        assert_eq!(rb.size(), 4);
        assert_eq!(rb.write_index(), rb.start());
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut rb = RingBuffer::new(4);
        for i in 0..6 {
            rb.write(i);
        }
        let mut out = [0; 4];
        assert_eq!(rb.read(&mut out), 4);
        assert_eq!(out, [2, 3, 4, 5]);
    }

    #[test]
    fn read_and_remove_across_wrap() {
        let mut rb = RingBuffer::new(5);
        for i in 0..4 {
            rb.write(i);
        }
        rb.remove_beginning(3);
        for i in 4..8 {
            rb.write(i);
        }

        let mut out = [0; 5];
        assert_eq!(rb.read_and_remove(&mut out[..3]), 3);
        assert_eq!(&out[..3], &[3, 4, 5]);
        assert_eq!(rb.size(), 2);
        assert_eq!(rb.read_and_remove(&mut out), 2);
        assert_eq!(&out[..2], &[6, 7]);
        assert!(rb.is_empty());
    }

    #[test]
    fn overwrite_targets_unconsumed_slot() {
        let mut rb = RingBuffer::new(3);
        rb.write(1);
        rb.write(2);
        rb.remove_beginning(1);
        rb.write(3);
        rb.overwrite(20, 0);
        rb.overwrite(30, 4);
        assert_eq!(rb.read_at(0), 20);
        assert_eq!(rb.read_at(1), 30);
    }

    #[test]
    fn set_write_index_recomputes_occupancy() {
        let mut rb = RingBuffer::<i32>::new(4);
        rb.set_write_index(0);
        assert!(rb.is_empty());
        rb.set_write_index(6);
        assert_eq!(rb.write_index(), 2);
        assert_eq!(rb.size(), 2);

        rb.set_write_index(3);
        assert_eq!(rb.size(), 3);
        rb.set_write_index(1);
        assert_eq!(rb.size(), 1);

        let mut full = RingBuffer::new(4);
        for i in 0..4 {
            full.write(i);
        }
        full.set_write_index(full.write_index());
        assert!(full.is_full());
        assert_eq!(full.size(), 4);
        full.set_write_index(3);
        assert_eq!(full.size(), 3);
    }

    #[test]
    fn set_start_index_recomputes_occupancy() {
        let mut rb = RingBuffer::new(4);
        rb.set_start_index(0);
        assert!(rb.is_empty());

        rb.write(10);
        rb.write(11);
        rb.write(12);
        rb.set_start_index(1);
        assert_eq!(rb.size(), 2);
        assert_eq!(rb.read_at(0), 11);
        rb.set_start_index(7);
        assert_eq!(rb.start(), 3);
        assert!(rb.is_empty());

        let mut full = RingBuffer::new(4);
        for i in 0..6 {
            full.write(i);
        }
        full.set_start_index(full.start());
        assert_eq!(full.size(), 4);
        let mut out = [0; 4];
        assert_eq!(full.read(&mut out), 4);
        assert_eq!(out, [2, 3, 4, 5]);
        full.set_start_index(full.start() + 1);
        assert_eq!(full.size(), 3);
    }

    #[test]
    fn destroy_then_initialize_starts_fresh() {
        let mut rb = RingBuffer::new(4);
        for i in 0..3 {
            rb.write(i);
        }
        rb.destroy();
        assert_eq!(rb.capacity(), 0);
        assert!(rb.is_empty());
        rb.write(9);
        assert!(rb.is_empty());

        rb.initialize(3);
        assert_eq!(rb.capacity(), 3);
        assert_eq!((rb.start(), rb.write_index(), rb.size()), (0, 0, 0));
        rb.write(7);
        assert_eq!(rb.read_at(0), 7);

        rb.initialize(2);
        assert_eq!(rb.capacity(), 2);
        assert!(rb.is_empty());
    }

    #[test]
    fn index_wraps_both_directions() {
        let rb = RingBuffer::<i16>::new(8);
        assert_eq!(rb.index(6, 3), 1);
        assert_eq!(rb.index(1, -3), 6);
        assert_eq!(rb.index(2, -2), 0);
        assert_eq!(rb.index(5, 0), 5);
        assert_eq!(rb.index(0, -17), 7);
        assert_eq!(rb.index(7, 17), 0);
    }

    proptest! {
        #[test]
        fn size_after_writes_is_bounded(capacity in 1usize..64, writes in 0usize..200) {
            let mut rb = RingBuffer::new(capacity);
            for i in 0..writes {
                rb.write(i as u32);
            }
            prop_assert_eq!(rb.size(), writes.min(capacity));
        }

        #[test]
        fn read_and_remove_is_fifo(
            capacity in 1usize..32,
            skip in 0usize..40,
            writes in 0usize..40,
            n in 0usize..40,
        ) {
            let mut rb = RingBuffer::new(capacity);
            for i in 0..skip {
                rb.write(i as u32);
            }
            rb.remove_beginning(skip);

            let values: Vec<u32> = (0..writes as u32).map(|v| v + 1000).collect();
            for &v in &values {
                rb.write(v);
            }

            let before = rb.size();
            let mut out = vec![0u32; n];
            let copied = rb.read_and_remove(&mut out);

            prop_assert_eq!(copied, n.min(before));
            prop_assert_eq!(rb.size(), before - copied);
            let oldest = values.len() - before;
            prop_assert_eq!(&out[..copied], &values[oldest..oldest + copied]);
        }

        #[test]
        fn index_round_trips(capacity in 1usize..64, base in 0usize..64, offset in -200isize..200) {
            let rb = RingBuffer::<u8>::new(capacity);
            let base = base % capacity;
            let moved = rb.index(base, offset);
            prop_assert!(moved < capacity);
            prop_assert_eq!(rb.index(moved, -offset), base);
        }
    }
}
