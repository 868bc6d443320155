use std::collections::VecDeque;

/// Bounded sliding window of recent PCM samples awaiting detection.
///
/// Append-only from the capture side; once capacity is exceeded the oldest
/// samples are discarded first. The owning session tracks its scan offset
/// into this buffer and compensates for evictions.
#[derive(Debug)]
pub struct RingBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append captured samples, evicting oldest beyond capacity.
    /// Returns how many samples were evicted.
    pub fn push(&mut self, new_samples: &[f32]) -> usize {
        self.samples.extend(new_samples.iter().copied());
        let mut evicted = 0;
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Copy the window starting at `start` into `out`. Returns false when
    /// the buffer does not yet hold enough samples.
    pub fn copy_window(&self, start: usize, out: &mut [f32]) -> bool {
        if start + out.len() > self.samples.len() {
            return false;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.samples[start + i];
        }
        true
    }

    /// Change capacity in place, evicting oldest samples if the new bound
    /// is already exceeded. Returns how many samples were evicted.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity;
        let mut evicted = 0;
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    #[cfg(test)]
    fn get(&self, index: usize) -> f32 {
        self.samples[index]
    }
}
