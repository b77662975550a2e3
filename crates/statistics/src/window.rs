use std::collections::VecDeque;

/// Fixed-capacity buffer of the most recent observations.
///
/// Rolling estimators read the buffer as a contiguous slice and recompute
/// from scratch, so no running sums carry over between windows.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    buffer: VecDeque<f64>,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Appends `value`, evicting the oldest observation once full.
    pub fn push(&mut self, value: f64) {
        self.buffer.push_back(value);
        if self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// The window contents, oldest first.
    pub fn as_slice(&mut self) -> &[f64] {
        self.buffer.make_contiguous()
    }
}
