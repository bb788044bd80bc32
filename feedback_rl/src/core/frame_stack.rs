//! Rolling frame window that turns single observations into stacked states.
//!
//! ```text
//! push(o4):  [o1 o2 o3] -> [o2 o3 o4]   (oldest evicted, newest last)
//! ```
//!
//! The stacked state is returned flat, frame-major: the first `frame_len`
//! values are the oldest frame.

use std::collections::VecDeque;

/// Fixed-capacity stack of the K most recent observations.
#[derive(Debug, Clone)]
pub struct FrameStack {
    capacity: usize,
    frames: VecDeque<Vec<f32>>,
}

impl FrameStack {
    /// Create an empty stack holding `capacity` frames.
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity),
        }
    }

    /// Number of frames per stacked state.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Refill the window with K copies of `obs` and return the stacked state.
    pub fn reset(&mut self, obs: &[f32]) -> Vec<f32> {
        self.frames.clear();
        for _ in 0..self.capacity {
            self.frames.push_back(obs.to_vec());
        }
        self.stacked()
    }

    /// Append `obs`, evicting the oldest frame, and return the stacked state.
    ///
    /// Pushing into a stack that was never reset behaves like `reset`.
    pub fn push(&mut self, obs: &[f32]) -> Vec<f32> {
        if self.frames.is_empty() {
            return self.reset(obs);
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(obs.to_vec());
        self.stacked()
    }

    /// Current stacked state without modifying the window.
    pub fn stacked(&self) -> Vec<f32> {
        let frame_len = self.frames.front().map(Vec::len).unwrap_or(0);
        let mut out = Vec::with_capacity(frame_len * self.frames.len());
        for frame in &self.frames {
            out.extend_from_slice(frame);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_fills_copies() {
        let mut stack = FrameStack::new(3);
        let state = stack.reset(&[1.0, 2.0]);
        assert_eq!(state, vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut stack = FrameStack::new(3);
        stack.reset(&[0.0]);
        stack.push(&[1.0]);
        stack.push(&[2.0]);
        let state = stack.push(&[3.0]);
        assert_eq!(state, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_reset_restarts_episode() {
        let mut stack = FrameStack::new(2);
        stack.reset(&[5.0]);
        stack.push(&[6.0]);
        assert_eq!(stack.reset(&[9.0]), vec![9.0, 9.0]);
    }

    #[test]
    fn test_push_without_reset() {
        let mut stack = FrameStack::new(2);
        assert_eq!(stack.push(&[4.0]), vec![4.0, 4.0]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut stack = FrameStack::new(0);
        assert_eq!(stack.capacity(), 1);
        assert_eq!(stack.reset(&[1.0, 1.0]).len(), 2);
    }
}
