use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SamplerError {
    #[error("frame interval must be >= 1, got {0}")]
    ZeroInterval(usize),
}

/// Forwards every Nth camera frame to detection.
///
/// Pure counter: frame `k` (0-based) is forwarded iff `(k + 1) % N == 0`.
/// No jitter correction and no late-frame detection.
#[derive(Debug)]
pub struct FrameSampler {
    interval: usize,
    frame_count: u64,
}

impl FrameSampler {
    pub fn new(interval: usize) -> Result<Self, SamplerError> {
        if interval < 1 {
            return Err(SamplerError::ZeroInterval(interval));
        }
        Ok(Self {
            interval,
            frame_count: 0,
        })
    }

    /// Number of callbacks seen so far, including ones without a buffer.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Counts one capture callback and reports whether it is a sampled one.
    pub fn should_process(&mut self) -> bool {
        self.frame_count += 1;
        self.frame_count % self.interval as u64 == 0
    }

    /// Counts the callback and hands the frame through if it is sampled.
    /// A callback without a buffer is skipped.
    pub fn sample(&mut self, frame: Option<Frame>) -> Option<Frame> {
        if !self.should_process() {
            return None;
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn frame(index: u64) -> Frame {
        Frame::new(vec![0u8; 2 * 2 * 3], 2, 2, index)
    }

    #[test]
    fn test_interval_0_errors() {
        assert_eq!(FrameSampler::new(0).unwrap_err(), SamplerError::ZeroInterval(0));
    }

    #[test]
    fn test_interval_1_processes_every_frame() {
        let mut sampler = FrameSampler::new(1).unwrap();
        for _ in 0..5 {
            assert!(sampler.should_process());
        }
        assert_eq!(sampler.frame_count(), 5);
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    #[case(5)]
    fn test_frame_k_processed_iff_k_plus_one_divisible(#[case] n: usize) {
        let mut sampler = FrameSampler::new(n).unwrap();
        for k in 0..(4 * n) {
            assert_eq!(sampler.should_process(), (k + 1) % n == 0, "k={k}, n={n}");
        }
    }

    #[test]
    fn test_missing_buffer_is_skipped_but_counted() {
        let mut sampler = FrameSampler::new(2).unwrap();
        assert!(sampler.sample(Some(frame(0))).is_none()); // k=0, not sampled
        assert!(sampler.sample(None).is_none()); // k=1, sampled but no buffer
        assert!(sampler.sample(Some(frame(2))).is_none()); // k=2
        let forwarded = sampler.sample(Some(frame(3))); // k=3
        assert_eq!(forwarded.map(|f| f.index()), Some(3));
        assert_eq!(sampler.frame_count(), 4);
    }
}
