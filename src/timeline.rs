//! Playback-time lookup over decoded video results.
//!
//! Frame `i` of a response was sampled at `i / frame_rate` seconds. Between
//! two frames the scores are linearly interpolated; past the last frame the
//! last frame's scores hold.

use crate::emotion::{EmotionScores, ScoreError, decode_blocks};

#[derive(Debug, Clone)]
pub struct Timeline {
    frames: Vec<EmotionScores>,
    frame_rate: u64,
}

impl Timeline {
    pub fn new(frames: Vec<EmotionScores>, frame_rate: u32) -> Self {
        Self {
            frames,
            frame_rate: u64::from(frame_rate.clamp(1, 1000)),
        }
    }

    /// Decode a raw response body
    pub fn from_response(body: &[u8], frame_rate: u32) -> Result<Self, ScoreError> {
        Ok(Self::new(decode_blocks(body)?, frame_rate))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[EmotionScores] {
        &self.frames
    }

    pub fn frame_time_ms(&self, index: usize) -> u64 {
        (index as u64).saturating_mul(1000) / self.frame_rate
    }

    fn clamped(&self, index: usize) -> &EmotionScores {
        &self.frames[index.min(self.frames.len() - 1)]
    }

    pub fn scores_at(&self, time_ms: u64) -> Option<EmotionScores> {
        if self.frames.is_empty() {
            return None;
        }

        // Position in frames, scaled by 1000
        let position = time_ms.saturating_mul(self.frame_rate);
        let index = usize::try_from(position / 1000).unwrap_or(usize::MAX);
        let current = self.clamped(index);
        let next = self.clamped(index.saturating_add(1));
        let fraction = (position % 1000) as f32 / 1000.0;

        let mut values = *current.values();
        for (value, target) in values.iter_mut().zip(next.values()) {
            *value += (target - *value) * fraction;
        }
        Some(EmotionScores::new(values))
    }
}
