//! Emotion labels and the fixed-width result block codec.
//!
//! A result block is 32 bytes: one big-endian IEEE-754 f32 per emotion, in
//! the order of [`Emotion::ALL`]. Responses are plain concatenations of
//! blocks, one per classified image or video frame.

use bytes::{BufMut, BytesMut};
use std::fmt;
use std::ops::{Index, IndexMut};
use thiserror::Error;

use crate::constants::{BLOCK_SIZE, EMOTION_COUNT};

/// Emotion labels in wire order. The discriminant is the block slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Emotion {
    Anger = 0,
    Contempt = 1,
    Fear = 2,
    Happiness = 3,
    Neutral = 4,
    Sadness = 5,
    Surprise = 6,
    Disgust = 7,
}

impl Emotion {
    pub const ALL: [Emotion; EMOTION_COUNT] = [
        Emotion::Anger,
        Emotion::Contempt,
        Emotion::Fear,
        Emotion::Happiness,
        Emotion::Neutral,
        Emotion::Sadness,
        Emotion::Surprise,
        Emotion::Disgust,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Anger => "anger",
            Emotion::Contempt => "contempt",
            Emotion::Fear => "fear",
            Emotion::Happiness => "happiness",
            Emotion::Neutral => "neutral",
            Emotion::Sadness => "sadness",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
        }
    }

    /// Parse a label, accepting the adjective forms most expression models
    /// use in their `id2label` tables ("angry", "happy", ...).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "anger" | "angry" => Some(Emotion::Anger),
            "contempt" | "contemptuous" => Some(Emotion::Contempt),
            "fear" | "fearful" | "afraid" => Some(Emotion::Fear),
            "happiness" | "happy" | "joy" => Some(Emotion::Happiness),
            "neutral" => Some(Emotion::Neutral),
            "sadness" | "sad" => Some(Emotion::Sadness),
            "surprise" | "surprised" => Some(Emotion::Surprise),
            "disgust" | "disgusted" => Some(Emotion::Disgust),
            _ => None,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ScoreError {
    #[error("unknown emotion label: {0}")]
    UnknownLabel(String),

    #[error("duplicate emotion label: {0}")]
    DuplicateLabel(Emotion),

    #[error("missing emotion label: {0}")]
    MissingLabel(Emotion),

    #[error("result buffer length {0} is not a multiple of 32")]
    TruncatedBlock(usize),
}

/// One score per emotion. Values are passed through untouched: no clamping,
/// no normalization.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EmotionScores([f32; EMOTION_COUNT]);

impl EmotionScores {
    pub fn new(values: [f32; EMOTION_COUNT]) -> Self {
        Self(values)
    }

    pub fn uniform(value: f32) -> Self {
        Self([value; EMOTION_COUNT])
    }

    /// Build from named scores. Every label must appear exactly once.
    pub fn from_named<'a, I>(pairs: I) -> Result<Self, ScoreError>
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut values = [0f32; EMOTION_COUNT];
        let mut seen = [false; EMOTION_COUNT];

        for (label, value) in pairs {
            let emotion = Emotion::from_label(label)
                .ok_or_else(|| ScoreError::UnknownLabel(label.to_string()))?;
            if seen[emotion.index()] {
                return Err(ScoreError::DuplicateLabel(emotion));
            }
            seen[emotion.index()] = true;
            values[emotion.index()] = value;
        }

        if let Some(missing) = Emotion::ALL.iter().find(|e| !seen[e.index()]) {
            return Err(ScoreError::MissingLabel(*missing));
        }

        Ok(Self(values))
    }

    pub fn values(&self) -> &[f32; EMOTION_COUNT] {
        &self.0
    }

    /// Scores paired with their labels, in wire order
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL.iter().map(move |e| (*e, self.0[e.index()]))
    }

    /// The highest-scoring emotion. Ties go to the earlier label.
    pub fn dominant(&self) -> Emotion {
        let mut best = Emotion::Anger;
        for (emotion, value) in self.iter() {
            if value > self[best] {
                best = emotion;
            }
        }
        best
    }

    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut out = [0u8; BLOCK_SIZE];
        for (i, value) in self.0.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&value.to_be_bytes());
        }
        out
    }

    /// Append one encoded block to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(BLOCK_SIZE);
        for value in self.0 {
            buf.put_f32(value);
        }
    }

    pub fn decode(block: &[u8; BLOCK_SIZE]) -> Self {
        let mut values = [0f32; EMOTION_COUNT];
        for (i, chunk) in block.chunks_exact(4).enumerate() {
            values[i] = f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self(values)
    }
}

impl Index<Emotion> for EmotionScores {
    type Output = f32;

    fn index(&self, emotion: Emotion) -> &f32 {
        &self.0[emotion.index()]
    }
}

impl IndexMut<Emotion> for EmotionScores {
    fn index_mut(&mut self, emotion: Emotion) -> &mut f32 {
        &mut self.0[emotion.index()]
    }
}

/// Split a response body back into per-frame scores
pub fn decode_blocks(data: &[u8]) -> Result<Vec<EmotionScores>, ScoreError> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(ScoreError::TruncatedBlock(data.len()));
    }

    Ok(data
        .chunks_exact(BLOCK_SIZE)
        .map(|chunk| {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            EmotionScores::decode(&block)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_be_floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn encodes_reference_mapping_in_label_order() {
        let scores = EmotionScores::from_named([
            ("anger", 10.0),
            ("contempt", 60.0),
            ("fear", 20.0),
            ("happiness", 40.0),
            ("neutral", 50.0),
            ("sadness", 10.0),
            ("surprise", 10.0),
            ("disgust", 1.0),
        ])
        .expect("all labels present");

        let encoded = scores.encode();
        assert_eq!(encoded.len(), 32);
        assert_eq!(
            read_be_floats(&encoded),
            vec![10.0, 60.0, 20.0, 40.0, 50.0, 10.0, 10.0, 1.0]
        );
        // 10.0f32 == 0x41200000
        assert_eq!(&encoded[0..4], &[0x41, 0x20, 0x00, 0x00]);
        assert_eq!(&encoded[28..32], &1.0f32.to_be_bytes());
    }

    #[test]
    fn named_order_does_not_affect_offsets() {
        let scores = EmotionScores::from_named([
            ("disgust", 8.0),
            ("surprise", 7.0),
            ("sadness", 6.0),
            ("neutral", 5.0),
            ("happiness", 4.0),
            ("fear", 3.0),
            ("contempt", 2.0),
            ("anger", 1.0),
        ])
        .unwrap();

        assert_eq!(
            read_be_floats(&scores.encode()),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
        );
    }

    #[test]
    fn raw_values_pass_through_unclamped() {
        let values = [-3.5, 1e9, f32::MIN_POSITIVE, 0.0, -0.0, 42.125, f32::MAX, 0.3];
        let decoded = EmotionScores::decode(&EmotionScores::new(values).encode());
        for (a, b) in decoded.values().iter().zip(values.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn encode_into_matches_encode() {
        let scores = EmotionScores::new([0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]);
        let mut buf = BytesMut::new();
        scores.encode_into(&mut buf);
        scores.encode_into(&mut buf);
        assert_eq!(buf.len(), 64);
        assert_eq!(&buf[..32], &scores.encode());
        assert_eq!(&buf[32..], &scores.encode());
    }

    #[test]
    fn from_named_rejects_missing_label() {
        let result = EmotionScores::from_named([
            ("anger", 1.0),
            ("contempt", 1.0),
            ("fear", 1.0),
            ("happiness", 1.0),
            ("neutral", 1.0),
            ("sadness", 1.0),
            ("surprise", 1.0),
        ]);
        assert_eq!(result, Err(ScoreError::MissingLabel(Emotion::Disgust)));
    }

    #[test]
    fn from_named_rejects_unknown_and_duplicate_labels() {
        let unknown = EmotionScores::from_named([("boredom", 1.0)]);
        assert_eq!(unknown, Err(ScoreError::UnknownLabel("boredom".to_string())));

        let duplicate = EmotionScores::from_named([("happy", 1.0), ("Happiness", 2.0)]);
        assert_eq!(duplicate, Err(ScoreError::DuplicateLabel(Emotion::Happiness)));
    }

    #[test]
    fn label_aliases_resolve() {
        assert_eq!(Emotion::from_label("Angry"), Some(Emotion::Anger));
        assert_eq!(Emotion::from_label("sad"), Some(Emotion::Sadness));
        assert_eq!(Emotion::from_label(" surprised "), Some(Emotion::Surprise));
        assert_eq!(Emotion::from_label("calm"), None);
    }

    #[test]
    fn decode_blocks_splits_frames_in_order() {
        let mut buf = BytesMut::new();
        for i in 0..3 {
            EmotionScores::uniform(i as f32).encode_into(&mut buf);
        }
        let frames = decode_blocks(&buf).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], EmotionScores::uniform(2.0));

        assert_eq!(decode_blocks(&buf[..40]), Err(ScoreError::TruncatedBlock(40)));
        assert!(decode_blocks(&[]).unwrap().is_empty());
    }

    #[test]
    fn dominant_picks_highest_score() {
        let mut scores = EmotionScores::uniform(0.1);
        scores[Emotion::Surprise] = 0.9;
        assert_eq!(scores.dominant(), Emotion::Surprise);
        assert_eq!(EmotionScores::uniform(1.0).dominant(), Emotion::Anger);
    }
}
