//! Payload generation
//!
//! A payload is one synthetic submission: a weighted-random submission-type
//! code plus a run of words drawn from the vocabulary, serialized as
//! `{"type": <code>, "data": {"1": w1, ..., "L": wL}}`. Generation is pure
//! given a source of randomness, so tests drive it with a seeded rng.

use std::sync::Arc;

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::vocab::Vocabulary;

/// How words are drawn from the vocabulary for one payload
///
/// The source material disagrees on this, so both behaviors are kept and the
/// choice is configuration, not code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Uniform random subset, no word appears twice in one payload
    Unique,
    /// Independent uniform draws, duplicates allowed
    Repeat,
}

/// Payload generation errors
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// Unique sampling asked for more words than the vocabulary holds
    #[error("vocabulary has {available} words, cannot draw {requested} without replacement")]
    InsufficientVocabulary {
        /// Words available in the vocabulary
        available: usize,
        /// Words requested for the payload
        requested: usize,
    },

    /// Submission-type weight table was unusable
    #[error("invalid submission-type weights: {0}")]
    InvalidWeights(String),
}

/// One synthetic submission
#[derive(Debug, Clone)]
pub struct Payload {
    /// Submission-type code sent as `type`
    pub submission_type: u32,
    /// Words in positional order; serialized as the 1-indexed `data` map
    pub words: Vec<String>,
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct DataMap<'a>(&'a [String]);

        impl Serialize for DataMap<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (i, word) in self.0.iter().enumerate() {
                    map.serialize_entry(&(i + 1).to_string(), word)?;
                }
                map.end()
            }
        }

        let mut state = serializer.serialize_struct("Payload", 2)?;
        state.serialize_field("type", &self.submission_type)?;
        state.serialize_field("data", &DataMap(&self.words))?;
        state.end()
    }
}

impl Payload {
    /// The preliminary submission that establishes a session server-side
    pub fn bootstrap(code: u32) -> Self {
        Self {
            submission_type: code,
            words: Vec::new(),
        }
    }

    /// Number of words in the payload
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the payload carries no words (only true for bootstraps)
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Builds randomized payloads from a shared vocabulary
pub struct PayloadBuilder {
    vocab: Arc<Vocabulary>,
    length_classes: Vec<usize>,
    type_codes: Vec<u32>,
    type_dist: WeightedIndex<f64>,
    mode: SamplingMode,
}

impl PayloadBuilder {
    /// Create a builder
    ///
    /// `type_weights` maps submission-type codes to selection weights.
    /// Weights need not sum to 1 but must be non-negative with at least one
    /// positive entry.
    pub fn new(
        vocab: Arc<Vocabulary>,
        length_classes: Vec<usize>,
        type_weights: &[(u32, f64)],
        mode: SamplingMode,
    ) -> Result<Self, PayloadError> {
        if length_classes.is_empty() {
            return Err(PayloadError::InvalidWeights(
                "no length classes configured".into(),
            ));
        }
        if type_weights.iter().any(|(_, w)| *w < 0.0) {
            return Err(PayloadError::InvalidWeights(
                "weights must be non-negative".into(),
            ));
        }

        let type_codes: Vec<u32> = type_weights.iter().map(|(code, _)| *code).collect();
        let type_dist = WeightedIndex::new(type_weights.iter().map(|(_, w)| *w))
            .map_err(|e| PayloadError::InvalidWeights(e.to_string()))?;

        Ok(Self {
            vocab,
            length_classes,
            type_codes,
            type_dist,
            mode,
        })
    }

    /// Build one randomized payload with a uniformly chosen length class
    pub fn build(&self, rng: &mut impl Rng) -> Result<Payload, PayloadError> {
        let length = *self
            .length_classes
            .choose(rng)
            .expect("length classes validated non-empty");
        self.build_with_length(length, rng)
    }

    /// Build a payload whose length honors the session's preferred seed
    /// length, falling back to a uniform class when the preference is stale
    pub fn build_for_session(
        &self,
        session: &crate::session::SessionHandle,
        rng: &mut impl Rng,
    ) -> Result<Payload, PayloadError> {
        if self.length_classes.contains(&session.seed_length()) {
            self.build_with_length(session.seed_length(), rng)
        } else {
            self.build(rng)
        }
    }

    fn build_with_length(
        &self,
        length: usize,
        rng: &mut impl Rng,
    ) -> Result<Payload, PayloadError> {
        let words = self.draw_words(length, rng)?;
        let submission_type = self.type_codes[self.type_dist.sample(rng)];

        Ok(Payload {
            submission_type,
            words,
        })
    }

    fn draw_words(&self, length: usize, rng: &mut impl Rng) -> Result<Vec<String>, PayloadError> {
        let words = self.vocab.words();
        match self.mode {
            SamplingMode::Unique => {
                if words.len() < length {
                    return Err(PayloadError::InsufficientVocabulary {
                        available: words.len(),
                        requested: length,
                    });
                }
                Ok(words
                    .choose_multiple(rng, length)
                    .cloned()
                    .collect())
            }
            SamplingMode::Repeat => Ok((0..length)
                .map(|_| {
                    words
                        .choose(rng)
                        .expect("vocabulary validated non-empty")
                        .clone()
                })
                .collect()),
        }
    }

    /// The configured length classes
    pub fn length_classes(&self) -> &[usize] {
        &self.length_classes
    }
}

impl std::fmt::Debug for PayloadBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadBuilder")
            .field("vocab_len", &self.vocab.len())
            .field("length_classes", &self.length_classes)
            .field("type_codes", &self.type_codes)
            .field("mode", &self.mode)
            .finish()
    }
}
