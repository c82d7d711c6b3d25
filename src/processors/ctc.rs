//! Greedy CTC decoding of recognition logits.
//!
//! The recognizer emits `(batch, timesteps, classes)` logits where the
//! last class is the CTC blank. Decoding takes the per-timestep argmax,
//! collapses adjacent repeats, drops blanks, and reports the weakest
//! argmax probability along the path as the line's confidence.

use crate::core::{ScanError, ScanResult, Tensor3D};

/// A decoded text line with its confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedText {
    /// The decoded string.
    pub text: String,
    /// Minimum per-timestep argmax probability over the whole sequence.
    pub confidence: f32,
}

/// Greedy CTC decoder over a fixed character vocabulary.
#[derive(Debug, Clone)]
pub struct CtcGreedyDecoder {
    vocab: Vec<char>,
}

impl CtcGreedyDecoder {
    /// Creates a decoder for the given vocabulary. The blank symbol is
    /// implicit: it occupies class index `vocab.len()`.
    pub fn new(vocab: &str) -> Self {
        Self {
            vocab: vocab.chars().collect(),
        }
    }

    /// Decodes a batch of logit sequences.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidInput`] if the class dimension does not
    /// equal the vocabulary size plus one blank.
    pub fn decode(&self, logits: &Tensor3D) -> ScanResult<Vec<DecodedText>> {
        let (batch, timesteps, classes) = logits.dim();

        if classes != self.vocab.len() + 1 {
            return Err(ScanError::invalid_input(format!(
                "recognizer emits {} classes but the vocabulary holds {} characters plus blank",
                classes,
                self.vocab.len()
            )));
        }
        let blank = classes - 1;

        let mut results = Vec::with_capacity(batch);

        for n in 0..batch {
            let mut text = String::new();
            let mut min_prob = 1.0f32;
            let mut prev: Option<usize> = None;

            for t in 0..timesteps {
                let row = logits.slice(ndarray::s![n, t, ..]);

                // Stable softmax over the class row.
                let max_logit = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let mut denom = 0.0f32;
                for &v in row.iter() {
                    denom += (v - max_logit).exp();
                }

                // Argmax, first index winning ties.
                let mut best = 0usize;
                let mut best_logit = row[0];
                for (idx, &v) in row.iter().enumerate().skip(1) {
                    if v > best_logit {
                        best = idx;
                        best_logit = v;
                    }
                }

                let prob = (best_logit - max_logit).exp() / denom;
                if prob < min_prob {
                    min_prob = prob;
                }

                // Collapse repeats, drop blanks. A blank between repeats
                // resets `prev`, so "a blank a" decodes to "aa".
                if prev != Some(best) && best != blank {
                    text.push(self.vocab[best]);
                }
                prev = Some(best);
            }

            results.push(DecodedText {
                text,
                confidence: min_prob,
            });
        }

        Ok(results)
    }
}
