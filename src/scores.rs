use crate::error::{DigitError, Result};

/// Number of digit classes.
pub const NUM_CLASSES: usize = 10;

/// Raw logits of the classifier; index `i` scores digit `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores([f32; NUM_CLASSES]);

impl ClassScores {
    pub fn new(logits: [f32; NUM_CLASSES]) -> Self {
        Self(logits)
    }

    /// Builds scores from a flat logit vector, which must hold exactly 10 entries.
    pub fn from_logits(logits: Vec<f32>) -> Result<Self> {
        let len = logits.len();
        let logits: [f32; NUM_CLASSES] = logits.try_into().map_err(|_| DigitError::ScoreCount {
            expected: NUM_CLASSES,
            actual: len,
        })?;

        Ok(Self(logits))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Index of the highest score. Ties go to the lowest index and NaN never wins.
    pub fn argmax(&self) -> usize {
        let mut best = 0;

        for (index, &score) in self.0.iter().enumerate().skip(1) {
            if score > self.0[best] || (self.0[best].is_nan() && !score.is_nan()) {
                best = index;
            }
        }

        best
    }

    /// Softmax of the logits, for confidence display.
    pub fn probabilities(&self) -> [f32; NUM_CLASSES] {
        let max = self.0.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp = self.0.map(|v| (v - max).exp());
        let sum: f32 = exp.iter().sum();

        exp.map(|v| v / sum)
    }
}

/// Outcome of classifying one drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: usize,
    pub scores: ClassScores,
}

impl Prediction {
    pub fn from_scores(scores: ClassScores) -> Self {
        Self {
            label: scores.argmax(),
            scores,
        }
    }

    /// Softmax probability of the predicted label.
    pub fn confidence(&self) -> f32 {
        self.scores.probabilities()[self.label]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_picks_highest_score() {
        let scores = ClassScores::new([0.1, 0.2, 3.0, -1.0, 0.0, 0.0, 0.0, 0.0, 2.9, 0.0]);

        assert_eq!(scores.argmax(), 2);
    }

    #[test]
    fn argmax_ties_resolve_to_lowest_index() {
        let scores = ClassScores::new([0.0, 1.0, 0.5, 0.0, 5.0, 0.0, 0.0, 5.0, 0.0, 5.0]);

        assert_eq!(scores.argmax(), 4);
    }

    #[test]
    fn argmax_of_uniform_scores_is_zero() {
        assert_eq!(ClassScores::new([0.25; NUM_CLASSES]).argmax(), 0);
    }

    #[test]
    fn argmax_skips_nan() {
        let mut logits = [0.0; NUM_CLASSES];
        logits[0] = f32::NAN;
        logits[6] = 1.0;

        assert_eq!(ClassScores::new(logits).argmax(), 6);
    }

    #[test]
    fn from_logits_requires_ten_entries() {
        assert!(ClassScores::from_logits(vec![0.0; 11]).is_err());
        assert!(ClassScores::from_logits(vec![0.0; 10]).is_ok());
    }

    #[test]
    fn probabilities_sum_to_one() {
        let scores = ClassScores::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let prediction = Prediction::from_scores(scores);

        let sum: f32 = scores.probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(prediction.label, 9);
        assert!(prediction.confidence() > 0.5);
    }
}
