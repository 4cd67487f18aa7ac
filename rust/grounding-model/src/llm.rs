use std::collections::BTreeMap;

use crate::{FeaturePool, IndicesByCv, LlmError};

/// Smallest probability [`Llm::pygx`] returns: the smallest positive normal
/// `f64`.
pub const PROBABILITY_FLOOR: f64 = f64::MIN_POSITIVE;

/// Largest probability [`Llm::pygx`] returns: the largest `f64` below one.
pub const PROBABILITY_CEILING: f64 = 1.0 - f64::EPSILON / 2.0;

/// The result of [`Llm::pygx`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PygxResult {
    /// `numerator / denominator`, clamped into
    /// `[PROBABILITY_FLOOR, PROBABILITY_CEILING]`.
    pub prob: f64,
    /// `exp` of the queried correspondence variable's weight sum.
    pub numerator: f64,
    /// Sum of `exp` of every correspondence variable's weight sum.
    pub denominator: f64,
    /// Per correspondence variable `exp` of its weight sum, when requested.
    pub sums: BTreeMap<String, f64>,
}

/// The log-linear model: a feature pool plus one weight per slot.
#[derive(Debug, Default)]
pub struct Llm {
    feature_pool: FeaturePool,
    weights: Vec<f64>,
}

impl Llm {
    /// A model over `feature_pool` with every weight zero.
    pub fn new(feature_pool: FeaturePool) -> Self {
        let weights = vec![0.0; feature_pool.num_constituent_features()];
        Self {
            feature_pool,
            weights,
        }
    }

    /// A model over `feature_pool` with the given weights, which must match
    /// the pool's slot count.
    pub fn with_weights(feature_pool: FeaturePool, weights: Vec<f64>) -> Result<Self, LlmError> {
        let mut llm = Self::new(feature_pool);
        llm.set_weights(weights)?;
        Ok(llm)
    }

    /// The feature pool.
    pub fn feature_pool(&self) -> &FeaturePool {
        &self.feature_pool
    }

    /// The feature pool, for building and evaluating factors.
    pub fn feature_pool_mut(&mut self) -> &mut FeaturePool {
        &mut self.feature_pool
    }

    /// One weight per feature slot.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Replace the weights. The count must match the pool's slot count.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<(), LlmError> {
        let expected = self.feature_pool.num_constituent_features();
        if weights.len() != expected {
            return Err(LlmError::WeightCount {
                expected,
                found: weights.len(),
            });
        }
        self.weights = weights;
        Ok(())
    }

    /// Sum of the weights at `indices`.
    pub fn sum_of_feature_weights(&self, indices: &[usize]) -> Result<f64, LlmError> {
        indices.iter().try_fold(0.0, |sum, &index| {
            self.weights
                .get(index)
                .map(|weight| sum + weight)
                .ok_or(LlmError::WeightIndexOutOfRange {
                    index,
                    len: self.weights.len(),
                })
        })
    }

    /// Probability of `cv` given the fired features of every
    /// correspondence variable.
    ///
    /// Each correspondence variable contributes `exp(sum of its weights)` to
    /// the denominator, the queried one also to the numerator. An exact `0`
    /// or `1` is clamped to [`PROBABILITY_FLOOR`] or [`PROBABILITY_CEILING`].
    /// An overflowed or fully underflowed denominator is an error.
    pub fn pygx(
        &self,
        cv: &str,
        indices_by_cv: &IndicesByCv,
        store_sums: bool,
    ) -> Result<PygxResult, LlmError> {
        if indices_by_cv.is_empty() {
            return Err(LlmError::NoCorrespondenceVariables { cv: cv.to_string() });
        }

        let mut result = PygxResult::default();
        for (class, indices) in indices_by_cv {
            let exponentiated = self.sum_of_feature_weights(indices)?.exp();
            if class == cv {
                result.numerator = exponentiated;
            }
            result.denominator += exponentiated;
            if store_sums {
                result.sums.insert(class.clone(), exponentiated);
            }
        }

        if result.denominator.is_infinite() {
            return Err(LlmError::InfiniteDenominator { cv: cv.to_string() });
        }
        if result.denominator == 0.0 {
            return Err(LlmError::ZeroDenominator { cv: cv.to_string() });
        }

        result.prob = result.numerator / result.denominator;
        if result.prob == 0.0 {
            result.prob = PROBABILITY_FLOOR;
        } else if result.prob == 1.0 {
            result.prob = PROBABILITY_CEILING;
        }
        Ok(result)
    }
}
