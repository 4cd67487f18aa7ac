use serde::{Deserialize, Serialize};

use crate::{IndicesByCv, Llm, LlmError};

/// Gradient ascent settings for [`train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Upper bound on gradient steps.
    pub max_iterations: usize,
    /// Step size.
    pub learning_rate: f64,
    /// L2 penalty on the weights.
    pub regularization: f64,
    /// Stop once the objective improves by less than this.
    pub tolerance: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            learning_rate: 0.1,
            regularization: 0.01,
            tolerance: 1e-6,
        }
    }
}

/// One evaluated factor with its observed correspondence variable.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    /// The observed correspondence variable.
    pub cv: String,
    /// The fired indices of every correspondence variable.
    pub indices_by_cv: IndicesByCv,
}

impl TrainingExample {
    /// An example observing `cv`.
    pub fn new(cv: impl Into<String>, indices_by_cv: IndicesByCv) -> Self {
        Self {
            cv: cv.into(),
            indices_by_cv,
        }
    }
}

/// Outcome of [`train`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Gradient steps taken.
    pub iterations: usize,
    /// Regularized log likelihood after the last step.
    pub log_likelihood: f64,
}

impl Llm {
    /// L2-regularized conditional log likelihood of `examples`.
    pub fn log_likelihood(
        &self,
        examples: &[TrainingExample],
        regularization: f64,
    ) -> Result<f64, LlmError> {
        let mut log_likelihood = 0.0;
        for example in examples {
            log_likelihood += self.pygx(&example.cv, &example.indices_by_cv, false)?.prob.ln();
        }
        let penalty: f64 = self.weights().iter().map(|weight| weight * weight).sum();
        Ok(log_likelihood - regularization * penalty / 2.0)
    }

    /// Gradient of [`Llm::log_likelihood`] with respect to the weights.
    ///
    /// Each fired index of a correspondence variable `c` contributes
    /// `[c is observed] - p(c | x)`.
    pub fn gradient(
        &self,
        examples: &[TrainingExample],
        regularization: f64,
    ) -> Result<Vec<f64>, LlmError> {
        let mut gradient: Vec<f64> = self
            .weights()
            .iter()
            .map(|weight| -regularization * weight)
            .collect();

        for example in examples {
            let result = self.pygx(&example.cv, &example.indices_by_cv, true)?;
            for (cv, indices) in &example.indices_by_cv {
                let expected = result.sums.get(cv).copied().unwrap_or_default() / result.denominator;
                let observed = if *cv == example.cv { 1.0 } else { 0.0 };
                for &index in indices {
                    let len = gradient.len();
                    let slot = gradient
                        .get_mut(index)
                        .ok_or(LlmError::WeightIndexOutOfRange { index, len })?;
                    *slot += observed - expected;
                }
            }
        }

        Ok(gradient)
    }
}

/// Fit `llm`'s weights to `examples` by fixed-step gradient ascent.
pub fn train(
    llm: &mut Llm,
    examples: &[TrainingExample],
    config: &TrainingConfig,
) -> Result<TrainingReport, LlmError> {
    let mut log_likelihood = llm.log_likelihood(examples, config.regularization)?;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        let gradient = llm.gradient(examples, config.regularization)?;
        let weights = llm
            .weights()
            .iter()
            .zip(&gradient)
            .map(|(weight, step)| weight + config.learning_rate * step)
            .collect();
        llm.set_weights(weights)?;
        iterations += 1;

        let next = llm.log_likelihood(examples, config.regularization)?;
        tracing::debug!(iterations, log_likelihood = next, "training step");
        let improvement = next - log_likelihood;
        log_likelihood = next;
        if improvement.abs() < config.tolerance {
            break;
        }
    }

    tracing::info!(iterations, log_likelihood, examples = examples.len(), "trained model");
    Ok(TrainingReport {
        iterations,
        log_likelihood,
    })
}
