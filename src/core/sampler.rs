use super::error::SimulationError;
use super::rng::{StandardNormalGenerator, UniformSource};
use super::types::DistributionConfig;

pub const MAX_TRUNCATION_ATTEMPTS: u32 = 100_000;

/// Draws per-period returns from a normal distribution truncated to the
/// open interval `(lower_bound, upper_bound)` by rejection.
#[derive(Debug, Clone, Copy)]
pub struct TruncatedReturnSampler {
    period_mu: f64,
    period_sigma: f64,
    lower_bound: f64,
    upper_bound: f64,
    max_attempts: u32,
}

impl TruncatedReturnSampler {
    pub fn new(config: &DistributionConfig) -> Self {
        let ratio = config.horizon_ratio();
        Self {
            period_mu: ratio.period_mean(config.mu),
            period_sigma: ratio.period_volatility(config.sigma),
            lower_bound: config.lower_bound,
            upper_bound: config.upper_bound,
            max_attempts: MAX_TRUNCATION_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn period_mu(&self) -> f64 {
        self.period_mu
    }

    pub fn period_sigma(&self) -> f64 {
        self.period_sigma
    }

    pub fn sample<U: UniformSource>(
        &self,
        normal: &mut StandardNormalGenerator<U>,
        iteration: u64,
    ) -> Result<f64, SimulationError> {
        for _ in 0..self.max_attempts {
            let x = normal
                .next_scaled(self.period_mu, self.period_sigma)
                .map_err(|e| e.at_iteration(iteration))?;
            if self.lower_bound < x && x < self.upper_bound {
                return Ok(x);
            }
        }

        Err(SimulationError::SamplingBoundsUnreachable {
            iteration,
            lower: self.lower_bound,
            upper: self.upper_bound,
            attempts: self.max_attempts,
        })
    }
}
