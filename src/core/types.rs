use serde::Serialize;

use super::error::SimulationError;

pub const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionConfig {
    pub mu: f64,
    pub sigma: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub discount: f64,
    pub period_months: u32,
    pub iteration_count: u64,
    pub seed: u64,
}

impl DistributionConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        for (name, value) in [
            ("mu", self.mu),
            ("sigma", self.sigma),
            ("lower", self.lower_bound),
            ("upper", self.upper_bound),
            ("discount", self.discount),
        ] {
            if !value.is_finite() {
                return Err(SimulationError::InvalidConfig(format!(
                    "{name} must be finite"
                )));
            }
        }

        if self.sigma <= 0.0 {
            return Err(SimulationError::InvalidConfig(
                "sigma must be > 0".to_string(),
            ));
        }

        if self.lower_bound >= self.upper_bound {
            return Err(SimulationError::InvalidConfig(format!(
                "lower bound {} must be < upper bound {}",
                self.lower_bound, self.upper_bound
            )));
        }

        if !(0.0..1.0).contains(&self.discount) {
            return Err(SimulationError::InvalidConfig(
                "discount must be in [0, 1)".to_string(),
            ));
        }

        if self.period_months == 0 {
            return Err(SimulationError::InvalidConfig(
                "period must be > 0 months".to_string(),
            ));
        }

        // A fractional exponent needs a positive base: raw > lower >= -1 keeps 1 + raw > 0.
        if !self.horizon_ratio().is_integral() && self.lower_bound < -1.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "lower bound must be >= -1 when 12 / period ({}) is fractional",
                self.horizon_ratio().value()
            )));
        }

        Ok(())
    }

    pub fn horizon_ratio(&self) -> HorizonRatio {
        HorizonRatio::from_period_months(self.period_months)
    }
}

/// Periods per year: `12 / period_months`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonRatio(f64);

impl HorizonRatio {
    pub fn from_period_months(period_months: u32) -> Self {
        Self(MONTHS_PER_YEAR / period_months as f64)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_integral(self) -> bool {
        self.0.fract() == 0.0
    }

    /// Per-period mean for an annual mean; the mean scales linearly with time.
    pub fn period_mean(self, annual_mu: f64) -> f64 {
        annual_mu / self.0
    }

    /// Per-period volatility for an annual volatility; scales with the square root of time.
    pub fn period_volatility(self, annual_sigma: f64) -> f64 {
        annual_sigma / self.0.sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawResult {
    pub raw_sample: f64,
    pub period_return: f64,
    pub annual_return: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSeries {
    pub raw_samples: Vec<f64>,
    pub period_returns: Vec<f64>,
    pub annual_returns: Vec<f64>,
}

impl SampleSeries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            raw_samples: Vec::with_capacity(capacity),
            period_returns: Vec::with_capacity(capacity),
            annual_returns: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, draw: DrawResult) {
        self.raw_samples.push(draw.raw_sample);
        self.period_returns.push(draw.period_return);
        self.annual_returns.push(draw.annual_return);
    }

    pub fn append(&mut self, mut other: SampleSeries) {
        self.raw_samples.append(&mut other.raw_samples);
        self.period_returns.append(&mut other.period_returns);
        self.annual_returns.append(&mut other.annual_returns);
    }

    pub fn len(&self) -> usize {
        self.raw_samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_samples.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub mean: f64,
    pub variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quantiles {
    pub p10: f64,
    pub median: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesQuantiles {
    pub samples: Quantiles,
    pub period_returns: Quantiles,
    pub annual_returns: Quantiles,
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub series: SampleSeries,
    pub sample_stats: SummaryStatistics,
    pub period_return_stats: SummaryStatistics,
    pub annual_return_stats: SummaryStatistics,
    pub quantiles: SeriesQuantiles,
}
