use log::{debug, info};
use rayon::prelude::*;

use super::compounder::compound;
use super::error::SimulationError;
use super::rng::{Rng, StandardNormalGenerator, UniformSource, derive_seed};
use super::sampler::TruncatedReturnSampler;
use super::stats::{quantiles, summarize};
use super::types::{DistributionConfig, DrawResult, SampleSeries, SeriesQuantiles, SimulationResult};

// Series grow past this on demand; the iteration count alone never drives a large up-front allocation.
const MAX_PREALLOCATED_DRAWS: u64 = 1 << 20;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExecutionMode {
    Sequential,
    Parallel { workers: usize },
}

impl ExecutionMode {
    pub fn from_workers(workers: usize) -> Self {
        if workers > 1 {
            ExecutionMode::Parallel { workers }
        } else {
            ExecutionMode::Sequential
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationRunner {
    config: DistributionConfig,
    mode: ExecutionMode,
}

impl SimulationRunner {
    pub fn new(config: DistributionConfig) -> Self {
        Self {
            config,
            mode: ExecutionMode::Sequential,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn run(&self) -> Result<SimulationResult, SimulationError> {
        self.config.validate()?;
        info!(
            "simulating {} draws (mu={}, sigma={}, bounds=({}, {}), period={}m, mode={:?})",
            self.config.iteration_count,
            self.config.mu,
            self.config.sigma,
            self.config.lower_bound,
            self.config.upper_bound,
            self.config.period_months,
            self.mode
        );

        let series = match self.mode {
            ExecutionMode::Sequential => draw_chunk(
                &self.config,
                Rng::new(self.config.seed),
                0,
                self.config.iteration_count,
            )?,
            ExecutionMode::Parallel { workers } => draw_parallel(&self.config, workers)?,
        };

        let result = summarize_series(series)?;
        info!(
            "finished {} draws: annual return mean {:.6}, variance {:.6}",
            result.series.len(),
            result.annual_return_stats.mean,
            result.annual_return_stats.variance
        );
        Ok(result)
    }
}

pub fn run_simulation(config: &DistributionConfig) -> Result<SimulationResult, SimulationError> {
    SimulationRunner::new(config.clone()).run()
}

pub fn draw_once<U: UniformSource>(
    sampler: &TruncatedReturnSampler,
    normal: &mut StandardNormalGenerator<U>,
    config: &DistributionConfig,
    iteration: u64,
) -> Result<DrawResult, SimulationError> {
    let raw_sample = sampler.sample(normal, iteration)?;
    let compounded = compound(raw_sample, config.discount, config.horizon_ratio());
    if !compounded.annual_return.is_finite() || !compounded.period_return.is_finite() {
        return Err(SimulationError::NonFiniteReturn {
            iteration,
            raw_sample,
        });
    }
    Ok(DrawResult {
        raw_sample,
        period_return: compounded.period_return,
        annual_return: compounded.annual_return,
    })
}

fn draw_chunk(
    config: &DistributionConfig,
    rng: Rng,
    first_iteration: u64,
    count: u64,
) -> Result<SampleSeries, SimulationError> {
    let sampler = TruncatedReturnSampler::new(config);
    let mut normal = StandardNormalGenerator::new(rng);
    let mut series = SampleSeries::with_capacity(initial_capacity(count));

    for iteration in first_iteration..first_iteration + count {
        series.push(draw_once(&sampler, &mut normal, config, iteration)?);
    }

    Ok(series)
}

fn draw_parallel(
    config: &DistributionConfig,
    workers: usize,
) -> Result<SampleSeries, SimulationError> {
    let chunks = partition(config.iteration_count, workers);
    debug!("partitioned {} draws as {:?}", config.iteration_count, chunks);

    let parts = chunks
        .into_par_iter()
        .enumerate()
        .map(|(worker, (first, count))| {
            let rng = Rng::new(derive_seed(config.seed, worker as u64));
            draw_chunk(config, rng, first, count)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut series = SampleSeries::with_capacity(initial_capacity(config.iteration_count));
    for part in parts {
        series.append(part);
    }
    Ok(series)
}

fn initial_capacity(count: u64) -> usize {
    count.min(MAX_PREALLOCATED_DRAWS) as usize
}

/// Splits `total` iterations into contiguous `(first, count)` ranges, one per
/// worker. Never more ranges than iterations (at least one).
fn partition(total: u64, workers: usize) -> Vec<(u64, u64)> {
    let workers = (workers.max(1) as u64).min(total.max(1));
    let base = total / workers;
    let extra = total % workers;

    let mut first = 0;
    (0..workers)
        .map(|w| {
            let count = base + u64::from(w < extra);
            let range = (first, count);
            first += count;
            range
        })
        .collect()
}

fn summarize_series(series: SampleSeries) -> Result<SimulationResult, SimulationError> {
    let sample_stats = summarize(&series.raw_samples)?;
    let period_return_stats = summarize(&series.period_returns)?;
    let annual_return_stats = summarize(&series.annual_returns)?;
    let quantiles = SeriesQuantiles {
        samples: quantiles(&series.raw_samples)?,
        period_returns: quantiles(&series.period_returns)?,
        annual_returns: quantiles(&series.annual_returns)?,
    };

    Ok(SimulationResult {
        series,
        sample_stats,
        period_return_stats,
        annual_return_stats,
        quantiles,
    })
}
