mod compounder;
mod engine;
mod error;
mod histogram;
mod rng;
mod sampler;
mod stats;
mod types;

pub use compounder::{CompoundedReturn, compound};
pub use engine::{ExecutionMode, SimulationRunner, draw_once, run_simulation};
pub use error::{RenderError, SimulationError};
pub use histogram::{HistogramRenderer, SvgHistogramRenderer};
pub use rng::{
    GeneratorExhausted, MAX_POLAR_ATTEMPTS, Rng, StandardNormalGenerator, UniformSource,
    derive_seed,
};
pub use sampler::{MAX_TRUNCATION_ATTEMPTS, TruncatedReturnSampler};
pub use stats::{quantiles, summarize};
pub use types::{
    DistributionConfig, DrawResult, HorizonRatio, Quantiles, SampleSeries, SeriesQuantiles,
    SimulationResult, SummaryStatistics,
};
