use std::io;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("iteration {iteration}: uniform source produced no usable pair after {attempts} attempts")]
    GeneratorExhausted { iteration: u64, attempts: u32 },

    #[error(
        "iteration {iteration}: no sample fell inside ({lower}, {upper}) after {attempts} attempts"
    )]
    SamplingBoundsUnreachable {
        iteration: u64,
        lower: f64,
        upper: f64,
        attempts: u32,
    },

    #[error("iteration {iteration}: raw sample {raw_sample} compounds to a non-finite return")]
    NonFiniteReturn { iteration: u64, raw_sample: f64 },

    #[error("statistics requested over an empty sample set")]
    EmptySampleSet,

    #[error("{0} overflowed to a non-finite value")]
    NonFiniteStatistic(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to write histogram: {0}")]
    Io(#[from] io::Error),

    #[error("no finite samples to chart")]
    NoFiniteSamples,
}
