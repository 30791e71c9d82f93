use super::types::HorizonRatio;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompoundedReturn {
    pub period_return: f64,
    pub annual_return: f64,
}

/// Gross period return after the discount, and its annualized power.
///
/// `discount < 1` is guaranteed by config validation, as is a positive base
/// whenever `ratio` is fractional.
pub fn compound(raw_sample: f64, discount: f64, ratio: HorizonRatio) -> CompoundedReturn {
    let period_return = (1.0 + raw_sample) / (1.0 - discount);
    CompoundedReturn {
        period_return,
        annual_return: period_return.powf(ratio.value()),
    }
}
