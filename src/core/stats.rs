use super::error::SimulationError;
use super::types::{Quantiles, SummaryStatistics};

/// Mean and population variance (divisor `n`).
pub fn summarize(samples: &[f64]) -> Result<SummaryStatistics, SimulationError> {
    if samples.is_empty() {
        return Err(SimulationError::EmptySampleSet);
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if !mean.is_finite() {
        return Err(SimulationError::NonFiniteStatistic("mean"));
    }
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    if !variance.is_finite() {
        return Err(SimulationError::NonFiniteStatistic("variance"));
    }

    Ok(SummaryStatistics { mean, variance })
}

pub fn quantiles(samples: &[f64]) -> Result<Quantiles, SimulationError> {
    if samples.is_empty() {
        return Err(SimulationError::EmptySampleSet);
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(Quantiles {
        p10: percentile_sorted(&sorted, 10.0),
        median: percentile_sorted(&sorted, 50.0),
        p90: percentile_sorted(&sorted, 90.0),
    })
}

fn percentile_sorted(values: &[f64], p: f64) -> f64 {
    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};
    use proptest::collection::vec;

    const EPS: f64 = 1e-12;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn summarize_one_two_three() {
        let stats = summarize(&[1.0, 2.0, 3.0]).expect("non-empty");
        assert_approx(stats.mean, 2.0);
        assert_approx(stats.variance, 2.0 / 3.0);
    }

    #[test]
    fn summarize_single_sample_has_zero_variance() {
        let stats = summarize(&[4.5]).expect("non-empty");
        assert_approx(stats.mean, 4.5);
        assert_approx(stats.variance, 0.0);
    }

    #[test]
    fn summarize_empty_is_an_error() {
        assert_eq!(summarize(&[]), Err(SimulationError::EmptySampleSet));
    }

    #[test]
    fn summarize_overflowing_variance_is_an_error() {
        assert_eq!(
            summarize(&[1e200, -1e200]),
            Err(SimulationError::NonFiniteStatistic("variance"))
        );
    }

    #[test]
    fn summarize_non_finite_input_is_an_error() {
        assert_eq!(
            summarize(&[1.0, f64::INFINITY]),
            Err(SimulationError::NonFiniteStatistic("mean"))
        );
    }

    #[test]
    fn quantiles_interpolate_between_order_statistics() {
        let q = quantiles(&[5.0, 1.0, 4.0, 2.0, 3.0]).expect("non-empty");
        assert_approx(q.median, 3.0);
        assert_approx(q.p10, 1.4);
        assert_approx(q.p90, 4.6);
    }

    #[test]
    fn quantiles_empty_is_an_error() {
        assert_eq!(quantiles(&[]), Err(SimulationError::EmptySampleSet));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(96))]

        #[test]
        fn prop_variance_is_non_negative_and_shift_invariant(
            values in vec(-1_000.0f64..1_000.0, 1..64),
            shift in -100.0f64..100.0
        ) {
            let base = summarize(&values).expect("non-empty");
            let shifted: Vec<f64> = values.iter().map(|v| v + shift).collect();
            let moved = summarize(&shifted).expect("non-empty");

            prop_assert!(base.variance >= 0.0);
            prop_assert!((moved.mean - (base.mean + shift)).abs() <= 1e-6);
            prop_assert!((moved.variance - base.variance).abs() <= 1e-6 * base.variance.max(1.0));
        }

        #[test]
        fn prop_quantiles_are_ordered_and_within_range(
            values in vec(-10.0f64..10.0, 1..128)
        ) {
            let q = quantiles(&values).expect("non-empty");
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(min <= q.p10 && q.p10 <= q.median && q.median <= q.p90 && q.p90 <= max);
        }
    }
}
