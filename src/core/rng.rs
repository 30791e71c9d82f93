use super::error::SimulationError;

pub const MAX_POLAR_ATTEMPTS: u32 = 10_000;

/// Uniform variates on the open interval (0, 1).
pub trait UniformSource {
    fn next_f64(&mut self) -> f64;
}

pub fn derive_seed(base_seed: u64, stream: u64) -> u64 {
    splitmix64(base_seed ^ stream.rotate_left(32))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// xorshift64* generator. Not shared across threads; each worker seeds its own.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }
}

impl UniformSource for Rng {
    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorExhausted {
    pub attempts: u32,
}

impl GeneratorExhausted {
    pub fn at_iteration(self, iteration: u64) -> SimulationError {
        SimulationError::GeneratorExhausted {
            iteration,
            attempts: self.attempts,
        }
    }
}

/// Standard normal variates via the Marsaglia polar method.
///
/// Each accepted pair yields two independent normals. By default the second one
/// is thrown away, which costs roughly twice the uniform draws; `with_pair_caching`
/// keeps it for the next call.
pub struct StandardNormalGenerator<U> {
    source: U,
    cache_pair: bool,
    cached_normal: Option<f64>,
    max_attempts: u32,
}

impl<U: UniformSource> StandardNormalGenerator<U> {
    pub fn new(source: U) -> Self {
        Self {
            source,
            cache_pair: false,
            cached_normal: None,
            max_attempts: MAX_POLAR_ATTEMPTS,
        }
    }

    pub fn with_pair_caching(mut self, enabled: bool) -> Self {
        self.cache_pair = enabled;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn next(&mut self) -> Result<f64, GeneratorExhausted> {
        if let Some(z) = self.cached_normal.take() {
            return Ok(z);
        }

        for _ in 0..self.max_attempts {
            let x1 = 2.0 * self.source.next_f64() - 1.0;
            let x2 = 2.0 * self.source.next_f64() - 1.0;
            let rad = x1 * x1 + x2 * x2;
            if rad >= 1.0 || rad == 0.0 {
                continue;
            }

            let c = (-2.0 * rad.ln() / rad).sqrt();
            if self.cache_pair {
                self.cached_normal = Some(x2 * c);
            }
            return Ok(x1 * c);
        }

        Err(GeneratorExhausted {
            attempts: self.max_attempts,
        })
    }

    pub fn next_scaled(&mut self, mu: f64, sigma: f64) -> Result<f64, GeneratorExhausted> {
        Ok(sigma * self.next()? + mu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{any, prop_assert, proptest};

    struct ConstantSource(f64);

    impl UniformSource for ConstantSource {
        fn next_f64(&mut self) -> f64 {
            self.0
        }
    }

    struct ScriptedSource {
        values: Vec<f64>,
        index: usize,
    }

    impl UniformSource for ScriptedSource {
        fn next_f64(&mut self) -> f64 {
            let v = self.values[self.index % self.values.len()];
            self.index += 1;
            v
        }
    }

    fn mean_and_variance(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, variance)
    }

    #[test]
    fn rng_zero_seed_is_remapped_and_not_stuck() {
        let mut rng = Rng::new(0);
        let a = rng.next_f64();
        let b = rng.next_f64();
        assert!(a > 0.0 && a < 1.0);
        assert!(b > 0.0 && b < 1.0);
        assert_ne!(a, b);
    }

    #[test]
    fn derive_seed_separates_streams() {
        assert_ne!(derive_seed(42, 0), derive_seed(42, 1));
        assert_ne!(derive_seed(42, 1), derive_seed(43, 1));
        assert_eq!(derive_seed(7, 3), derive_seed(7, 3));
    }

    #[test]
    fn stuck_uniform_source_exhausts_instead_of_hanging() {
        // 0.5 maps to x1 = x2 = 0, so rad is always zero.
        let mut normal = StandardNormalGenerator::new(ConstantSource(0.5));
        let err = normal.next().expect_err("must exhaust");
        assert_eq!(
            err,
            GeneratorExhausted {
                attempts: MAX_POLAR_ATTEMPTS
            }
        );
        assert_eq!(
            err.at_iteration(9),
            SimulationError::GeneratorExhausted {
                iteration: 9,
                attempts: MAX_POLAR_ATTEMPTS
            }
        );
    }

    #[test]
    fn retry_cap_is_configurable() {
        let mut normal = StandardNormalGenerator::new(ConstantSource(0.5)).with_max_attempts(12);
        assert_eq!(normal.next(), Err(GeneratorExhausted { attempts: 12 }));
    }

    #[test]
    fn polar_transform_matches_hand_calculation() {
        // u = 0.75, 0.5 -> x1 = 0.5, x2 = 0.0, rad = 0.25
        let mut normal = StandardNormalGenerator::new(ScriptedSource {
            values: vec![0.75, 0.5],
            index: 0,
        });
        let expected = 0.5 * (-2.0 * 0.25_f64.ln() / 0.25).sqrt();
        let z = normal.next().expect("accepted pair");
        assert!((z - expected).abs() <= 1e-12, "expected {expected}, got {z}");
    }

    #[test]
    fn rejected_pairs_outside_unit_circle_are_redrawn() {
        // First pair lands on the corner (rad = 1.62), second is accepted.
        let mut normal = StandardNormalGenerator::new(ScriptedSource {
            values: vec![0.95, 0.95, 0.75, 0.5],
            index: 0,
        });
        let expected = 0.5 * (-2.0 * 0.25_f64.ln() / 0.25).sqrt();
        let z = normal.next().expect("second pair accepted");
        assert!((z - expected).abs() <= 1e-12);
    }

    #[test]
    fn pair_caching_returns_second_variate_next() {
        // x1 = 0.5, x2 = -0.25, rad = 0.3125
        let mut normal = StandardNormalGenerator::new(ScriptedSource {
            values: vec![0.75, 0.375],
            index: 0,
        })
        .with_pair_caching(true);
        let rad: f64 = 0.3125;
        let c = (-2.0 * rad.ln() / rad).sqrt();
        let first = normal.next().expect("first");
        let second = normal.next().expect("second");
        assert!((first - 0.5 * c).abs() <= 1e-12);
        assert!((second + 0.25 * c).abs() <= 1e-12);
    }

    #[test]
    fn large_run_matches_standard_normal_moments() {
        let mut normal = StandardNormalGenerator::new(Rng::new(2024));
        let draws: Vec<f64> = (0..100_000)
            .map(|_| normal.next().expect("draw"))
            .collect();
        let (mean, variance) = mean_and_variance(&draws);
        assert!(mean.abs() <= 0.05, "mean {mean}");
        assert!((variance - 1.0).abs() <= 0.1, "variance {variance}");
    }

    #[test]
    fn cached_pairs_keep_standard_normal_moments() {
        let mut normal = StandardNormalGenerator::new(Rng::new(99)).with_pair_caching(true);
        let draws: Vec<f64> = (0..100_000)
            .map(|_| normal.next().expect("draw"))
            .collect();
        let (mean, variance) = mean_and_variance(&draws);
        assert!(mean.abs() <= 0.05, "mean {mean}");
        assert!((variance - 1.0).abs() <= 0.1, "variance {variance}");
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_uniform_draws_stay_in_open_unit_interval(seed in any::<u64>()) {
            let mut rng = Rng::new(seed);
            for _ in 0..256 {
                let u = rng.next_f64();
                prop_assert!(u > 0.0 && u < 1.0);
            }
        }

        #[test]
        fn prop_scaled_draw_is_affine_in_mu_and_sigma(
            seed in any::<u64>(),
            mu_bp in -5_000i32..5_000,
            sigma_bp in 1u32..10_000
        ) {
            let mu = mu_bp as f64 / 10_000.0;
            let sigma = sigma_bp as f64 / 10_000.0;
            let z = StandardNormalGenerator::new(Rng::new(seed)).next().expect("draw");
            let x = StandardNormalGenerator::new(Rng::new(seed))
                .next_scaled(mu, sigma)
                .expect("draw");
            prop_assert!((x - (sigma * z + mu)).abs() <= 1e-12);
        }
    }
}
