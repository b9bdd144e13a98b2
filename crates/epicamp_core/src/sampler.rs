//! Monte Carlo sampler
//!
//! Each iteration draws one value per stochastic rate from a lognormal
//! centred on the deterministic rate, so draws never go negative.
//! Transmissibility is picked uniformly from the normalised beta vector and
//! rescaled by the drawn removal rate, keeping every draw's reproduction
//! number on the configured R0 range.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};

use crate::config::ParameterSet;
use crate::error::{InputValidationError, Result};
use crate::model::{DerivedRate, DrawnRates};

/// Lognormal with a given mean and standard deviation, or a constant
#[derive(Debug, Clone, Copy)]
pub enum RateDistribution {
    Fixed(f64),
    LogNormal(LogNormal<f64>),
}

impl RateDistribution {
    /// μ = ln(m² / √(m² + s²)), σ = √ln(1 + s²/m²)
    pub fn from_mean_sd(name: &str, mean: f64, sd: f64) -> Result<Self> {
        if !(mean > 0.0) || !mean.is_finite() {
            return Err(InputValidationError::InvalidValue {
                field: name.to_string(),
                value: mean,
                reason: "sampled rates need a finite positive mean",
            });
        }
        if !(sd >= 0.0) || !sd.is_finite() {
            return Err(InputValidationError::InvalidValue {
                field: format!("{name} sigma"),
                value: sd,
                reason: "must be finite and non-negative",
            });
        }
        if sd == 0.0 {
            return Ok(RateDistribution::Fixed(mean));
        }

        let m2 = mean * mean;
        let mu = (m2 / (m2 + sd * sd).sqrt()).ln();
        let sigma = (1.0 + sd * sd / m2).ln().sqrt();
        LogNormal::new(mu, sigma)
            .map(RateDistribution::LogNormal)
            .map_err(|_| InputValidationError::InvalidValue {
                field: format!("{name} sigma"),
                value: sd,
                reason: "lognormal parameters out of range",
            })
    }

    pub fn from_rate(name: &str, rate: DerivedRate) -> Result<Self> {
        Self::from_mean_sd(name, rate.rate, rate.sigma)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            RateDistribution::Fixed(v) => *v,
            RateDistribution::LogNormal(d) => d.sample(rng),
        }
    }
}

/// Per-request sampler, built once and shared read-only by all workers
#[derive(Debug, Clone)]
pub struct RateSampler {
    beta_list: Vec<f64>,
    mean_removal: f64,
    latent: RateDistribution,
    removal: RateDistribution,
    hosp: RateDistribution,
    death: RateDistribution,
    death_with_icu: RateDistribution,
}

impl RateSampler {
    pub fn new(params: &ParameterSet) -> Result<Self> {
        let d = &params.disease;
        if params.infection.beta_list.is_empty() {
            return Err(InputValidationError::ShapeMismatch {
                what: "beta vector",
                expected: crate::infection::BETA_POINTS,
                found: 0,
            });
        }
        Ok(Self {
            beta_list: params.infection.beta_list.clone(),
            mean_removal: d.removal.rate,
            latent: RateDistribution::from_rate("latent rate", d.latent)?,
            removal: RateDistribution::from_rate("removal rate", d.removal)?,
            hosp: RateDistribution::from_rate("hosp rate", d.hosp)?,
            death: RateDistribution::from_rate("death rate", d.death)?,
            death_with_icu: RateDistribution::from_rate("death rate with ICU", d.death_with_icu)?,
        })
    }

    /// Draw one parameter vector. The draw order is fixed so a seeded RNG
    /// always yields the same vector.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> DrawnRates {
        let beta = self.beta_list[rng.random_range(0..self.beta_list.len())];
        let latent_rate = self.latent.sample(rng);
        let removal_rate = self.removal.sample(rng);
        let hosp_rate = self.hosp.sample(rng);
        let death_rate = self.death.sample(rng);
        let death_rate_with_icu = self.death_with_icu.sample(rng);

        DrawnRates {
            beta: beta * removal_rate / self.mean_removal,
            latent_rate,
            removal_rate,
            hosp_rate,
            death_rate,
            death_rate_with_icu,
        }
    }
}

/// Independent RNG of one iteration: seeded with `base_seed + iteration`
pub fn iteration_rng(base_seed: u64, iteration: usize) -> StdRng {
    StdRng::seed_from_u64(base_seed.wrapping_add(iteration as u64))
}

/// The configured seed, or a fresh one from OS entropy
pub fn resolve_base_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| rand::rng().random::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sd_is_exact() {
        let d = RateDistribution::from_mean_sd("x", 0.2, 0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(d.sample(&mut rng), 0.2);
    }

    #[test]
    fn test_lognormal_moments() {
        let (mean, sd) = (0.2, 0.04);
        let d = RateDistribution::from_mean_sd("x", mean, sd).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let n = 100_000;
        let samples: Vec<f64> = (0..n).map(|_| d.sample(&mut rng)).collect();

        assert!(samples.iter().all(|v| *v > 0.0));
        let m = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
        assert!((m - mean).abs() < 0.002, "mean {m}");
        assert!((var.sqrt() - sd).abs() < 0.002, "sd {}", var.sqrt());
    }

    #[test]
    fn test_non_positive_mean_rejected() {
        assert!(RateDistribution::from_mean_sd("x", 0.0, 0.1).is_err());
        assert!(RateDistribution::from_mean_sd("x", 0.1, -0.1).is_err());
    }

    #[test]
    fn test_iteration_rng_is_deterministic() {
        let a: u64 = iteration_rng(42, 3).random();
        let b: u64 = iteration_rng(42, 3).random();
        let c: u64 = iteration_rng(43, 2).random();
        assert_eq!(a, b);
        // seed + i: (42, 3) and (43, 2) share a stream
        assert_eq!(a, c);
        assert_eq!(resolve_base_seed(Some(9)), 9);
    }
}
