//! Integrator metrics for profiling and debugging
//!
//! Collected by `simulate_with_metrics`; the plain `simulate` path skips the
//! bookkeeping.

/// Metrics collected while integrating one iteration
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationMetrics {
    /// RK4 steps taken
    pub rk4_steps: u64,
    /// Output points recorded (horizon + 1 on success)
    pub output_steps: u64,
    /// Largest |sum of population cells - 1| seen at an output point
    pub max_population_drift: f64,
    /// Smallest population cell value seen at an output point
    pub min_state_value: f64,
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self {
            rk4_steps: 0,
            output_steps: 0,
            max_population_drift: 0.0,
            min_state_value: f64::INFINITY,
        }
    }
}

impl SimulationMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self) {
        self.rk4_steps += 1;
    }

    /// Record an output point with the population cells at that time
    pub fn record_output(&mut self, occupancy: &[f64]) {
        self.output_steps += 1;
        let total: f64 = occupancy.iter().sum();
        self.max_population_drift = self.max_population_drift.max((total - 1.0).abs());
        if let Some(min) = occupancy.iter().copied().reduce(f64::min) {
            self.min_state_value = self.min_state_value.min(min);
        }
    }

    /// True if some cell went meaningfully negative
    #[must_use]
    pub fn had_negative_state(&self, tolerance: f64) -> bool {
        self.min_state_value < -tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let mut metrics = SimulationMetrics::new();
        metrics.record_step();
        metrics.record_step();
        metrics.record_output(&[0.5, 0.5]);
        metrics.record_output(&[0.7, 0.3000001, -1e-3]);

        assert_eq!(metrics.rk4_steps, 2);
        assert_eq!(metrics.output_steps, 2);
        assert!((metrics.max_population_drift - 0.0009999).abs() < 1e-9);
        assert_eq!(metrics.min_state_value, -1e-3);
        assert!(metrics.had_negative_state(1e-6));
        assert!(!metrics.had_negative_state(1e-2));
    }
}
