use serde::{Deserialize, Serialize};

/// First-order lag filter C/(s + C), discretized with the Tustin transform.
///
/// Used to knock execution-rate jitter out of the gear contact forces and
/// the wheel slip angle. A coefficient at or below zero bypasses the filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LagFilter {
    ca: f64,
    cb: f64,
    prev_input: f64,
    prev_output: f64,
}

impl LagFilter {
    pub fn new(coeff: f64, dt: f64) -> Self {
        let denom = 2.0 + coeff * dt;
        Self {
            ca: coeff * dt / denom,
            cb: (2.0 - coeff * dt) / denom,
            prev_input: 0.0,
            prev_output: 0.0,
        }
    }

    pub fn execute(&mut self, input: f64) -> f64 {
        let output = (input + self.prev_input) * self.ca + self.prev_output * self.cb;
        self.prev_input = input;
        self.prev_output = output;
        output
    }

    pub fn reset(&mut self) {
        self.prev_input = 0.0;
        self.prev_output = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_settles_to_step_input() {
        let mut filter = LagFilter::new(100.0, 0.01);
        let mut out = 0.0;
        for _ in 0..100 {
            out = filter.execute(1.0);
        }
        assert_relative_eq!(out, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_first_sample_is_attenuated() {
        let mut filter = LagFilter::new(100.0, 0.01);
        let out = filter.execute(1.0);
        assert!(out > 0.0 && out < 1.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = LagFilter::new(50.0, 0.01);
        filter.execute(5.0);
        filter.reset();
        let out = filter.execute(0.0);
        assert_relative_eq!(out, 0.0, epsilon = 1e-12);
    }
}
