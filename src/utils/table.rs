use serde::{Deserialize, Serialize};

use crate::utils::errors::SimError;

/// One-dimensional lookup table with linear interpolation and clamped ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table1D {
    rows: Vec<(f64, f64)>,
}

impl Table1D {
    pub fn new(rows: Vec<(f64, f64)>) -> Result<Self, SimError> {
        if rows.len() < 2 {
            return Err(SimError::InvalidConfig(
                "Table must have at least two rows".into(),
            ));
        }
        if rows.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(SimError::InvalidConfig(
                "Table keys must be strictly increasing".into(),
            ));
        }
        Ok(Self { rows })
    }

    pub fn value(&self, key: f64) -> f64 {
        let first = self.rows[0];
        let last = self.rows[self.rows.len() - 1];
        if key <= first.0 {
            return first.1;
        }
        if key >= last.0 {
            return last.1;
        }
        // Find the bracketing pair and interpolate.
        let idx = self.rows.partition_point(|r| r.0 <= key);
        let (x0, y0) = self.rows[idx - 1];
        let (x1, y1) = self.rows[idx];
        y0 + (y1 - y0) * (key - x0) / (x1 - x0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> Table1D {
        Table1D::new(vec![(-10.0, -1.0), (0.0, 0.0), (10.0, 1.0)]).unwrap()
    }

    #[test]
    fn test_interpolation() {
        let t = table();
        assert_relative_eq!(t.value(5.0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(t.value(-2.5), -0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_clamped_ends() {
        let t = table();
        assert_relative_eq!(t.value(100.0), 1.0);
        assert_relative_eq!(t.value(-100.0), -1.0);
    }

    #[test]
    fn test_exact_breakpoints() {
        let t = table();
        assert_relative_eq!(t.value(0.0), 0.0);
        assert_relative_eq!(t.value(10.0), 1.0);
    }

    #[test]
    fn test_rejects_unsorted_keys() {
        assert!(Table1D::new(vec![(0.0, 0.0), (0.0, 1.0)]).is_err());
        assert!(Table1D::new(vec![(1.0, 0.0)]).is_err());
    }
}
