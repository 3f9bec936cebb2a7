/// Relative change from `previous` to `current` best score.
///
/// Improvements (`current <= previous`) are positive, `|prev - cur| / |prev|`.
/// Regressions are negative, `-|prev - cur| / |cur|`.
pub fn relative_improvement(previous: f64, current: f64) -> f64 {
    if previous == current {
        return 0.0;
    }
    if previous.is_infinite() && current.is_finite() {
        return f64::INFINITY;
    }
    if current.is_infinite() && previous.is_finite() {
        return f64::NEG_INFINITY;
    }
    if current <= previous {
        (previous - current).abs() / previous.abs()
    } else {
        -(previous - current).abs() / current.abs()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EarlyStopping {
    pub min_rel_delta: f64,
}

impl EarlyStopping {
    pub fn new(min_rel_delta: f64) -> Self {
        Self { min_rel_delta }
    }

    /// Improvement between the last two progression entries if it falls
    /// below the threshold.
    pub fn check(&self, progression: &[f64]) -> Option<f64> {
        let [.., previous, current] = progression else {
            return None;
        };
        let improvement = relative_improvement(*previous, *current);
        (improvement < self.min_rel_delta).then_some(improvement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improvement() {
        assert!((relative_improvement(100.0, 90.0) - 0.1).abs() < 1e-12);
        assert!((relative_improvement(-100.0, -110.0) - 0.1).abs() < 1e-12);
        assert_eq!(relative_improvement(5.0, 5.0), 0.0);
    }

    #[test]
    fn test_regression_is_negative() {
        assert!((relative_improvement(90.0, 100.0) + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_infinite_previous() {
        assert_eq!(relative_improvement(f64::INFINITY, 3.0), f64::INFINITY);
        assert_eq!(relative_improvement(f64::INFINITY, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_check_threshold() {
        let stopping = EarlyStopping::new(0.2);
        assert_eq!(stopping.check(&[100.0]), None);
        let improvement = stopping.check(&[f64::INFINITY, 100.0, 90.0]).unwrap();
        assert!((improvement - 0.1).abs() < 1e-12);
        assert_eq!(stopping.check(&[100.0, 50.0]), None);
    }
}
