use crate::error::{KerndiscError, Result};
use log::{error, warn};

const STD_TOLERANCE: f64 = 1e-8;

/// Prepare a series for discovery.
///
/// `y` is centred and scaled to unit standard deviation (scaling is skipped
/// when the deviation is numerically zero). `x` is optionally rescaled onto
/// `[0, upper_bound]` with `x' = upper_bound * x / max(x)`.
pub fn preprocess(x: &[f64], y: &[f64], rescale_x_to_upper_bound: Option<f64>) -> Result<(Vec<f64>, Vec<f64>)> {
    if x.len() != y.len() {
        error!("Shapes of x and y do not match: {} vs {}", x.len(), y.len());
        return Err(KerndiscError::ShapeMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }

    let mut y = y.to_vec();
    if !y.is_empty() {
        let n = y.len() as f64;
        let mean = y.iter().sum::<f64>() / n;
        y.iter_mut().for_each(|v| *v -= mean);

        let std = (y.iter().map(|v| v * v).sum::<f64>() / n).sqrt();
        if std.abs() > STD_TOLERANCE {
            y.iter_mut().for_each(|v| *v /= std);
        } else {
            warn!("Standard deviation of y is zero, skipping scaling");
        }
    }

    let x = match rescale_x_to_upper_bound {
        Some(bound) => rescale_x(x, bound)?,
        None => x.to_vec(),
    };

    Ok((x, y))
}

/// `bound * x / max(x)`, keeping ratios between points.
pub fn rescale_x(x: &[f64], bound: f64) -> Result<Vec<f64>> {
    let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if bound.is_nan() || bound <= 0.0 || x.is_empty() || max == 0.0 {
        error!("Bad upper bound `{}` or bad maximum `{}` to rescale x", bound, max);
        return Err(KerndiscError::InvalidBound(format!(
            "cannot rescale x with maximum {} to upper bound {}",
            max, bound
        )));
    }
    Ok(x.iter().map(|v| bound * v / max).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch() {
        let result = preprocess(&[1.0, 2.0], &[1.0], None);
        assert!(matches!(
            result,
            Err(KerndiscError::ShapeMismatch { x_len: 2, y_len: 1 })
        ));
    }

    #[test]
    fn test_y_is_standardised() {
        let (_, y) = preprocess(&[0.0, 1.0, 2.0, 3.0], &[2.0, 4.0, 6.0, 8.0], None).unwrap();
        let mean = y.iter().sum::<f64>() / 4.0;
        let var = y.iter().map(|v| v * v).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_y_only_centred() {
        let (_, y) = preprocess(&[0.0, 1.0, 2.0], &[5.0, 5.0, 5.0], None).unwrap();
        assert_eq!(y, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rescale_keeps_ratios() {
        let (x, _) = preprocess(&[1.0, 2.0, 4.0], &[0.0, 1.0, 0.0], Some(2.0)).unwrap();
        assert_eq!(x, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(matches!(
            preprocess(&[1.0, 2.0], &[0.0, 1.0], Some(0.0)),
            Err(KerndiscError::InvalidBound(_))
        ));
        assert!(matches!(
            preprocess(&[1.0, 2.0], &[0.0, 1.0], Some(-1.0)),
            Err(KerndiscError::InvalidBound(_))
        ));
        assert!(matches!(
            preprocess(&[-1.0, 0.0], &[0.0, 1.0], Some(1.0)),
            Err(KerndiscError::InvalidBound(_))
        ));
    }

    #[test]
    fn test_empty_series_passes_through() {
        let (x, y) = preprocess(&[], &[], None).unwrap();
        assert!(x.is_empty() && y.is_empty());
    }
}
