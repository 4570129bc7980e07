//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation of the same window.

use super::sma::sma;
use super::stddev::stddev;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger(values: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    let middle = sma(values, period);
    let deviations = stddev(values, period);
    let width = |sd: &f64| multiplier.abs() * sd;

    BollingerBands {
        upper: middle.iter().zip(&deviations).map(|(m, sd)| m + width(sd)).collect(),
        lower: middle.iter().zip(&deviations).map(|(m, sd)| m - width(sd)).collect(),
        middle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn bollinger_known_window() {
        let bands = bollinger(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8, 2.0);
        assert_eq!(bands.middle.len(), 1);
        assert_abs_diff_eq!(bands.middle[0], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bands.upper[0], 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bands.lower[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn bollinger_constant_prices_collapse() {
        let bands = bollinger(&[10.0; 5], 3, 2.0);
        assert_eq!(bands.upper, bands.middle);
        assert_eq!(bands.lower, bands.middle);
    }

    #[test]
    fn bollinger_ordering() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 + ((i * 7) % 11) as f64).collect();
        let bands = bollinger(&closes, 5, 2.5);
        for i in 0..bands.middle.len() {
            assert!(bands.lower[i] <= bands.middle[i]);
            assert!(bands.middle[i] <= bands.upper[i]);
        }
    }

    #[test]
    fn bollinger_short_input() {
        let bands = bollinger(&[1.0, 2.0], 3, 2.0);
        assert!(bands.upper.is_empty() && bands.middle.is_empty() && bands.lower.is_empty());
    }
}
