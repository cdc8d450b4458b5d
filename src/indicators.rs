//! Moving-average indicator and the crossover signal built on it.
//!
//! Input slices are `&[f64]` closing prices, oldest first.

/// Average of the last `period` values, or `None` if there are fewer.
pub fn last_sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Price position relative to a moving average with a dead band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Crossover {
    /// Price more than `band` above the average.
    Above,
    /// Price more than `band` below the average.
    Below,
    /// Within the band.
    Inside,
}

/// Classify `last` against `average` with an absolute `band`.
pub fn crossover(average: f64, last: f64, band: f64) -> Crossover {
    if average + band < last {
        Crossover::Above
    } else if average - band > last {
        Crossover::Below
    } else {
        Crossover::Inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_sma_uses_the_tail() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        assert_eq!(last_sma(&closes, 5), Some(13.0));
        assert_eq!(last_sma(&closes, 6), Some(12.5));
        assert_eq!(last_sma(&closes, 7), None);
        assert_eq!(last_sma(&closes, 0), None);
    }

    #[test]
    fn crossover_band() {
        assert_eq!(crossover(100.0, 101.5, 1.0), Crossover::Above);
        assert_eq!(crossover(100.0, 98.5, 1.0), Crossover::Below);
        assert_eq!(crossover(100.0, 101.0, 1.0), Crossover::Inside);
        assert_eq!(crossover(100.0, 99.0, 1.0), Crossover::Inside);
    }
}
