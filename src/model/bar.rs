/// One finalized OHLC bar. `start_time_ms` is aligned to the bar interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub start_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(start_time_ms: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            start_time_ms,
            open,
            high,
            low,
            close,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// All four prices are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// Start of the interval containing `timestamp_ms`, floored toward negative infinity.
///
/// `None` when `interval_ms` is not positive or the start is not representable.
pub fn interval_start(timestamp_ms: i64, interval_ms: i64) -> Option<i64> {
    if interval_ms <= 0 {
        return None;
    }
    timestamp_ms
        .div_euclid(interval_ms)
        .checked_mul(interval_ms)
}

/// The in-progress bar that live ticks are folded into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentBar {
    pub start_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl CurrentBar {
    /// Start a new bar. The bucket is aligned to the interval; `None` when
    /// the tick cannot be bucketed.
    pub fn new(price: f64, timestamp_ms: i64, interval_ms: i64) -> Option<Self> {
        Some(Self {
            start_time_ms: interval_start(timestamp_ms, interval_ms)?,
            open: price,
            high: price,
            low: price,
            close: price,
        })
    }

    /// Update the bar with a new tick price.
    pub fn update(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }

    /// Check if a timestamp belongs to this bar's time bucket.
    pub fn contains(&self, timestamp_ms: i64, interval_ms: i64) -> bool {
        interval_start(timestamp_ms, interval_ms) == Some(self.start_time_ms)
    }

    /// Finalize into an immutable Bar.
    pub fn finish(&self) -> Bar {
        Bar {
            start_time_ms: self.start_time_ms,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        }
    }
}

/// Fold one tick into the in-progress bar.
///
/// Returns `(true, fresh)` when the tick opens a new interval (or there was no
/// bar yet); the caller must finalize the previous bar before adopting `fresh`.
/// Otherwise returns `(false, updated)` with close/high/low moved by the tick.
/// Returns `None` for a non-positive interval or an unbucketable timestamp.
pub fn fold_tick(
    current: Option<CurrentBar>,
    timestamp_ms: i64,
    price: f64,
    interval_ms: i64,
) -> Option<(bool, CurrentBar)> {
    match current {
        Some(mut bar) if bar.contains(timestamp_ms, interval_ms) => {
            bar.update(price);
            Some((false, bar))
        }
        _ => CurrentBar::new(price, timestamp_ms, interval_ms).map(|fresh| (true, fresh)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_bar_basics() {
        let mut cb = CurrentBar::new(100.0, 60_500, 60_000).unwrap();
        assert_eq!(cb.start_time_ms, 60_000);
        assert!(cb.contains(60_500, 60_000));
        assert!(cb.contains(119_999, 60_000));
        assert!(!cb.contains(120_000, 60_000));

        cb.update(105.0);
        cb.update(95.0);
        cb.update(102.0);

        let bar = cb.finish();
        assert!((bar.open - 100.0).abs() < f64::EPSILON);
        assert!((bar.high - 105.0).abs() < f64::EPSILON);
        assert!((bar.low - 95.0).abs() < f64::EPSILON);
        assert!((bar.close - 102.0).abs() < f64::EPSILON);
        assert!(bar.is_bullish());
    }

    #[test]
    fn bearish_bar() {
        let bar = Bar::new(0, 100.0, 105.0, 90.0, 95.0);
        assert!(!bar.is_bullish());
    }

    #[test]
    fn interval_start_floors_negative_timestamps() {
        assert_eq!(interval_start(-1, 60_000), Some(-60_000));
        assert_eq!(interval_start(-60_000, 60_000), Some(-60_000));
        assert_eq!(interval_start(59_999, 60_000), Some(0));
    }

    #[test]
    fn fold_tick_without_current_rolls_over() {
        let (rolled, cb) = fold_tick(None, 61_000, 1.5, 60_000).unwrap();
        assert!(rolled);
        assert_eq!(cb.start_time_ms, 60_000);
        assert!((cb.high - 1.5).abs() < f64::EPSILON);
        assert!((cb.low - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_bar_detected() {
        assert!(!Bar::new(0, 1.0, f64::NAN, 1.0, 1.0).is_finite());
        assert!(Bar::new(0, 1.0, 1.0, 1.0, 1.0).is_finite());
    }

    #[test]
    fn current_bar_rejects_non_positive_interval() {
        assert!(CurrentBar::new(100.0, 60_500, 0).is_none());
        assert!(CurrentBar::new(100.0, 60_500, -60_000).is_none());
        assert!(fold_tick(None, 60_500, 100.0, 0).is_none());
    }

    #[test]
    fn extreme_timestamps_are_not_bucketed() {
        assert_eq!(interval_start(i64::MIN, 60_000), None);
        assert!(fold_tick(None, i64::MIN, 1.0, 60_000).is_none());

        let cb = CurrentBar::new(1.0, 60_000, 60_000).unwrap();
        assert!(!cb.contains(i64::MIN, 60_000));
        assert!(fold_tick(Some(cb), i64::MIN, 2.0, 60_000).is_none());
    }
}
