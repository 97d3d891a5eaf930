use super::bar::{interval_start, Bar};

/// Ordered bars, ascending by `start_time_ms`. The last bar may still be live.
///
/// Callers are expected to upsert with non-decreasing timestamps; an older
/// timestamp is appended as-is and breaks the ordering.
#[derive(Debug, Clone, Default)]
pub struct BarSequence {
    bars: Vec<Bar>,
}

impl BarSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current bars and install `bars`, which must already be
    /// session-filtered and sorted.
    pub fn replace_all(&mut self, bars: Vec<Bar>) {
        self.bars = bars;
    }

    /// Replace the last bar when it has the same start time, otherwise append.
    pub fn upsert_last_or_append(&mut self, bar: Bar) {
        match self.bars.last_mut() {
            Some(last) if last.start_time_ms == bar.start_time_ms => *last = bar,
            _ => {
                if let Some(last) = self.bars.last() {
                    if bar.start_time_ms < last.start_time_ms {
                        tracing::warn!(
                            last = last.start_time_ms,
                            incoming = bar.start_time_ms,
                            "Appending bar older than last stored bar"
                        );
                    }
                }
                self.bars.push(bar);
            }
        }
    }

    /// Move the last bar's close to `price` and widen its range, if the tick
    /// falls into that bar's interval. Returns whether anything changed.
    pub fn extend_last_with_price(&mut self, timestamp_ms: i64, price: f64, interval_ms: i64) -> bool {
        let Some(start) = interval_start(timestamp_ms, interval_ms) else {
            tracing::debug!(timestamp_ms, interval_ms, "Skipping tick outside any interval");
            return false;
        };
        match self.bars.last_mut() {
            Some(last) if last.start_time_ms == start => {
                last.high = last.high.max(price);
                last.low = last.low.min(price);
                last.close = price;
                true
            }
            _ => false,
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// The trailing `n` bars, or all of them when there are fewer.
pub fn clamp_last_n(bars: &[Bar], n: usize) -> &[Bar] {
    &bars[bars.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_ignores_tick_outside_last_interval() {
        let mut seq = BarSequence::new();
        seq.replace_all(vec![Bar::new(60_000, 1.0, 1.0, 1.0, 1.0)]);
        assert!(!seq.extend_last_with_price(120_000, 2.0, 60_000));
        assert!(!seq.extend_last_with_price(59_999, 2.0, 60_000));
        assert_eq!(seq.last(), Some(&Bar::new(60_000, 1.0, 1.0, 1.0, 1.0)));
    }

    #[test]
    fn extend_skips_unbucketable_ticks() {
        let mut seq = BarSequence::new();
        seq.replace_all(vec![Bar::new(0, 1.0, 1.0, 1.0, 1.0)]);
        assert!(!seq.extend_last_with_price(i64::MIN, 2.0, 60_000));
        assert!(!seq.extend_last_with_price(0, 2.0, 0));
        assert_eq!(seq.last(), Some(&Bar::new(0, 1.0, 1.0, 1.0, 1.0)));
    }

    #[test]
    fn extend_on_empty_sequence_is_noop() {
        let mut seq = BarSequence::new();
        assert!(!seq.extend_last_with_price(0, 1.0, 60_000));
        assert!(seq.is_empty());
    }

    #[test]
    fn clamp_last_n_keeps_tail() {
        let bars: Vec<Bar> = (0..5)
            .map(|i| Bar::new(i * 60_000, 1.0, 1.0, 1.0, 1.0))
            .collect();
        assert_eq!(clamp_last_n(&bars, 2).len(), 2);
        assert_eq!(clamp_last_n(&bars, 2)[0].start_time_ms, 180_000);
        assert_eq!(clamp_last_n(&bars, 10).len(), 5);
    }
}
