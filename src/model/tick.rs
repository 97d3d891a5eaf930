/// A single best-bid observation from the live feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub timestamp_ms: i64,
    pub price: f64,
}

impl Tick {
    pub fn new(timestamp_ms: i64, price: f64) -> Self {
        Self {
            timestamp_ms,
            price,
        }
    }
}
