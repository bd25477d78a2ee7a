//! Social sentiment/volume feed port trait.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentReading {
    /// Bullishness in [0, 1].
    pub sentiment: f64,
    /// Posts mentioning the symbol over the sampling window.
    pub post_volume: u64,
}

impl SentimentReading {
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.sentiment)
    }
}

pub trait SentimentPort {
    fn reading(&self, symbol: &str) -> Option<SentimentReading>;
}
