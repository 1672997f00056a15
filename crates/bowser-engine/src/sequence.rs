//! Per-flow request sequencing.
//!
//! Each asynchronous flow stamps its requests with a monotonically increasing
//! number. Only the response to the most recently issued request may be
//! applied; anything older is stale.

use std::fmt;

/// The asynchronous flows driven by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Tile,
    Reference,
    Aggregator,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::Tile => "tile",
            Flow::Reference => "reference",
            Flow::Aggregator => "aggregator",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic sequence counter for one flow.
#[derive(Debug, Clone, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next sequence number. Every earlier number becomes stale.
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        seq == self.latest
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_last_issued_is_latest() {
        let mut seq = RequestSequence::new();
        let first = seq.issue();
        let second = seq.issue();
        assert!(second > first);
        assert!(!seq.is_latest(first));
        assert!(seq.is_latest(second));
    }

    #[test]
    fn test_nothing_issued_accepts_nothing() {
        let seq = RequestSequence::new();
        assert!(!seq.is_latest(1));
        assert_eq!(seq.latest(), 0);
    }
}
