//! Search request options and tuning knobs.
//!
//! The bounds follow the usual engine spin options: threads 0..=256 (0 means
//! one per CPU), hash up to 1 GiB, depth 1..=30.

use std::time::Duration;

use crate::error::SearchError;
use crate::transposition_table::BUCKET_BYTES;

pub const MIN_DEPTH: u32 = 1;
pub const MAX_DEPTH: u32 = 30;
pub const DEFAULT_DEPTH: u32 = 6;

pub const MAX_THREADS: usize = 256;

/// Smallest usable table: 1 KiB.
pub const MIN_TRANSPOSITION_BYTES: usize = 1 << 10;
pub const MAX_TRANSPOSITION_BYTES: usize = 1 << 30;
pub const DEFAULT_TRANSPOSITION_BYTES: usize = 16 << 20;

pub const DEFAULT_ASPIRATION_DELTA: i32 = 50;

/// Options for one `get_move` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub max_depth: u32,
    /// `None` searches until `max_depth` or an external stop.
    pub time_budget: Option<Duration>,
    /// Root-move workers; 0 uses every CPU.
    pub thread_count: usize,
    pub transposition_bytes: usize,
}

impl SearchRequest {
    pub fn new(max_depth: u32) -> Self {
        SearchRequest {
            max_depth,
            ..Default::default()
        }
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.thread_count = threads;
        self
    }

    pub fn with_transposition_bytes(mut self, bytes: usize) -> Self {
        self.transposition_bytes = bytes;
        self
    }

    /// Reject out-of-range options before any work starts.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&self.max_depth) {
            return Err(SearchError::InvalidConfiguration(format!(
                "depth {} outside {MIN_DEPTH}..={MAX_DEPTH}",
                self.max_depth
            )));
        }
        if self.time_budget == Some(Duration::ZERO) {
            return Err(SearchError::InvalidConfiguration("time budget must be positive".into()));
        }
        if self.thread_count > MAX_THREADS {
            return Err(SearchError::InvalidConfiguration(format!(
                "{} threads requested, at most {MAX_THREADS} supported",
                self.thread_count
            )));
        }
        if !(MIN_TRANSPOSITION_BYTES..=MAX_TRANSPOSITION_BYTES).contains(&self.transposition_bytes)
            || self.transposition_bytes < BUCKET_BYTES
        {
            return Err(SearchError::InvalidConfiguration(format!(
                "transposition table size {} outside {MIN_TRANSPOSITION_BYTES}..={MAX_TRANSPOSITION_BYTES} bytes",
                self.transposition_bytes
            )));
        }
        Ok(())
    }

    /// Worker count with 0 resolved to the number of CPUs.
    pub fn effective_threads(&self) -> usize {
        if self.thread_count == 0 {
            num_cpus::get()
        } else {
            self.thread_count
        }
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            max_depth: DEFAULT_DEPTH,
            time_budget: None,
            thread_count: 1,
            transposition_bytes: DEFAULT_TRANSPOSITION_BYTES,
        }
    }
}

/// Search heuristics that stay fixed across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTuning {
    /// Initial half-width of the aspiration window, in centipawns.
    pub aspiration_delta: i32,
    pub use_aspiration_windows: bool,
    pub use_transposition_cutoffs: bool,
}

impl SearchTuning {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.aspiration_delta <= 0 {
            return Err(SearchError::InvalidConfiguration(format!(
                "aspiration delta must be positive, got {}",
                self.aspiration_delta
            )));
        }
        Ok(())
    }
}

impl Default for SearchTuning {
    fn default() -> Self {
        SearchTuning {
            aspiration_delta: DEFAULT_ASPIRATION_DELTA,
            use_aspiration_windows: true,
            use_transposition_cutoffs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SearchRequest::default().validate().is_ok());
        assert!(SearchTuning::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_options_are_rejected() {
        let invalid = [
            SearchRequest::new(0),
            SearchRequest::new(MAX_DEPTH + 1),
            SearchRequest::new(4).with_time_budget(Duration::ZERO),
            SearchRequest::new(4).with_threads(MAX_THREADS + 1),
            SearchRequest::new(4).with_transposition_bytes(16),
        ];
        for request in invalid {
            assert!(
                matches!(request.validate(), Err(SearchError::InvalidConfiguration(_))),
                "{request:?} should be rejected"
            );
        }
        let tuning = SearchTuning {
            aspiration_delta: 0,
            ..SearchTuning::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn zero_threads_means_every_cpu() {
        assert_eq!(SearchRequest::new(3).with_threads(0).effective_threads(), num_cpus::get());
        assert_eq!(SearchRequest::new(3).with_threads(3).effective_threads(), 3);
    }
}
