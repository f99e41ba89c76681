//! Run statistics
//!
//! This module tallies what happened to every candidate article during a run and
//! prints the summary shown at the end of the crawl.

use crate::state::{CandidateState, SkipReason};
use std::collections::HashMap;

/// Run statistics summary
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    /// Keywords whose search finished
    pub keywords_searched: u64,

    /// Hits returned by the search, before run-level dedup
    pub hits_found: u64,

    /// Candidates dispatched after run-level dedup
    pub candidates: u64,

    /// Final state counts
    pub outcomes: HashMap<CandidateState, u64>,

    /// Media assets attached to written articles
    pub images_saved: u64,
    pub videos_saved: u64,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a candidate's terminal state
    pub fn record(&mut self, state: CandidateState) {
        debug_assert!(state.is_terminal(), "recorded non-terminal state {}", state);
        *self.outcomes.entry(state).or_insert(0) += 1;
    }

    pub fn count(&self, state: CandidateState) -> u64 {
        self.outcomes.get(&state).copied().unwrap_or(0)
    }

    pub fn written(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|(state, _)| state.is_success())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn skipped(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|(state, _)| !state.is_success())
            .map(|(_, count)| count)
            .sum()
    }

    /// Share of processed candidates that ended with a file, in percent
    pub fn success_rate(&self) -> f64 {
        let processed: u64 = self.outcomes.values().sum();
        if processed == 0 {
            0.0
        } else {
            (self.written() as f64 / processed as f64) * 100.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Run Statistics ===\n");

    println!("Overview:");
    if stats.keywords_searched > 0 {
        println!("  Keywords searched: {}", stats.keywords_searched);
        println!("  Search hits: {}", stats.hits_found);
    }
    println!("  Unique candidates: {}", stats.candidates);
    println!("  Articles written: {}", stats.written());
    println!("  Images saved: {}", stats.images_saved);
    println!("  Videos saved: {}", stats.videos_saved);
    println!();

    if stats.skipped() > 0 {
        println!("Skipped:");
        for reason in [
            SkipReason::AlreadySeen,
            SkipReason::ExtractionFailed,
            SkipReason::WriteFailed,
            SkipReason::Cancelled,
        ] {
            let count = stats.count(CandidateState::Skipped(reason));
            if count > 0 {
                println!("  {}: {}", CandidateState::Skipped(reason), count);
            }
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} candidates written)",
        stats.success_rate(),
        stats.written(),
        stats.outcomes.values().sum::<u64>()
    );
}
