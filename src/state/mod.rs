//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `KeywordState`: pagination lifecycle of one search keyword
//! - `CandidateState`: lifecycle of one candidate article (fetched, written, skipped)

mod candidate_state;
mod keyword_state;

// Re-export main types
pub use candidate_state::{CandidateState, SkipReason};
pub use keyword_state::KeywordState;
