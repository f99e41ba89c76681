/// Candidate state definitions for tracking article progress
///
/// Every search hit handed to the coordinator walks
/// `Pending -> Fetched -> Written | Skipped`.
use std::fmt;

/// Why a candidate article did not produce a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// URL already written in this run (or a persisted earlier one)
    AlreadySeen,

    /// Page unreachable, or no title/body/paragraphs recoverable
    ExtractionFailed,

    /// Article extracted but the file could not be written
    WriteFailed,

    /// Run cancelled before the candidate was processed
    Cancelled,
}

/// Represents the current state of a candidate article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateState {
    /// Queued for extraction
    Pending,

    /// Extraction attempted and produced an article
    Fetched,

    /// Article file written; this is the commit point
    Written,

    /// Dropped without writing
    Skipped(SkipReason),
}

impl CandidateState {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Written | Self::Skipped(_))
    }

    /// Returns true if the candidate ended with a written file
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Written)
    }

    /// Returns true if the transition is allowed by the candidate lifecycle
    pub fn can_transition_to(&self, next: CandidateState) -> bool {
        match (self, next) {
            (Self::Pending, Self::Fetched) | (Self::Pending, Self::Skipped(_)) => true,
            (Self::Fetched, Self::Written) | (Self::Fetched, Self::Skipped(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetched => "fetched",
            Self::Written => "written",
            Self::Skipped(SkipReason::AlreadySeen) => "skipped_already_seen",
            Self::Skipped(SkipReason::ExtractionFailed) => "skipped_extraction_failed",
            Self::Skipped(SkipReason::WriteFailed) => "skipped_write_failed",
            Self::Skipped(SkipReason::Cancelled) => "skipped_cancelled",
        }
    }
}

impl fmt::Display for CandidateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
