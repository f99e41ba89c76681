/// Keyword search lifecycle
///
/// `Searching -> PagesExhausted | MaxPagesReached -> Done`
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordState {
    /// Result pages are still being requested
    Searching,

    /// A page matched none of the result containers; `page` was the last requested
    PagesExhausted { page: u32 },

    /// The configured page limit was reached
    MaxPagesReached,

    /// All hits for the keyword have been handled
    Done,
}

impl KeywordState {
    /// Moves a finished search to `Done`; any other state is returned unchanged
    pub fn finish(self) -> Self {
        match self {
            Self::PagesExhausted { .. } | Self::MaxPagesReached => Self::Done,
            other => other,
        }
    }
}

impl fmt::Display for KeywordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Searching => write!(f, "searching"),
            Self::PagesExhausted { page } => write!(f, "pages exhausted at page {}", page),
            Self::MaxPagesReached => write!(f, "max pages reached"),
            Self::Done => write!(f, "done"),
        }
    }
}
