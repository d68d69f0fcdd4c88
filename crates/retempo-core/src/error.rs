//! Error types for the streaming core.

/// Why a [`StreamFilter::set_position`](crate::StreamFilter::set_position)
/// request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    /// The requested position is past the frames delivered so far.
    AheadOfCurrent {
        /// Requested output position.
        requested: usize,
        /// Frames delivered so far.
        current: usize,
    },
    /// The requested position has already been evicted from history.
    OutsideHistory {
        /// Requested output position.
        requested: usize,
        /// Earliest output position still retained.
        earliest: usize,
    },
}

impl core::fmt::Display for PositionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AheadOfCurrent { requested, current } => write!(
                f,
                "position {requested} is ahead of the current position {current}"
            ),
            Self::OutsideHistory {
                requested,
                earliest,
            } => write!(
                f,
                "position {requested} is outside the retained history (earliest {earliest})"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PositionError {}
