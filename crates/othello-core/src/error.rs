//! Error types for the engine.
//!
//! Rejected moves and search failures are ordinary values: illegal input is
//! expected, not exceptional. Only [`BitboardError::InvalidBitIndex`] signals a
//! bug in the caller.

use thiserror::Error;

/// Reason a move was refused by the rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejected {
    #[error("square is already occupied")]
    Occupied,
    #[error("move does not capture any disc")]
    NoCaptures,
    #[error("position is outside the board")]
    InvalidPosition,
    #[error("game is already finished")]
    GameFinished,
    #[error("it is not this player's turn")]
    NotYourTurn,
}

impl MoveRejected {
    /// Returns the stable reason code reported to callers.
    pub fn reason_code(self) -> &'static str {
        match self {
            MoveRejected::Occupied => "occupied",
            MoveRejected::NoCaptures => "no_captures",
            MoveRejected::InvalidPosition => "invalid_position",
            MoveRejected::GameFinished => "game_finished",
            MoveRejected::NotYourTurn => "not_your_turn",
        }
    }
}

/// Errors raised by the bitboard layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitboardError {
    /// A bit index outside `0..64` was used. This means the board
    /// representation is corrupted.
    #[error("invalid bit index {0}, expected 0..64")]
    InvalidBitIndex(u32),
}

/// Errors from parsing boards and coordinates in text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("board string must have 64 cells, found {0}")]
    BoardLength(usize),
    #[error("unexpected board character {0:?}")]
    BoardChar(char),
    #[error("invalid position {0:?}")]
    Position(String),
}

/// Errors surfaced by the distributed search coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("no workers available")]
    NoWorkersAvailable,
    #[error("search job {job_id} timed out without any result")]
    Timeout { job_id: u64 },
    #[error("worker {worker_id} faulted: {message}")]
    WorkerFault { worker_id: usize, message: String },
    #[error("search job {job_id} was cancelled")]
    Cancelled { job_id: u64 },
    #[error("coordinator is not running")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        assert_eq!(MoveRejected::Occupied.reason_code(), "occupied");
        assert_eq!(MoveRejected::NoCaptures.reason_code(), "no_captures");
        assert_eq!(MoveRejected::InvalidPosition.reason_code(), "invalid_position");
        assert_eq!(MoveRejected::GameFinished.reason_code(), "game_finished");
        assert_eq!(MoveRejected::NotYourTurn.reason_code(), "not_your_turn");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            BitboardError::InvalidBitIndex(64).to_string(),
            "invalid bit index 64, expected 0..64"
        );
        assert_eq!(
            SearchError::NoWorkersAvailable.to_string(),
            "no workers available"
        );
    }
}
