//! Game state management.
//!
//! [`GameCore`] is an immutable snapshot of a game in progress. Every
//! successful move produces a new core, and undo/redo walk the recorded
//! snapshots without touching the original value.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bitboard::Bitboard;
use crate::board::{Board, Score, Winner};
use crate::disc::Player;
use crate::error::MoveRejected;
use crate::square::{Position, positions};

static NEXT_GAME_ID: AtomicU64 = AtomicU64::new(1);

/// Whether a game is still being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Playing,
    Finished,
}

/// A move that has been played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub row: u8,
    pub col: u8,
    pub player: Player,
    pub captured_cells: Vec<Position>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Successful result of [`GameCore::make_move`].
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub mv: Position,
    pub new_core: GameCore,
    pub captured_cells: Vec<Position>,
}

/// State saved before a move so it can be undone.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    bitboard: Bitboard,
    current_player: Player,
    status: GameStatus,
}

/// An undone move together with the state it led to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RedoEntry {
    record: MoveRecord,
    after: Snapshot,
}

/// A game position plus its history.
///
/// `score` always matches the disc counts on `board` and `valid_moves` always
/// lists the legal moves of `current_player`.
#[derive(Debug, Clone)]
pub struct GameCore {
    id: u64,
    board: Board,
    bitboard: Bitboard,
    current_player: Player,
    valid_moves: Vec<Position>,
    score: Score,
    status: GameStatus,
    move_history: Arc<Vec<MoveRecord>>,
    snapshots: Arc<Vec<Snapshot>>,
    redo: Arc<Vec<RedoEntry>>,
}

impl Default for GameCore {
    fn default() -> Self {
        Self::new()
    }
}

impl GameCore {
    /// Creates a new game in the initial position with black to move.
    pub fn new() -> GameCore {
        GameCore::from_position(Bitboard::initial(), Player::Black)
    }

    /// Creates a game starting from an arbitrary position.
    ///
    /// If `player` has no legal move but the opponent does, the opponent is
    /// to move instead; if neither can move the game is already finished.
    pub fn from_position(bitboard: Bitboard, player: Player) -> GameCore {
        let (current_player, status) = resolve_turn(&bitboard, player);
        let id = NEXT_GAME_ID.fetch_add(1, Ordering::Relaxed);
        GameCore::build(
            id,
            bitboard,
            current_player,
            status,
            Arc::default(),
            Arc::default(),
            Arc::default(),
        )
    }

    fn build(
        id: u64,
        bitboard: Bitboard,
        current_player: Player,
        status: GameStatus,
        move_history: Arc<Vec<MoveRecord>>,
        snapshots: Arc<Vec<Snapshot>>,
        redo: Arc<Vec<RedoEntry>>,
    ) -> GameCore {
        let valid_moves = match status {
            GameStatus::Playing => positions(bitboard.valid_moves_mask(current_player)).collect(),
            GameStatus::Finished => Vec::new(),
        };
        GameCore {
            id,
            board: Board::from_bitboard(&bitboard),
            bitboard,
            current_player,
            valid_moves,
            score: Score {
                black: bitboard.count(Player::Black),
                white: bitboard.count(Player::White),
            },
            status,
            move_history,
            snapshots,
            redo,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn bitboard(&self) -> Bitboard {
        self.bitboard
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn valid_moves(&self) -> &[Position] {
        &self.valid_moves
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn move_history(&self) -> &[MoveRecord] {
        &self.move_history
    }

    pub fn is_game_over(&self) -> bool {
        self.status == GameStatus::Finished
    }

    /// Winner of a finished game, `None` while it is still being played.
    pub fn winner(&self) -> Option<Winner> {
        match self.status {
            GameStatus::Finished => Some(self.board.winner()),
            GameStatus::Playing => None,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.snapshots.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Plays `pos` for `player`.
    ///
    /// # Arguments
    ///
    /// * `player` - The side attempting the move.
    /// * `pos` - Target cell.
    ///
    /// # Returns
    ///
    /// The new core and the captured cells, or the reason the move was refused.
    /// `self` is never modified.
    pub fn make_move(&self, player: Player, pos: Position) -> Result<MoveOutcome, MoveRejected> {
        if self.status == GameStatus::Finished {
            return Err(MoveRejected::GameFinished);
        }
        if player != self.current_player {
            return Err(MoveRejected::NotYourTurn);
        }
        if !pos.is_on_board() {
            return Err(MoveRejected::InvalidPosition);
        }
        if self.bitboard.occupied() & pos.bitboard() != 0 {
            return Err(MoveRejected::Occupied);
        }
        let Some((next, flips)) = self.bitboard.apply_move(player, pos) else {
            return Err(MoveRejected::NoCaptures);
        };

        let captured_cells: Vec<Position> = positions(flips).collect();
        let record = MoveRecord {
            row: pos.row,
            col: pos.col,
            player,
            captured_cells: captured_cells.clone(),
            timestamp: now_millis(),
        };

        let mut history = (*self.move_history).clone();
        history.push(record);
        let mut snapshots = (*self.snapshots).clone();
        snapshots.push(self.snapshot());

        let (current_player, status) = resolve_turn(&next, player.opposite());
        let new_core = GameCore::build(
            self.id,
            next,
            current_player,
            status,
            Arc::new(history),
            Arc::new(snapshots),
            Arc::default(),
        );
        Ok(MoveOutcome {
            mv: pos,
            new_core,
            captured_cells,
        })
    }

    /// Plays `pos` for the side to move.
    pub fn play(&self, pos: Position) -> Result<MoveOutcome, MoveRejected> {
        self.make_move(self.current_player, pos)
    }

    /// Returns the game as it was before the last move, or `None` at the start.
    pub fn undo(&self) -> Option<GameCore> {
        let mut snapshots = (*self.snapshots).clone();
        let before = snapshots.pop()?;
        let mut history = (*self.move_history).clone();
        let record = history.pop()?;
        let mut redo = (*self.redo).clone();
        redo.push(RedoEntry {
            record,
            after: self.snapshot(),
        });
        Some(GameCore::build(
            self.id,
            before.bitboard,
            before.current_player,
            before.status,
            Arc::new(history),
            Arc::new(snapshots),
            Arc::new(redo),
        ))
    }

    /// Replays the most recently undone move, or returns `None` if there is none.
    pub fn redo(&self) -> Option<GameCore> {
        let mut redo = (*self.redo).clone();
        let entry = redo.pop()?;
        let mut history = (*self.move_history).clone();
        history.push(entry.record);
        let mut snapshots = (*self.snapshots).clone();
        snapshots.push(self.snapshot());
        Some(GameCore::build(
            self.id,
            entry.after.bitboard,
            entry.after.current_player,
            entry.after.status,
            Arc::new(history),
            Arc::new(snapshots),
            Arc::new(redo),
        ))
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            bitboard: self.bitboard,
            current_player: self.current_player,
            status: self.status,
        }
    }
}

/// Decides who moves next given the side that would normally move.
fn resolve_turn(bitboard: &Bitboard, candidate: Player) -> (Player, GameStatus) {
    if bitboard.has_moves(candidate) {
        (candidate, GameStatus::Playing)
    } else if bitboard.has_moves(candidate.opposite()) {
        (candidate.opposite(), GameStatus::Playing)
    } else {
        (candidate, GameStatus::Finished)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
