//! Move generation testing by exhaustive tree walks.

use crate::bitboard::Bitboard;
use crate::disc::Player;
use crate::square::{Position, positions};

/// Executes a perft run starting from the standard initial position.
///
/// # Arguments
///
/// * `depth` - Number of plies to expand from the initial position. A depth of
///   `1` counts the immediate legal moves; larger values walk the tree
///   recursively.
///
/// # Returns
///
/// The total node count the search visits from the initial position.
pub fn perft_root(depth: u32) -> u64 {
    let mut board = Bitboard::initial();
    perft(&mut board, Player::Black, depth)
}

/// Counts the leaves of the game tree below `board`.
///
/// A forced pass hands the move to the opponent without using up depth, and
/// a finished game counts as a single leaf. The board is restored before
/// returning.
pub fn perft(board: &mut Bitboard, player: Player, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = board.valid_moves_mask(player);
    if moves == 0 {
        let opponent = player.opposite();
        return if board.has_moves(opponent) { perft(board, opponent, depth) } else { 1 };
    }
    if depth == 1 {
        return moves.count_ones() as u64;
    }

    let mut nodes = 0;
    for pos in positions(moves) {
        let Some(undo) = board.flip_pieces(player, pos) else {
            continue;
        };
        nodes += perft(board, player.opposite(), depth - 1);
        board.undo_move(&undo);
    }
    nodes
}

/// Per-move breakdown of [`perft`] for the root moves of `board`.
pub fn divide(board: &Bitboard, player: Player, depth: u32) -> Vec<(Position, u64)> {
    let mut board = *board;
    positions(board.valid_moves_mask(player))
        .filter_map(|pos| {
            let undo = board.flip_pieces(player, pos)?;
            let nodes = perft(&mut board, player.opposite(), depth.saturating_sub(1));
            board.undo_move(&undo);
            Some((pos, nodes))
        })
        .collect()
}
