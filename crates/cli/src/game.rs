//! Game state for the interactive CLI.
//!
//! Wraps [`GameCore`] with undo/redo navigation and a colored board printer.

use colored::Colorize;
use othello_core::board::Winner;
use othello_core::disc::{Disc, Player};
use othello_core::error::MoveRejected;
use othello_core::game_state::GameCore;
use othello_core::square::Position;

/// A game being played in the terminal.
pub struct GameState {
    core: GameCore,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Creates a new game in the initial position, Black to move.
    pub fn new() -> Self {
        Self { core: GameCore::new() }
    }

    pub fn core(&self) -> &GameCore {
        &self.core
    }

    pub fn side_to_move(&self) -> Player {
        self.core.current_player()
    }

    pub fn is_game_over(&self) -> bool {
        self.core.is_game_over()
    }

    /// Plays `pos` for the side to move.
    ///
    /// # Returns
    /// The number of captured discs, or the reason the move was refused.
    pub fn make_move(&mut self, pos: Position) -> Result<usize, MoveRejected> {
        let outcome = self.core.play(pos)?;
        self.core = outcome.new_core;
        Ok(outcome.captured_cells.len())
    }

    /// Takes back the last move. Returns `false` if there is none.
    pub fn undo(&mut self) -> bool {
        match self.core.undo() {
            Some(core) => {
                self.core = core;
                true
            }
            None => false,
        }
    }

    /// Replays the last undone move. Returns `false` if there is none.
    pub fn redo(&mut self) -> bool {
        match self.core.redo() {
            Some(core) => {
                self.core = core;
                true
            }
            None => false,
        }
    }

    pub fn last_move(&self) -> Option<Position> {
        self.core
            .move_history()
            .last()
            .map(|record| Position::new(record.row, record.col))
    }

    /// Moves played so far, in algebraic notation.
    pub fn transcript(&self) -> String {
        self.core
            .move_history()
            .iter()
            .map(|record| Position::new(record.row, record.col).to_string())
            .collect()
    }

    /// Prints a colored representation of the board to the terminal.
    pub fn print(&self) {
        let board = self.core.board();
        let side_to_move = self.core.current_player();
        let legal = self.core.valid_moves();
        let last_move = self.last_move();
        let score = self.core.score();

        println!("      a   b   c   d   e   f   g   h");
        println!("    ┌───┬───┬───┬───┬───┬───┬───┬───┐");

        for row in 0..8u8 {
            print!("  {} │", row + 1);

            for col in 0..8u8 {
                let pos = Position::new(row, col);
                let is_last_move = Some(pos) == last_move;
                let symbol = match board.get(pos) {
                    Disc::Black if is_last_move => " X ".on_bright_black().bright_green(),
                    Disc::White if is_last_move => " O ".on_bright_black().bright_yellow(),
                    Disc::Black => " X ".bright_green(),
                    Disc::White => " O ".bright_yellow(),
                    Disc::Empty if legal.contains(&pos) => " · ".bright_cyan(),
                    Disc::Empty => "   ".black(),
                };
                print!("{symbol}│");
            }

            match row {
                2 if !self.core.is_game_over() => {
                    let player_info = match side_to_move {
                        Player::Black => "Black's turn (X)".bright_green(),
                        Player::White => "White's turn (O)".bright_yellow(),
                    };
                    println!("   {player_info}");
                }
                3 => println!("   Black: {}", format!("{:2}", score.black).bright_green()),
                4 => println!("   White: {}", format!("{:2}", score.white).bright_yellow()),
                6 => match self.core.winner() {
                    Some(Winner::Black) => println!("   {}", "Black wins!".bright_green()),
                    Some(Winner::White) => println!("   {}", "White wins!".bright_yellow()),
                    Some(Winner::Draw) => println!("   {}", "Draw".bright_cyan()),
                    None => println!(),
                },
                7 if self.core.is_game_over() => println!("   {}", "*** Game Over ***".bright_red()),
                _ => println!(),
            }

            if row < 7 {
                println!("    ├───┼───┼───┼───┼───┼───┼───┼───┤");
            }
        }

        println!("    └───┴───┴───┴───┴───┴───┴───┴───┘");
    }
}
