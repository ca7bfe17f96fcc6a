//! One-shot analysis of a position given on the command line.

use std::time::Duration;

use othello_core::board::Board;
use othello_core::disc::Player;
use othello_core::game_state::GameCore;
use othello_core::{AnalysisRequest, Coordinator, CoordinatorConfig, Engine, EngineOptions};

use crate::report;

/// Analyzes `board_text` (64 cells, `X`/`O`/`-`) with `player` to move.
///
/// With `workers` set, the search is split over a worker pool.
pub fn analyze(
    board_text: &str,
    player: Player,
    options: EngineOptions,
    level: u8,
    time_limit: Duration,
    workers: Option<usize>,
) -> Result<(), String> {
    let board = Board::from_string(board_text).map_err(|e| e.to_string())?;
    let core = GameCore::from_position(board.to_bitboard(), player);
    if core.current_player() != player && !core.is_game_over() {
        println!("{player} has no legal move and passes.");
    }
    println!("{board}");

    let request = AnalysisRequest::new(core)
        .with_skill(level)
        .with_time_limit(time_limit);
    let result = match workers {
        Some(workers) => {
            let coordinator = Coordinator::new(
                CoordinatorConfig::default()
                    .with_workers(workers)
                    .with_engine_options(options),
            );
            coordinator.analyze(request).map_err(|e| e.to_string())?
        }
        None => Engine::new(options).analyze(&request),
    };

    report::print_analysis(&result);
    match result.best_move {
        Some(mv) => println!("best move: {mv}"),
        None => println!("no move available"),
    }
    Ok(())
}
