//! Line-oriented interactive play.

use std::time::Duration;

use colored::Colorize;
use othello_core::disc::Player;
use othello_core::square::Position;
use othello_core::{AnalysisRequest, AnalysisResult, Engine, EngineOptions};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::game::GameState;
use crate::report;

/// Who plays which colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    HumanBlack,
    HumanWhite,
    EngineOnly,
    HumanOnly,
}

impl Mode {
    fn from_index(index: usize) -> Option<Mode> {
        match index {
            0 => Some(Mode::HumanBlack),
            1 => Some(Mode::HumanWhite),
            2 => Some(Mode::EngineOnly),
            3 => Some(Mode::HumanOnly),
            _ => None,
        }
    }

    fn engine_plays(self, side: Player) -> bool {
        matches!(
            (self, side),
            (Mode::HumanBlack, Player::White) | (Mode::HumanWhite, Player::Black) | (Mode::EngineOnly, _)
        )
    }
}

fn print_help() {
    println!("  <move>         play a move, e.g. d3");
    println!("  play <moves>   play a sequence, e.g. d3c5f6");
    println!("  go             let the engine move");
    println!("  hint           show the engine's choice without playing it");
    println!("  undo | redo    step through the game");
    println!("  level <0-60>   set the engine level");
    println!("  time <ms>      set the time per move");
    println!("  mode <0-3>     0: human black, 1: human white, 2: engine only, 3: human only");
    println!("  new            start over");
    println!("  quit");
}

fn think(engine: &mut Engine, game: &GameState, level: u8, time_limit: Duration) -> AnalysisResult {
    let opponent_moves = game.last_move().into_iter().collect();
    let request = AnalysisRequest::new(game.core().clone())
        .with_skill(level)
        .with_time_limit(time_limit)
        .with_opponent_moves(opponent_moves);
    engine.analyze(&request)
}

fn engine_move(engine: &mut Engine, game: &mut GameState, level: u8, time_limit: Duration) -> bool {
    let result = think(engine, game, level, time_limit);
    report::print_analysis(&result);
    match result.best_move {
        Some(mv) if game.make_move(mv).is_ok() => {
            println!("Computer plays {}\n", mv.to_string().bold());
            true
        }
        _ => false,
    }
}

fn play_sequence(game: &mut GameState, moves: &str) {
    let chars: Vec<char> = moves.chars().collect();
    for chunk in chars.chunks(2) {
        let text: String = chunk.iter().collect();
        let Ok(pos) = text.parse::<Position>() else {
            println!("Invalid move: {text}");
            return;
        };
        if let Err(reason) = game.make_move(pos) {
            println!("Illegal move {text}: {reason}");
            return;
        }
    }
}

/// Runs the interactive loop until the user quits.
///
/// # Arguments
/// * `options` - Engine settings.
/// * `level` - Initial engine level.
/// * `time_limit` - Initial time per engine move.
pub fn ui_loop(options: EngineOptions, level: u8, time_limit: Duration) -> Result<(), ReadlineError> {
    let mut rl = DefaultEditor::new()?;
    let mut game = GameState::new();
    let mut engine = Engine::new(options);
    let mut level = level;
    let mut time_limit = time_limit;
    let mut mode = Mode::HumanBlack;

    loop {
        game.print();
        println!();

        if mode.engine_plays(game.side_to_move())
            && !game.is_game_over()
            && engine_move(&mut engine, &mut game, level, time_limit)
        {
            continue;
        }

        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        };
        let _ = rl.add_history_entry(&line);
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            continue;
        };
        println!();

        match cmd {
            "new" | "n" => {
                game = GameState::new();
                engine.reset();
            }
            "undo" | "u" => {
                if !game.undo() {
                    println!("Cannot undo.");
                }
            }
            "redo" | "r" => {
                if !game.redo() {
                    println!("Cannot redo.");
                }
            }
            "level" | "l" => match parts.next().and_then(|s| s.parse::<u8>().ok()) {
                Some(value) if value <= 60 => level = value,
                _ => println!("Current level: {level}"),
            },
            "time" | "t" => match parts.next().and_then(|s| s.parse::<u64>().ok()) {
                Some(ms) => time_limit = Duration::from_millis(ms),
                None => println!("Current time per move: {}ms", time_limit.as_millis()),
            },
            "mode" | "m" => match parts.next().and_then(|s| s.parse::<usize>().ok()).and_then(Mode::from_index) {
                Some(m) => {
                    mode = m;
                    println!("Mode changed to: {mode:?}");
                }
                None => println!("Invalid mode number. Please specify a value between 0-3."),
            },
            "go" => {
                if !game.is_game_over() {
                    engine_move(&mut engine, &mut game, level, time_limit);
                }
            }
            "hint" => {
                let result = think(&mut engine, &game, level, time_limit);
                report::print_analysis(&result);
            }
            "play" => {
                if let Some(moves) = parts.next() {
                    play_sequence(&mut game, moves);
                }
            }
            "moves" => println!("{}", game.transcript()),
            "help" | "h" | "?" => print_help(),
            "quit" | "q" => break,
            _ => match cmd.parse::<Position>() {
                Ok(pos) => {
                    if let Err(reason) = game.make_move(pos) {
                        println!("Illegal move {cmd}: {reason}\n");
                    }
                }
                Err(_) => println!("Unknown command: {cmd} (type help)\n"),
            },
        }
    }
    Ok(())
}
