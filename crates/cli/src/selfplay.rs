//! Engine-versus-engine games.

use std::time::Duration;

use colored::Colorize;
use log::info;
use othello_core::board::Winner;
use othello_core::game_state::GameCore;
use othello_core::square::Position;
use othello_core::{AnalysisRequest, AnalysisResult, Coordinator, CoordinatorConfig, Engine, EngineOptions, SearchError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

/// Where moves come from: one engine in this thread, or a worker pool.
enum Mover {
    Local(Box<Engine>),
    Pool(Coordinator),
}

impl Mover {
    fn analyze(&mut self, request: AnalysisRequest) -> Result<AnalysisResult, SearchError> {
        match self {
            Mover::Local(engine) => Ok(engine.analyze(&request)),
            Mover::Pool(coordinator) => coordinator.analyze(request),
        }
    }
}

/// Settings of a self-play run.
pub struct SelfPlay {
    pub games: usize,
    /// Number of random opening moves before the engine takes over.
    pub random_plies: usize,
    pub level: u8,
    pub time_limit: Duration,
    pub seed: u64,
    /// Worker count; `None` plays with a single local engine.
    pub workers: Option<usize>,
}

#[derive(Default)]
struct Tally {
    black: usize,
    white: usize,
    draws: usize,
    discs: i64,
}

fn play_game(mover: &mut Mover, rng: &mut StdRng, settings: &SelfPlay) -> Result<GameCore, SearchError> {
    let mut core = GameCore::new();
    while !core.is_game_over() {
        let random = core.move_history().len() < settings.random_plies;
        let mv = if random {
            core.valid_moves().choose(rng).copied()
        } else {
            let opponent_moves = core
                .move_history()
                .last()
                .map(|r| Position::new(r.row, r.col))
                .into_iter()
                .collect();
            let request = AnalysisRequest::new(core.clone())
                .with_skill(settings.level)
                .with_time_limit(settings.time_limit)
                .with_opponent_moves(opponent_moves);
            mover.analyze(request)?.best_move
        };
        let Some(mv) = mv else {
            break;
        };
        match core.play(mv) {
            Ok(outcome) => core = outcome.new_core,
            Err(reason) => {
                log::error!("engine produced an illegal move {mv}: {reason}");
                break;
            }
        }
    }
    Ok(core)
}

/// Plays the configured games and prints a summary.
pub fn run(settings: &SelfPlay, options: EngineOptions) -> Result<(), SearchError> {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut mover = match settings.workers {
        Some(workers) => Mover::Pool(Coordinator::new(
            CoordinatorConfig::default()
                .with_workers(workers)
                .with_engine_options(options),
        )),
        None => Mover::Local(Box::new(Engine::new(options))),
    };

    let mut tally = Tally::default();
    for game in 1..=settings.games {
        let core = play_game(&mut mover, &mut rng, settings)?;
        let score = core.score();
        match core.winner() {
            Some(Winner::Black) => tally.black += 1,
            Some(Winner::White) => tally.white += 1,
            _ => tally.draws += 1,
        }
        tally.discs += score.black as i64 - score.white as i64;
        info!("game {game}: {} {}-{}", core.board().to_compact_string(), score.black, score.white);
        println!(
            "game {:>3}: {} {:>2}-{:<2}",
            game,
            core.move_history()
                .iter()
                .map(|r| Position::new(r.row, r.col).to_string())
                .collect::<String>(),
            score.black,
            score.white
        );
    }

    println!();
    println!(
        "{} black {} / white {} / draws {}  (average margin {:+.2})",
        "result:".bold(),
        tally.black,
        tally.white,
        tally.draws,
        tally.discs as f64 / settings.games.max(1) as f64
    );
    Ok(())
}
