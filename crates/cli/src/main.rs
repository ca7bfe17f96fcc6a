mod analyze;
mod game;
mod report;
mod selfplay;
mod ui;

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use othello_core::EngineOptions;
use othello_core::bitboard::Bitboard;
use othello_core::disc::Player;
use othello_core::eval::EvalProfile;
use othello_core::perft;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Profile {
    Classic,
    Tournament,
}

impl From<Profile> for EvalProfile {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Classic => EvalProfile::Classic,
            Profile::Tournament => EvalProfile::Tournament,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Side {
    Black,
    White,
}

impl From<Side> for Player {
    fn from(side: Side) -> Self {
        match side {
            Side::Black => Player::Black,
            Side::White => Player::White,
        }
    }
}

#[derive(Parser, Debug, Clone)]
struct EngineParams {
    /// Transposition table capacity in entries, as a power of two.
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u8).range(10..=28))]
    hash_bits: u8,

    #[arg(short, long, default_value = "30", value_parser = clap::value_parser!(u8).range(0..=60))]
    level: u8,

    /// Time per move in milliseconds.
    #[arg(short, long, default_value = "2000")]
    time: u64,

    /// Evaluation profile; chosen from the level when omitted.
    #[arg(long, value_enum)]
    profile: Option<Profile>,
}

impl EngineParams {
    fn engine_options(&self) -> EngineOptions {
        EngineOptions::new(1 << self.hash_bits)
            .with_level(self.level)
            .with_time_limit(Some(self.time_limit()))
            .with_eval_profile(self.profile.map(EvalProfile::from))
    }

    fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time)
    }
}

#[derive(Parser, Debug)]
#[command(name = "othello", version, about = "Othello engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<SubCommands>,

    #[command(flatten)]
    engine_params: EngineParams,
}

#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Analyze a position given as 64 cells of X, O and -.
    Analyze {
        board: String,

        #[arg(long, value_enum, default_value = "black")]
        player: Side,

        /// Split the search over this many worker threads.
        #[arg(long)]
        workers: Option<usize>,

        #[command(flatten)]
        engine_params: EngineParams,
    },
    /// Let the engine play against itself.
    Selfplay {
        #[arg(short = 'n', long, default_value = "10")]
        games: usize,

        /// Random moves at the start of every game.
        #[arg(long, default_value = "4")]
        random_plies: usize,

        #[arg(long, default_value = "1")]
        seed: u64,

        #[arg(long)]
        workers: Option<usize>,

        #[command(flatten)]
        engine_params: EngineParams,
    },
    /// Count move-generation leaves from the initial position.
    Perft {
        depth: u32,

        /// Print the count below every root move.
        #[arg(long)]
        divide: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Cli::parse();
    match args.command {
        Some(SubCommands::Analyze {
            board,
            player,
            workers,
            engine_params,
        }) => {
            if let Err(e) = analyze::analyze(
                &board,
                player.into(),
                engine_params.engine_options(),
                engine_params.level,
                engine_params.time_limit(),
                workers,
            ) {
                eprintln!("Error analyzing position: {e}");
                std::process::exit(1);
            }
        }
        Some(SubCommands::Selfplay {
            games,
            random_plies,
            seed,
            workers,
            engine_params,
        }) => {
            let settings = selfplay::SelfPlay {
                games,
                random_plies,
                level: engine_params.level,
                time_limit: engine_params.time_limit(),
                seed,
                workers,
            };
            if let Err(e) = selfplay::run(&settings, engine_params.engine_options()) {
                eprintln!("Self-play aborted: {e}");
                std::process::exit(1);
            }
        }
        Some(SubCommands::Perft { depth, divide }) => {
            let start = std::time::Instant::now();
            let nodes = if divide {
                let parts = perft::divide(&Bitboard::initial(), Player::Black, depth);
                for (mv, n) in &parts {
                    println!("{mv}: {n}");
                }
                parts.iter().map(|(_, n)| n).sum()
            } else {
                perft::perft_root(depth)
            };
            println!("perft({depth}) = {nodes} in {}ms", start.elapsed().as_millis());
        }
        None => {
            let params = args.engine_params;
            ui::ui_loop(params.engine_options(), params.level, params.time_limit()).unwrap_or_else(|err| {
                eprintln!("Failed to run interactive session: {err}");
            });
        }
    }
}
