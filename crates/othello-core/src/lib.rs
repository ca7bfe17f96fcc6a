pub mod bitboard;
pub mod board;
pub mod constants;
pub mod coordinator;
pub mod disc;
pub mod engine;
pub mod error;
pub mod eval;
pub mod game_state;
pub mod level;
pub mod move_list;
pub mod perft;
pub mod search;
pub mod square;
mod stability;
pub mod transposition_table;
pub mod types;

pub use coordinator::{Coordinator, CoordinatorConfig, JobHandle};
pub use engine::{AnalysisRequest, AnalysisResult, AnalysisStats, Engine, EngineOptions, SearchOptions};
pub use error::{BitboardError, MoveRejected, ParseError, SearchError};
