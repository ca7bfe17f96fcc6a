use criterion::{Criterion, criterion_group, criterion_main};
use othello_core::bitboard::{self, Bitboard, compute_hash};
use othello_core::board::Board;
use othello_core::disc::Player;
use othello_core::eval::{EvalProfile, evaluate};
use othello_core::square::Position;
use std::hint::black_box;

const MIDGAME: &str = "--O--O----OOOOO-XOOOOOOOXXOOXOOOXXXXXOXXXOXXOOXXXXXXOXOXXOOOOOOX";

fn midgame() -> Bitboard {
    Board::from_string(MIDGAME).unwrap().to_bitboard()
}

fn bench_get_moves(c: &mut Criterion) {
    let board = midgame();
    let own = board.own(Player::Black);
    let opp = board.opp(Player::Black);

    c.bench_function("bitboard_get_moves", |b| {
        b.iter(|| bitboard::get_moves(black_box(own), black_box(opp)))
    });
}

fn bench_flips(c: &mut Criterion) {
    let board = Bitboard::initial();
    let pos = Position::new(2, 3);

    c.bench_function("bitboard_flips", |b| {
        b.iter(|| black_box(board).flips_for_move(Player::Black, black_box(pos)))
    });
}

fn bench_hash(c: &mut Criterion) {
    let board = midgame();

    c.bench_function("bitboard_hash", |b| {
        b.iter(|| compute_hash(black_box(&board), Player::White))
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let board = Board::initial().to_bitboard();
    let midgame = midgame();

    c.bench_function("evaluate_opening", |b| {
        b.iter(|| evaluate(black_box(&board), Player::Black, EvalProfile::Classic))
    });
    c.bench_function("evaluate_midgame", |b| {
        b.iter(|| evaluate(black_box(&midgame), Player::Black, EvalProfile::Tournament))
    });
}

criterion_group!(benches, bench_get_moves, bench_flips, bench_hash, bench_evaluate);
criterion_main!(benches);
