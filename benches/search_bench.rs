use std::sync::Arc;

use chess_search::{
    Evaluator, GameControlInfo, Position, SearchDriver, SearchRequest, SearchTuning,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const ITALIAN: &str = "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";

fn bench_perft(c: &mut Criterion) {
    let position = Position::starting();
    c.bench_function("perft_3_start", |b| b.iter(|| black_box(position.perft(black_box(3)))));
}

fn bench_evaluate(c: &mut Criterion) {
    let position = Position::from_fen(ITALIAN).unwrap();
    let evaluator = Evaluator::new();
    c.bench_function("evaluate_italian", |b| {
        b.iter(|| black_box(evaluator.score(black_box(&position), 0)))
    });
}

fn bench_search(c: &mut Criterion) {
    let position = Position::from_fen(ITALIAN).unwrap();
    let mut group = c.benchmark_group("search_depth_3");
    group.sample_size(10);
    for threads in [1usize, 4] {
        group.bench_function(format!("{threads}_threads"), |b| {
            b.iter(|| {
                let mut driver = SearchDriver::new(SearchTuning::default());
                let request = SearchRequest::new(3).with_threads(threads);
                let control = Arc::new(GameControlInfo::new());
                black_box(driver.get_move(&position, &request, control, |_| {}).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_perft, bench_evaluate, bench_search);
criterion_main!(benches);
