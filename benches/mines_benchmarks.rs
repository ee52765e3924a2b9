//! Benchmarks for the Mines hot paths

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hiwa_mines::gaming::{BoardGenerator, GameRules, PayoutModel};
use hiwa_mines::token::{LedgerPolicy, MemoryLedger};
use hiwa_mines::MinesEngine;

fn benchmark_board_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("board_generation");
    let generator = BoardGenerator::seeded(42);

    for mines in [3u8, 12, 24] {
        group.bench_function(format!("generate_{}_mines", mines), |b| {
            b.iter(|| generator.generate(black_box(mines)))
        });
    }

    group.finish();
}

fn benchmark_payout(c: &mut Criterion) {
    let mut group = c.benchmark_group("payout");
    let model = PayoutModel::default();

    group.bench_function("multiplier_after", |b| {
        b.iter(|| model.multiplier_after(black_box(5), black_box(12)))
    });
    group.bench_function("table_3_mines", |b| b.iter(|| model.table(black_box(3))));

    group.finish();
}

fn benchmark_game_round(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("runtime");

    let ledger = Arc::new(MemoryLedger::new(LedgerPolicy::default()));
    let engine = MinesEngine::new(
        ledger.clone(),
        BoardGenerator::seeded(7),
        PayoutModel::default(),
        GameRules::default(),
    );
    runtime.block_on(async {
        ledger.register(1, None).await.expect("register");
        ledger.set_balance(1, u64::MAX / 2).await.expect("fund");
    });

    // Start a game and sweep the board until it settles
    c.bench_function("start_and_sweep", |b| {
        b.iter(|| {
            runtime.block_on(async {
                engine.start_game(1, 1, 5).await.expect("start");
                for index in 0..25 {
                    let result = engine
                        .reveal_tile(1, index / 5, index % 5)
                        .await
                        .expect("reveal");
                    if matches!(result, hiwa_mines::gaming::MoveResult::Finished(_)) {
                        break;
                    }
                }
            })
        })
    });
}

criterion_group!(benches, benchmark_board_generation, benchmark_payout, benchmark_game_round);
criterion_main!(benches);
