use criterion::{criterion_group, criterion_main, Criterion};
use powledger_core::{Block, Transaction, GENESIS_HASH};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn bench_pow(c: &mut Criterion) {
    c.bench_function("mine_block_difficulty_2", |b| {
        let mut rng = StdRng::seed_from_u64(42);
        let tx = Transaction::new(
            format!("alice-{}", rng.gen_range(0..100)),
            "bob",
            rng.gen_range(1..10) as f64,
        );
        let block = Block::new(tx, GENESIS_HASH.to_string());

        b.iter(|| {
            let mut candidate = block.clone();
            candidate.mine(2).unwrap()
        });
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
