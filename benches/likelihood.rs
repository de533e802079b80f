use ahash::AHashMap;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use skilltrace::model::bkt::{skill_log_likelihood, BktParams};

fn bench_skill_log_likelihood(c: &mut Criterion) {
    let mut group = c.benchmark_group("skill_log_likelihood");

    let params = BktParams {
        psi: 0.3,
        mu: 0.1,
        pi1: 0.9,
        prop0: 0.2,
    };

    for &num_trials in &[50usize, 500, 5_000] {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let num_students = 20;

        let mut trials: AHashMap<usize, Vec<usize>> = AHashMap::new();
        let mut sequences = Vec::with_capacity(num_students);
        for student in 0..num_students {
            let sequence: Vec<(usize, bool)> =
                (0..num_trials).map(|_| (0, rng.gen::<f64>() < 0.7)).collect();
            sequences.push(sequence);
            trials.insert(student, (0..num_trials).collect());
        }
        let students: Vec<usize> = (0..num_students).collect();
        let first_exposures = vec![0usize; num_students];

        group.bench_function(format!("students{}_trials{}", num_students, num_trials), |b| {
            b.iter(|| {
                black_box(skill_log_likelihood(
                    black_box(&trials),
                    black_box(&sequences),
                    black_box(&params),
                    black_box(&students),
                    black_box(&first_exposures),
                ))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_skill_log_likelihood);
criterion_main!(benches);
