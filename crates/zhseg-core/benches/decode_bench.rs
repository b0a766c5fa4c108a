use criterion::{Criterion, black_box, criterion_group, criterion_main};
use zhseg_core::{ModelConfig, ModelParams, ViterbiDecoder, WindowMatrix, emission_matrix};

fn bench_decode(c: &mut Criterion) {
    let config = ModelConfig::new(3500, 50, 1);
    let params = ModelParams::init(config, 7).unwrap();

    let sentence: Vec<usize> = (0..40).map(|i| 2 + (i * 37) % 3000).collect();
    let windows = WindowMatrix::build(&sentence, config.skip_window);
    let emissions = emission_matrix(&params.score_windows(&windows).unwrap());
    let decoder = ViterbiDecoder::new();

    c.bench_function("score_windows_40", |b| {
        b.iter(|| params.score_windows(black_box(&windows)).unwrap());
    });

    c.bench_function("viterbi_decode_40", |b| {
        b.iter(|| {
            decoder
                .decode(black_box(&emissions), &params.transitions)
                .unwrap()
        });
    });

    c.bench_function("viterbi_decode_two_path_40", |b| {
        b.iter(|| {
            decoder
                .decode_two_path(black_box(&emissions), &params.transitions)
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
