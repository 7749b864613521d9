use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use umb::{CompressionFormat, ExportConfig, NumericType, TimeNotion, UmbReader, UmbWriter};

/// Random MDP in CSR form: (state offsets, choice offsets, targets, probabilities)
struct RandomModel {
    state_choices: Vec<u64>,
    choice_branches: Vec<u64>,
    targets: Vec<u64>,
    probabilities: Vec<f64>,
}

fn generate_model(num_states: u64, seed: u64) -> RandomModel {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model = RandomModel {
        state_choices: vec![0],
        choice_branches: vec![0],
        targets: Vec::new(),
        probabilities: Vec::new(),
    };
    let mut choices = 0u64;
    for _ in 0..num_states {
        for _ in 0..rng.gen_range(1..=3) {
            let branches = rng.gen_range(1..=4);
            for _ in 0..branches {
                model.targets.push(rng.gen_range(0..num_states));
                model.probabilities.push(1.0 / branches as f64);
            }
            model.choice_branches.push(model.targets.len() as u64);
            choices += 1;
        }
        model.state_choices.push(choices);
    }
    model
}

fn writer_for(model: &RandomModel) -> UmbWriter<'_> {
    let num_states = model.state_choices.len() as u64 - 1;
    let mut writer = UmbWriter::new();
    writer
        .index_mut()
        .set_time(TimeNotion::Discrete)
        .set_num_players(1)
        .set_num_states(num_states)
        .set_num_choices(model.choice_branches.len() as u64 - 1)
        .set_num_choice_actions(0)
        .set_num_branches(model.targets.len() as u64)
        .set_num_branch_actions(0)
        .set_branch_probability_type(NumericType::Double);
    writer
        .add_state_choice_offsets(model.state_choices.iter().copied())
        .unwrap();
    writer
        .add_choice_branch_offsets(model.choice_branches.iter().copied())
        .unwrap();
    writer.add_branch_targets(model.targets.iter().copied()).unwrap();
    writer
        .add_branch_probabilities(model.probabilities.iter().copied())
        .unwrap();
    writer.add_initial_state_indices([0]).unwrap();
    writer
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    for num_states in [1_000u64, 100_000] {
        let model = generate_model(num_states, 7);
        group.throughput(Throughput::Elements(model.targets.len() as u64));
        let configs = [
            ("plain", ExportConfig::uncompressed()),
            ("xz", ExportConfig::default()),
            (
                "zstd",
                ExportConfig::default().with_compression(Some(CompressionFormat::Zstd)),
            ),
        ];
        for (name, config) in configs {
            group.bench_with_input(BenchmarkId::new(name, num_states), &model, |b, model| {
                b.iter(|| {
                    let bytes = writer_for(model)
                        .export_to(Vec::new(), &config)
                        .unwrap();
                    black_box(bytes)
                })
            });
        }
    }
    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("extract");
    for num_states in [1_000u64, 100_000] {
        let model = generate_model(num_states, 11);
        let path = dir.path().join(format!("model-{num_states}.umb"));
        writer_for(&model)
            .export_with(&path, &ExportConfig::uncompressed())
            .unwrap();
        let reader = UmbReader::open(&path).unwrap();
        group.throughput(Throughput::Elements(model.targets.len() as u64));

        group.bench_function(BenchmarkId::new("branch_targets", num_states), |b| {
            b.iter(|| {
                let mut sum = 0u64;
                reader.extract_branch_targets(|t| sum += t).unwrap();
                black_box(sum)
            })
        });
        group.bench_function(BenchmarkId::new("choice_counts", num_states), |b| {
            b.iter(|| black_box(reader.max_state_choice_count().unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_export, bench_extract);
criterion_main!(benches);
