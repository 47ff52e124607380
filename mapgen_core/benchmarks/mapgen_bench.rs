use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use mapgen_core::{
    run_generation, ClimateRefiner, DefaultTerrain, MapDimensions, MapgenTunables,
    PlayerRosterResource, StartBiasCatalog, StoryTags, WorldFields,
};

fn bench_generation(c: &mut Criterion) {
    let tunables = MapgenTunables::builtin();
    let catalog = StartBiasCatalog::builtin();
    let roster = PlayerRosterResource::sample(&catalog, 8, true);
    let mut group = c.benchmark_group("generation");
    group.sample_size(10);

    for (width, height) in [(44u32, 26u32), (84, 54), (128, 80)] {
        group.bench_with_input(
            BenchmarkId::new("grid", format!("{width}x{height}")),
            &(width, height),
            |b, &(width, height)| {
                b.iter(|| {
                    run_generation(
                        7,
                        MapDimensions { width, height },
                        &tunables,
                        &catalog,
                        &roster.0,
                        &DefaultTerrain,
                    )
                })
            },
        );
    }

    group.finish();
}

fn bench_climate(c: &mut Criterion) {
    let tunables = MapgenTunables::builtin();
    let catalog = StartBiasCatalog::builtin();
    let map = run_generation(
        3,
        MapDimensions::default(),
        &tunables,
        &catalog,
        &[],
        &DefaultTerrain,
    );

    c.bench_function("climate_refine", |b| {
        b.iter_batched(
            || map.grid.clone(),
            |mut grid| {
                ClimateRefiner::new(&tunables, &map.fields, &map.tags).refine(&mut grid);
                grid
            },
            BatchSize::SmallInput,
        )
    });

    let fields = WorldFields::new();
    let tags = StoryTags::new();
    c.bench_function("climate_refine_untagged", |b| {
        b.iter_batched(
            || map.grid.clone(),
            |mut grid| {
                ClimateRefiner::new(&tunables, &fields, &tags).refine(&mut grid);
                grid
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(mapgen_benches, bench_generation, bench_climate);
criterion_main!(mapgen_benches);
