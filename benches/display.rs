use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vizfield::{
    caching_display_processor, get_display_processor, DisplayProcessorOptions, DisplayTimeZone,
    Field, FieldConfig, FieldType, FieldValue, Theme, ThresholdStep, ThresholdsConfig,
    ThresholdsMode,
};

fn bench_field() -> Field {
    Field::new("value", FieldType::Number, vec![]).with_config(FieldConfig {
        unit: Some("short".to_string()),
        thresholds: Some(ThresholdsConfig::new(
            ThresholdsMode::Absolute,
            vec![
                ThresholdStep::base("green"),
                ThresholdStep::new(1_000.0, "yellow"),
                ThresholdStep::new(10_000.0, "red"),
            ],
        )),
        min: Some(0.0),
        max: Some(100_000.0),
        ..Default::default()
    })
}

fn display_processor(c: &mut Criterion) {
    let theme = Theme::dark();
    let field = bench_field();
    // a streaming-shaped workload: many repeats over a small value space
    let values: Vec<FieldValue> = (0..2_000)
        .map(|i| FieldValue::from(((i * 37) % 500) as f64 * 50.0))
        .collect();

    let uncached = get_display_processor(DisplayProcessorOptions {
        field: Some(&field),
        theme: &theme,
        time_zone: DisplayTimeZone::Utc,
    });
    c.bench_function("display_uncached", |b| {
        b.iter(|| {
            for value in &values {
                black_box(uncached.process(value));
            }
        })
    });

    let cached = caching_display_processor(
        get_display_processor(DisplayProcessorOptions {
            field: Some(&field),
            theme: &theme,
            time_zone: DisplayTimeZone::Utc,
        }),
        2500,
    );
    c.bench_function("display_cached", |b| {
        b.iter(|| {
            for value in &values {
                black_box(cached.process(value));
            }
        })
    });
}

criterion_group!(benches, display_processor);
criterion_main!(benches);
